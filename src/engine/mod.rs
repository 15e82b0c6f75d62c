pub mod reader;
pub mod tally;

use crate::model::{AddressReport, Config, PortResult, Target};
use crate::output::OutputChannel;
use crate::probe::probe_address;
use std::net::SocketAddr;
use tally::Tally;
use tokio_stream::StreamExt;
use tracing::{debug, instrument};

/// Probes every target and port one at a time and reports as it goes.
pub struct Engine {
    cfg: Config,
    sink: OutputChannel,
    tally: Tally,
}

impl Engine {
    pub fn new(cfg: Config, sink: OutputChannel) -> Self {
        Self {
            cfg,
            sink,
            tally: Tally::default(),
        }
    }

    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    /// Scans everything, then closes the output whether or not the scan
    /// finished cleanly.
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let scanned = self.scan_all().await;
        let closed = self.sink.shutdown().await;
        scanned.and(closed)
    }

    async fn scan_all(&mut self) -> anyhow::Result<()> {
        let mut targets = crate::input::stream_targets(&self.cfg);

        while let Some(target) = targets.next().await {
            let report = self.scan_target(&target).await;
            self.sink.emit(report).await?;
        }

        if self.cfg.output.summary {
            self.sink.emit_summary(self.tally.clone()).await?;
        }
        Ok(())
    }

    #[instrument(skip(self, target), fields(host = %target.host, addr = %target.addr))]
    pub async fn scan_target(&mut self, target: &Target) -> AddressReport {
        let timestamp = self
            .cfg
            .output
            .timestamp
            .as_deref()
            .map(crate::util::now_formatted);
        let mut report = AddressReport::new(target, timestamp);

        for &port in &target.ports {
            let starttls = self.cfg.upgrade_mode(port);
            let outcome =
                probe_address(SocketAddr::new(target.addr, port), starttls, &self.cfg.probe).await;
            debug!(port, ?outcome, "probe finished");
            self.tally.record(port, outcome);
            report.results.push(PortResult {
                port,
                outcome,
                starttls,
            });
        }

        report
    }
}
