use crate::engine::tally::Tally;
use crate::model::{AddressReport, OutputConfig};
use std::io::Write;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::sink::OutputSink;

/// Hands reports to a blocking writer task so slow stdout never stalls a probe.
pub struct OutputChannel {
    tx: Option<mpsc::Sender<OutputCommand>>,
    writer: Option<JoinHandle<()>>,
}

enum OutputCommand {
    Report(AddressReport),
    Summary(Tally),
}

impl OutputChannel {
    pub fn new(cfg: OutputConfig) -> anyhow::Result<Self> {
        Ok(Self::with_writer(cfg, Box::new(std::io::stdout())))
    }

    pub fn with_writer(cfg: OutputConfig, writer: Box<dyn Write + Send>) -> Self {
        let (tx, mut rx) = mpsc::channel(64);
        let writer = tokio::task::spawn_blocking(move || {
            let mut sink = OutputSink::new(cfg, writer);
            while let Some(cmd) = rx.blocking_recv() {
                let res = match cmd {
                    OutputCommand::Report(report) => sink.write_report(&report),
                    OutputCommand::Summary(tally) => sink.write_summary(&tally),
                };
                if let Err(err) = res {
                    tracing::error!(error = %err, "failed to write scan output");
                }
            }
            sink.flush();
        });

        Self {
            tx: Some(tx),
            writer: Some(writer),
        }
    }

    pub async fn emit(&self, report: AddressReport) -> anyhow::Result<()> {
        self.send(OutputCommand::Report(report)).await
    }

    pub async fn emit_summary(&self, tally: Tally) -> anyhow::Result<()> {
        self.send(OutputCommand::Summary(tally)).await
    }

    async fn send(&self, cmd: OutputCommand) -> anyhow::Result<()> {
        let Some(tx) = &self.tx else {
            anyhow::bail!("output already closed; dropping scan output");
        };
        tx.send(cmd)
            .await
            .map_err(|err| anyhow::anyhow!("output writer stopped: {err}"))
    }

    /// Closes the queue and waits until everything queued has been written.
    pub async fn shutdown(&mut self) -> anyhow::Result<()> {
        self.tx = None;
        if let Some(writer) = self.writer.take() {
            writer
                .await
                .map_err(|err| anyhow::anyhow!("failed to join output writer: {err}"))?;
        }
        Ok(())
    }
}
