use crate::clients::{self, Connection};
use crate::engine::reader::RecordReader;
use crate::model::{ProbeConfig, ProbeOutcome, UpgradeMode};
use crate::tls::{
    build_client_hello, build_heartbeat_request, is_server_hello_done, Record, CONTENT_TYPE_ALERT,
    CONTENT_TYPE_HANDSHAKE, CONTENT_TYPE_HEARTBEAT, HEARTBEAT_MIN_RESPONSE,
};
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};
use tracing::{debug, instrument, trace};

use super::ProbeStage;

/// Connects to `addr` and runs a full probe over the new connection.
#[instrument(skip(cfg))]
pub async fn probe_address(
    addr: SocketAddr,
    upgrade: Option<UpgradeMode>,
    cfg: &ProbeConfig,
) -> ProbeOutcome {
    let mut stream = match timeout(cfg.connect_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(err)) => {
            debug!(error = %err, "connect failed");
            return ProbeStage::Connecting.outcome_without_evidence();
        }
        Err(_) => {
            debug!("connect timeout");
            return ProbeStage::Connecting.outcome_without_evidence();
        }
    };

    let outcome = probe_stream(&mut stream, upgrade, cfg).await;
    let _ = stream.shutdown().await;
    outcome
}

/// Runs a probe over an already established connection.
pub async fn probe_stream<S: Connection>(
    stream: &mut S,
    upgrade: Option<UpgradeMode>,
    cfg: &ProbeConfig,
) -> ProbeOutcome {
    HeartbleedProbe::new(cfg).run(stream, upgrade).await
}

/// State for one probe attempt. Holds the connection's record reader, so it
/// must not outlive the connection it was used on.
pub struct HeartbleedProbe<'a> {
    cfg: &'a ProbeConfig,
    reader: RecordReader,
    stage: ProbeStage,
}

impl<'a> HeartbleedProbe<'a> {
    pub fn new(cfg: &'a ProbeConfig) -> Self {
        Self {
            cfg,
            reader: RecordReader::new(cfg.header_timeout, cfg.payload_timeout),
            stage: ProbeStage::Connecting,
        }
    }

    pub fn stage(&self) -> ProbeStage {
        self.stage
    }

    fn enter(&mut self, stage: ProbeStage) {
        trace!(from = %self.stage, to = %stage, "probe stage");
        self.stage = stage;
    }

    fn give_up(&self, reason: &str) -> ProbeOutcome {
        let outcome = self.stage.outcome_without_evidence();
        debug!(stage = %self.stage, reason, ?outcome, "probe stopped");
        outcome
    }

    pub async fn run<S: Connection>(
        mut self,
        stream: &mut S,
        upgrade: Option<UpgradeMode>,
    ) -> ProbeOutcome {
        if let Some(mode) = upgrade {
            self.enter(ProbeStage::Upgrading);
            if !clients::upgrade(stream, mode, self.cfg.upgrade_timeout).await {
                debug!(%mode, "continuing without starttls");
            }
        }

        // the overall budget covers the TLS exchange only
        self.reader.limit_to(Instant::now() + self.cfg.overall_timeout);
        self.enter(ProbeStage::Handshaking);
        if let Err(err) = send(stream, &build_client_hello()).await {
            return self.give_up(&err.to_string());
        }

        self.enter(ProbeStage::AwaitingReady);
        let Some(version) = self.await_server_hello_done(stream).await else {
            return self.give_up("server never finished its hello");
        };

        let request = build_heartbeat_request(version, self.cfg.heartbeat_length);
        if let Err(err) = send(stream, &request).await {
            // the heartbeat never left, so nothing was learned about it
            return self.give_up(&err.to_string());
        }
        self.enter(ProbeStage::ProbeSent);
        debug!(
            version = %format!("{:#06x}", version),
            declared = self.cfg.heartbeat_length,
            "heartbeat request sent"
        );

        self.enter(ProbeStage::Classifying);
        self.classify(stream).await
    }

    /// Reads records until one carries ServerHelloDone. Returns the version of
    /// the last record seen, which the heartbeat request reuses.
    async fn await_server_hello_done<S: Connection>(&mut self, stream: &mut S) -> Option<u16> {
        loop {
            let record = self.next_record(stream).await?;
            if record.content_type == CONTENT_TYPE_HANDSHAKE && is_server_hello_done(&record.payload)
            {
                return Some(record.version);
            }
        }
    }

    async fn classify<S: Connection>(&mut self, stream: &mut S) -> ProbeOutcome {
        loop {
            let Some(record) = self.next_record(stream).await else {
                return self.give_up("no heartbeat response");
            };

            match record.content_type {
                CONTENT_TYPE_HEARTBEAT => return classify_heartbeat(&record),
                CONTENT_TYPE_ALERT => {
                    debug!(alert = ?record.payload, "server answered with an alert");
                    return ProbeOutcome::NotVulnerable;
                }
                _ => {
                    debug!(content_type = record.content_type_name(), "ignoring record");
                }
            }
        }
    }

    /// Reads the next record unless the overall deadline has passed. A read
    /// already under way is cut short at the deadline but keeps what arrived.
    async fn next_record<S: Connection>(&mut self, stream: &mut S) -> Option<Record> {
        if self.reader.limit_reached() {
            debug!(stage = %self.stage, "overall probe deadline elapsed");
            return None;
        }
        self.reader.read_record(stream).await
    }
}

/// Anything past the three byte minimum was never sent by us, so it can only
/// be server memory.
fn classify_heartbeat(record: &Record) -> ProbeOutcome {
    if record.payload.len() > HEARTBEAT_MIN_RESPONSE {
        let leaked = &record.payload[HEARTBEAT_MIN_RESPONSE..];
        debug!(
            leaked = leaked.len(),
            truncated = record.is_truncated(),
            "heartbeat response carries extra data"
        );
        trace!("leaked bytes:\n{}", crate::util::hex::hexdump(leaked));
        ProbeOutcome::Vulnerable
    } else {
        debug!(len = record.payload.len(), "heartbeat answered without extra data");
        ProbeOutcome::NotVulnerable
    }
}

async fn send<S: Connection>(stream: &mut S, bytes: &[u8]) -> std::io::Result<()> {
    stream.write_all(bytes).await?;
    stream.flush().await
}
