//! One heartbeat probe against one address and port.

mod heartbleed;

pub use heartbleed::{probe_address, probe_stream, HeartbleedProbe};

use crate::model::ProbeOutcome;
use std::fmt;

/// How far a probe attempt got. Ordered: later stages compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProbeStage {
    Connecting,
    Upgrading,
    Handshaking,
    AwaitingReady,
    ProbeSent,
    Classifying,
}

impl ProbeStage {
    /// Outcome reported when the attempt stops at this stage without evidence.
    ///
    /// Once the heartbeat went out, silence counts as not vulnerable; before
    /// that nothing was learned about the heartbeat handler at all.
    pub fn outcome_without_evidence(self) -> ProbeOutcome {
        if self >= ProbeStage::ProbeSent {
            ProbeOutcome::NotVulnerable
        } else {
            ProbeOutcome::Indeterminate
        }
    }
}

impl fmt::Display for ProbeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProbeStage::Connecting => "connecting",
            ProbeStage::Upgrading => "upgrading",
            ProbeStage::Handshaking => "handshaking",
            ProbeStage::AwaitingReady => "awaiting-ready",
            ProbeStage::ProbeSent => "probe-sent",
            ProbeStage::Classifying => "classifying",
        };
        write!(f, "{}", label)
    }
}
