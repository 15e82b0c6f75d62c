use crate::model::ProbeOutcome;
use std::collections::BTreeMap;

/// Per-port counters, one bucket per outcome.
#[derive(Debug, Clone, Default)]
pub struct Tally {
    no_ssl: BTreeMap<u16, u64>,
    vulnerable: BTreeMap<u16, u64>,
    not_vulnerable: BTreeMap<u16, u64>,
}

impl Tally {
    pub fn record(&mut self, port: u16, outcome: ProbeOutcome) {
        *self.bucket_mut(outcome).entry(port).or_insert(0) += 1;
    }

    pub fn total(&self, outcome: ProbeOutcome) -> u64 {
        self.bucket(outcome).values().sum()
    }

    /// Counts for `outcome` in ascending port order.
    pub fn per_port(&self, outcome: ProbeOutcome) -> impl Iterator<Item = (u16, u64)> + '_ {
        self.bucket(outcome).iter().map(|(port, count)| (*port, *count))
    }

    fn bucket(&self, outcome: ProbeOutcome) -> &BTreeMap<u16, u64> {
        match outcome {
            ProbeOutcome::Indeterminate => &self.no_ssl,
            ProbeOutcome::Vulnerable => &self.vulnerable,
            ProbeOutcome::NotVulnerable => &self.not_vulnerable,
        }
    }

    fn bucket_mut(&mut self, outcome: ProbeOutcome) -> &mut BTreeMap<u16, u64> {
        match outcome {
            ProbeOutcome::Indeterminate => &mut self.no_ssl,
            ProbeOutcome::Vulnerable => &mut self.vulnerable,
            ProbeOutcome::NotVulnerable => &mut self.not_vulnerable,
        }
    }
}
