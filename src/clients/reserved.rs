use async_trait::async_trait;
use std::time::Duration;

use super::{Connection, Upgrader};

/// Placeholder for modes that are recognised on the command line but have no
/// exchange implemented yet. Never writes to the stream.
pub(crate) struct ReservedUpgrader {
    name: &'static str,
}

impl ReservedUpgrader {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Upgrader for ReservedUpgrader {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn negotiate(
        &self,
        _stream: &mut dyn Connection,
        _timeout: Duration,
    ) -> anyhow::Result<bool> {
        tracing::debug!(mode = self.name, "starttls mode not implemented; skipping");
        Ok(false)
    }
}
