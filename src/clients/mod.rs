//! Plaintext preambles that switch a connection to TLS in-band (STARTTLS).

mod registry;
mod reserved;
mod session;
pub mod smtp;

pub use registry::{upgrade, upgrader_for_mode};
pub use session::UpgradeSession;

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

/// Any byte stream a probe can run over.
pub trait Connection: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Connection for T {}

#[async_trait]
pub trait Upgrader: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs the protocol exchange. `Ok(true)` only when the server explicitly
    /// acknowledged the switch to TLS.
    async fn negotiate(
        &self,
        stream: &mut dyn Connection,
        timeout: Duration,
    ) -> anyhow::Result<bool>;
}
