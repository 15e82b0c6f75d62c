use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::session::{reply_code, UpgradeSession};
use super::{Connection, Upgrader};

pub const EHLO_COMMAND: &[u8] = b"EHLO heartbleed-scanner.example.com\r\n";
pub const STARTTLS_COMMAND: &[u8] = b"STARTTLS\r\n";

pub(crate) struct SmtpUpgrader;

#[async_trait]
impl Upgrader for SmtpUpgrader {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn negotiate(
        &self,
        stream: &mut dyn Connection,
        timeout: Duration,
    ) -> anyhow::Result<bool> {
        let mut session = UpgradeSession::new(stream, timeout);

        let greeting = session.read_reply().await?;
        debug!(greeting = %greeting.trim_end(), "smtp greeting");

        session.send(EHLO_COMMAND).await?;
        let capabilities = session.read_reply().await?;
        if !capabilities.to_ascii_uppercase().contains("STARTTLS") {
            debug!("smtp server does not advertise STARTTLS");
            return Ok(false);
        }

        session.send(STARTTLS_COMMAND).await?;
        let ack = session.read_reply().await?;
        Ok(reply_code(&ack) == Some(220))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::upgrade;
    use crate::model::UpgradeMode;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    async fn scripted_server(
        server: tokio::io::DuplexStream,
        capabilities: &'static [u8],
        ack: &'static [u8],
    ) -> Vec<String> {
        let mut server = BufReader::new(server);
        let mut commands = Vec::new();
        server
            .get_mut()
            .write_all(b"220 mx.example.com ESMTP\r\n")
            .await
            .unwrap();
        loop {
            let mut line = String::new();
            if server.read_line(&mut line).await.unwrap() == 0 {
                break;
            }
            let reply = if line.starts_with("EHLO") {
                capabilities
            } else {
                ack
            };
            commands.push(line);
            server.get_mut().write_all(reply).await.unwrap();
        }
        commands
    }

    #[tokio::test]
    async fn upgrades_when_starttls_is_advertised() {
        let (mut client, server) = tokio::io::duplex(1024);
        let handle = tokio::spawn(scripted_server(
            server,
            b"250-mx.example.com\r\n250-PIPELINING\r\n250 STARTTLS\r\n",
            b"220 2.0.0 Ready to start TLS\r\n",
        ));

        assert!(upgrade(&mut client, UpgradeMode::Smtp, Duration::from_millis(500)).await);
        drop(client);

        let commands = handle.await.unwrap();
        assert_eq!(commands.len(), 2);
        assert!(commands[0].starts_with("EHLO "));
        assert_eq!(commands[1], "STARTTLS\r\n");
    }

    #[tokio::test]
    async fn skips_starttls_when_not_advertised() {
        let (mut client, server) = tokio::io::duplex(1024);
        let handle = tokio::spawn(scripted_server(
            server,
            b"250-mx.example.com\r\n250 PIPELINING\r\n",
            b"220 Ready\r\n",
        ));

        assert!(!upgrade(&mut client, UpgradeMode::Smtp, Duration::from_millis(500)).await);
        drop(client);

        let commands = handle.await.unwrap();
        assert_eq!(commands.len(), 1);
        assert!(commands[0].starts_with("EHLO "));
    }

    #[tokio::test]
    async fn refused_starttls_is_not_upgraded() {
        let (mut client, server) = tokio::io::duplex(1024);
        let handle = tokio::spawn(scripted_server(
            server,
            b"250 STARTTLS\r\n",
            b"454 TLS not available\r\n",
        ));

        assert!(!upgrade(&mut client, UpgradeMode::Smtp, Duration::from_millis(500)).await);
        drop(client);
        assert_eq!(handle.await.unwrap().len(), 2);
    }
}
