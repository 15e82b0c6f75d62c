use anyhow::Context;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{timeout_at, Instant};

use super::Connection;

const MAX_REPLY_BYTES: usize = 4096;

/// Line-oriented command/reply exchange over a plaintext connection.
pub struct UpgradeSession<'a> {
    stream: &'a mut dyn Connection,
    timeout: Duration,
}

impl<'a> UpgradeSession<'a> {
    pub fn new(stream: &'a mut dyn Connection, timeout: Duration) -> Self {
        Self { stream, timeout }
    }

    pub async fn send(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.stream
            .write_all(bytes)
            .await
            .context("failed to write starttls command")?;
        self.stream.flush().await.context("failed to flush starttls command")
    }

    /// Reads one reply, stopping at its final line, on close, at the size cap,
    /// or when the timeout elapses. Returns whatever text arrived.
    ///
    /// Reads one byte at a time so nothing past the reply is consumed; the TLS
    /// handshake that follows must see the stream untouched.
    pub async fn read_reply(&mut self) -> anyhow::Result<String> {
        let deadline = Instant::now() + self.timeout;
        let mut reply = Vec::new();
        let mut byte = [0u8; 1];

        while reply.len() < MAX_REPLY_BYTES && !is_complete_reply(&reply) {
            match timeout_at(deadline, self.stream.read(&mut byte)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(_)) => reply.push(byte[0]),
                Ok(Err(err)) => return Err(err).context("failed to read starttls reply"),
                Err(_) => break,
            }
        }

        if reply.is_empty() {
            anyhow::bail!("no reply from server");
        }
        Ok(String::from_utf8_lossy(&reply).into_owned())
    }
}

/// A reply is complete once its last line is `NNN text` (space, not dash,
/// after the code) and terminated by a newline.
fn is_complete_reply(buf: &[u8]) -> bool {
    if !buf.ends_with(b"\n") {
        return false;
    }
    let body = &buf[..buf.len() - 1];
    let last = match body.iter().rposition(|&b| b == b'\n') {
        Some(pos) => &body[pos + 1..],
        None => body,
    };
    last.len() >= 3
        && last[..3].iter().all(u8::is_ascii_digit)
        && last.get(3).map_or(true, |&b| b != b'-')
}

/// Three-digit status code at the start of a reply.
pub(crate) fn reply_code(reply: &str) -> Option<u16> {
    reply.get(..3)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_final_line() {
        assert!(is_complete_reply(b"220 mail ready\r\n"));
        assert!(!is_complete_reply(b"250-mail\r\n"));
        assert!(is_complete_reply(b"250-mail\r\n250-PIPELINING\r\n250 STARTTLS\r\n"));
        assert!(!is_complete_reply(b"250 partial"));
        assert!(is_complete_reply(b"250\r\n"));
    }

    #[test]
    fn extracts_reply_code() {
        assert_eq!(reply_code("220 go ahead\r\n"), Some(220));
        assert_eq!(reply_code("OK"), None);
    }

    #[tokio::test]
    async fn reads_multiline_reply_without_overreading() {
        let (mut client, mut server) = tokio::io::duplex(256);
        server
            .write_all(b"250-host\r\n250 STARTTLS\r\n\x16\x03\x02")
            .await
            .unwrap();

        let mut session = UpgradeSession::new(&mut client, Duration::from_millis(200));
        let reply = session.read_reply().await.unwrap();
        assert_eq!(reply, "250-host\r\n250 STARTTLS\r\n");

        let mut rest = [0u8; 3];
        client.read_exact(&mut rest).await.unwrap();
        assert_eq!(rest, [0x16, 0x03, 0x02]);
    }

    #[tokio::test]
    async fn silent_server_is_an_error() {
        let (mut client, _server) = tokio::io::duplex(64);
        let mut session = UpgradeSession::new(&mut client, Duration::from_millis(50));
        assert!(session.read_reply().await.is_err());
    }
}
