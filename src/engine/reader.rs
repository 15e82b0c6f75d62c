use crate::tls::{parse_record_header, Record, RECORD_HEADER_LEN};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, trace};

const READ_CHUNK: usize = 4096;

/// Bytes received from the peer but not yet handed to a caller.
#[derive(Debug, Default)]
pub struct ReceiveBuffer {
    pending: Vec<u8>,
}

impl ReceiveBuffer {
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Moves up to `max` buffered bytes onto the end of `out`.
    pub fn take_into(&mut self, out: &mut Vec<u8>, max: usize) -> usize {
        let take = max.min(self.pending.len());
        out.extend(self.pending.drain(..take));
        take
    }
}

/// Reads whole TLS records from one connection.
///
/// Owns the receive buffer for that connection; build a fresh reader for
/// every connection.
pub struct RecordReader {
    buffer: ReceiveBuffer,
    header_timeout: Duration,
    payload_timeout: Duration,
    limit: Option<Instant>,
}

impl RecordReader {
    pub fn new(header_timeout: Duration, payload_timeout: Duration) -> Self {
        Self {
            buffer: ReceiveBuffer::default(),
            header_timeout,
            payload_timeout,
            limit: None,
        }
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Caps every later read at `limit`, on top of its own timeout.
    pub fn limit_to(&mut self, limit: Instant) {
        self.limit = Some(limit);
    }

    pub fn limit_reached(&self) -> bool {
        self.limit.is_some_and(|limit| Instant::now() >= limit)
    }

    /// Collects `length` bytes, serving buffered bytes first.
    ///
    /// Returns `None` when nothing at all arrived before the deadline or the
    /// peer closed. Otherwise returns what was collected, which may be short.
    /// The deadline is `timeout` from now or the reader's limit, whichever
    /// comes first.
    pub async fn read_exact<S: AsyncRead + Unpin>(
        &mut self,
        stream: &mut S,
        length: usize,
        timeout: Duration,
    ) -> Option<Vec<u8>> {
        let mut deadline = Instant::now() + timeout;
        if let Some(limit) = self.limit {
            deadline = deadline.min(limit);
        }
        let mut collected = Vec::with_capacity(length);
        let mut chunk = vec![0u8; READ_CHUNK];

        loop {
            let wanted = length - collected.len();
            self.buffer.take_into(&mut collected, wanted);
            if collected.len() == length {
                return Some(collected);
            }

            match timeout_at(deadline, stream.read(&mut chunk)).await {
                Ok(Ok(0)) => {
                    debug!(collected = collected.len(), length, "peer closed connection");
                    return non_empty(collected);
                }
                Ok(Ok(n)) => {
                    trace!(bytes = n, "received");
                    self.buffer.extend(&chunk[..n]);
                }
                Ok(Err(err)) => {
                    debug!(error = %err, collected = collected.len(), "read failed");
                    return non_empty(collected);
                }
                Err(_) => {
                    debug!(collected = collected.len(), length, "read deadline elapsed");
                    return non_empty(collected);
                }
            }
        }
    }

    /// Reads one record: a five byte header, then the declared payload.
    pub async fn read_record<S: AsyncRead + Unpin>(&mut self, stream: &mut S) -> Option<Record> {
        let header = self
            .read_exact(stream, RECORD_HEADER_LEN, self.header_timeout)
            .await?;
        let Some((content_type, version, declared_length)) = parse_record_header(&header) else {
            debug!(bytes = header.len(), "incomplete record header");
            return None;
        };

        let payload = self
            .read_exact(stream, declared_length, self.payload_timeout)
            .await?;
        let record = Record {
            content_type,
            version,
            declared_length,
            payload,
        };
        trace!(
            content_type = record.content_type_name(),
            version = %format!("{:#06x}", version),
            declared_length,
            received = record.payload.len(),
            "record"
        );
        Some(record)
    }
}

fn non_empty(bytes: Vec<u8>) -> Option<Vec<u8>> {
    if bytes.is_empty() {
        None
    } else {
        Some(bytes)
    }
}
