//! Just enough of the TLS wire format to reach the heartbeat handler.

pub mod handshake;
pub mod hello;

pub use handshake::is_server_hello_done;
pub use hello::{build_client_hello, build_heartbeat_request};

pub const CONTENT_TYPE_ALERT: u8 = 0x15;
pub const CONTENT_TYPE_HANDSHAKE: u8 = 0x16;
pub const CONTENT_TYPE_HEARTBEAT: u8 = 0x18;

pub const HANDSHAKE_TYPE_SERVER_HELLO_DONE: u8 = 0x0e;

pub const HEARTBEAT_REQUEST: u8 = 0x01;
/// Type byte plus the two-byte payload length; anything past this is payload.
pub const HEARTBEAT_MIN_RESPONSE: usize = 3;

pub const RECORD_HEADER_LEN: usize = 5;
pub const HANDSHAKE_HEADER_LEN: usize = 4;

/// One record as read off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub content_type: u8,
    pub version: u16,
    /// Length announced in the record header.
    pub declared_length: usize,
    pub payload: Vec<u8>,
}

impl Record {
    /// True when the payload deadline expired before `declared_length` bytes arrived.
    pub fn is_truncated(&self) -> bool {
        self.payload.len() < self.declared_length
    }

    pub fn content_type_name(&self) -> &'static str {
        match self.content_type {
            0x14 => "ChangeCipherSpec",
            CONTENT_TYPE_ALERT => "Alert",
            CONTENT_TYPE_HANDSHAKE => "Handshake",
            0x17 => "ApplicationData",
            CONTENT_TYPE_HEARTBEAT => "Heartbeat",
            _ => "Unknown",
        }
    }
}

/// Splits a record header into type, version and payload length.
pub fn parse_record_header(header: &[u8]) -> Option<(u8, u16, usize)> {
    if header.len() < RECORD_HEADER_LEN {
        return None;
    }
    let version = u16::from_be_bytes([header[1], header[2]]);
    let length = u16::from_be_bytes([header[3], header[4]]) as usize;
    Some((header[0], version, length))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_fields() {
        let (typ, ver, len) = parse_record_header(&[0x16, 0x03, 0x02, 0x01, 0x00]).unwrap();
        assert_eq!(typ, CONTENT_TYPE_HANDSHAKE);
        assert_eq!(ver, 0x0302);
        assert_eq!(len, 256);
    }

    #[test]
    fn rejects_short_header() {
        assert!(parse_record_header(&[0x16, 0x03, 0x02]).is_none());
    }

    #[test]
    fn reports_truncation() {
        let record = Record {
            content_type: CONTENT_TYPE_HEARTBEAT,
            version: 0x0302,
            declared_length: 16,
            payload: vec![0; 10],
        };
        assert!(record.is_truncated());
        assert_eq!(record.content_type_name(), "Heartbeat");
    }
}
