use super::{HANDSHAKE_HEADER_LEN, HANDSHAKE_TYPE_SERVER_HELLO_DONE};

/// Walks the handshake messages packed into one record payload and reports
/// whether a ServerHelloDone is among them.
///
/// Truncated or malformed framing yields `false`: the server may still be
/// sending the rest of its flight in later records.
pub fn is_server_hello_done(payload: &[u8]) -> bool {
    let mut offset = 0usize;
    while offset < payload.len() {
        let remaining = payload.len() - offset;
        if remaining < HANDSHAKE_HEADER_LEN {
            tracing::trace!(remaining, "handshake framing too short to parse");
            return false;
        }
        let msg_type = payload[offset];
        let high = payload[offset + 1] as usize;
        let low = u16::from_be_bytes([payload[offset + 2], payload[offset + 3]]) as usize;
        let msg_len = high * 0x10000 + low;
        if msg_type == HANDSHAKE_TYPE_SERVER_HELLO_DONE {
            return true;
        }
        offset += HANDSHAKE_HEADER_LEN + msg_len;
    }
    false
}
