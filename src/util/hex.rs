use std::fmt::Write;

pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Classic 16-bytes-per-line dump: offset, hex column, printable column.
pub fn hexdump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (line, chunk) in bytes.chunks(16).enumerate() {
        let text: String = chunk.iter().map(|&b| super::printable(b)).collect();
        let _ = writeln!(out, "  {:04x}: {:<47} {}", line * 16, to_hex(chunk), text);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_hex() {
        let s = to_hex(&[0xde, 0xad]);
        assert_eq!(s, "de ad");
    }

    #[test]
    fn dumps_lines_of_sixteen() {
        let bytes: Vec<u8> = (0x40..0x52).collect();
        let dump = hexdump(&bytes);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("  0000: 40 41"));
        assert!(lines[0].ends_with("@ABCDEFGHIJKLMNO"));
        assert!(lines[1].starts_with("  0010: 50 51"));
        assert!(lines[1].ends_with("PQ"));
    }

    #[test]
    fn empty_input_dumps_nothing() {
        assert!(hexdump(&[]).is_empty());
    }
}
