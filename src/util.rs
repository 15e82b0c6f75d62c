pub mod hex;

use chrono::format::{Item, StrftimeItems};
use chrono::Utc;

/// Checks a strftime-style format up front so rendering can never fail later.
pub fn validate_timestamp_format(format: &str) -> anyhow::Result<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        anyhow::bail!("invalid timestamp format: {format}");
    }
    Ok(())
}

/// Current UTC time rendered with a format already checked by
/// [`validate_timestamp_format`].
pub fn now_formatted(format: &str) -> String {
    Utc::now().format(format).to_string()
}

pub fn printable(byte: u8) -> char {
    match byte {
        0x20..=0x7e => byte as char,
        _ => '.',
    }
}
