use crate::model::UpgradeMode;
use std::time::Duration;
use tracing::debug;

use super::reserved::ReservedUpgrader;
use super::smtp::SmtpUpgrader;
use super::{Connection, Upgrader};

static SMTP_UPGRADER: SmtpUpgrader = SmtpUpgrader;
static POP3_UPGRADER: ReservedUpgrader = ReservedUpgrader::new("pop3");
static IMAP_UPGRADER: ReservedUpgrader = ReservedUpgrader::new("imap");
static LDAP_UPGRADER: ReservedUpgrader = ReservedUpgrader::new("ldap");
static XMPP_UPGRADER: ReservedUpgrader = ReservedUpgrader::new("xmpp");

pub fn upgrader_for_mode(mode: UpgradeMode) -> &'static dyn Upgrader {
    match mode {
        UpgradeMode::Smtp => &SMTP_UPGRADER,
        UpgradeMode::Pop3 => &POP3_UPGRADER,
        UpgradeMode::Imap => &IMAP_UPGRADER,
        UpgradeMode::Ldap => &LDAP_UPGRADER,
        UpgradeMode::Xmpp => &XMPP_UPGRADER,
    }
}

/// Switches `stream` to TLS using `mode`. Failures of any kind just mean
/// "not upgraded"; the caller carries on with the handshake regardless.
pub async fn upgrade(stream: &mut dyn Connection, mode: UpgradeMode, timeout: Duration) -> bool {
    let upgrader = upgrader_for_mode(mode);
    match upgrader.negotiate(stream, timeout).await {
        Ok(upgraded) => {
            debug!(mode = upgrader.name(), upgraded, "starttls exchange finished");
            upgraded
        }
        Err(err) => {
            debug!(mode = upgrader.name(), error = %err, "starttls exchange failed");
            false
        }
    }
}
