use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 443;
pub const DEFAULT_HEARTBEAT_LENGTH: u16 = 0x4000;
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z:";
pub const DEFAULT_STARTTLS: &str =
    "25/smtp, 110/pop3, 143/imap, 389/ldap, 5222/xmpp, 5269/xmpp";

#[derive(Debug, Clone)]
pub struct Config {
    pub input: InputConfig,
    pub ports: Vec<u16>,
    pub starttls: BTreeMap<u16, UpgradeMode>,
    pub ipv4: bool,
    pub ipv6: bool,
    pub probe: ProbeConfig,
    pub output: OutputConfig,
}

impl Config {
    pub fn upgrade_mode(&self, port: u16) -> Option<UpgradeMode> {
        self.starttls.get(&port).copied()
    }
}

#[derive(Debug, Clone, Default)]
pub struct InputConfig {
    /// Host-list files, `-` meaning stdin; host names when `direct_hosts` is set.
    pub hostlist: Vec<String>,
    pub direct_hosts: bool,
}

/// Knobs for a single probe attempt.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub connect_timeout: Duration,
    pub header_timeout: Duration,
    pub payload_timeout: Duration,
    pub upgrade_timeout: Duration,
    pub overall_timeout: Duration,
    pub heartbeat_length: u16,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(2),
            header_timeout: Duration::from_secs(5),
            payload_timeout: Duration::from_secs(10),
            upgrade_timeout: Duration::from_secs(5),
            overall_timeout: Duration::from_secs(30),
            heartbeat_length: DEFAULT_HEARTBEAT_LENGTH,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub concise: bool,
    pub summary: bool,
    pub timestamp: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            concise: false,
            summary: true,
            timestamp: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Jsonl,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}

/// Plaintext protocols that can be switched to TLS in-band.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UpgradeMode {
    Smtp,
    Pop3,
    Imap,
    Ldap,
    Xmpp,
}

impl fmt::Display for UpgradeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UpgradeMode::Smtp => "smtp",
            UpgradeMode::Pop3 => "pop3",
            UpgradeMode::Imap => "imap",
            UpgradeMode::Ldap => "ldap",
            UpgradeMode::Xmpp => "xmpp",
        };
        write!(f, "{}", label)
    }
}

impl FromStr for UpgradeMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "smtp" => Ok(UpgradeMode::Smtp),
            "pop3" => Ok(UpgradeMode::Pop3),
            "imap" => Ok(UpgradeMode::Imap),
            "ldap" => Ok(UpgradeMode::Ldap),
            "xmpp" => Ok(UpgradeMode::Xmpp),
            other => anyhow::bail!("unknown STARTTLS mode: {other}"),
        }
    }
}

/// One line of a host list, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEntry {
    pub host: String,
    pub port: Option<u16>,
}

/// A resolved address together with the ports to probe on it.
#[derive(Debug, Clone)]
pub struct Target {
    pub host: String,
    pub addr: IpAddr,
    pub ports: Vec<u16>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProbeOutcome {
    Vulnerable,
    NotVulnerable,
    /// No TLS on the port, unreachable, or the handshake never got far enough.
    Indeterminate,
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProbeOutcome::Vulnerable => "VULNERABLE",
            ProbeOutcome::NotVulnerable => "not vulnerable",
            ProbeOutcome::Indeterminate => "no SSL/unreachable",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortResult {
    pub port: u16,
    pub outcome: ProbeOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starttls: Option<UpgradeMode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressReport {
    pub host: String,
    pub addr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub results: Vec<PortResult>,
}

impl AddressReport {
    pub fn new(target: &Target, timestamp: Option<String>) -> Self {
        Self {
            host: target.host.clone(),
            addr: target.addr.to_string(),
            timestamp,
            results: Vec::with_capacity(target.ports.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_upgrade_modes_case_insensitively() {
        assert_eq!("SMTP".parse::<UpgradeMode>().unwrap(), UpgradeMode::Smtp);
        assert_eq!("xmpp".parse::<UpgradeMode>().unwrap(), UpgradeMode::Xmpp);
        assert!("ftp".parse::<UpgradeMode>().is_err());
    }

    #[test]
    fn looks_up_upgrade_mode_per_port() {
        let mut starttls = BTreeMap::new();
        starttls.insert(25, UpgradeMode::Smtp);
        let cfg = Config {
            input: InputConfig::default(),
            ports: vec![25, 443],
            starttls,
            ipv4: true,
            ipv6: true,
            probe: ProbeConfig::default(),
            output: OutputConfig::default(),
        };
        assert_eq!(cfg.upgrade_mode(25), Some(UpgradeMode::Smtp));
        assert_eq!(cfg.upgrade_mode(443), None);
    }

    #[test]
    fn report_starts_empty() {
        let target = Target {
            host: "example".into(),
            addr: "127.0.0.1".parse().unwrap(),
            ports: vec![443, 8443],
        };
        let report = AddressReport::new(&target, None);
        assert_eq!(report.addr, "127.0.0.1");
        assert!(report.results.is_empty());
    }
}
