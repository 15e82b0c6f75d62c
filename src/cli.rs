use crate::model::{
    Config, InputConfig, OutputConfig, OutputFormat, ProbeConfig, UpgradeMode, DEFAULT_HEARTBEAT_LENGTH,
    DEFAULT_PORT, DEFAULT_STARTTLS, DEFAULT_TIMESTAMP_FORMAT,
};
use clap::{ArgAction, Parser};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Checks TLS endpoints for the heartbeat out-of-bounds read (CVE-2014-0160)",
    long_about = None
)]
pub struct Cli {
    /// Make output concise
    #[arg(short = 'c', long = "concise", action = ArgAction::SetTrue)]
    pub concise: bool,

    /// Turn on IPv4 scans (default)
    #[arg(short = '4', long = "ipv4", action = ArgAction::SetTrue, overrides_with = "no_ipv4")]
    pub ipv4: bool,

    /// Turn on IPv6 scans (default)
    #[arg(short = '6', long = "ipv6", action = ArgAction::SetTrue, overrides_with = "no_ipv6")]
    pub ipv6: bool,

    /// Turn off IPv4 scans
    #[arg(long = "no-ipv4", action = ArgAction::SetTrue, overrides_with = "ipv4")]
    pub no_ipv4: bool,

    /// Turn off IPv6 scans
    #[arg(long = "no-ipv6", action = ArgAction::SetTrue, overrides_with = "ipv6")]
    pub no_ipv6: bool,

    /// Suppress scan summary
    #[arg(long = "no-summary", action = ArgAction::SetTrue)]
    pub no_summary: bool,

    /// Prefix each line with a UTC timestamp; optionally takes a strftime format
    #[arg(
        short = 't',
        long = "timestamp",
        value_name = "FORMAT",
        num_args = 0..=1,
        default_missing_value = DEFAULT_TIMESTAMP_FORMAT
    )]
    pub timestamp: Option<String>,

    /// PORT/MODE pairs that need a STARTTLS exchange first; bare flag uses common defaults
    #[arg(
        long = "starttls",
        value_name = "SPEC",
        num_args = 0..=1,
        default_missing_value = DEFAULT_STARTTLS
    )]
    pub starttls: Option<String>,

    /// Ports or port ranges to scan, e.g. "443,8443" or "8000-8010" (default: 443)
    #[arg(short = 'p', long = "ports", value_name = "SPEC", action = ArgAction::Append)]
    pub ports: Vec<String>,

    /// Heartbeat request length field
    #[arg(short = 'l', long = "length", default_value_t = DEFAULT_HEARTBEAT_LENGTH)]
    pub length: u16,

    /// Treat positional arguments as host names rather than host-list files
    #[arg(short = 'H', long = "hosts", action = ArgAction::SetTrue)]
    pub hosts: bool,

    /// Output format
    #[arg(long = "output", default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Connect timeout in milliseconds
    #[arg(long = "connect-timeout", default_value_t = 2000)]
    pub connect_timeout_ms: u64,

    /// Record header read timeout in milliseconds
    #[arg(long = "header-timeout", default_value_t = 5000)]
    pub header_timeout_ms: u64,

    /// Record payload read timeout in milliseconds
    #[arg(long = "payload-timeout", default_value_t = 10000)]
    pub payload_timeout_ms: u64,

    /// Timeout for each STARTTLS reply in milliseconds
    #[arg(long = "upgrade-timeout", default_value_t = 5000)]
    pub upgrade_timeout_ms: u64,

    /// Upper bound for one probe after connecting, in milliseconds
    #[arg(long = "overall-timeout", default_value_t = 30000)]
    pub overall_timeout_ms: u64,

    /// Host-list files ("-" for stdin), or host names with --hosts
    #[arg(value_name = "HOSTLIST", default_value = "-")]
    pub hostlist: Vec<String>,
}

impl Cli {
    pub fn into_config(self) -> anyhow::Result<Config> {
        // the last of each -4/--no-ipv4 pair wins; neither means on
        let ipv4 = self.ipv4 || !self.no_ipv4;
        let ipv6 = self.ipv6 || !self.no_ipv6;
        if !ipv4 && !ipv6 {
            anyhow::bail!("--no-ipv4 and --no-ipv6 together leave nothing to scan");
        }

        if let Some(format) = &self.timestamp {
            crate::util::validate_timestamp_format(format)?;
        }

        let ports = if self.ports.is_empty() {
            vec![DEFAULT_PORT]
        } else {
            parse_ports(&self.ports)?
        };

        let starttls = match &self.starttls {
            Some(spec) => parse_starttls(spec)?,
            None => BTreeMap::new(),
        };

        Ok(Config {
            input: InputConfig {
                hostlist: self.hostlist,
                direct_hosts: self.hosts,
            },
            ports,
            starttls,
            ipv4,
            ipv6,
            probe: ProbeConfig {
                connect_timeout: Duration::from_millis(self.connect_timeout_ms),
                header_timeout: Duration::from_millis(self.header_timeout_ms),
                payload_timeout: Duration::from_millis(self.payload_timeout_ms),
                upgrade_timeout: Duration::from_millis(self.upgrade_timeout_ms),
                overall_timeout: Duration::from_millis(self.overall_timeout_ms),
                heartbeat_length: self.length,
            },
            output: OutputConfig {
                format: self.output,
                concise: self.concise,
                summary: !self.no_summary,
                timestamp: self.timestamp,
            },
        })
    }
}

fn split_list(spec: &str) -> impl Iterator<Item = &str> {
    spec.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|item| !item.is_empty())
}

/// Expands port lists and ranges into a sorted, de-duplicated list.
pub fn parse_ports(specs: &[String]) -> anyhow::Result<Vec<u16>> {
    let mut ports = BTreeSet::new();
    for item in specs.iter().flat_map(|spec| split_list(spec)) {
        let invalid = || anyhow::anyhow!("invalid port specification: {item}");
        match item.split_once('-') {
            Some((start, end)) => {
                let start: u16 = start.parse().map_err(|_| invalid())?;
                let end: u16 = end.parse().map_err(|_| invalid())?;
                if start == 0 || start > end {
                    return Err(invalid());
                }
                ports.extend(start..=end);
            }
            None => {
                let port: u16 = item.parse().map_err(|_| invalid())?;
                if port == 0 {
                    return Err(invalid());
                }
                ports.insert(port);
            }
        }
    }
    if ports.is_empty() {
        anyhow::bail!("no ports given");
    }
    Ok(ports.into_iter().collect())
}

/// Parses "25/smtp, 143/imap" into a port to mode table.
pub fn parse_starttls(spec: &str) -> anyhow::Result<BTreeMap<u16, UpgradeMode>> {
    let mut modes = BTreeMap::new();
    for item in split_list(spec) {
        let invalid = || anyhow::anyhow!("invalid STARTTLS specification: {item}");
        let (port, mode) = item.split_once('/').ok_or_else(invalid)?;
        let port: u16 = port.parse().map_err(|_| invalid())?;
        let mode: UpgradeMode = mode.parse().map_err(|_| invalid())?;
        modes.insert(port, mode);
    }
    Ok(modes)
}
