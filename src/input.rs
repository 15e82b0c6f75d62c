use crate::model::{Config, HostEntry, Target};
use anyhow::Context;
use std::net::{IpAddr, Ipv6Addr};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::net::lookup_host;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

const STDIN_SOURCE: &str = "-";

#[derive(Debug, Clone)]
struct Resolution {
    ports: Vec<u16>,
    ipv4: bool,
    ipv6: bool,
}

/// Yields one `Target` per resolved (host, address family), in input order.
pub fn stream_targets(cfg: &Config) -> ReceiverStream<Target> {
    let (tx, rx) = mpsc::channel(16);
    let sources = cfg.input.hostlist.clone();
    let direct = cfg.input.direct_hosts;
    let resolution = Resolution {
        ports: cfg.ports.clone(),
        ipv4: cfg.ipv4,
        ipv6: cfg.ipv6,
    };

    tokio::spawn(async move {
        if direct {
            for host in sources {
                if !send_entry(&host, &resolution, &tx).await {
                    return;
                }
            }
            return;
        }

        for source in sources {
            if let Err(err) = read_source(&source, &resolution, &tx).await {
                tracing::error!(source = %source, error = %err, "failed to read host list");
            }
        }
    });

    ReceiverStream::new(rx)
}

async fn read_source(
    source: &str,
    resolution: &Resolution,
    tx: &mpsc::Sender<Target>,
) -> anyhow::Result<()> {
    if source == STDIN_SOURCE {
        return read_lines(BufReader::new(tokio::io::stdin()), resolution, tx).await;
    }
    let file = tokio::fs::File::open(source)
        .await
        .with_context(|| format!("cannot open host list {}", source))?;
    read_lines(BufReader::new(file), resolution, tx).await
}

async fn read_lines<R: AsyncBufRead + Unpin>(
    reader: R,
    resolution: &Resolution,
    tx: &mpsc::Sender<Target>,
) -> anyhow::Result<()> {
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if !send_entry(trimmed, resolution, tx).await {
            break;
        }
    }
    Ok(())
}

/// Returns false once the receiving side has gone away.
async fn send_entry(line: &str, resolution: &Resolution, tx: &mpsc::Sender<Target>) -> bool {
    let Some(entry) = parse_entry(line) else {
        tracing::warn!(line = %line, "skipping invalid host entry");
        return true;
    };

    let ports = match entry.port {
        Some(port) => vec![port],
        None => resolution.ports.clone(),
    };

    let families = [(resolution.ipv4, false), (resolution.ipv6, true)];
    for (enabled, want_v6) in families {
        if !enabled {
            continue;
        }
        let Some(addr) = resolve(&entry.host, want_v6).await else {
            tracing::debug!(host = %entry.host, ipv6 = want_v6, "no address for family");
            continue;
        };
        let target = Target {
            host: entry.host.clone(),
            addr,
            ports: ports.clone(),
        };
        if tx.send(target).await.is_err() {
            return false;
        }
    }
    true
}

async fn resolve(host: &str, want_v6: bool) -> Option<IpAddr> {
    match lookup_host((host, 0)).await {
        Ok(addrs) => addrs
            .map(|addr| addr.ip())
            .find(|ip| ip.is_ipv6() == want_v6),
        Err(err) => {
            tracing::debug!(host = %host, error = %err, "resolution failed");
            None
        }
    }
}

/// Parses `host`, `host:port`, `[v6]`, `[v6]:port` or a bare IPv6 literal.
pub fn parse_entry(line: &str) -> Option<HostEntry> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(rest) = line.strip_prefix('[') {
        let (host, after) = rest.split_once(']')?;
        let port = match after {
            "" => None,
            other => Some(parse_port(other.strip_prefix(':')?)?),
        };
        return non_empty_host(host, port);
    }

    if line.parse::<Ipv6Addr>().is_ok() {
        return non_empty_host(line, None);
    }

    match line.split_once(':') {
        Some((host, port)) => non_empty_host(host, Some(parse_port(port)?)),
        None => non_empty_host(line, None),
    }
}

fn parse_port(raw: &str) -> Option<u16> {
    raw.parse::<u16>().ok().filter(|port| *port != 0)
}

fn non_empty_host(host: &str, port: Option<u16>) -> Option<HostEntry> {
    if host.is_empty() {
        return None;
    }
    Some(HostEntry {
        host: host.to_string(),
        port,
    })
}
