use crate::engine::tally::Tally;
use crate::model::{AddressReport, OutputConfig, OutputFormat, ProbeOutcome};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{BufWriter, Write};

pub struct OutputSink {
    cfg: OutputConfig,
    writer: BufWriter<Box<dyn Write + Send>>,
}

#[derive(Serialize)]
struct SummaryLine {
    summary: BTreeMap<&'static str, OutcomeCount>,
}

#[derive(Serialize)]
struct OutcomeCount {
    total: u64,
    ports: BTreeMap<u16, u64>,
}

const SUMMARY_ORDER: [(ProbeOutcome, &str, &str); 3] = [
    (ProbeOutcome::Indeterminate, "-", "no_ssl"),
    (ProbeOutcome::Vulnerable, "!", "vulnerable"),
    (ProbeOutcome::NotVulnerable, "+", "not_vulnerable"),
];

impl OutputSink {
    pub fn new(cfg: OutputConfig, writer: Box<dyn Write + Send>) -> Self {
        Self {
            cfg,
            writer: BufWriter::new(writer),
        }
    }

    pub fn write_report(&mut self, report: &AddressReport) -> anyhow::Result<()> {
        let line = render_report(&self.cfg, report)?;
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_summary(&mut self, tally: &Tally) -> anyhow::Result<()> {
        let text = render_summary(&self.cfg, tally)?;
        write!(self.writer, "{text}")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn flush(&mut self) {
        let _ = self.writer.flush();
    }
}

/// One address on one line.
pub fn render_report(cfg: &OutputConfig, report: &AddressReport) -> anyhow::Result<String> {
    if cfg.format == OutputFormat::Jsonl {
        return Ok(serde_json::to_string(report)?);
    }

    let mut parts = Vec::with_capacity(report.results.len() + 2);
    if let Some(ts) = &report.timestamp {
        parts.push(ts.clone());
    }
    if cfg.concise {
        parts.push(format!("{} ({})", report.host, report.addr));
        for result in &report.results {
            parts.push(format!("{}{}", result.port, concise_marker(result.outcome)));
        }
    } else {
        parts.push(format!("Testing {} ({})...", report.host, report.addr));
        for result in &report.results {
            parts.push(format!(
                "port {}: {}{}",
                result.port,
                result.outcome,
                verbose_suffix(result.outcome)
            ));
        }
    }
    Ok(parts.join(" "))
}

pub fn render_summary(cfg: &OutputConfig, tally: &Tally) -> anyhow::Result<String> {
    if cfg.format == OutputFormat::Jsonl {
        let summary = SUMMARY_ORDER
            .iter()
            .map(|(outcome, _, key)| {
                let count = OutcomeCount {
                    total: tally.total(*outcome),
                    ports: tally.per_port(*outcome).collect(),
                };
                (*key, count)
            })
            .collect();
        let mut line = serde_json::to_string(&SummaryLine { summary })?;
        line.push('\n');
        return Ok(line);
    }

    let mut text = String::from("\n");
    for (outcome, marker, _) in SUMMARY_ORDER {
        let ports = tally
            .per_port(outcome)
            .map(|(port, count)| format!("port {port}: {count}"))
            .collect::<Vec<_>>()
            .join("; ");
        text.push_str(&format!(
            "{marker} {outcome}: {} ({ports})\n",
            tally.total(outcome)
        ));
    }
    Ok(text)
}

fn concise_marker(outcome: ProbeOutcome) -> char {
    match outcome {
        ProbeOutcome::Vulnerable => '!',
        ProbeOutcome::NotVulnerable => '+',
        ProbeOutcome::Indeterminate => '-',
    }
}

fn verbose_suffix(outcome: ProbeOutcome) -> char {
    match outcome {
        ProbeOutcome::Vulnerable => '!',
        _ => ';',
    }
}
