use heartbleed_scanner::engine::Engine;
use heartbleed_scanner::model::{
    Config, InputConfig, OutputConfig, OutputFormat, ProbeConfig, ProbeOutcome,
};
use heartbleed_scanner::output::OutputChannel;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl SharedBuffer {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

fn record(content_type: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![content_type, 0x03, 0x01];
    out.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

async fn leaking_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut hello = vec![0u8; 225];
        socket.read_exact(&mut hello).await.unwrap();
        socket
            .write_all(&record(0x16, &[0x0e, 0x00, 0x00, 0x00]))
            .await
            .unwrap();
        let mut heartbeat = [0u8; 8];
        socket.read_exact(&mut heartbeat).await.unwrap();
        socket.write_all(&record(0x18, &[0x41; 128])).await.unwrap();
        let _ = socket.read(&mut [0u8; 1]).await;
    });
    port
}

fn config(hosts: Vec<String>, ports: Vec<u16>, output: OutputConfig) -> Config {
    Config {
        input: InputConfig {
            hostlist: hosts,
            direct_hosts: true,
        },
        ports,
        starttls: Default::default(),
        ipv4: true,
        ipv6: false,
        probe: ProbeConfig {
            connect_timeout: Duration::from_millis(500),
            header_timeout: Duration::from_millis(300),
            payload_timeout: Duration::from_millis(300),
            upgrade_timeout: Duration::from_millis(300),
            overall_timeout: Duration::from_secs(3),
            heartbeat_length: 0x4000,
        },
        output,
    }
}

async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn scans_ports_in_order_and_prints_summary() {
    let vulnerable = leaking_server().await;
    let closed = closed_port().await;
    let buffer = SharedBuffer::default();

    let cfg = config(
        vec!["127.0.0.1".into()],
        vec![vulnerable, closed],
        OutputConfig::default(),
    );
    let sink = OutputChannel::with_writer(cfg.output.clone(), Box::new(buffer.clone()));
    let mut engine = Engine::new(cfg, sink);
    engine.run().await.unwrap();

    assert_eq!(engine.tally().total(ProbeOutcome::Vulnerable), 1);
    assert_eq!(engine.tally().total(ProbeOutcome::Indeterminate), 1);

    let out = buffer.text();
    let expected_line = format!(
        "Testing 127.0.0.1 (127.0.0.1)... port {vulnerable}: VULNERABLE! port {closed}: no SSL/unreachable;"
    );
    assert!(out.starts_with(&expected_line), "{out}");
    assert!(out.contains(&format!("! VULNERABLE: 1 (port {vulnerable}: 1)")));
    assert!(out.contains("+ not vulnerable: 0 ()"));
}

#[tokio::test]
async fn jsonl_output_without_summary() {
    let closed = closed_port().await;
    let buffer = SharedBuffer::default();
    let output = OutputConfig {
        format: OutputFormat::Jsonl,
        summary: false,
        ..OutputConfig::default()
    };

    let cfg = config(vec![format!("127.0.0.1:{closed}")], vec![443], output);
    let sink = OutputChannel::with_writer(cfg.output.clone(), Box::new(buffer.clone()));
    let mut engine = Engine::new(cfg, sink);
    engine.run().await.unwrap();

    let out = buffer.text();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 1);
    let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(value["host"], "127.0.0.1");
    assert_eq!(value["results"][0]["port"], closed);
    assert_eq!(value["results"][0]["outcome"], "indeterminate");
}
