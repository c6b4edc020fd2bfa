use std::{
    io::{self, ErrorKind, Write},
    path::Path,
    time::Duration,
};

use anyhow::Context;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use pwmfan_common::{
    net::bind_address, protocol::RESPONSE_BUFFER_BYTES, FanSnapshot, MonitorConfig,
};

const DEFAULT_CONFIG_PATH: &str = "monitor.json";
const MIN_REPLY_WAIT: Duration = Duration::from_millis(200);

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let config_path = std::env::var("PWMFAN_MONITOR_CONFIG")
        .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = load_config(Path::new(&config_path)).await?;

    let local = bind_address(&config.interface_name, 0)
        .context("failed to resolve monitor address")?;
    let socket = UdpSocket::bind(local)
        .await
        .with_context(|| format!("failed to bind monitor socket at {local}"))?;
    socket
        .connect((config.remote_host.as_str(), config.remote_port))
        .await
        .with_context(|| {
            format!(
                "failed to reach {}:{}",
                config.remote_host, config.remote_port
            )
        })?;
    let period = config.poll_interval()?;
    info!(
        "polling {}:{} every {period:?}",
        config.remote_host, config.remote_port
    );

    let outcome = tokio::select! {
        result = poll(&socket, &config, period) => result,
        result = tokio::signal::ctrl_c() => result.context("failed to listen for ctrl-c"),
    };

    // Leave the cursor below the status line.
    println!();
    outcome
}

async fn load_config(path: &Path) -> anyhow::Result<MonitorConfig> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read config {}", path.display()))?;
    MonitorConfig::from_json_slice(&raw)
        .with_context(|| format!("invalid config {}", path.display()))
}

async fn poll(
    socket: &UdpSocket,
    config: &MonitorConfig,
    period: Duration,
) -> anyhow::Result<()> {
    let wait = period.max(MIN_REPLY_WAIT);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let mut buf = vec![0u8; RESPONSE_BUFFER_BYTES];
    let mut line = StatusLine::default();
    let mut stdout = io::stdout();

    loop {
        ticker.tick().await;

        socket
            .send(config.token.as_bytes())
            .await
            .context("failed to send status request")?;

        match tokio::time::timeout(wait, socket.recv(&mut buf)).await {
            Ok(Ok(len)) => {
                let text = render_reply(&buf[..len]);
                line.redraw(&mut stdout, &text)
                    .context("failed to write status line")?;
            }
            // The controller is not listening yet; keep asking.
            Ok(Err(err)) if err.kind() == ErrorKind::ConnectionRefused => {
                warn!("status request refused: {err}");
            }
            Ok(Err(err)) => return Err(err).context("status receive failed"),
            Err(_) => debug!("no reply within {wait:?}"),
        }
    }
}

/// JSON replies are shown in the same columns as text replies.
fn render_reply(reply: &[u8]) -> String {
    match serde_json::from_slice::<FanSnapshot>(reply) {
        Ok(snapshot) => snapshot.to_string(),
        Err(_) => String::from_utf8_lossy(reply).trim_end().to_string(),
    }
}

/// A single terminal line rewritten in place.
#[derive(Debug, Default)]
struct StatusLine {
    width: usize,
}

impl StatusLine {
    fn redraw(&mut self, out: &mut impl Write, text: &str) -> io::Result<()> {
        write!(out, "\r{}\r{text}", " ".repeat(self.width))?;
        out.flush()?;
        self.width = text.chars().count();
        Ok(())
    }
}
