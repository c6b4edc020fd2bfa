use std::{path::Path, sync::Arc};

use anyhow::Context;
use tokio::{
    sync::{watch, Mutex},
    task::JoinError,
};
use tracing::{info, warn};

use pwmfan_common::{net::bind_address, FanConfig, FanEngine};

use crate::{
    hw::ThermalZone,
    sampler::{self, SharedEngine},
    server::StatusServer,
};

const DEFAULT_CONFIG_PATH: &str = "config.json";

enum Exit {
    Sampler(Result<anyhow::Result<()>, JoinError>),
    Server(Result<anyhow::Result<()>, JoinError>),
    Signal(anyhow::Result<&'static str>),
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config_path =
        std::env::var("PWMFAN_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = load_config(Path::new(&config_path)).await?;
    info!(
        "loaded {config_path}: pin {} start {:.1} low {:.1} high {:.1} at {} Hz",
        config.pin, config.start.temp, config.low.temp, config.high.temp, config.sample_rate
    );

    let listen_addr = bind_address(&config.network.interface_name, config.network.listen_port)
        .context("failed to resolve status server address")?;
    let sensor = ThermalZone::new(&config.cpu_temp_path, config.temp_divider);
    let output = open_output(&config)?;
    let interval = config.sample_interval()?;
    let network = config.network.clone();

    let engine: SharedEngine = Arc::new(Mutex::new(FanEngine::new(config)));

    let server = StatusServer::bind(listen_addr, engine.clone(), &network).await?;
    info!("status server listening on udp://{}", server.local_addr()?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut sampler_task = tokio::spawn(sampler::run(
        engine,
        sensor,
        output,
        interval,
        shutdown_rx,
    ));
    let mut server_task = tokio::spawn(server.serve());

    let exit = tokio::select! {
        joined = &mut sampler_task => Exit::Sampler(joined),
        joined = &mut server_task => Exit::Server(joined),
        signal = shutdown_signal() => Exit::Signal(signal),
    };

    let outcome = match exit {
        Exit::Sampler(joined) => task_outcome(joined, "sampling"),
        Exit::Server(joined) => {
            let served = task_outcome(joined, "status server");
            let _ = shutdown_tx.send(true);
            let sampled = task_outcome(sampler_task.await, "sampling");
            served.and(sampled)
        }
        Exit::Signal(signal) => {
            match &signal {
                Ok(name) => info!("caught {name}, preparing to exit"),
                Err(err) => warn!("{err:#}"),
            }
            let _ = shutdown_tx.send(true);
            let sampled = task_outcome(sampler_task.await, "sampling");
            signal.map(|_| ()).and(sampled)
        }
    };

    server_task.abort();
    if outcome.is_ok() {
        info!("terminating");
    }
    outcome
}

async fn load_config(path: &Path) -> anyhow::Result<FanConfig> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read config {}", path.display()))?;
    FanConfig::from_json_slice(&raw).with_context(|| format!("invalid config {}", path.display()))
}

#[cfg(not(feature = "rpi"))]
fn open_output(config: &FanConfig) -> anyhow::Result<crate::hw::SysfsPwm> {
    let channel = crate::hw::pwm_channel_for_pin(config.pin)?;
    crate::hw::SysfsPwm::open(&config.pwm.sysfs_root, config.pwm.chip, channel).with_context(
        || {
            format!(
                "failed to open pwmchip{} channel {channel} for GPIO {}",
                config.pwm.chip, config.pin
            )
        },
    )
}

#[cfg(feature = "rpi")]
fn open_output(config: &FanConfig) -> anyhow::Result<crate::rpi::RppalPwm> {
    crate::rpi::RppalPwm::open(config.pin)
        .with_context(|| format!("failed to open hardware PWM for GPIO {}", config.pin))
}

fn task_outcome(
    joined: Result<anyhow::Result<()>, JoinError>,
    task: &str,
) -> anyhow::Result<()> {
    joined.with_context(|| format!("{task} task did not complete"))?
}

#[cfg(unix)]
async fn shutdown_signal() -> anyhow::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    let mut hangup = signal(SignalKind::hangup()).context("failed to install SIGHUP handler")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for SIGINT")?;
            Ok("SIGINT")
        }
        _ = terminate.recv() => Ok("SIGTERM"),
        _ = hangup.recv() => Ok("SIGHUP"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> anyhow::Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    Ok("ctrl-c")
}
