use std::{sync::Arc, time::Duration};

use anyhow::Context;
use tokio::{
    sync::{watch, Mutex},
    time::MissedTickBehavior,
};
use tracing::{debug, error, info};

use pwmfan_common::{FanEngine, PwmOutput, TemperatureSource};

pub type SharedEngine = Arc<Mutex<FanEngine>>;

/// Samples, steps the engine and actuates once per `interval` until `shutdown`
/// fires or a collaborator fails. The output is driven low on every exit path.
pub async fn run<S, O>(
    engine: SharedEngine,
    sensor: S,
    mut output: O,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()>
where
    S: TemperatureSource + Send + 'static,
    O: PwmOutput,
{
    let outcome = drive(&engine, sensor, &mut output, interval, shutdown).await;

    let parked = output
        .set_low()
        .context("failed to drive fan output low");
    match &parked {
        Ok(()) => info!("fan output driven low"),
        Err(err) => error!("{err:#}"),
    }

    outcome.and(parked)
}

async fn drive<S, O>(
    engine: &SharedEngine,
    mut sensor: S,
    output: &mut O,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()>
where
    S: TemperatureSource + Send + 'static,
    O: PwmOutput,
{
    anyhow::ensure!(!interval.is_zero(), "sampling interval must be non-zero");

    let (pwm_freq, full_cycle, initial_cycle) = {
        let engine = engine.lock().await;
        (
            engine.config().pwm_freq,
            engine.config().full_cycle,
            engine.cycle(),
        )
    };

    output
        .set_frequency(pwm_freq)
        .context("failed to set PWM frequency")?;
    output
        .set_duty_cycle(initial_cycle, full_cycle)
        .context("failed to set initial duty cycle")?;

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        "sampling every {:?} at {pwm_freq} Hz, full scale {full_cycle}",
        interval
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => {
                info!("sampling loop stopping");
                return Ok(());
            }
        }

        let (returned, temp) = read_blocking(sensor).await?;
        sensor = returned;

        let (tick, count) = {
            let mut engine = engine.lock().await;
            let tick = engine.tick(temp);
            (tick, engine.count())
        };

        if tick.changed_state() {
            info!(
                "fan {} -> {} at {temp:.1}, cycle {}",
                tick.previous, tick.state, tick.cycle
            );
        }
        debug!(
            "temp: {temp:.2} state: {} cycle: {} count: {count}",
            tick.state, tick.cycle
        );

        output
            .set_frequency(pwm_freq)
            .context("failed to set PWM frequency")?;
        output
            .set_duty_cycle(tick.cycle, full_cycle)
            .context("failed to set duty cycle")?;
    }
}

/// Sensor reads are file I/O, so they run on the blocking pool.
async fn read_blocking<S>(mut sensor: S) -> anyhow::Result<(S, f64)>
where
    S: TemperatureSource + Send + 'static,
{
    let (sensor, reading) = tokio::task::spawn_blocking(move || {
        let reading = sensor.read_temperature();
        (sensor, reading)
    })
    .await
    .context("temperature read task did not complete")?;
    let temp = reading.context("failed to read CPU temperature")?;
    Ok((sensor, temp))
}
