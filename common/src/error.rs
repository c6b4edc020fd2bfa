use std::{io, path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("sample_rate must be a positive number of Hz no faster than 1000 with a representable period, got {0}")]
    SampleRate(f64),

    #[error("pwm_freq must be greater than zero")]
    PwmFrequency,

    #[error("full_cycle must be greater than zero")]
    FullCycle,

    #[error("{name} cycle {cycle} exceeds full_cycle {full_cycle}")]
    CycleOutOfRange {
        name: &'static str,
        cycle: u32,
        full_cycle: u32,
    },

    #[error("{name} count must be greater than zero")]
    ZeroCount { name: &'static str },

    #[error("{name} temperature must be finite, got {temp}")]
    NonFiniteTemp { name: &'static str, temp: f64 },

    #[error("low temperature {low} must be below high temperature {high}")]
    LowNotBelowHigh { low: f64, high: f64 },

    #[error("start temperature {start} must be above low temperature {low}")]
    StartNotAboveLow { start: f64, low: f64 },

    #[error("temp_divider must be a positive finite number, got {0}")]
    TempDivider(f64),

    #[error("network token must be between 1 and {max} bytes, got {len}")]
    TokenLength { len: usize, max: usize },

    #[error("network interface `{0}` not found or has no IPv4 address")]
    InterfaceNotFound(String),

    #[error("failed to enumerate network interfaces: {0}")]
    InterfaceQuery(#[source] io::Error),

    #[error("GPIO {0} has no hardware PWM channel")]
    NoPwmChannel(u8),
}

#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("unparseable temperature `{raw}` in {path}")]
    ParseTemperature { path: PathBuf, raw: String },

    #[error("pwm driver error: {0}")]
    Driver(String),
}
