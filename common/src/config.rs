use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_CPU_TEMP_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";
pub const MAX_TOKEN_BYTES: usize = 1024;
/// Shortest period the sampling and polling loops will run at.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub temp: f64,
    #[serde(default)]
    pub cycle: u32,
    #[serde(default)]
    pub count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Empty means listen on every interface.
    #[serde(default)]
    pub interface_name: String,
    pub listen_port: u16,
    pub token: String,
    #[serde(default)]
    pub format: StatusFormat,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            interface_name: String::new(),
            listen_port: 5_000,
            token: String::new(),
            format: StatusFormat::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PwmSettings {
    pub sysfs_root: String,
    pub chip: u32,
}

impl Default for PwmSettings {
    fn default() -> Self {
        Self {
            sysfs_root: "/sys/class/pwm".to_string(),
            chip: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanConfig {
    pub pin: u8,
    #[serde(default = "default_cpu_temp_path")]
    pub cpu_temp_path: String,
    #[serde(default = "default_temp_divider")]
    pub temp_divider: f64,
    pub sample_rate: f64,
    pub pwm_freq: u32,
    pub full_cycle: u32,
    #[serde(default)]
    pub stop_cycle: u32,
    pub start: CalibrationPoint,
    pub low: CalibrationPoint,
    pub high: CalibrationPoint,
    #[serde(default)]
    pub network: NetworkSettings,
    #[serde(default)]
    pub pwm: PwmSettings,
}

fn default_cpu_temp_path() -> String {
    DEFAULT_CPU_TEMP_PATH.to_string()
}

fn default_temp_divider() -> f64 {
    1_000.0
}

impl Default for FanConfig {
    fn default() -> Self {
        Self {
            pin: 18,
            cpu_temp_path: default_cpu_temp_path(),
            temp_divider: default_temp_divider(),
            sample_rate: 2.0,
            pwm_freq: 25_000,
            full_cycle: 100,
            stop_cycle: 0,
            start: CalibrationPoint {
                temp: 55.0,
                cycle: 60,
                count: 10,
            },
            low: CalibrationPoint {
                temp: 45.0,
                cycle: 25,
                count: 20,
            },
            high: CalibrationPoint {
                temp: 70.0,
                cycle: 100,
                count: 0,
            },
            network: NetworkSettings::default(),
            pwm: PwmSettings::default(),
        }
    }
}

impl FanConfig {
    pub fn from_json_slice(raw: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects anything that would make the control loop misbehave silently.
    pub fn validate(&self) -> Result<(), ConfigError> {
        rate_interval(self.sample_rate)?;
        if self.pwm_freq == 0 {
            return Err(ConfigError::PwmFrequency);
        }
        if self.full_cycle == 0 {
            return Err(ConfigError::FullCycle);
        }
        if !self.temp_divider.is_finite() || self.temp_divider <= 0.0 {
            return Err(ConfigError::TempDivider(self.temp_divider));
        }

        for (name, cycle) in [
            ("stop", self.stop_cycle),
            ("start", self.start.cycle),
            ("low", self.low.cycle),
            ("high", self.high.cycle),
        ] {
            if cycle > self.full_cycle {
                return Err(ConfigError::CycleOutOfRange {
                    name,
                    cycle,
                    full_cycle: self.full_cycle,
                });
            }
        }

        for (name, point) in [("start", self.start), ("low", self.low), ("high", self.high)] {
            if !point.temp.is_finite() {
                return Err(ConfigError::NonFiniteTemp {
                    name,
                    temp: point.temp,
                });
            }
        }

        for (name, point) in [("start", self.start), ("low", self.low)] {
            if point.count == 0 {
                return Err(ConfigError::ZeroCount { name });
            }
        }

        if self.low.temp >= self.high.temp {
            return Err(ConfigError::LowNotBelowHigh {
                low: self.low.temp,
                high: self.high.temp,
            });
        }
        if self.start.temp <= self.low.temp {
            return Err(ConfigError::StartNotAboveLow {
                start: self.start.temp,
                low: self.low.temp,
            });
        }

        validate_token(&self.network.token)
    }

    pub fn sample_interval(&self) -> Result<Duration, ConfigError> {
        rate_interval(self.sample_rate)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub interface_name: String,
    pub remote_host: String,
    pub remote_port: u16,
    pub token: String,
    #[serde(default = "default_poll_rate")]
    pub sample_rate: f64,
}

fn default_poll_rate() -> f64 {
    1.0
}

impl MonitorConfig {
    pub fn from_json_slice(raw: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        rate_interval(self.sample_rate)?;
        validate_token(&self.token)
    }

    pub fn poll_interval(&self) -> Result<Duration, ConfigError> {
        rate_interval(self.sample_rate)
    }
}

/// Period for a rate in Hz; it must be representable and at least
/// `MIN_INTERVAL`.
fn rate_interval(rate: f64) -> Result<Duration, ConfigError> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(ConfigError::SampleRate(rate));
    }
    Duration::try_from_secs_f64(1.0 / rate)
        .ok()
        .filter(|interval| *interval >= MIN_INTERVAL)
        .ok_or(ConfigError::SampleRate(rate))
}

fn validate_token(token: &str) -> Result<(), ConfigError> {
    let len = token.len();
    if len == 0 || len > MAX_TOKEN_BYTES {
        return Err(ConfigError::TokenLength {
            len,
            max: MAX_TOKEN_BYTES,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn valid() -> FanConfig {
        let mut config = FanConfig::default();
        config.network.token = "secret".to_string();
        config
    }

    #[test]
    fn parses_minimal_json_with_defaults() {
        let raw = br#"{
            "pin": 18,
            "sample_rate": 2,
            "pwm_freq": 25000,
            "full_cycle": 100,
            "start": { "temp": 60, "cycle": 50, "count": 3 },
            "low": { "temp": 50, "cycle": 20, "count": 3 },
            "high": { "temp": 80, "cycle": 100 },
            "network": { "listen_port": 6000, "token": "hello" }
        }"#;

        let config = FanConfig::from_json_slice(raw).unwrap();

        assert_eq!(config.cpu_temp_path, DEFAULT_CPU_TEMP_PATH);
        assert_eq!(config.temp_divider, 1_000.0);
        assert_eq!(config.stop_cycle, 0);
        assert_eq!(
            config.high,
            CalibrationPoint {
                temp: 80.0,
                cycle: 100,
                count: 0
            }
        );
        assert_eq!(
            config.network,
            NetworkSettings {
                interface_name: String::new(),
                listen_port: 6000,
                token: "hello".to_string(),
                format: StatusFormat::Text,
            }
        );
        assert_eq!(config.pwm, PwmSettings::default());
    }

    #[test]
    fn default_with_token_is_valid() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn rejects_zero_sample_rate() {
        let mut config = valid();
        config.sample_rate = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::SampleRate(_))));

        config.sample_rate = f64::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::SampleRate(_))));
    }

    #[test]
    fn rejects_inverted_calibration() {
        let mut config = valid();
        config.low.temp = config.high.temp;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::LowNotBelowHigh { .. })
        ));

        let mut config = valid();
        config.start.temp = config.low.temp;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::StartNotAboveLow { .. })
        ));
    }

    #[test]
    fn rejects_zero_debounce_counts() {
        let mut config = valid();
        config.low.count = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroCount { name: "low" })
        ));
    }

    #[test]
    fn rejects_cycle_above_full_scale() {
        let mut config = valid();
        config.high.cycle = config.full_cycle + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CycleOutOfRange { name: "high", .. })
        ));
    }

    #[test]
    fn rejects_empty_token() {
        let config = FanConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TokenLength { len: 0, .. })
        ));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            FanConfig::from_json_slice(b"{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn sample_interval_follows_rate() {
        let mut config = valid();
        config.sample_rate = 4.0;
        assert_eq!(config.sample_interval().unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn rejects_rates_without_a_usable_interval() {
        for rate in [1e12, 5_000.0, 1e-30, f64::MIN_POSITIVE] {
            let mut config = valid();
            config.sample_rate = rate;
            assert!(
                matches!(config.validate(), Err(ConfigError::SampleRate(r)) if r == rate),
                "{rate}"
            );
            assert!(config.sample_interval().is_err(), "{rate}");
        }

        let mut config = valid();
        config.sample_rate = 500.0;
        assert_eq!(config.sample_interval().unwrap(), Duration::from_millis(2));
    }

    #[test]
    fn monitor_rejects_rates_without_a_usable_interval() {
        for rate in [1e12, 1e-30] {
            let raw = format!(
                r#"{{ "remote_host": "10.0.0.2", "remote_port": 6000, "token": "hello", "sample_rate": {rate:e} }}"#
            );
            assert!(
                matches!(
                    MonitorConfig::from_json_slice(raw.as_bytes()),
                    Err(ConfigError::SampleRate(_))
                ),
                "{rate}"
            );
        }
    }

    #[test]
    fn monitor_config_defaults_poll_rate() {
        let raw = br#"{ "remote_host": "10.0.0.2", "remote_port": 6000, "token": "hello" }"#;
        let config = MonitorConfig::from_json_slice(raw).unwrap();
        assert_eq!(config.sample_rate, 1.0);
        assert_eq!(config.interface_name, "");
    }

    #[test]
    fn shipped_sample_configs_are_valid() {
        let mut fan =
            FanConfig::from_json_slice(include_bytes!("../../demos/config.json")).unwrap();
        fan.network.token = String::new();
        let mut expected = FanConfig::default();
        expected.network.token = String::new();
        assert_eq!(fan, expected);

        let monitor =
            MonitorConfig::from_json_slice(include_bytes!("../../demos/monitor.json")).unwrap();
        assert_eq!(monitor.remote_port, 5_000);
    }
}
