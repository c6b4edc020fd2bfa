use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use pwmfan_common::{ConfigError, HardwareError, PwmOutput, TemperatureSource};

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Hardware PWM channel wired to a BCM GPIO on the Raspberry Pi header.
pub fn pwm_channel_for_pin(pin: u8) -> Result<u8, ConfigError> {
    match pin {
        12 | 18 => Ok(0),
        13 | 19 => Ok(1),
        other => Err(ConfigError::NoPwmChannel(other)),
    }
}

/// Thermal zone file holding an integer reading in `divider` units per degree.
#[derive(Debug, Clone)]
pub struct ThermalZone {
    path: PathBuf,
    divider: f64,
}

impl ThermalZone {
    pub fn new(path: impl Into<PathBuf>, divider: f64) -> Self {
        Self {
            path: path.into(),
            divider,
        }
    }
}

impl TemperatureSource for ThermalZone {
    fn read_temperature(&mut self) -> Result<f64, HardwareError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| HardwareError::Read {
            path: self.path.clone(),
            source,
        })?;
        let trimmed = raw.trim();
        let value = trimmed
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| HardwareError::ParseTemperature {
                path: self.path.clone(),
                raw: trimmed.to_string(),
            })?;
        Ok(value / self.divider)
    }
}

/// Kernel PWM class device, `<root>/pwmchip<N>/pwm<C>`.
#[derive(Debug)]
pub struct SysfsPwm {
    channel_dir: PathBuf,
    period_ns: Option<u64>,
    written: HashMap<&'static str, u64>,
}

impl SysfsPwm {
    pub fn open(root: impl AsRef<Path>, chip: u32, channel: u8) -> Result<Self, HardwareError> {
        let chip_dir = root.as_ref().join(format!("pwmchip{chip}"));
        let channel_dir = chip_dir.join(format!("pwm{channel}"));

        let reused = channel_dir.exists();
        if !reused {
            let export = chip_dir.join("export");
            fs::write(&export, channel.to_string())
                .map_err(|source| HardwareError::Write {
                    path: export,
                    source,
                })?;
        }

        let mut pwm = Self {
            channel_dir,
            period_ns: None,
            written: HashMap::new(),
        };
        // A previous run may have left a duty cycle longer than the period we
        // are about to program.
        if reused {
            pwm.write_attr("duty_cycle", 0)?;
        }
        Ok(pwm)
    }

    fn write_attr(&mut self, name: &'static str, value: u64) -> Result<(), HardwareError> {
        if self.written.get(name) == Some(&value) {
            return Ok(());
        }
        let path = self.channel_dir.join(name);
        fs::write(&path, value.to_string())
            .map_err(|source| HardwareError::Write { path, source })?;
        self.written.insert(name, value);
        Ok(())
    }
}

impl PwmOutput for SysfsPwm {
    fn set_frequency(&mut self, hz: u32) -> Result<(), HardwareError> {
        if hz == 0 {
            return Err(HardwareError::Driver("pwm frequency must be non-zero".to_string()));
        }
        let period = NANOS_PER_SECOND / u64::from(hz);

        // The kernel refuses a period shorter than the active duty cycle.
        if self.written.get("duty_cycle").is_some_and(|duty| *duty > period) {
            self.write_attr("duty_cycle", 0)?;
        }
        self.write_attr("period", period)?;
        self.period_ns = Some(period);
        Ok(())
    }

    fn set_duty_cycle(&mut self, value: u32, full_scale: u32) -> Result<(), HardwareError> {
        let Some(period) = self.period_ns else {
            return Err(HardwareError::Driver(
                "pwm period must be set before the duty cycle".to_string(),
            ));
        };
        if full_scale == 0 {
            return Err(HardwareError::Driver("full scale must be non-zero".to_string()));
        }
        let duty = period * u64::from(value.min(full_scale)) / u64::from(full_scale);
        self.write_attr("duty_cycle", duty)?;
        self.write_attr("enable", 1)
    }

    fn set_low(&mut self) -> Result<(), HardwareError> {
        self.write_attr("duty_cycle", 0)?;
        self.write_attr("enable", 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn maps_header_pins_to_channels() {
        assert_eq!(pwm_channel_for_pin(18).unwrap(), 0);
        assert_eq!(pwm_channel_for_pin(12).unwrap(), 0);
        assert_eq!(pwm_channel_for_pin(19).unwrap(), 1);
        assert!(matches!(
            pwm_channel_for_pin(4),
            Err(ConfigError::NoPwmChannel(4))
        ));
    }

    #[test]
    fn thermal_zone_scales_millidegrees() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp");
        fs::write(&path, "47250\n").unwrap();

        let mut zone = ThermalZone::new(&path, 1_000.0);
        assert_eq!(zone.read_temperature().unwrap(), 47.25);
    }

    #[test]
    fn thermal_zone_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp");
        fs::write(&path, "hot\n").unwrap();

        let mut zone = ThermalZone::new(&path, 1_000.0);
        assert!(matches!(
            zone.read_temperature(),
            Err(HardwareError::ParseTemperature { raw, .. }) if raw == "hot"
        ));

        fs::write(&path, "NaN\n").unwrap();
        assert!(zone.read_temperature().is_err());
    }

    #[test]
    fn thermal_zone_missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut zone = ThermalZone::new(dir.path().join("missing"), 1_000.0);
        assert!(matches!(
            zone.read_temperature(),
            Err(HardwareError::Read { .. })
        ));
    }

    #[test]
    fn exports_missing_channel() {
        let dir = tempfile::tempdir().unwrap();
        let chip = dir.path().join("pwmchip0");
        fs::create_dir_all(&chip).unwrap();

        SysfsPwm::open(dir.path(), 0, 1).unwrap();

        assert_eq!(read(&chip.join("export")), "1");
    }

    #[test]
    fn writes_period_duty_and_enable() {
        let dir = tempfile::tempdir().unwrap();
        let channel = dir.path().join("pwmchip0").join("pwm0");
        fs::create_dir_all(&channel).unwrap();

        let mut pwm = SysfsPwm::open(dir.path(), 0, 0).unwrap();
        pwm.set_frequency(25_000).unwrap();
        pwm.set_duty_cycle(60, 100).unwrap();

        assert_eq!(read(&channel.join("period")), "40000");
        assert_eq!(read(&channel.join("duty_cycle")), "24000");
        assert_eq!(read(&channel.join("enable")), "1");

        pwm.set_low().unwrap();
        assert_eq!(read(&channel.join("duty_cycle")), "0");
        assert_eq!(read(&channel.join("enable")), "0");
    }

    #[test]
    fn duty_before_period_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("pwmchip0").join("pwm0")).unwrap();

        let mut pwm = SysfsPwm::open(dir.path(), 0, 0).unwrap();
        assert!(matches!(
            pwm.set_duty_cycle(10, 100),
            Err(HardwareError::Driver(_))
        ));
    }

    #[test]
    fn shortening_period_clears_duty_first() {
        let dir = tempfile::tempdir().unwrap();
        let channel = dir.path().join("pwmchip0").join("pwm0");
        fs::create_dir_all(&channel).unwrap();

        let mut pwm = SysfsPwm::open(dir.path(), 0, 0).unwrap();
        pwm.set_frequency(100).unwrap();
        pwm.set_duty_cycle(100, 100).unwrap();
        pwm.set_frequency(25_000).unwrap();

        assert_eq!(read(&channel.join("period")), "40000");
        assert_eq!(read(&channel.join("duty_cycle")), "0");
    }

    #[test]
    fn reopening_clears_stale_duty_before_period() {
        let dir = tempfile::tempdir().unwrap();
        let channel = dir.path().join("pwmchip0").join("pwm0");
        fs::create_dir_all(&channel).unwrap();
        fs::write(channel.join("period"), "10000000").unwrap();
        fs::write(channel.join("duty_cycle"), "10000000").unwrap();

        let mut pwm = SysfsPwm::open(dir.path(), 0, 0).unwrap();
        assert_eq!(read(&channel.join("duty_cycle")), "0");
        assert!(!dir.path().join("pwmchip0").join("export").exists());

        pwm.set_frequency(25_000).unwrap();
        assert_eq!(read(&channel.join("period")), "40000");
        assert_eq!(read(&channel.join("duty_cycle")), "0");
    }
}
