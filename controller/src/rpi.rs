use rppal::{
    gpio::Gpio,
    pwm::{Channel, Polarity, Pwm},
};

use pwmfan_common::{ConfigError, HardwareError, PwmOutput};

use crate::hw::pwm_channel_for_pin;

/// PWM through the BCM2835 peripheral via `rppal`.
pub struct RppalPwm {
    pwm: Pwm,
    pin: u8,
    duty: f64,
}

impl RppalPwm {
    pub fn open(pin: u8) -> anyhow::Result<Self> {
        let channel = match pwm_channel_for_pin(pin)? {
            0 => Channel::Pwm0,
            1 => Channel::Pwm1,
            _ => return Err(ConfigError::NoPwmChannel(pin).into()),
        };
        let pwm = Pwm::with_frequency(channel, 25_000.0, 0.0, Polarity::Normal, false)?;
        Ok(Self {
            pwm,
            pin,
            duty: 0.0,
        })
    }
}

fn driver_error(err: impl std::fmt::Display) -> HardwareError {
    HardwareError::Driver(err.to_string())
}

impl PwmOutput for RppalPwm {
    fn set_frequency(&mut self, hz: u32) -> Result<(), HardwareError> {
        self.pwm
            .set_frequency(f64::from(hz), self.duty)
            .map_err(driver_error)
    }

    fn set_duty_cycle(&mut self, value: u32, full_scale: u32) -> Result<(), HardwareError> {
        if full_scale == 0 {
            return Err(HardwareError::Driver("full scale must be non-zero".to_string()));
        }
        self.duty = f64::from(value.min(full_scale)) / f64::from(full_scale);
        self.pwm.set_duty_cycle(self.duty).map_err(driver_error)?;
        self.pwm.enable().map_err(driver_error)
    }

    fn set_low(&mut self) -> Result<(), HardwareError> {
        self.duty = 0.0;
        self.pwm.set_duty_cycle(0.0).map_err(driver_error)?;
        self.pwm.disable().map_err(driver_error)?;

        // Hand the pin back to GPIO and latch it low after we exit.
        let mut pin = Gpio::new()
            .and_then(|gpio| gpio.get(self.pin))
            .map_err(driver_error)?
            .into_output_low();
        pin.set_reset_on_drop(false);
        Ok(())
    }
}
