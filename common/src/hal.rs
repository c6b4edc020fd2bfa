use crate::error::HardwareError;

/// Source of pre-scaled CPU temperature readings, in degrees.
pub trait TemperatureSource {
    fn read_temperature(&mut self) -> Result<f64, HardwareError>;
}

/// PWM-capable output pin driving the fan.
pub trait PwmOutput {
    fn set_frequency(&mut self, hz: u32) -> Result<(), HardwareError>;

    /// Duty cycle expressed as `value / full_scale`.
    fn set_duty_cycle(&mut self, value: u32, full_scale: u32) -> Result<(), HardwareError>;

    /// Stop driving PWM and hold the line low.
    fn set_low(&mut self) -> Result<(), HardwareError>;
}
