pub mod config;
pub mod error;
pub mod fan;
pub mod hal;
pub mod net;
pub mod protocol;
pub mod remap;
pub mod types;

pub use config::{
    CalibrationPoint, FanConfig, MonitorConfig, NetworkSettings, PwmSettings, StatusFormat,
};
pub use error::{ConfigError, HardwareError};
pub use fan::{FanEngine, FanTick};
pub use hal::{PwmOutput, TemperatureSource};
pub use remap::{linear_clamp_remap, linear_remap};
pub use types::{FanSnapshot, FanState};
