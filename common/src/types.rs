use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FanState {
    #[default]
    Stop,
    Start,
    Run,
}

impl FanState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stop => "Stop",
            Self::Start => "Start",
            Self::Run => "Run",
        }
    }
}

impl fmt::Display for FanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FanSnapshot {
    pub pin: u8,
    pub temp: f64,
    pub state: FanState,
    pub cycle: u32,
    pub count: u32,
}

const COLUMN_WIDTH: usize = 16;

// One fixed-width line so the monitor can redraw it in place.
impl fmt::Display for FanSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns = [
            format!("Pin: {}", self.pin),
            format!("Temp: {}", self.temp),
            format!("State: {}", self.state),
            format!("Cycle: {}", self.cycle),
            format!("Count: {}", self.count),
        ];
        for column in columns {
            write!(f, "{column:<COLUMN_WIDTH$}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn snapshot_renders_padded_columns() {
        let snapshot = FanSnapshot {
            pin: 18,
            temp: 47.5,
            state: FanState::Run,
            cycle: 41,
            count: 2,
        };

        assert_eq!(
            snapshot.to_string(),
            "Pin: 18         Temp: 47.5      State: Run      Cycle: 41       Count: 2        "
        );
    }

    #[test]
    fn state_serializes_as_name() {
        assert_eq!(serde_json::to_string(&FanState::Start).unwrap(), "\"Start\"");
    }
}
