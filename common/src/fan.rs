use crate::{
    config::FanConfig,
    remap::linear_clamp_remap,
    types::{FanSnapshot, FanState},
};

/// Outcome of one sampling tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FanTick {
    pub previous: FanState,
    pub state: FanState,
    pub cycle: u32,
}

impl FanTick {
    pub fn changed_state(&self) -> bool {
        self.previous != self.state
    }
}

/// Hysteresis state machine for one PWM fan.
///
/// A single debounce counter is shared by `Stop` and `Run`. It climbs while the
/// temperature is on the "leave this state" side of the threshold, bleeds back
/// down by one when it is not, and only a full count fires the transition.
/// `Start` lasts exactly one tick and applies the kick-start duty cycle.
#[derive(Debug, Clone)]
pub struct FanEngine {
    config: FanConfig,
    state: FanState,
    temp: f64,
    cycle: u32,
    count: u32,
}

impl FanEngine {
    pub fn new(config: FanConfig) -> Self {
        let cycle = config.stop_cycle.min(config.full_cycle);
        Self {
            config,
            state: FanState::Stop,
            temp: 0.0,
            cycle,
            count: 0,
        }
    }

    pub fn config(&self) -> &FanConfig {
        &self.config
    }

    pub fn state(&self) -> FanState {
        self.state
    }

    pub fn temp(&self) -> f64 {
        self.temp
    }

    pub fn cycle(&self) -> u32 {
        self.cycle
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Debounce threshold the counter is working towards in the current state.
    pub fn threshold(&self) -> u32 {
        match self.state {
            FanState::Stop => self.config.start.count,
            FanState::Start => 0,
            FanState::Run => self.config.low.count,
        }
    }

    pub fn tick(&mut self, temp: f64) -> FanTick {
        let previous = self.state;
        self.temp = temp;

        match self.state {
            FanState::Stop => {
                let start = self.config.start;
                self.debounce(temp >= start.temp, start.count);
                if self.count >= start.count {
                    self.enter(FanState::Start);
                }
            }
            FanState::Start => self.enter(FanState::Run),
            FanState::Run => {
                let low = self.config.low;
                self.debounce(temp <= low.temp, low.count);
                if self.count >= low.count {
                    self.enter(FanState::Stop);
                }
            }
        }

        self.cycle = self.cycle_for_state();

        FanTick {
            previous,
            state: self.state,
            cycle: self.cycle,
        }
    }

    pub fn snapshot(&self) -> FanSnapshot {
        FanSnapshot {
            pin: self.config.pin,
            temp: self.temp,
            state: self.state,
            cycle: self.cycle,
            count: self.count,
        }
    }

    fn debounce(&mut self, toward_threshold: bool, threshold: u32) {
        if toward_threshold {
            if self.count < threshold {
                self.count += 1;
            }
        } else if self.count > 0 {
            self.count -= 1;
        }
    }

    fn enter(&mut self, state: FanState) {
        self.state = state;
        self.count = 0;
    }

    fn cycle_for_state(&self) -> u32 {
        let cycle = match self.state {
            FanState::Stop => self.config.stop_cycle,
            FanState::Start => self.config.start.cycle,
            FanState::Run => {
                let low = self.config.low;
                let high = self.config.high;
                let remapped = linear_clamp_remap(
                    self.temp,
                    low.temp,
                    high.temp,
                    f64::from(low.cycle),
                    f64::from(high.cycle),
                );
                remapped.floor() as u32
            }
        };
        cycle.min(self.config.full_cycle)
    }
}
