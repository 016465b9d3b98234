//! Hardware seams. Each trait is one collaborator contract; the firmware
//! implements them on its board bundle, tests implement them on simulators.

use crate::config::ConfigRecord;

/// Absolute rotary position sensor transport. Blocking, bounded latency.
pub trait PositionSensor {
    /// Reads one raw 16-bit absolute angle sample.
    fn read_raw(&mut self) -> u16;
}

/// Three-phase PWM output. Duty values are in algorithm units,
/// `0 ..= PWM_PERIOD`; the driver rescales onto the timer period.
pub trait PwmOutput {
    fn set_duty(&mut self, duty: [u16; 3]);
}

/// One control-loop period of delay. Calibration paces its open-loop drive
/// with this; the firmware maps it onto the PWM tick.
pub trait Ticker {
    fn delay_tick(&mut self);
}

/// Persistent configuration store. `commit` replaces the whole record in one
/// logical step (erase + program); partial writes are never observed.
pub trait ConfigStore {
    fn load_config(&mut self) -> ConfigRecord;
    fn commit_config(&mut self, config: &ConfigRecord);
}

/// Advisory indicator outputs. `on` means "attention needed" (blinking).
pub trait Indicators {
    fn set_calibration_indicator(&mut self, on: bool);
    fn set_identity_indicator(&mut self, on: bool);
}

/// Everything the controller needs from the board, as one bound.
pub trait Board: PositionSensor + PwmOutput + Ticker + ConfigStore + Indicators {}

impl<T> Board for T where T: PositionSensor + PwmOutput + Ticker + ConfigStore + Indicators {}
