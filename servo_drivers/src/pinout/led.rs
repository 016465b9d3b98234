use super::PinDef;
use super::{PinMode, Port};

/// Calibration status LED: blinks while the motor calibration or the
/// travel limit search is missing.
pub const CALIB: PinDef = PinDef {
    port: Port::B,
    pin: 14,
    mode: PinMode::Output,
};

/// Identity status LED: blinks while no controller id is assigned.
pub const ID: PinDef = PinDef {
    port: Port::B,
    pin: 15,
    mode: PinMode::Output,
};
