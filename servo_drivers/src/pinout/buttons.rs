//! Pin map for the two panel buttons, pulled down, active high.
use super::PinDef;
use super::{PinMode, Port};

pub const CALIBRATE: PinDef = PinDef {
    port: Port::A,
    pin: 2,
    mode: PinMode::Input,
};

pub const IDENTITY: PinDef = PinDef {
    port: Port::A,
    pin: 3,
    mode: PinMode::Input,
};
