//! Pin map for the three-phase gate driver.
use super::PinDef;
use super::{PinMode, Port};

/// Reset pin for the gate driver
pub const RESET: PinDef = PinDef {
    port: Port::B,
    pin: 2,
    mode: PinMode::Output,
};

/// Enable pin for the gate driver
pub const ENABLE: PinDef = PinDef {
    port: Port::A,
    pin: 4,
    mode: PinMode::Output,
};

/// PWM pin for phase U (TIM2 CH1)
pub const PWM_U: PinDef = PinDef {
    port: Port::A,
    pin: 0,
    mode: PinMode::Alt(1),
};

/// PWM pin for phase V (TIM2 CH2)
pub const PWM_V: PinDef = PinDef {
    port: Port::A,
    pin: 1,
    mode: PinMode::Alt(1),
};

/// PWM pin for phase W (TIM2 CH3)
pub const PWM_W: PinDef = PinDef {
    port: Port::B,
    pin: 10,
    mode: PinMode::Alt(1),
};
