//! Pin map for the RS-485 bus transceiver.
use super::PinDef;
use super::{PinMode, Port};

pub const USART1_TX: PinDef = PinDef {
    port: Port::B,
    pin: 6,
    mode: PinMode::Alt(7),
};

pub const USART1_RX: PinDef = PinDef {
    port: Port::B,
    pin: 7,
    mode: PinMode::Alt(7),
};

/// Driver-enable output, switched by the USART in hardware.
pub const USART1_DE: PinDef = PinDef {
    port: Port::A,
    pin: 12,
    mode: PinMode::Alt(7),
};
