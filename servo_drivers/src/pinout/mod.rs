use hal::gpio::{Pin, PinMode, Port};

pub mod buttons;
pub mod driver;
pub mod encoder;
pub mod led;
pub mod serial;

/// Compile-time definition of one GPIO pin, so the whole board map lives
/// in this module tree as constants.
pub struct PinDef {
    port: Port,
    pin: u8,
    mode: PinMode,
}

impl PinDef {
    pub const fn new(port: Port, pin: u8, mode: PinMode) -> PinDef {
        PinDef { port, pin, mode }
    }

    /// Claims and configures the pin.
    /// # Example
    /// ```ignore
    /// let mut dr_reset = driver::RESET.init();
    /// dr_reset.set_high();
    /// ```
    pub fn init(&self) -> Pin {
        Pin::new(self.port, self.pin, self.mode)
    }
}
