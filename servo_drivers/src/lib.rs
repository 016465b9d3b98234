#![no_std]

//! Board drivers for the servo controller: pin map, three-phase PWM
//! timer, SPI angle sensor, flash-backed configuration storage and the
//! RS-485 serial port. The control algorithms in `servo_algo` reach this
//! hardware only through its trait seams; the firmware binary wires the
//! two together.

mod fmt;

pub mod encoder_spi;
pub mod flash_store;
pub mod pinout;
pub mod pwm;
pub mod serial;
