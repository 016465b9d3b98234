use hal::{
    clocks::Clocks,
    pac::USART1,
    usart::{Usart, UsartConfig, UsartInterrupt},
};

use super::pinout;

const BAUD: u32 = 115_200;

/// RS-485 command port on USART1. The bus transceiver's driver-enable
/// pin is switched by the USART hardware, so transmit is a plain
/// blocking write. Reception is interrupt driven, one byte at a time.
pub struct SerialPort {
    uart: Usart<USART1>,
}

impl SerialPort {
    pub fn new(regs: USART1, clock_cfg: &Clocks) -> Self {
        pinout::serial::USART1_TX.init();
        pinout::serial::USART1_RX.init();
        pinout::serial::USART1_DE.init();

        let mut uart = Usart::new(regs, BAUD, UsartConfig::default(), clock_cfg);
        uart.enable_interrupt(UsartInterrupt::ReadNotEmpty);

        SerialPort { uart }
    }

    /// Takes the received byte, from the RX interrupt handler.
    pub fn read_byte(&mut self) -> u8 {
        self.uart.read_one()
    }

    pub fn clear_rx_interrupt(&mut self) {
        self.uart.clear_interrupt(UsartInterrupt::ReadNotEmpty);
    }

    /// Blocking transmit of one reply line.
    pub fn write_line(&mut self, line: &[u8]) {
        let _ = self.uart.write(line);
    }
}
