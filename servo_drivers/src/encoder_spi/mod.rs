use hal::{
    self,
    gpio::Pin,
    pac::SPI1,
    spi::{BaudRate, Spi, SpiConfig, SpiMode},
};

use super::pinout;

// MA700 register access: command in the top nibble, register in the next.
const CMD_WRITE: u16 = 0b0010 << 12;
const REG_BCT: u16 = 3 << 8;
const REG_AXIS: u16 = 5 << 8;
const AXIS_Y: u16 = 1 << 5;

/// Side-shaft mounting correction factor for this board's magnet geometry.
const BCT_VALUE: u16 = 160;

/// Absolute angle sensor on SPI1 (MA700-family magnetic encoder).
///
/// One blocking 16-bit transfer per sample; the sensor shifts out the
/// current angle regardless of the word shifted in.
pub struct EncoderSpi {
    spi: Spi<SPI1>,
    cs_pin: Pin,
}

impl EncoderSpi {
    pub fn new(spi_reg: SPI1) -> Self {
        let spi_cfg = SpiConfig {
            mode: SpiMode::mode1(),
            ..Default::default()
        };

        pinout::encoder::SPI1_SCK.init();
        pinout::encoder::SPI1_MISO.init();
        pinout::encoder::SPI1_MOSI.init();
        let mut cs_pin = pinout::encoder::SPI1_CS.init();
        cs_pin.set_high();

        let spi = Spi::new(spi_reg, spi_cfg, BaudRate::Div32);

        let mut encoder = EncoderSpi { spi, cs_pin };

        // Off-axis mounting correction, written once before the first
        // angle sample.
        encoder.transfer_word(CMD_WRITE | REG_BCT | BCT_VALUE);
        encoder.transfer_word(CMD_WRITE | REG_AXIS | AXIS_Y);

        encoder
    }

    fn transfer_word(&mut self, word: u16) -> u16 {
        let mut buf = word.to_be_bytes();
        self.cs_pin.set_low();
        let _ = self.spi.transfer(&mut buf);
        self.cs_pin.set_high();
        u16::from_be_bytes(buf)
    }

    /// Reads one raw 16-bit angle sample.
    pub fn read_raw(&mut self) -> u16 {
        self.transfer_word(0xFFFF)
    }
}
