use hal::{
    flash::{Bank, Flash},
    pac::FLASH,
};

use servo_algo::config::{ConfigRecord, CONFIG_WORDS};

/// Last 2KB page of the 128KB part, reserved for the configuration
/// record.
const CONFIG_PAGE: usize = 63;

/// Flash-backed configuration storage. A store erases the page and
/// rewrites the whole record, so readers only ever see a complete record
/// or blank flash.
pub struct FlashStore {
    flash: Flash,
}

impl FlashStore {
    pub fn new(regs: FLASH) -> Self {
        Self {
            flash: Flash::new(regs),
        }
    }

    pub fn load(&mut self) -> ConfigRecord {
        let mut bytes = [0u8; CONFIG_WORDS * 2];
        self.flash.read(Bank::B1, CONFIG_PAGE, 0, &mut bytes);

        if bytes.iter().all(|&b| b == 0xFF) {
            info!("config page blank, using defaults");
            return ConfigRecord::default();
        }

        let mut words = [0u16; CONFIG_WORDS];
        for (i, word) in words.iter_mut().enumerate() {
            *word = u16::from_le_bytes([bytes[2 * i], bytes[2 * i + 1]]);
        }
        ConfigRecord::from_words(&words)
    }

    pub fn store(&mut self, config: &ConfigRecord) {
        let words = config.to_words();
        let mut bytes = [0u8; CONFIG_WORDS * 2];
        for (i, word) in words.iter().enumerate() {
            bytes[2 * i..2 * i + 2].copy_from_slice(&word.to_le_bytes());
        }

        if self
            .flash
            .erase_write_page(Bank::B1, CONFIG_PAGE, &bytes)
            .is_err()
        {
            error!("config page write failed");
        }
    }
}
