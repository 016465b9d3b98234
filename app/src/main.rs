#![no_main]
#![no_std]

use defmt_rtt as _;
use panic_probe as _;

use hal::{
    self,
    clocks::Clocks,
    gpio::{self, Edge, Pin},
    pac,
};

use servo_algo::{
    config::ConfigRecord,
    events::{Event, EventQueue},
    hardware::{ConfigStore, Indicators, PositionSensor, PwmOutput, Ticker},
    ServoController,
};

use cortex_m;

/// Control loop rate in Hz, shared by the PWM timer and the tick delay.
const TICK_FREQ: u32 = 20_000;

/// Core cycles per control tick at the default 170 MHz sysclk.
const CYCLES_PER_TICK: u32 = 170_000_000 / TICK_FREQ;

/// Indicator blink half-period, in control ticks.
const BLINK_TICKS: u32 = 4096;

/// Longest accepted command frame, address and newline included.
const LINE_CAP: usize = 64;

/// Pending ISR events the idle loop has not drained yet.
const EVENT_CAP: usize = 32;

#[rtic::app(device = pac, peripherals = true, dispatchers = [TIM7])]
mod app {
    use super::*;

    use servo_drivers::{
        encoder_spi::EncoderSpi, flash_store::FlashStore, pinout, pwm::TimPWM, serial::SerialPort,
    };

    /// All peripherals the control core talks to, bundled behind its
    /// hardware traits. Owned by the idle loop through the controller.
    pub struct ServoBoard {
        pwm: TimPWM,
        encoder: EncoderSpi,
        store: FlashStore,
        calib_led: Pin,
        id_led: Pin,
        calib_blink: bool,
        id_blink: bool,
        blink_phase: bool,
        blink_counter: u32,
    }

    impl ServoBoard {
        fn service_leds(&mut self) {
            self.blink_counter += 1;
            if self.blink_counter < BLINK_TICKS {
                return;
            }
            self.blink_counter = 0;
            self.blink_phase = !self.blink_phase;

            if self.calib_blink && self.blink_phase {
                self.calib_led.set_high();
            } else {
                self.calib_led.set_low();
            }
            if self.id_blink && self.blink_phase {
                self.id_led.set_high();
            } else {
                self.id_led.set_low();
            }
        }
    }

    impl PositionSensor for ServoBoard {
        fn read_raw(&mut self) -> u16 {
            self.encoder.read_raw()
        }
    }

    impl PwmOutput for ServoBoard {
        fn set_duty(&mut self, duty: [u16; 3]) {
            self.pwm.apply_duty(duty);
        }
    }

    impl Ticker for ServoBoard {
        fn delay_tick(&mut self) {
            cortex_m::asm::delay(CYCLES_PER_TICK);
            self.service_leds();
        }
    }

    impl ConfigStore for ServoBoard {
        fn load_config(&mut self) -> ConfigRecord {
            self.store.load()
        }

        fn commit_config(&mut self, config: &ConfigRecord) {
            self.store.store(config);
        }
    }

    impl Indicators for ServoBoard {
        fn set_calibration_indicator(&mut self, on: bool) {
            self.calib_blink = on;
            if !on {
                self.calib_led.set_low();
            }
        }

        fn set_identity_indicator(&mut self, on: bool) {
            self.id_blink = on;
            if !on {
                self.id_led.set_low();
            }
        }
    }

    #[shared]
    struct Shared {
        events: EventQueue<EVENT_CAP>,
        serial: SerialPort,
    }

    #[local]
    struct Local {
        servo: ServoController<ServoBoard>,
    }

    #[init]
    fn init(ctx: init::Context) -> (Shared, Local) {
        let dp = ctx.device;
        let clock_cfg = Clocks::default();
        clock_cfg.setup().unwrap();
        defmt::debug!(
            "SYSTEM: clock frequency is {} MHz",
            clock_cfg.sysclk() / 1_000_000
        );

        init_driver_pins();

        let mut pwm = TimPWM::new(dp.TIM2, &clock_cfg, TICK_FREQ as u16);
        pwm.begin();

        let encoder = EncoderSpi::new(dp.SPI1);
        let store = FlashStore::new(dp.FLASH);
        let serial = SerialPort::new(dp.USART1, &clock_cfg);

        init_buttons();

        let board = ServoBoard {
            pwm,
            encoder,
            store,
            calib_led: pinout::led::CALIB.init(),
            id_led: pinout::led::ID.init(),
            calib_blink: false,
            id_blink: false,
            blink_phase: false,
            blink_counter: 0,
        };

        let servo = ServoController::new(board);
        defmt::info!("SYSTEM: controller id {:02x}", servo.controller_id());

        (
            Shared {
                events: EventQueue::new(),
                serial,
            },
            Local { servo },
        )
    }

    fn init_driver_pins() {
        let mut dr_reset = pinout::driver::RESET.init();
        dr_reset.set_high();
        let mut dr_en = pinout::driver::ENABLE.init();
        dr_en.set_high();
    }

    fn init_buttons() {
        let mut calibrate = pinout::buttons::CALIBRATE.init();
        calibrate.enable_interrupt(Edge::Rising);
        let mut identity = pinout::buttons::IDENTITY.init();
        identity.enable_interrupt(Edge::Rising);
    }

    #[idle(shared = [events, serial], local = [servo])]
    fn idle(mut cx: idle::Context) -> ! {
        let servo = cx.local.servo;
        let mut line = [0u8; LINE_CAP];
        let mut line_len = 0usize;

        loop {
            servo.tick(1);

            while let Some(event) = cx.shared.events.lock(|queue| queue.pop()) {
                match event {
                    Event::SerialByte(byte) => {
                        if line_len < LINE_CAP {
                            line[line_len] = byte;
                            line_len += 1;
                        } else {
                            // Overlong frame; discard it wholesale.
                            line_len = 0;
                            continue;
                        }
                        if byte == b'\n' {
                            if let Some(reply) = servo.handle_frame(&line[..line_len]) {
                                cx.shared.serial.lock(|port| port.write_line(reply.as_bytes()));
                            }
                            line_len = 0;
                        }
                    }
                    Event::CalibrateButton => {
                        defmt::info!("BUTTON: calibration requested");
                        if let Err(err) = servo.calibrate() {
                            defmt::warn!("calibration failed: {}", err);
                        }
                    }
                    Event::IdentityButton => {
                        let id = servo.increment_controller_id();
                        defmt::info!("BUTTON: controller id now {:02x}", id);
                    }
                }
            }

            cortex_m::asm::delay(CYCLES_PER_TICK);
        }
    }

    #[task(binds = USART1, shared = [serial, events], priority = 2)]
    fn usart_rx(cx: usart_rx::Context) {
        (cx.shared.serial, cx.shared.events).lock(|port, queue| {
            port.clear_rx_interrupt();
            let byte = port.read_byte();
            if !queue.push(Event::SerialByte(byte)) {
                defmt::warn!("RX: event queue full, byte dropped");
            }
        });
    }

    #[task(binds = EXTI2, shared = [events], priority = 2)]
    fn calibrate_button(mut cx: calibrate_button::Context) {
        gpio::clear_exti_interrupt(2);
        cx.shared.events.lock(|queue| {
            if !queue.push(Event::CalibrateButton) {
                defmt::warn!("BUTTON: event queue full, press dropped");
            }
        });
    }

    #[task(binds = EXTI3, shared = [events], priority = 2)]
    fn identity_button(mut cx: identity_button::Context) {
        gpio::clear_exti_interrupt(3);
        cx.shared.events.lock(|queue| {
            if !queue.push(Event::IdentityButton) {
                defmt::warn!("BUTTON: event queue full, press dropped");
            }
        });
    }
}

#[defmt::panic_handler]
fn panic() -> ! {
    cortex_m::asm::udf()
}
