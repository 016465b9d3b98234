use hal::{
    clocks::Clocks,
    pac::TIM2,
    timer::{
        Alignment, CaptureCompareDma, CountDir, OutputCompare, TimChannel, Timer, TimerConfig,
        UpdateReqSrc,
    },
};

use servo_algo::commutation::PWM_PERIOD;

use super::pinout;

/// Three-phase PWM on TIM2 channels 1..3. Duties arrive in algorithm
/// units (`0 ..= PWM_PERIOD`) and are rescaled onto the timer period.
pub struct TimPWM {
    tim: Timer<TIM2>,
}

impl TimPWM {
    pub fn new(tim2: TIM2, clock_cfg: &Clocks, freq: u16) -> Self {
        let mut timer = Timer::new_tim2(
            tim2,
            freq as f32,
            TimerConfig {
                one_pulse_mode: false,
                update_request_source: UpdateReqSrc::Any,
                auto_reload_preload: true,
                alignment: Alignment::Center1,
                capture_compare_dma: CaptureCompareDma::Update,
                direction: CountDir::Up,
            },
            clock_cfg,
        );
        timer.enable();

        TimPWM { tim: timer }
    }

    /// Enables the three phase outputs at zero duty and claims their pins.
    pub fn begin(&mut self) {
        self.tim
            .enable_pwm_output(TimChannel::C1, OutputCompare::Pwm1, 0.0);
        self.tim
            .enable_pwm_output(TimChannel::C2, OutputCompare::Pwm1, 0.0);
        self.tim
            .enable_pwm_output(TimChannel::C3, OutputCompare::Pwm1, 0.0);

        pinout::driver::PWM_U.init();
        pinout::driver::PWM_V.init();
        pinout::driver::PWM_W.init();
    }

    pub fn apply_duty(&mut self, duty: [u16; 3]) {
        let period = self.tim.get_max_duty();
        self.tim
            .set_duty(TimChannel::C1, Self::rescale(duty[0], period));
        self.tim
            .set_duty(TimChannel::C2, Self::rescale(duty[1], period));
        self.tim
            .set_duty(TimChannel::C3, Self::rescale(duty[2], period));
    }

    fn rescale(duty: u16, period: u32) -> u32 {
        let duty = (duty as u32).min(PWM_PERIOD as u32);
        duty * period / PWM_PERIOD as u32
    }
}
