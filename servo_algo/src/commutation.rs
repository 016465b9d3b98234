//! Three-phase sinusoidal commutation from an electrical angle and a signed
//! torque magnitude.

use crate::angle_mapper::electrical_degrees;
use crate::config::ConfigRecord;
use crate::hardware::PwmOutput;
use crate::math_integer::trigonometry::{isin, SIN_PERIOD, SIN_RANGE, SIN_ZERO};

/// PWM timer period in duty units; chosen so full power at full sine
/// amplitude lands just inside the timer range (~20kHz on the reference
/// hardware).
pub const TIMER_SCALE: i32 = 7;
pub const PWM_PERIOD: i32 = SIN_RANGE / TIMER_SCALE;

/// Electrical quadrature offset: 90 degrees leads/lags the rotor field so a
/// torque scalar becomes correct-phase drive.
pub const QUARTER_TURN: i32 = SIN_PERIOD / 4;

const PHASE_B: i32 = SIN_PERIOD / 3;
const PHASE_C: i32 = SIN_PERIOD * 2 / 3;

/// Computes the three phase duty cycles for one electrical angle and power.
///
/// Phases sit at 0/120/240 degrees electrical, biased to mid-scale and
/// scaled by `power` against the sine full scale. Negative power drives the
/// 180-degree-shifted (complementary) waveform. Output is clamped to the
/// timer's valid range.
pub fn phase_duties(angle: i32, power: i32) -> [u16; 3] {
    let (angle, power) = if power < 0 {
        (angle + SIN_PERIOD / 2, -power)
    } else {
        (angle, power)
    };

    let duty = |phase_angle: i32| {
        let level = (isin(phase_angle) + SIN_ZERO) * power / SIN_RANGE / TIMER_SCALE;
        level.clamp(0, PWM_PERIOD) as u16
    };

    [duty(angle), duty(angle + PHASE_B), duty(angle + PHASE_C)]
}

/// Writes one commutation step to the PWM peripheral.
pub fn drive_phases<B: PwmOutput>(pwm: &mut B, angle: i32, power: i32) {
    pwm.set_duty(phase_duties(angle, power));
}

/// Open-loop torque drive: maps the mechanical angle through the calibration
/// table and advances (torque > 0) or retards (torque < 0) the field by 90
/// degrees electrical, driving with the torque magnitude.
pub fn drive_torque<B: PwmOutput>(pwm: &mut B, config: &ConfigRecord, mech_angle: i32, torque: i32) {
    let angle = electrical_degrees(mech_angle, config);
    if torque > 0 {
        drive_phases(pwm, angle + QUARTER_TURN, torque);
    } else {
        drive_phases(pwm, angle - QUARTER_TURN, -torque);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TORQUE_LIMIT_MAX;

    #[test]
    fn zero_power_yields_zero_duty_on_all_channels() {
        for angle in (0..SIN_PERIOD).step_by(997) {
            assert_eq!(phase_duties(angle, 0), [0, 0, 0]);
        }
    }

    #[test]
    fn negative_power_is_the_half_period_shifted_waveform() {
        for angle in (0..SIN_PERIOD).step_by(311) {
            for power in [100, 2048, TORQUE_LIMIT_MAX] {
                assert_eq!(
                    phase_duties(angle, -power),
                    phase_duties(angle + SIN_PERIOD / 2, power)
                );
            }
        }
    }

    #[test]
    fn full_power_stays_inside_the_timer_range() {
        for angle in 0..SIN_PERIOD {
            for duty in phase_duties(angle, TORQUE_LIMIT_MAX) {
                assert!((duty as i32) <= PWM_PERIOD);
            }
        }
    }

    #[test]
    fn phases_are_a_third_of_a_period_apart() {
        let power = 4096;
        for angle in (0..SIN_PERIOD).step_by(41) {
            let here = phase_duties(angle, power);
            assert_eq!(here[1], phase_duties(angle + PHASE_B, power)[0]);
            assert_eq!(here[2], phase_duties(angle + PHASE_C, power)[0]);
        }
    }
}
