//! Fixed-point sine for commutation. Integer only, so the control loop
//! timing is deterministic.

/// Full sine period in angle units (2^15 per electrical circle).
pub const SIN_PERIOD: i32 = 1 << 15;

/// Output amplitude, Q12: `isin` returns -4096..=4096.
pub const SIN_AMPLITUDE: i32 = 1 << 12;

/// Peak-to-peak output range.
pub const SIN_RANGE: i32 = SIN_AMPLITUDE * 2;

/// Mid-scale bias that shifts `isin` output into the unsigned duty domain.
pub const SIN_ZERO: i32 = SIN_RANGE / 2;

// Odd quintic coefficients for sin(pi/2 * z), z in [0, 1], all Q15:
// sin(pi/2 * z) ~ 1.570781*z - 0.643229*z^3 + 0.072710*z^5.
const C1: i32 = 51472;
const C2: i32 = 21079;
const C3: i32 = 2383;

/// Sine approximation over one full period of 2^15 angle units.
///
/// The angle is reduced to a quarter wave by odd/mirror symmetry and the
/// quarter wave is evaluated as an odd fifth-order polynomial:
/// input quarter-angle is Q13 (8192 = quarter turn), coefficients are Q15,
/// the Q13*Q15 product is shifted down 16 to a Q12 result.
///
/// Worst-case error is 1 LSB of the Q12 scale (~0.024% of full scale).
/// Accepts any angle; the period wraps via the low 15 bits.
pub const fn isin(angle: i32) -> i32 {
    let mut x = angle & (SIN_PERIOD - 1);

    // Second half-period is the negated first half.
    let neg = x >= SIN_PERIOD / 2;
    if neg {
        x -= SIN_PERIOD / 2;
    }
    // Second quarter mirrors the first.
    if x > SIN_PERIOD / 4 {
        x = SIN_PERIOD / 2 - x;
    }

    let z2 = (x * x) >> 13;
    let inner = (z2 * (C2 - ((z2 * C3) >> 13))) >> 13;
    let mut y = (x * (C1 - inner)) >> 16;
    if y > SIN_AMPLITUDE {
        y = SIN_AMPLITUDE;
    }

    if neg {
        -y
    } else {
        y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f64::consts::TAU;

    fn reference(angle: i32) -> f64 {
        libm::sin(angle as f64 / SIN_PERIOD as f64 * TAU) * SIN_AMPLITUDE as f64
    }

    #[test]
    fn anchors() {
        assert_eq!(isin(0), 0);
        assert_eq!(isin(SIN_PERIOD / 4), SIN_AMPLITUDE);
        assert_eq!(isin(SIN_PERIOD / 2), 0);
        assert_eq!(isin(3 * SIN_PERIOD / 4), -SIN_AMPLITUDE);
    }

    #[test]
    fn error_within_a_tenth_percent_of_full_scale() {
        let bound = SIN_AMPLITUDE as f64 * 0.001;
        for angle in 0..SIN_PERIOD {
            let err = (isin(angle) as f64 - reference(angle)).abs();
            assert!(err <= bound, "angle {}: err {}", angle, err);
        }
    }

    #[test]
    fn odd_symmetry_and_wrapping() {
        for angle in (0..SIN_PERIOD).step_by(13) {
            assert_eq!(isin(angle), -isin(angle + SIN_PERIOD / 2));
            assert_eq!(isin(angle), isin(angle + SIN_PERIOD));
            assert_eq!(isin(angle), isin(angle - 3 * SIN_PERIOD));
        }
    }
}
