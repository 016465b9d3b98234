//! Mechanical-to-electrical angle mapping through the calibration table.

use crate::config::{ConfigRecord, QUADRANT_DIV, SENSOR_PERIOD};

/// Maps a mechanical sensor angle onto the electrical commutation angle.
///
/// The angle is normalized into the sensor period, its quadrant looked up,
/// and the position within the quadrant linearly interpolated onto the
/// quadrant's recorded drive-angle span. When the sensor runs opposite the
/// drive direction the interpolation is mirrored from the span's top end.
///
/// Precondition: `config.calibrated == true`. An uncalibrated table has
/// zero-range quadrants and maps everything onto the recorded endpoints;
/// the calibrators guarantee this never reaches torque service.
pub fn electrical_degrees(mech_angle: i32, config: &ConfigRecord) -> i32 {
    let angle = mech_angle & (SENSOR_PERIOD - 1);
    let q = (angle / QUADRANT_DIV) as usize;
    let quadrant = &config.quadrants[q];
    let qstart = q as i32 * QUADRANT_DIV;

    if config.up {
        quadrant.min_angle + (angle - qstart) * quadrant.range / QUADRANT_DIV
    } else {
        quadrant.max_angle - (angle - qstart) * quadrant.range / QUADRANT_DIV
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{QuadrantData, NUM_QUADRANTS};

    /// Table where each quadrant spans `width` drive units, contiguously.
    fn even_table(width: i32, up: bool) -> ConfigRecord {
        let mut config = ConfigRecord::default();
        config.up = up;
        config.calibrated = true;
        for (i, q) in config.quadrants.iter_mut().enumerate() {
            q.min_angle = i as i32 * width;
            q.max_angle = (i as i32 + 1) * width;
            q.range = width;
        }
        config
    }

    #[test]
    fn monotonic_within_quadrant_and_continuous_at_boundaries() {
        let config = even_table(7168, true); // 7 pole pairs worth of drive
        let mut prev = electrical_degrees(0, &config);
        for angle in 1..SENSOR_PERIOD {
            let cur = electrical_degrees(angle, &config);
            assert!(cur >= prev, "regression at angle {}", angle);
            // One quantization step of the interpolation is range/div = 7.
            assert!(cur - prev <= 7 + 1, "jump at angle {}", angle);
            prev = cur;
        }
    }

    #[test]
    fn reversed_direction_mirrors_interpolation() {
        // Down-sense table: drive angle decreases as the sensor advances.
        let width = 7168;
        let mut config = ConfigRecord::default();
        config.up = false;
        config.calibrated = true;
        for (i, q) in config.quadrants.iter_mut().enumerate() {
            q.min_angle = (NUM_QUADRANTS - 1 - i) as i32 * width;
            q.max_angle = (NUM_QUADRANTS - i) as i32 * width;
            q.range = width;
        }

        assert_eq!(electrical_degrees(0, &config), config.quadrants[0].max_angle);
        let mut prev = electrical_degrees(0, &config);
        for angle in 1..SENSOR_PERIOD {
            let cur = electrical_degrees(angle, &config);
            assert!(cur <= prev, "increase at angle {}", angle);
            assert!(prev - cur <= 7 + 1, "jump at angle {}", angle);
            prev = cur;
        }
    }

    #[test]
    fn wraps_out_of_range_input_into_sensor_period() {
        let config = even_table(1024, true);
        for angle in [-1, SENSOR_PERIOD, 3 * SENSOR_PERIOD + 100, -SENSOR_PERIOD - 1] {
            let folded = angle & (SENSOR_PERIOD - 1);
            assert_eq!(
                electrical_degrees(angle, &config),
                electrical_degrees(folded, &config)
            );
        }
    }
}
