//! Continuous-angle tracking from the wrapping 16-bit absolute sensor.

/// Unwraps sensor samples into an unbounded signed angle and derives the
/// zero-referenced reported angle plus velocity/acceleration telemetry.
///
/// The unwrap relies on the signed-wraparound convention: the difference
/// between a new sample and the low 16 bits of the accumulator, reduced to
/// `i16`, is always in (-32768, 32767], so any true per-sample motion of
/// less than half a turn reconstructs exactly.
pub struct PositionTracker {
    /// Unbounded accumulator of sensor motion. Never re-wrapped.
    tracked: i32,
    /// Reference captured at boot or on the zero command.
    startup: i32,
    /// `tracked - startup`.
    reported: i32,
    /// Latest 15-bit mechanical angle for commutation (raw sample >> 1).
    mech_angle: i32,
    last_velocity: i32,
    /// Running maximum acceleration since last telemetry read, byte-clamped.
    max_accel: u8,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self {
            tracked: 0,
            startup: 0,
            reported: 0,
            mech_angle: 0,
            last_velocity: 0,
            max_accel: 0,
        }
    }

    /// Boot-time (or zero-command) initialization: adopt the sample as both
    /// accumulator and reference, so the reported angle starts at zero.
    pub fn seed(&mut self, raw: u16) {
        self.tracked = raw as i32;
        self.startup = self.tracked;
        self.reported = 0;
        self.mech_angle = (raw >> 1) as i32;
        self.last_velocity = 0;
    }

    /// Folds one sensor sample into the tracked angle. `elapsed` is the
    /// number of control ticks since the previous update (telemetry only).
    /// Returns the 15-bit mechanical angle of this sample.
    pub fn update(&mut self, raw: u16, elapsed: i32) -> i32 {
        let diff = raw.wrapping_sub(self.tracked as u16) as i16 as i32;
        self.tracked = self.tracked.wrapping_add(diff);
        self.reported = self.tracked.wrapping_sub(self.startup);

        let dt = elapsed.max(1);
        let velocity = diff / dt;
        let accel = ((velocity - self.last_velocity).abs() / dt).min(0xFF) as u8;
        self.last_velocity = velocity;
        if accel > self.max_accel {
            self.max_accel = accel;
        }

        self.mech_angle = (raw >> 1) as i32;
        self.mech_angle
    }

    /// Re-captures the zero reference at the current position.
    pub fn zero(&mut self) {
        self.startup = self.tracked;
        self.reported = 0;
    }

    /// Continuous position relative to the zero reference.
    pub fn reported(&self) -> i32 {
        self.reported
    }

    /// Latest 15-bit mechanical angle (commutation domain).
    pub fn mech_angle(&self) -> i32 {
        self.mech_angle
    }

    /// Unbounded tracked angle (sensor units).
    pub fn tracked(&self) -> i32 {
        self.tracked
    }

    /// Peak acceleration since the previous call, then resets the peak.
    pub fn take_max_accel(&mut self) -> u8 {
        let peak = self.max_accel;
        self.max_accel = 0;
        peak
    }
}

impl Default for PositionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwrap_reconstructs_path_across_wraps() {
        let mut tracker = PositionTracker::new();
        tracker.seed(60_000);

        // March forward 200 units per sample, crossing the 16-bit wrap
        // several times; 5000 samples = 1_000_000 units of true travel.
        let mut truth: i64 = 60_000;
        for _ in 0..5000 {
            truth += 200;
            tracker.update(truth as u16, 1);
        }
        assert_eq!(tracker.tracked() as i64, truth);
        assert_eq!(tracker.reported() as i64, truth - 60_000);

        // And back down across the wrap the other way.
        for _ in 0..7000 {
            truth -= 331;
            tracker.update((truth as i64 as u64 & 0xFFFF) as u16, 1);
        }
        assert_eq!(tracker.tracked() as i64, truth);
    }

    #[test]
    fn zero_rebases_reported_angle() {
        let mut tracker = PositionTracker::new();
        tracker.seed(1000);
        tracker.update(3000, 1);
        assert_eq!(tracker.reported(), 2000);

        tracker.zero();
        assert_eq!(tracker.reported(), 0);
        tracker.update(2500, 1);
        assert_eq!(tracker.reported(), -500);
    }

    #[test]
    fn mech_angle_is_fifteen_bit() {
        let mut tracker = PositionTracker::new();
        tracker.seed(0);
        assert_eq!(tracker.update(0xFFFF, 1), 0x7FFF);
        assert_eq!(tracker.update(2, 1), 1);
    }

    #[test]
    fn max_accel_clamps_and_resets() {
        let mut tracker = PositionTracker::new();
        tracker.seed(0);
        tracker.update(20_000, 1); // huge step, accel clamps to 255
        assert_eq!(tracker.take_max_accel(), 0xFF);
        assert_eq!(tracker.take_max_accel(), 0);
    }
}
