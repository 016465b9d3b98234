//! Motor calibration procedures.
//!
//! Two independent procedures, both blocking and both bounded:
//!
//! * [`quadrants`] discovers the sensor-to-electrical-angle mapping by
//!   sweeping the rotor one full turn in each direction.
//! * [`limits`] discovers the mechanical travel envelope by driving the
//!   rotor into its hard stops at a configured search torque.
//!
//! Every internal loop carries a tick budget; a rotor that cannot complete
//! the motion surfaces as [`CalibrationError::Stalled`] instead of hanging
//! the control loop forever.

pub mod limits;
pub mod quadrants;

use crate::config::NUM_QUADRANTS;

/// Why a calibration procedure gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// The rotor did not complete the expected motion within the tick
    /// budget of one of the calibration phases.
    Stalled,
    /// Limit search requires a completed quadrant calibration.
    Uncalibrated,
    /// The discovered travel limits are closer together than the minimum
    /// span; the search result was discarded.
    DegenerateSpan,
}

/// Suppresses sensor noise at quadrant boundaries during a sweep.
///
/// While the rotor crosses a boundary the sensed quadrant can flicker
/// between the two neighbours. A sweep only ever moves in one known
/// direction, so any single-step regression (including the wrap between
/// quadrant 0 and the last quadrant) is held at the previously accepted
/// quadrant until the reading advances again.
pub struct QuadrantFilter {
    prev: usize,
    ascending: bool,
}

impl QuadrantFilter {
    pub fn new(start: usize, ascending: bool) -> Self {
        Self {
            prev: start,
            ascending,
        }
    }

    /// Feeds one sensed quadrant through the filter and returns the
    /// accepted quadrant.
    pub fn apply(&mut self, q: usize) -> usize {
        let last = NUM_QUADRANTS - 1;
        let q = if self.ascending {
            if (q != 0 || self.prev != last) && q < self.prev {
                self.prev
            } else if q == last && self.prev == 0 {
                self.prev
            } else {
                q
            }
        } else {
            if (q != last || self.prev != 0) && q > self.prev {
                self.prev
            } else if q == 0 && self.prev == last {
                self.prev
            } else {
                q
            }
        };
        self.prev = q;
        q
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascending_filter_holds_single_step_regressions() {
        let mut f = QuadrantFilter::new(4, true);
        assert_eq!(f.apply(5), 5);
        assert_eq!(f.apply(4), 5);
        assert_eq!(f.apply(5), 5);
        assert_eq!(f.apply(6), 6);
    }

    #[test]
    fn ascending_filter_accepts_the_forward_wrap() {
        let mut f = QuadrantFilter::new(NUM_QUADRANTS - 1, true);
        assert_eq!(f.apply(0), 0);
        // flicker back across the wrap is noise
        assert_eq!(f.apply(NUM_QUADRANTS - 1), 0);
        assert_eq!(f.apply(1), 1);
    }

    #[test]
    fn descending_filter_mirrors_the_sense() {
        let mut f = QuadrantFilter::new(1, false);
        assert_eq!(f.apply(0), 0);
        assert_eq!(f.apply(1), 0);
        assert_eq!(f.apply(NUM_QUADRANTS - 1), NUM_QUADRANTS - 1);
        // flicker forward across the wrap is noise
        assert_eq!(f.apply(0), NUM_QUADRANTS - 1);
    }
}
