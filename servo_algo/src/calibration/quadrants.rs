//! Quadrant sweep: builds the sensor-to-electrical-angle table.
//!
//! The rotor is dragged open-loop through one full mechanical turn forward
//! and one full turn backward while the drive angle at every sensor
//! quadrant boundary is recorded. Magnetic hysteresis makes the forward
//! and backward records differ by a constant lag, so the two passes are
//! averaged into the stored table.

use crate::calibration::{CalibrationError, QuadrantFilter};
use crate::commutation::drive_phases;
use crate::config::{QuadrantData, NUM_QUADRANTS, QUADRANT_DIV, SENSOR_PERIOD, UNVISITED_MIN};
use crate::hardware::Board;
use crate::math_integer::trigonometry::SIN_RANGE;
use crate::position::PositionTracker;

/// Drive power used while dragging the rotor. Half scale holds the rotor
/// firmly without overheating the windings during the slow sweep.
pub const CALIB_POWER: i32 = SIN_RANGE / 2;

/// Drive angle increment per tick while hunting for quadrant edges.
const STEP: i32 = 5;

const RAMP_STAGES: i32 = CALIB_POWER / 10;

// Tick budgets. A full mechanical turn takes on the order of 25k ticks at
// the sweep rate; anything past these bounds means the rotor is not
// following the field.
const DIRECTION_TICKS: u32 = 200_000;
const SWEEP_TICKS: u32 = 1_000_000;
const TRANSITION_TICKS: u32 = 100_000;

/// Result of a completed double sweep.
pub struct SweepOutcome {
    pub quadrants: [QuadrantData; NUM_QUADRANTS],
    /// Sensor angle increased while the drive angle increased.
    pub up: bool,
}

/// Runs the full double-sweep procedure. The PWM output is released (all
/// phases off) before returning, on success and on error alike.
pub fn run<B: Board>(
    hw: &mut B,
    tracker: &mut PositionTracker,
) -> Result<SweepOutcome, CalibrationError> {
    let mut sweeper = Sweeper {
        hw,
        tracker,
        drive: 0,
    };

    sweeper.ramp_up();

    let result = sweeper.run_sweeps();
    sweeper.release();
    result
}

struct Sweeper<'a, B: Board> {
    hw: &'a mut B,
    tracker: &'a mut PositionTracker,
    /// Unwrapped open-loop drive angle, in sine-period units.
    drive: i32,
}

impl<B: Board> Sweeper<'_, B> {
    fn run_sweeps(&mut self) -> Result<SweepOutcome, CalibrationError> {
        let up = self.detect_direction()?;
        debug!("sweep direction detected: up={}", up);

        let forward = self.sweep(up, STEP * 2)?;
        self.reverse_transition(up)?;
        let backward = self.sweep(!up, -(STEP * 2))?;

        let mut quadrants = [QuadrantData::default(); NUM_QUADRANTS];
        for (i, q) in quadrants.iter_mut().enumerate() {
            q.min_angle = (forward[i].min_angle + backward[i].min_angle) / 2;
            q.max_angle = (forward[i].max_angle + backward[i].max_angle) / 2;
            q.range = q.max_angle - q.min_angle;
        }
        Ok(SweepOutcome { quadrants, up })
    }

    /// One control tick: wait, sample the sensor, return the mechanical
    /// angle.
    fn sample(&mut self) -> i32 {
        self.hw.delay_tick();
        let raw = self.hw.read_raw();
        self.tracker.update(raw, 1);
        self.tracker.mech_angle()
    }

    fn advance(&mut self, delta: i32) {
        self.drive += delta;
        drive_phases(self.hw, self.drive, CALIB_POWER);
    }

    /// Gently pulls the rotor to the zero drive angle.
    fn ramp_up(&mut self) {
        for p in 0..RAMP_STAGES {
            self.hw.delay_tick();
            drive_phases(self.hw, 0, p * 10);
        }
    }

    /// Ramps the drive power back down and turns the phases off.
    fn release(&mut self) {
        for p in (1..=RAMP_STAGES).rev() {
            self.hw.delay_tick();
            drive_phases(self.hw, self.drive, p * 10);
        }
        drive_phases(self.hw, 0, 0);
    }

    /// Creeps forward until four distinct quadrants have been seen, then
    /// decides the rotation sense from the shorter circular path between
    /// the first and last sensor readings.
    fn detect_direction(&mut self) -> Result<bool, CalibrationError> {
        let first = self.sample();
        let mut seen = [-1i32; 3];
        for _ in 0..DIRECTION_TICKS {
            let sensor = self.sample();
            let q = sensor / QUADRANT_DIV;

            if seen[0] == -1 {
                seen[0] = q;
            } else if seen[1] == -1 && seen[0] != q {
                seen[1] = q;
            } else if seen[2] == -1 && seen[0] != q && seen[1] != q {
                seen[2] = q;
            } else if seen[0] != q && seen[1] != q && seen[2] != q {
                let up = if sensor > first {
                    sensor - first < first + (SENSOR_PERIOD - sensor)
                } else {
                    first - sensor >= sensor + (SENSOR_PERIOD - first)
                };
                return Ok(up);
            }

            self.advance(STEP);
        }
        Err(CalibrationError::Stalled)
    }

    /// One full mechanical turn, recording the drive angle extremes seen
    /// in every sensor quadrant. `ascending` is the direction the quadrant
    /// index moves during this pass.
    fn sweep(
        &mut self,
        ascending: bool,
        delta: i32,
    ) -> Result<[QuadrantData; NUM_QUADRANTS], CalibrationError> {
        let mut table = [QuadrantData::default(); NUM_QUADRANTS];
        for q in table.iter_mut() {
            q.min_angle = UNVISITED_MIN;
            q.max_angle = -UNVISITED_MIN;
        }

        let start = (self.tracker.mech_angle() / QUADRANT_DIV) as usize;
        let mut filter = QuadrantFilter::new(start, ascending);
        let mut first_q = -1i32;
        let mut away_from_first = false;

        for _ in 0..SWEEP_TICKS {
            let mech = self.sample();
            let q = filter.apply((mech / QUADRANT_DIV) as usize) as i32;
            if first_q == -1 {
                first_q = q;
            }

            away_from_first |= (q - first_q).unsigned_abs() == NUM_QUADRANTS as u32 / 2;
            if away_from_first && q == first_q {
                for qd in table.iter_mut() {
                    if qd.min_angle == UNVISITED_MIN {
                        return Err(CalibrationError::Stalled);
                    }
                    qd.range = qd.max_angle - qd.min_angle;
                }
                return Ok(table);
            }

            let qd = &mut table[q as usize];
            if qd.min_angle > self.drive {
                qd.min_angle = self.drive;
            }
            if qd.max_angle < self.drive {
                qd.max_angle = self.drive;
            }

            self.advance(delta);
        }
        Err(CalibrationError::Stalled)
    }

    /// Between the two passes: one quadrant further in the sweep
    /// direction, then back, so the backward pass starts settled against
    /// the reversed hysteresis.
    fn reverse_transition(&mut self, up: bool) -> Result<(), CalibrationError> {
        let n = NUM_QUADRANTS as i32;
        let q = self.tracker.mech_angle() / QUADRANT_DIV;
        let (q_forth, q_back) = if up {
            ((q + 1) % n, (q + n - 1) % n)
        } else {
            ((q + n - 1) % n, (q + 1) % n)
        };

        let mut reached = false;
        for _ in 0..TRANSITION_TICKS {
            if self.sample() / QUADRANT_DIV == q_forth {
                reached = true;
                break;
            }
            self.advance(STEP * 2);
        }
        if !reached {
            return Err(CalibrationError::Stalled);
        }

        for _ in 0..TRANSITION_TICKS {
            if self.sample() / QUADRANT_DIV == q_back {
                return Ok(());
            }
            self.advance(-(STEP * 2));
        }
        Err(CalibrationError::Stalled)
    }
}
