//! Travel limit search: drives the rotor into both mechanical hard stops
//! at a configured search torque and stores the envelope, backed off by a
//! safety buffer, into the failsafe record.

use crate::commutation::drive_torque;
use crate::config::{
    ConfigRecord, FailsafeConfig, MIN_LIMIT_SPAN, TORQUE_LIMIT_MAX,
};
use crate::calibration::CalibrationError;
use crate::hardware::Board;
use crate::position::PositionTracker;

/// Parameters of one limit search.
#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    /// Torque clamp applied once a limit is violated. [`TORQUE_LIMIT_MAX`]
    /// requests no limiting and skips the search entirely.
    pub torque_limit: i32,
    /// Torque used to push the rotor into the stops.
    pub search_magnitude: i32,
    /// Reported-angle distance the stored limits are backed off from the
    /// physical stops.
    pub angle_buffer: i32,
}

impl SearchParams {
    /// The parameters a previous search left in the stored record.
    pub fn from_stored(failsafe: &FailsafeConfig) -> Self {
        Self {
            torque_limit: failsafe.torque_limit,
            search_magnitude: failsafe.torque_search_magnitude,
            angle_buffer: failsafe.angle_offset_buffer,
        }
    }
}

/// Samples averaged per plateau probe.
const AVG_SAMPLES: u32 = 100;
/// Samples used to settle the rotor between search phases.
const SETTLE_SAMPLES: u32 = 1000;
/// A stop must be reached within this many plateau probes.
const MAX_PLATEAU_ROUNDS: u32 = 10_000;
const MOVE_AWAY_TICKS: u32 = 1_000_000;

/// Runs the limit search and commits the result.
///
/// The envelope in the stored record is reset to its no-limit defaults
/// before any motion, so losing power mid-search cannot leave a
/// half-discovered envelope in effect. On any failure after that point the
/// defaults stay committed.
pub fn run<B: Board>(
    hw: &mut B,
    tracker: &mut PositionTracker,
    config: &mut ConfigRecord,
    params: SearchParams,
) -> Result<(), CalibrationError> {
    let mut record = *config;
    record.failsafe = FailsafeConfig::default();
    record.failsafe.torque_search_magnitude = params.search_magnitude;
    record.failsafe.angle_offset_buffer = params.angle_buffer;
    hw.commit_config(&record);
    *config = record;

    // Full-scale limit means the caller asked for no limiting; the
    // defaults just committed already express that.
    if params.torque_limit == TORQUE_LIMIT_MAX {
        return Ok(());
    }

    if !config.calibrated {
        return Err(CalibrationError::Uncalibrated);
    }

    let discard = |hw: &mut B, config: &mut ConfigRecord, err| {
        let mut safe = *config;
        safe.failsafe = FailsafeConfig::default();
        hw.commit_config(&safe);
        *config = safe;
        Err(err)
    };

    // Let the rotor settle, then push it into the positive stop.
    average_change(hw, tracker, config, 0, SETTLE_SAMPLES);
    average_change(hw, tracker, config, params.search_magnitude, SETTLE_SAMPLES);
    if seek_stop(hw, tracker, config, params.search_magnitude).is_err() {
        return discard(hw, config, CalibrationError::Stalled);
    }
    record.failsafe.max_angle = tracker.reported() - params.angle_buffer;
    info!("positive stop at {}", record.failsafe.max_angle);

    // Same for the negative stop.
    average_change(hw, tracker, config, 0, SETTLE_SAMPLES);
    average_change(hw, tracker, config, -params.search_magnitude, SETTLE_SAMPLES);
    if seek_stop(hw, tracker, config, -params.search_magnitude).is_err() {
        return discard(hw, config, CalibrationError::Stalled);
    }
    record.failsafe.min_angle = tracker.reported() + params.angle_buffer;
    info!("negative stop at {}", record.failsafe.min_angle);

    // Back off the lower stop so the limiter does not trip immediately.
    let mut moved_away = false;
    for _ in 0..MOVE_AWAY_TICKS {
        if tracker.reported() >= record.failsafe.min_angle {
            moved_away = true;
            break;
        }
        control_tick(hw, tracker, config, params.search_magnitude);
    }
    average_change(hw, tracker, config, 0, AVG_SAMPLES);
    if !moved_away {
        return discard(hw, config, CalibrationError::Stalled);
    }

    record.failsafe.torque_limit = params.torque_limit;

    // The buffers cancel in the span check, so this compares the physical
    // stop positions themselves.
    let span = (record.failsafe.max_angle + params.angle_buffer)
        - (record.failsafe.min_angle - params.angle_buffer);
    if span < MIN_LIMIT_SPAN {
        warn!("limit span {} too small, discarding", span);
        return discard(hw, config, CalibrationError::DegenerateSpan);
    }

    hw.commit_config(&record);
    *config = record;
    Ok(())
}

/// One torque-controlled tick: sample the sensor, drive, wait.
fn control_tick<B: Board>(
    hw: &mut B,
    tracker: &mut PositionTracker,
    config: &ConfigRecord,
    torque: i32,
) {
    let raw = hw.read_raw();
    tracker.update(raw, 1);
    drive_torque(hw, config, tracker.mech_angle(), torque);
    hw.delay_tick();
}

/// Drives at `torque` for `samples` ticks and returns the mean per-tick
/// change of the reported angle.
fn average_change<B: Board>(
    hw: &mut B,
    tracker: &mut PositionTracker,
    config: &ConfigRecord,
    torque: i32,
    samples: u32,
) -> i32 {
    let start = tracker.reported();
    for _ in 0..samples {
        control_tick(hw, tracker, config, torque);
    }
    (tracker.reported() - start) / samples as i32
}

/// Keeps probing until the rotor stops advancing in the drive direction.
fn seek_stop<B: Board>(
    hw: &mut B,
    tracker: &mut PositionTracker,
    config: &ConfigRecord,
    torque: i32,
) -> Result<(), CalibrationError> {
    for _ in 0..MAX_PLATEAU_ROUNDS {
        let avg = average_change(hw, tracker, config, torque, AVG_SAMPLES);
        if (torque > 0 && avg <= 0) || (torque < 0 && avg >= 0) {
            return Ok(());
        }
    }
    Err(CalibrationError::Stalled)
}
