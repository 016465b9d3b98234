#![cfg_attr(not(test), no_std)]

// must come first so the log macros are visible everywhere
mod fmt;

pub mod angle_mapper;
pub mod calibration;
pub mod commutation;
pub mod config;
pub mod events;
pub mod hardware;
pub mod math_integer;
pub mod position;
pub mod protocol;

use calibration::limits::{self, SearchParams};
use calibration::{quadrants, CalibrationError};
use commutation::drive_torque;
use config::{ConfigRecord, TORQUE_LIMIT_MAX};
use hardware::Board;
use position::PositionTracker;
use protocol::{Command, BROADCAST_ID, MAINBOARD_ID};

/// The servo controller: owns the board, the position tracker and the
/// active configuration, and exposes one entry point per operation the
/// serial protocol and the panel buttons can trigger.
pub struct ServoController<B: Board> {
    hw: B,
    tracker: PositionTracker,
    config: ConfigRecord,
    torque_command: i32,
    /// Travel limits have been searched (or explicitly disabled) since
    /// the angle reference was last trustworthy.
    failsafe_calibrated: bool,
}

impl<B: Board> ServoController<B> {
    pub fn new(mut hw: B) -> Self {
        let config = hw.load_config();
        let mut tracker = PositionTracker::new();
        tracker.seed(hw.read_raw());

        let mut controller = Self {
            hw,
            tracker,
            config,
            torque_command: 0,
            failsafe_calibrated: false,
        };
        controller.ensure_configured();
        controller
    }

    /// One pass of the control loop: sample the sensor, integrate the
    /// position and drive the commanded torque through the failsafe
    /// clamp. `elapsed` is the tick count since the previous call.
    pub fn tick(&mut self, elapsed: i32) {
        let raw = self.hw.read_raw();
        self.tracker.update(raw, elapsed);
        let torque = self.limited_torque();
        drive_torque(
            &mut self.hw,
            &self.config,
            self.tracker.mech_angle(),
            torque,
        );
    }

    /// The commanded torque, clamped when the reported angle sits past a
    /// travel limit. The stored limit torque is signed toward the
    /// violated limit, so a negative limit actively pushes back.
    fn limited_torque(&self) -> i32 {
        let torque = self.torque_command;
        if !self.failsafe_calibrated || self.config.failsafe.torque_limit == TORQUE_LIMIT_MAX {
            return torque;
        }
        let limit = self.config.failsafe.torque_limit;
        if self.tracker.reported() > self.config.failsafe.max_angle {
            torque.min(limit)
        } else if self.tracker.reported() < self.config.failsafe.min_angle {
            torque.max(-limit)
        } else {
            torque
        }
    }

    /// Refreshes the panel indicators: blinking signals a missing
    /// calibration or a missing controller id.
    pub fn ensure_configured(&mut self) {
        self.failsafe_calibrated =
            self.failsafe_calibrated || self.config.failsafe.torque_limit == TORQUE_LIMIT_MAX;
        let calib_configured = self.config.calibrated && self.failsafe_calibrated;
        let id_configured = self.config.controller_id != 0 && self.config.controller_id != -1;
        self.hw.set_calibration_indicator(!calib_configured);
        self.hw.set_identity_indicator(!id_configured);
    }

    /// Executes one decoded serial command. Returns false when the
    /// command was rejected, which makes the frame answer with an error
    /// line.
    pub fn execute(&mut self, command: Command) -> bool {
        match command {
            Command::Torque(value) => self.set_torque_command(value),
            Command::ZeroAngle => {
                self.zero_position();
                true
            }
            Command::FailsafeSearch {
                torque_limit,
                search_magnitude,
                angle_buffer,
            } => self
                .calibrate_failsafe(SearchParams {
                    torque_limit,
                    search_magnitude,
                    angle_buffer,
                })
                .is_ok(),
            Command::SetIdentity(id) => self.set_controller_id(id),
            Command::Calibrate => self.calibrate().is_ok(),
            Command::ResetConfig => {
                self.reset_config();
                true
            }
            Command::Ping => true,
        }
    }

    /// Whether a received frame address selects this controller.
    pub fn addressed_by(&self, addr: u8) -> bool {
        addr == BROADCAST_ID || addr as i32 == self.config.controller_id
    }

    /// Processes one received line end to end. Returns the reply to
    /// transmit, or None when the frame addresses another controller or
    /// carries no valid address at all.
    pub fn handle_frame(&mut self, line: &[u8]) -> Option<protocol::Reply> {
        let (addr, tail) = protocol::frame_address(line)?;
        if !self.addressed_by(addr) {
            return None;
        }

        let mut ok = true;
        for command in protocol::CommandParser::new(tail) {
            ok = match command {
                Ok(command) => self.execute(command),
                Err(()) => false,
            };
        }

        Some(if ok {
            let (id, max_accel, reported) = self.state_report();
            protocol::Reply::State(protocol::encode_state(id, max_accel, reported))
        } else {
            warn!("rejected serial frame");
            protocol::Reply::Error(protocol::encode_error(self.controller_id()))
        })
    }

    /// Sets the held torque command. Rejected (and the command cleared)
    /// until both calibrations have completed, so a torque sent to an
    /// unconfigured controller cannot move the motor.
    pub fn set_torque_command(&mut self, torque: i32) -> bool {
        if !self.config.calibrated || !self.failsafe_calibrated {
            self.torque_command = 0;
            return false;
        }
        self.torque_command = torque;
        true
    }

    /// Re-zeroes the reported angle at the current rotor position.
    ///
    /// Being told where zero is carries the same information a limit
    /// search recovers, so if the stored envelope is real (neither the
    /// factory defaults nor erased flash) the failsafe is considered
    /// calibrated again without a new search.
    pub fn zero_position(&mut self) {
        let raw = self.hw.read_raw();
        self.tracker.seed(raw);

        let failsafe = &self.config.failsafe;
        let at_defaults = failsafe.max_angle == config::DEFAULT_MAX_ANGLE
            && failsafe.min_angle == -config::DEFAULT_MAX_ANGLE;
        let erased = failsafe.max_angle == 0 && failsafe.min_angle == 0;
        if !at_defaults && !erased {
            self.failsafe_calibrated = true;
        }
        self.ensure_configured();
    }

    /// Runs the quadrant sweep and persists the result. The stored
    /// controller id and failsafe record survive. If the failsafe is not
    /// yet calibrated, a limit search with the stored parameters follows
    /// automatically.
    pub fn calibrate(&mut self) -> Result<(), CalibrationError> {
        self.torque_command = 0;
        info!("quadrant calibration started");

        let outcome = quadrants::run(&mut self.hw, &mut self.tracker)?;
        self.config.quadrants = outcome.quadrants;
        self.config.up = outcome.up;
        self.config.calibrated = true;
        self.hw.commit_config(&self.config);
        info!("quadrant calibration done, up={}", self.config.up);

        let result = if self.failsafe_calibrated {
            Ok(())
        } else {
            let params = SearchParams::from_stored(&self.config.failsafe);
            limits::run(&mut self.hw, &mut self.tracker, &mut self.config, params)
        };
        self.failsafe_calibrated = result.is_ok();
        self.ensure_configured();
        result
    }

    /// Runs a limit search with explicit parameters.
    pub fn calibrate_failsafe(&mut self, params: SearchParams) -> Result<(), CalibrationError> {
        self.torque_command = 0;
        let result = limits::run(&mut self.hw, &mut self.tracker, &mut self.config, params);
        self.failsafe_calibrated = result.is_ok();
        self.ensure_configured();
        result
    }

    /// Persists a new controller id. The mainboard and broadcast
    /// addresses are not assignable.
    pub fn set_controller_id(&mut self, id: u8) -> bool {
        if id == MAINBOARD_ID || id == BROADCAST_ID {
            return false;
        }
        self.config.controller_id = id as i32;
        self.hw.commit_config(&self.config);
        self.ensure_configured();
        true
    }

    /// Panel shortcut: advances the stored controller id, skipping the
    /// reserved mainboard and broadcast addresses. Returns the new id.
    pub fn increment_controller_id(&mut self) -> u8 {
        let next = match self.config.controller_id {
            id @ 1..=0xFD => (id + 1) as u8,
            _ => 1,
        };
        self.set_controller_id(next);
        next
    }

    /// Erases the stored configuration back to factory defaults.
    pub fn reset_config(&mut self) {
        self.torque_command = 0;
        self.config = ConfigRecord::default();
        self.hw.commit_config(&self.config);
        self.failsafe_calibrated = false;
        self.ensure_configured();
    }

    /// State-report fields: controller id, peak acceleration since the
    /// last report, reported angle. Reading resets the acceleration peak.
    pub fn state_report(&mut self) -> (u8, u8, i32) {
        (
            self.config.controller_id as u8,
            self.tracker.take_max_accel(),
            self.tracker.reported(),
        )
    }

    pub fn controller_id(&self) -> u8 {
        self.config.controller_id as u8
    }

    pub fn config(&self) -> &ConfigRecord {
        &self.config
    }

    pub fn reported_angle(&self) -> i32 {
        self.tracker.reported()
    }

    pub fn torque_command(&self) -> i32 {
        self.torque_command
    }

    pub fn into_board(self) -> B {
        self.hw
    }
}
