//! Persisted configuration record: calibration table, failsafe envelope and
//! controller identity. The record is only ever replaced as a whole
//! (read-modify-commit) so readers never observe a partially written table.

/// Full mechanical circle of the 15-bit commutation sample. Also the period
/// of the sine generator, so one sensor turn maps onto one sine period.
pub const SENSOR_PERIOD: i32 = 1 << 15;

/// Number of independently calibrated partitions of the sensor circle.
pub const NUM_QUADRANTS: usize = 32;

/// Width of one quadrant in sensor units.
pub const QUADRANT_DIV: i32 = SENSOR_PERIOD / NUM_QUADRANTS as i32;

/// Full torque scale. A command byte (0..=255) scales by 32 to land here.
/// Doubles as the "no limiting" sentinel for the failsafe torque limit.
pub const TORQUE_LIMIT_MAX: i32 = 0xFF * 32;

/// By default search for limits with 40% torque.
pub const DEFAULT_TORQUE_SEARCH_MAGNITUDE: i32 = TORQUE_LIMIT_MAX * 2 / 5;

/// By default back the discovered limits off by 10 degrees of angle
/// (reported-angle units: 0xFFFF per mechanical turn).
pub const DEFAULT_ANGLE_OFFSET_BUFFER: i32 = (0xFFFF / 360) * 10;

/// Discovered limits closer together than this (10 degrees) indicate a
/// failed search; the calibration is discarded.
pub const MIN_LIMIT_SPAN: i32 = (0xFFFF / 360) * 10;

/// Widest representable reported-angle envelope: the i32 tracked angle
/// minus the largest possible u16 startup reference.
pub const DEFAULT_MAX_ANGLE: i32 = 0x7FFF_0000;

/// `min_angle` sentinel for a quadrant entry that was never visited during
/// a calibration sweep.
pub const UNVISITED_MIN: i32 = 0x00FF_FFFF;

/// Angular extrema of the open-loop drive angle observed while the rotor
/// crossed one quadrant of the sensor circle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuadrantData {
    pub min_angle: i32,
    pub max_angle: i32,
    /// Always `max_angle - min_angle`; stored so the per-cycle mapper does
    /// not recompute it.
    pub range: i32,
}

/// Failsafe angular-travel envelope and the parameters used to discover it.
///
/// When the reported angle violates `max_angle`/`min_angle`, commanded
/// torque is clamped to `torque_limit` in the direction of the violated
/// limit. A `torque_limit` of [`TORQUE_LIMIT_MAX`] disables limiting, since
/// no command can exceed that value anyway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailsafeConfig {
    pub torque_limit: i32,
    pub torque_search_magnitude: i32,
    pub angle_offset_buffer: i32,
    pub max_angle: i32,
    pub min_angle: i32,
}

impl Default for FailsafeConfig {
    fn default() -> Self {
        Self {
            torque_limit: TORQUE_LIMIT_MAX,
            torque_search_magnitude: DEFAULT_TORQUE_SEARCH_MAGNITUDE,
            angle_offset_buffer: DEFAULT_ANGLE_OFFSET_BUFFER,
            max_angle: DEFAULT_MAX_ANGLE,
            min_angle: -DEFAULT_MAX_ANGLE,
        }
    }
}

/// The persisted configuration record. Owned by the controller; written only
/// by the two calibration procedures and the identity/reset commands, always
/// as a full-record commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigRecord {
    pub controller_id: i32,
    pub quadrants: [QuadrantData; NUM_QUADRANTS],
    /// Sensor angle increases with "up" (forward-driven) rotation.
    pub up: bool,
    /// Mechanical calibration completed; precondition for the angle mapper.
    pub calibrated: bool,
    pub failsafe: FailsafeConfig,
}

impl Default for ConfigRecord {
    fn default() -> Self {
        Self {
            controller_id: 0,
            quadrants: [QuadrantData::default(); NUM_QUADRANTS],
            up: false,
            calibrated: false,
            failsafe: FailsafeConfig::default(),
        }
    }
}

/// Size of the serialized record in 16-bit flash words.
/// id (2) + 32 quadrants * 3 fields * 2 + flags (1) + failsafe 5 * 2.
pub const CONFIG_WORDS: usize = 2 + NUM_QUADRANTS * 6 + 1 + 10;

impl ConfigRecord {
    /// Serializes into the fixed little-endian word layout. This layout is
    /// the stable binary contract with previously stored calibration data.
    pub fn to_words(&self) -> [u16; CONFIG_WORDS] {
        let mut words = [0u16; CONFIG_WORDS];
        let mut w = WordWriter::new(&mut words);
        w.put_i32(self.controller_id);
        for q in &self.quadrants {
            w.put_i32(q.min_angle);
            w.put_i32(q.max_angle);
            w.put_i32(q.range);
        }
        w.put_u16((self.up as u16) | ((self.calibrated as u16) << 1));
        w.put_i32(self.failsafe.torque_limit);
        w.put_i32(self.failsafe.torque_search_magnitude);
        w.put_i32(self.failsafe.angle_offset_buffer);
        w.put_i32(self.failsafe.max_angle);
        w.put_i32(self.failsafe.min_angle);
        words
    }

    pub fn from_words(words: &[u16; CONFIG_WORDS]) -> Self {
        let mut r = WordReader::new(words);
        let controller_id = r.get_i32();
        let mut quadrants = [QuadrantData::default(); NUM_QUADRANTS];
        for q in quadrants.iter_mut() {
            q.min_angle = r.get_i32();
            q.max_angle = r.get_i32();
            q.range = r.get_i32();
        }
        let flags = r.get_u16();
        Self {
            controller_id,
            quadrants,
            up: flags & 0b01 != 0,
            calibrated: flags & 0b10 != 0,
            failsafe: FailsafeConfig {
                torque_limit: r.get_i32(),
                torque_search_magnitude: r.get_i32(),
                angle_offset_buffer: r.get_i32(),
                max_angle: r.get_i32(),
                min_angle: r.get_i32(),
            },
        }
    }
}

struct WordWriter<'a> {
    words: &'a mut [u16],
    idx: usize,
}

impl<'a> WordWriter<'a> {
    fn new(words: &'a mut [u16]) -> Self {
        Self { words, idx: 0 }
    }

    fn put_u16(&mut self, v: u16) {
        self.words[self.idx] = v;
        self.idx += 1;
    }

    fn put_i32(&mut self, v: i32) {
        self.put_u16(v as u16);
        self.put_u16((v >> 16) as u16);
    }
}

struct WordReader<'a> {
    words: &'a [u16],
    idx: usize,
}

impl<'a> WordReader<'a> {
    fn new(words: &'a [u16]) -> Self {
        Self { words, idx: 0 }
    }

    fn get_u16(&mut self) -> u16 {
        let v = self.words[self.idx];
        self.idx += 1;
        v
    }

    fn get_i32(&mut self) -> i32 {
        let lo = self.get_u16() as u32;
        let hi = self.get_u16() as u32;
        (lo | (hi << 16)) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_no_limit_in_effect() {
        let cfg = ConfigRecord::default();
        assert_eq!(cfg.failsafe.torque_limit, TORQUE_LIMIT_MAX);
        assert_eq!(cfg.failsafe.max_angle, DEFAULT_MAX_ANGLE);
        assert_eq!(cfg.failsafe.min_angle, -DEFAULT_MAX_ANGLE);
        assert!(!cfg.calibrated);
    }

    #[test]
    fn word_layout_round_trip() {
        let mut cfg = ConfigRecord::default();
        cfg.controller_id = 7;
        cfg.up = true;
        cfg.calibrated = true;
        cfg.quadrants[0] = QuadrantData {
            min_angle: -5,
            max_angle: 7165,
            range: 7170,
        };
        cfg.quadrants[31] = QuadrantData {
            min_angle: 222_000,
            max_angle: 229_170,
            range: 7170,
        };
        cfg.failsafe.max_angle = 120_000;
        cfg.failsafe.min_angle = -45_000;
        cfg.failsafe.torque_limit = 96;

        let words = cfg.to_words();
        assert_eq!(ConfigRecord::from_words(&words), cfg);
    }

    #[test]
    fn quadrant_width_divides_sensor_circle() {
        assert_eq!(QUADRANT_DIV * NUM_QUADRANTS as i32, SENSOR_PERIOD);
        assert_eq!(QUADRANT_DIV, 1024);
    }
}
