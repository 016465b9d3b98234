//! ASCII-hex serial protocol.
//!
//! A frame is `<addr><commands>\n` where `addr` is the two-hex-digit
//! controller id (or `FF` for broadcast) and `commands` is a run of
//! single-letter commands, each followed by its hex arguments. The
//! controller answers every frame addressed to it with either a state
//! report or an error line; frames for other controllers are ignored.
//!
//! This module is the pure codec. Command execution lives in the
//! controller, which replies with [`encode_state`] or [`encode_error`].

pub const MAINBOARD_ID: u8 = 0x00;
pub const BROADCAST_ID: u8 = 0xFF;

/// Torque and limit bytes arrive as 0..=255 and scale by 32 onto the
/// internal full torque scale.
pub const TORQUE_BYTE_SCALE: i32 = 32;

pub const STATE_REPLY_LEN: usize = 11;
pub const ERROR_REPLY_LEN: usize = 8;

/// A decoded command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// `T<sign><hh>`: signed torque command, already scaled.
    Torque(i32),
    /// `Z`: re-zero the reported angle at the current position.
    ZeroAngle,
    /// `F<sign><hh><hh><hhhh>`: run a limit search with these parameters.
    FailsafeSearch {
        torque_limit: i32,
        search_magnitude: i32,
        angle_buffer: i32,
    },
    /// `I<hh>`: persist a new controller id.
    SetIdentity(u8),
    /// `C`: run the quadrant calibration.
    Calibrate,
    /// `R`: erase the stored configuration.
    ResetConfig,
    /// `a`: ping, replies with state only.
    Ping,
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

fn is_hex(c: u8) -> bool {
    hex_value(c).is_some()
}

/// Splits a received line into its address byte and the command tail.
///
/// A single leading non-hex byte is tolerated and skipped; partial
/// characters from a previous frame can land there on a shared bus.
pub fn frame_address(line: &[u8]) -> Option<(u8, &[u8])> {
    let line = match line.first() {
        Some(&c) if !is_hex(c) => &line[1..],
        _ => line,
    };
    if line.len() < 2 {
        return None;
    }
    let addr = (hex_value(line[0])? << 4) | hex_value(line[1])?;
    Some((addr, &line[2..]))
}

/// Streaming command parser over the tail of a frame. Stops cleanly at a
/// line terminator; anything undecodable yields one `Err(())` and ends
/// the iteration.
pub struct CommandParser<'a> {
    tail: &'a [u8],
}

impl<'a> CommandParser<'a> {
    pub fn new(tail: &'a [u8]) -> Self {
        Self { tail }
    }

    fn take(&mut self) -> Option<u8> {
        let (&c, rest) = self.tail.split_first()?;
        self.tail = rest;
        Some(c)
    }

    fn take_byte(&mut self) -> Option<u8> {
        let hi = hex_value(self.take()?)?;
        let lo = hex_value(self.take()?)?;
        Some((hi << 4) | lo)
    }

    /// Reads a sign character followed by one hex byte, scaled onto the
    /// torque range.
    fn take_signed_torque(&mut self) -> Option<i32> {
        let sign = self.take()?;
        let value = self.take_byte()? as i32 * TORQUE_BYTE_SCALE;
        match sign {
            b'+' => Some(value),
            b'-' => Some(-value),
            _ => None,
        }
    }

    fn parse_one(&mut self, cmd: u8) -> Option<Command> {
        match cmd {
            b'T' => Some(Command::Torque(self.take_signed_torque()?)),
            b'Z' => Some(Command::ZeroAngle),
            b'F' => {
                let torque_limit = self.take_signed_torque()?;
                let search_magnitude = self.take_byte()? as i32 * TORQUE_BYTE_SCALE;
                let buffer_hi = self.take_byte()? as i32;
                let buffer_lo = self.take_byte()? as i32;
                Some(Command::FailsafeSearch {
                    torque_limit,
                    search_magnitude,
                    angle_buffer: (buffer_hi << 8) | buffer_lo,
                })
            }
            b'I' => Some(Command::SetIdentity(self.take_byte()?)),
            b'C' => Some(Command::Calibrate),
            b'R' => Some(Command::ResetConfig),
            b'a' => Some(Command::Ping),
            _ => None,
        }
    }
}

impl Iterator for CommandParser<'_> {
    type Item = Result<Command, ()>;

    fn next(&mut self) -> Option<Self::Item> {
        let cmd = self.take()?;
        if cmd == b'\n' || cmd == b'\r' {
            self.tail = &[];
            return None;
        }
        match self.parse_one(cmd) {
            Some(command) => Some(Ok(command)),
            None => {
                self.tail = &[];
                Some(Err(()))
            }
        }
    }
}

fn put_hex_byte(out: &mut [u8], at: usize, byte: u8) {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    out[at] = DIGITS[(byte >> 4) as usize];
    out[at + 1] = DIGITS[(byte & 0x0F) as usize];
}

/// Encodes the state report: sender id, peak acceleration since the last
/// report, and the low 24 bits of the reported angle.
pub fn encode_state(id: u8, max_accel: u8, reported: i32) -> [u8; STATE_REPLY_LEN] {
    let mut out = [0u8; STATE_REPLY_LEN];
    put_hex_byte(&mut out, 0, id);
    put_hex_byte(&mut out, 2, max_accel);
    put_hex_byte(&mut out, 4, (reported >> 16) as u8);
    put_hex_byte(&mut out, 6, (reported >> 8) as u8);
    put_hex_byte(&mut out, 8, reported as u8);
    out[10] = b'\n';
    out
}

pub fn encode_error(id: u8) -> [u8; ERROR_REPLY_LEN] {
    let mut out = *b"..error\n";
    put_hex_byte(&mut out, 0, id);
    out
}

/// A reply line ready for transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    State([u8; STATE_REPLY_LEN]),
    Error([u8; ERROR_REPLY_LEN]),
}

impl Reply {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Reply::State(line) => line,
            Reply::Error(line) => line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_splits_and_tolerates_leading_noise() {
        assert_eq!(frame_address(b"2BT+40\n"), Some((0x2B, &b"T+40\n"[..])));
        assert_eq!(frame_address(b"\n2bT+40\n"), Some((0x2B, &b"T+40\n"[..])));
        assert_eq!(frame_address(b"x"), None);
    }

    #[test]
    fn torque_command_scales_and_signs() {
        let cmds: Vec<_> = CommandParser::new(b"T+FF\n").collect();
        assert_eq!(cmds, vec![Ok(Command::Torque(255 * 32))]);

        let cmds: Vec<_> = CommandParser::new(b"T-10\n").collect();
        assert_eq!(cmds, vec![Ok(Command::Torque(-(16 * 32)))]);

        let cmds: Vec<_> = CommandParser::new(b"T*10\n").collect();
        assert_eq!(cmds, vec![Err(())]);
    }

    #[test]
    fn failsafe_command_decodes_all_fields() {
        let cmds: Vec<_> = CommandParser::new(b"F+3066071C\n").collect();
        assert_eq!(
            cmds,
            vec![Ok(Command::FailsafeSearch {
                torque_limit: 0x30 * 32,
                search_magnitude: 0x66 * 32,
                angle_buffer: 0x071C,
            })]
        );
    }

    #[test]
    fn several_commands_in_one_frame() {
        let cmds: Vec<_> = CommandParser::new(b"ZT+08\n").collect();
        assert_eq!(
            cmds,
            vec![Ok(Command::ZeroAngle), Ok(Command::Torque(8 * 32))]
        );
    }

    #[test]
    fn carriage_return_also_terminates() {
        let cmds: Vec<_> = CommandParser::new(b"a\r\n").collect();
        assert_eq!(cmds, vec![Ok(Command::Ping)]);
    }

    #[test]
    fn unknown_command_is_an_error() {
        let cmds: Vec<_> = CommandParser::new(b"Q\n").collect();
        assert_eq!(cmds, vec![Err(())]);
    }

    #[test]
    fn truncated_argument_is_an_error() {
        let cmds: Vec<_> = CommandParser::new(b"I5").collect();
        assert_eq!(cmds, vec![Err(())]);
    }

    #[test]
    fn state_reply_layout() {
        let out = encode_state(0x2B, 0x07, 0x00_1234_56);
        assert_eq!(&out, b"2B07123456\n");
    }

    #[test]
    fn error_reply_layout() {
        assert_eq!(&encode_error(0x2B), b"2Berror\n");
    }
}
