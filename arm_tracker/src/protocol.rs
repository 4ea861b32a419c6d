//! Host command protocol.
//!
//! Line-oriented ASCII commands from the host and their responses:
//!
//! ```text
//! > SETDIM 254,254,254,35
//! < ACK,DIMENSIONS_SET
//! > getpos
//! < POS,1520,797.000,0.000,0.000,0.00,0.00,0.00,0.00
//! > FOO
//! < ERROR,Unknown command: FOO
//! ```
//!
//! Commands are case-insensitive. The command word ends at the first space,
//! parameters are comma-separated.

use arm::arm::types::Vec3;
use arm::consts::{
    COMMAND_BUFFER_SIZE, MAX_PROTOCOL_PPR, NUM_AXES, PROTOCOL_DATE, PROTOCOL_VERSION,
};
use arm::telemetry::TelemetryRecord;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const SETPPR_USAGE: &str = "SETPPR <value>";
const SETDIM_USAGE: &str = "SETDIM l1,l2,l3,l4";
const SETTOOL_USAGE: &str = "SETTOOL x,y,z";

/// Errors reported to the host as `ERROR,<message>`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    /// Command word not recognized
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Parameters missing entirely
    #[error("{command} requires {noun}: {usage}")]
    MissingParameters {
        /// Command word
        command: &'static str,
        /// "parameter" or "parameters"
        noun: &'static str,
        /// Usage line
        usage: &'static str,
    },

    /// `SETPPR` value not a number in 1..=10000
    #[error("Invalid PPR value (1-10000)")]
    InvalidPpr,

    /// Wrong parameter count or a non-numeric parameter
    #[error("Invalid format. Use: {0}")]
    InvalidFormat(&'static str),

    /// Line exceeded the command buffer
    #[error("Command too long")]
    CommandTooLong,
}

/// A parsed host command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Begin streaming positions
    Start,
    /// Stop streaming
    Stop,
    /// Suspend streaming
    Pause,
    /// Continue streaming
    Resume,
    /// Zero all encoders and capture the origin
    Zero,
    /// Send one position now
    GetPos,
    /// Set pulses per revolution
    SetPpr(u32),
    /// Set link lengths L1..L4
    SetDim([f64; NUM_AXES]),
    /// Set tool offset
    SetTool(Vec3),
    /// Send system information
    Info,
    /// Send version
    Version,
}

/// Parse exactly `N` comma-separated finite numbers.
fn parse_numbers<const N: usize>(params: &str, usage: &'static str) -> Result<[f64; N], ProtocolError> {
    let mut values = [0.0; N];
    let mut count = 0;
    for token in params.split(',') {
        let value = token
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or(ProtocolError::InvalidFormat(usage))?;
        *values.get_mut(count).ok_or(ProtocolError::InvalidFormat(usage))? = value;
        count += 1;
    }
    if count != N {
        return Err(ProtocolError::InvalidFormat(usage));
    }
    Ok(values)
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let upper = line.trim_end_matches(['\r', '\n']).to_ascii_uppercase();
        let trimmed = upper.trim_start_matches(' ');
        let (word, params) = match trimmed.split_once(' ') {
            Some((word, rest)) => {
                let rest = rest.trim();
                (word, (!rest.is_empty()).then_some(rest))
            }
            None => (trimmed, None),
        };

        let missing = |command, noun, usage| ProtocolError::MissingParameters {
            command,
            noun,
            usage,
        };

        match word {
            "START" => Ok(Self::Start),
            "STOP" => Ok(Self::Stop),
            "PAUSE" => Ok(Self::Pause),
            "RESUME" => Ok(Self::Resume),
            "ZERO" => Ok(Self::Zero),
            "GETPOS" => Ok(Self::GetPos),
            "INFO" => Ok(Self::Info),
            "VERSION" => Ok(Self::Version),
            "SETPPR" => {
                let params = params.ok_or_else(|| missing("SETPPR", "parameter", SETPPR_USAGE))?;
                params
                    .parse::<u32>()
                    .ok()
                    .filter(|ppr| (1..=MAX_PROTOCOL_PPR).contains(ppr))
                    .map(Self::SetPpr)
                    .ok_or(ProtocolError::InvalidPpr)
            }
            "SETDIM" => {
                let params = params.ok_or_else(|| missing("SETDIM", "parameters", SETDIM_USAGE))?;
                parse_numbers::<NUM_AXES>(params, SETDIM_USAGE).map(Self::SetDim)
            }
            "SETTOOL" => {
                let params = params.ok_or_else(|| missing("SETTOOL", "parameters", SETTOOL_USAGE))?;
                let [x, y, z] = parse_numbers::<3>(params, SETTOOL_USAGE)?;
                Ok(Self::SetTool(Vec3::new(x, y, z)))
            }
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

/// Recording state driven by START/STOP/PAUSE/RESUME.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Session {
    /// Not streaming
    #[default]
    Idle,
    /// Streaming a POS line every cycle
    Recording,
    /// Recording suspended
    Paused,
}

impl Session {
    /// State after `command`. Commands that do not apply leave it unchanged.
    pub fn next(self, command: &Command) -> Self {
        match (self, command) {
            (_, Command::Start) => Self::Recording,
            (_, Command::Stop) => Self::Idle,
            (Self::Recording, Command::Pause) => Self::Paused,
            (Self::Paused, Command::Resume) => Self::Recording,
            (state, _) => state,
        }
    }

    /// Whether POS lines are streamed in this state.
    pub fn is_streaming(self) -> bool {
        self == Self::Recording
    }
}

/// Current settings reported by `INFO`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemInfo {
    /// Pulses per revolution
    pub ppr: u32,
    /// Update period in milliseconds
    pub update_interval_ms: u32,
    /// Link lengths L1..L4
    pub links: [f64; NUM_AXES],
}

impl fmt::Display for SystemInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rate_hz = 1000 / self.update_interval_ms.max(1);
        writeln!(f, "INFO,System Information:")?;
        writeln!(f, "INFO,Firmware: {PROTOCOL_VERSION}")?;
        writeln!(f, "INFO,Encoder PPR: {}", self.ppr)?;
        writeln!(f, "INFO,Update Rate: {rate_hz} Hz")?;
        let [l1, l2, l3, l4] = self.links;
        write!(f, "INFO,Link Lengths: {l1:.2},{l2:.2},{l3:.2},{l4:.2}")
    }
}

/// Reply to one command line. `Display` gives the wire text without the
/// final newline.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// `ACK,<what>`
    Ack(&'static str),
    /// `ERROR,<message>`
    Error(ProtocolError),
    /// One `POS` record
    Position(TelemetryRecord),
    /// Several `INFO` lines
    Info(SystemInfo),
    /// `VERSION,<version>,<date>`
    Version,
}

impl From<ProtocolError> for Response {
    fn from(err: ProtocolError) -> Self {
        Self::Error(err)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ack(what) => write!(f, "ACK,{what}"),
            Self::Error(err) => write!(f, "ERROR,{err}"),
            Self::Position(record) => fmt::Display::fmt(record, f),
            Self::Info(info) => fmt::Display::fmt(info, f),
            Self::Version => write!(f, "VERSION,{PROTOCOL_VERSION},{PROTOCOL_DATE}"),
        }
    }
}

/// `ACK` payloads.
pub mod ack {
    /// START
    pub const RECORDING_STARTED: &str = "RECORDING_STARTED";
    /// STOP
    pub const RECORDING_STOPPED: &str = "RECORDING_STOPPED";
    /// PAUSE
    pub const RECORDING_PAUSED: &str = "RECORDING_PAUSED";
    /// RESUME
    pub const RECORDING_RESUMED: &str = "RECORDING_RESUMED";
    /// ZERO
    pub const ENCODERS_ZEROED: &str = "ENCODERS_ZEROED";
    /// SETPPR
    pub const PPR_SET: &str = "PPR_SET";
    /// SETDIM
    pub const DIMENSIONS_SET: &str = "DIMENSIONS_SET";
    /// SETTOOL
    pub const TOOL_OFFSET_SET: &str = "TOOL_OFFSET_SET";
}

/// Fixed-size accumulator splitting a byte stream into command lines.
///
/// `\n` and `\r` both terminate a line; empty lines are dropped. A line that
/// would not fit (one byte is kept for the terminator) is discarded with
/// [`ProtocolError::CommandTooLong`].
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: heapless::Vec<u8, COMMAND_BUFFER_SIZE>,
}

impl LineBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Returns a complete line or an overflow error.
    pub fn push(&mut self, byte: u8) -> Option<Result<String, ProtocolError>> {
        match byte {
            b'\n' | b'\r' => {
                if self.buf.is_empty() {
                    return None;
                }
                let line = String::from_utf8_lossy(&self.buf).into_owned();
                self.buf.clear();
                Some(Ok(line))
            }
            _ if self.buf.len() < COMMAND_BUFFER_SIZE - 1 => {
                self.buf.push(byte).ok();
                None
            }
            _ => {
                self.buf.clear();
                Some(Err(ProtocolError::CommandTooLong))
            }
        }
    }

    /// Feed a chunk of bytes, collecting every completed line.
    pub fn extend(&mut self, bytes: &[u8]) -> Vec<Result<String, ProtocolError>> {
        bytes.iter().filter_map(|&b| self.push(b)).collect()
    }

    /// Bytes buffered for the current line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}
