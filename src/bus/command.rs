//! Typed command and reply payloads.
//!
//! The first payload byte is an ASCII tag. Replies mirror the tag of the
//! command they answer.
//!
//! | Tag | Command            | Reply            |
//! |-----|--------------------|------------------|
//! | `A` | ping               | `['A']`          |
//! | `R` | random probe       | `['R', v]`       |
//! | `H` | heartbeat query    | `['H', bpm]`     |
//! | `C` | crying query       | `['C', level]`   |
//! | `M` | motor `[amp, freq]`| none             |

use heapless::Vec;

use super::codec::{MAX_PAYLOAD, Payload};
use crate::control::grid::GridCell;
use crate::error::CommandError;

pub const TAG_PING: u8 = b'A';
pub const TAG_RANDOM: u8 = b'R';
pub const TAG_HEARTBEAT: u8 = b'H';
pub const TAG_CRYING: u8 = b'C';
pub const TAG_MOTOR: u8 = b'M';

/// Command sent by the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping,
    RandomProbe,
    HeartbeatQuery,
    CryingQuery,
    /// Raw indices as received; the motor clamps them to the grid.
    MotorCommand { amp: u8, freq: u8 },
}

impl Command {
    /// Motor command for a validated cell.
    pub fn motor(cell: GridCell) -> Self {
        Self::MotorCommand {
            amp: cell.amp(),
            freq: cell.freq(),
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            Self::Ping => TAG_PING,
            Self::RandomProbe => TAG_RANDOM,
            Self::HeartbeatQuery => TAG_HEARTBEAT,
            Self::CryingQuery => TAG_CRYING,
            Self::MotorCommand { .. } => TAG_MOTOR,
        }
    }

    pub fn encode(self) -> Payload {
        let mut out: Payload = Vec::new();
        // At most three bytes; always fits.
        let _ = out.push(self.tag());
        if let Self::MotorCommand { amp, freq } = self {
            let _ = out.extend_from_slice(&[amp, freq]);
        }
        out
    }

    pub fn decode(payload: &[u8]) -> Result<Self, CommandError> {
        let (&tag, rest) = payload.split_first().ok_or(CommandError::Empty)?;
        match tag {
            TAG_PING => Ok(Self::Ping),
            TAG_RANDOM => Ok(Self::RandomProbe),
            TAG_HEARTBEAT => Ok(Self::HeartbeatQuery),
            TAG_CRYING => Ok(Self::CryingQuery),
            TAG_MOTOR => match rest {
                [amp, freq, ..] => Ok(Self::MotorCommand {
                    amp: *amp,
                    freq: *freq,
                }),
                _ => Err(short(tag, payload)),
            },
            other => Err(CommandError::UnknownTag(other)),
        }
    }
}

/// Reply sent back to the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Pong,
    Random(u8),
    Heartbeat(u8),
    Crying(u8),
    /// Motor echo. Never sent by the motor node; decoded for completeness.
    MotorAck(u8, u8),
}

impl Reply {
    pub fn tag(self) -> u8 {
        match self {
            Self::Pong => TAG_PING,
            Self::Random(_) => TAG_RANDOM,
            Self::Heartbeat(_) => TAG_HEARTBEAT,
            Self::Crying(_) => TAG_CRYING,
            Self::MotorAck(..) => TAG_MOTOR,
        }
    }

    /// Single data byte, for replies that carry one.
    pub fn value(self) -> Option<u8> {
        match self {
            Self::Random(v) | Self::Heartbeat(v) | Self::Crying(v) => Some(v),
            Self::Pong | Self::MotorAck(..) => None,
        }
    }

    pub fn encode(self) -> Payload {
        let mut out: Payload = Vec::new();
        let _ = out.push(self.tag());
        match self {
            Self::Pong => {}
            Self::Random(v) | Self::Heartbeat(v) | Self::Crying(v) => {
                let _ = out.push(v);
            }
            Self::MotorAck(a, f) => {
                let _ = out.extend_from_slice(&[a, f]);
            }
        }
        debug_assert!(out.len() <= MAX_PAYLOAD);
        out
    }

    pub fn decode(payload: &[u8]) -> Result<Self, CommandError> {
        let (&tag, rest) = payload.split_first().ok_or(CommandError::Empty)?;
        let byte = || rest.first().copied().ok_or_else(|| short(tag, payload));
        match tag {
            TAG_PING => Ok(Self::Pong),
            TAG_RANDOM => Ok(Self::Random(byte()?)),
            TAG_HEARTBEAT => Ok(Self::Heartbeat(byte()?)),
            TAG_CRYING => Ok(Self::Crying(byte()?)),
            TAG_MOTOR => match rest {
                [a, f, ..] => Ok(Self::MotorAck(*a, *f)),
                _ => Err(short(tag, payload)),
            },
            other => Err(CommandError::UnknownTag(other)),
        }
    }
}

fn short(tag: u8, payload: &[u8]) -> CommandError {
    CommandError::Short {
        tag,
        len: payload.len() as u8,
    }
}
