//! Unified error types for the lullaby nodes.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! node loops' error handling uniform. All variants are `Copy` so they can be
//! passed through the controller and the bus without allocation.
//!
//! None of these are fatal: every cross-node failure degrades to "treat the
//! reading as stale and retry next cycle".

use core::fmt;

use crate::bus::codec::NodeId;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The ring transport failed to move a frame.
    Transport(TransportError),
    /// A query was not answered in time.
    Query(QueryError),
    /// A payload could not be interpreted as a command or reply.
    Command(CommandError),
    /// A grid index fell outside the 5×5 actuation space.
    Grid(GridError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Query(e) => write!(f, "query: {e}"),
            Self::Command(e) => write!(f, "command: {e}"),
            Self::Grid(e) => write!(f, "grid: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// No byte arrived within the per-byte timeout.
    TimedOut,
    /// A frame addressed to this node ended before its declared length.
    FrameTruncated { declared: u8, received: u8 },
    /// A frame being relayed ended early; the partial frame is on the wire.
    ForwardTruncated { declared: u8, relayed: u8 },
    /// The source byte of a delivered frame is not a known node.
    UnknownSource(u8),
    /// The underlying byte stream reported an error.
    Link,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimedOut => write!(f, "byte timeout"),
            Self::FrameTruncated { declared, received } => {
                write!(f, "frame truncated ({received}/{declared} payload bytes)")
            }
            Self::ForwardTruncated { declared, relayed } => {
                write!(f, "forward truncated ({relayed}/{declared} payload bytes relayed)")
            }
            Self::UnknownSource(src) => write!(f, "unknown source address {src}"),
            Self::Link => write!(f, "link error"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryError {
    /// No matching reply arrived before the query deadline.
    Timeout { node: NodeId, tag: u8 },
    /// The command frame could not be written.
    SendFailed(TransportError),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { node, tag } => {
                write!(f, "no '{}' reply from {node}", char::from(*tag))
            }
            Self::SendFailed(e) => write!(f, "send failed: {e}"),
        }
    }
}

impl From<QueryError> for Error {
    fn from(e: QueryError) -> Self {
        Self::Query(e)
    }
}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Zero-length payload.
    Empty,
    /// The tag byte is not a known command.
    UnknownTag(u8),
    /// The payload is shorter than the tag requires.
    Short { tag: u8, len: u8 },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty payload"),
            Self::UnknownTag(tag) => write!(f, "unknown tag 0x{tag:02x}"),
            Self::Short { tag, len } => {
                write!(f, "'{}' payload too short ({len} bytes)", char::from(*tag))
            }
        }
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

// ---------------------------------------------------------------------------
// Grid errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridError {
    /// Amplitude or frequency index outside `0..=4`.
    OutOfRangeIndex { amp: u8, freq: u8 },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRangeIndex { amp, freq } => {
                write!(f, "index out of range (amp={amp}, freq={freq})")
            }
        }
    }
}

impl From<GridError> for Error {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
