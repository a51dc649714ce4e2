//! Addressed frame codec.
//!
//! Wire format:
//! ```text
//! ┌─────────┬─────────┬─────────┬──────────────────────────┐
//! │ DST (1B)│ SRC (1B)│ LEN (1B)│ Payload (LEN B, ≤ 8)     │
//! └─────────┴─────────┴─────────┴──────────────────────────┘
//! ```
//!
//! [`Frame::encode`] produces exactly `3 + len` bytes. The streaming
//! [`FrameDecoder`] accumulates bytes from an untimed stream and yields
//! complete frames; the timed, forwarding receive path lives in
//! [`ring`](super::ring).

use core::fmt;

use heapless::Vec;
use log::warn;

/// Maximum payload bytes a node buffers per frame.
pub const MAX_PAYLOAD: usize = 8;

/// Header size (`dst`, `src`, `len`).
pub const HEADER_SIZE: usize = 3;

/// Largest encoded frame.
pub const MAX_FRAME: usize = HEADER_SIZE + MAX_PAYLOAD;

/// Payload buffer type.
pub type Payload = Vec<u8, MAX_PAYLOAD>;

// ---------------------------------------------------------------------------
// Node addresses
// ---------------------------------------------------------------------------

/// The four fixed ring participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeId {
    Master = 0,
    Heartbeat = 1,
    Crying = 2,
    Motor = 3,
}

impl NodeId {
    pub const ALL: [Self; 4] = [Self::Master, Self::Heartbeat, Self::Crying, Self::Motor];

    /// Peripherals in ring order after the master.
    pub const PERIPHERALS: [Self; 3] = [Self::Heartbeat, Self::Crying, Self::Motor];

    /// Address byte on the wire.
    pub const fn addr(self) -> u8 {
        self as u8
    }

    /// Decode an address byte.
    pub fn from_addr(byte: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.addr() == byte)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Master => "MSTR",
            Self::Heartbeat => "HB",
            Self::Crying => "CRY",
            Self::Motor => "MTR",
        };
        write!(f, "{name}@{}", self.addr())
    }
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Raw header as it appears on the wire. Addresses are kept as bytes so that
/// frames for unknown nodes can still be relayed untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub dst: u8,
    pub src: u8,
    pub len: u8,
}

impl Header {
    pub fn from_bytes(bytes: [u8; HEADER_SIZE]) -> Self {
        Self {
            dst: bytes[0],
            src: bytes[1],
            len: bytes[2],
        }
    }

    pub fn to_bytes(self) -> [u8; HEADER_SIZE] {
        [self.dst, self.src, self.len]
    }
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// A complete addressed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub dst: NodeId,
    pub src: NodeId,
    pub payload: Payload,
}

impl Frame {
    /// Build a frame. Returns `None` if `payload` exceeds [`MAX_PAYLOAD`].
    pub fn new(dst: NodeId, src: NodeId, payload: &[u8]) -> Option<Self> {
        let payload = Payload::from_slice(payload).ok()?;
        Some(Self { dst, src, payload })
    }

    pub fn len(&self) -> u8 {
        self.payload.len() as u8
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn header(&self) -> Header {
        Header {
            dst: self.dst.addr(),
            src: self.src.addr(),
            len: self.len(),
        }
    }

    /// Encode as `[dst][src][len][payload…]`.
    pub fn encode(&self) -> Vec<u8, MAX_FRAME> {
        let mut out = Vec::new();
        // Capacity is HEADER_SIZE + MAX_PAYLOAD, so neither push can fail.
        let _ = out.extend_from_slice(&self.header().to_bytes());
        let _ = out.extend_from_slice(&self.payload);
        out
    }
}

// ---------------------------------------------------------------------------
// Streaming decoder
// ---------------------------------------------------------------------------

/// Decoder state machine.
enum DecoderState {
    /// Waiting for header bytes.
    ReadingHeader { collected: usize },
    /// Header received, reading payload. Bytes past `MAX_PAYLOAD` are
    /// consumed and dropped.
    ReadingPayload { header: Header, collected: usize },
}

/// Streaming frame decoder for untimed byte streams.
pub struct FrameDecoder {
    state: DecoderState,
    header_buf: [u8; HEADER_SIZE],
    payload: Payload,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::ReadingHeader { collected: 0 },
            header_buf: [0; HEADER_SIZE],
            payload: Payload::new(),
        }
    }

    /// Feed one byte. Returns a frame when its last declared byte arrives.
    ///
    /// Frames whose addresses are not known nodes are consumed and dropped.
    pub fn push(&mut self, byte: u8) -> Option<Frame> {
        match &mut self.state {
            DecoderState::ReadingHeader { collected } => {
                self.header_buf[*collected] = byte;
                *collected += 1;
                if *collected < HEADER_SIZE {
                    return None;
                }
                let header = Header::from_bytes(self.header_buf);
                if header.len as usize > MAX_PAYLOAD {
                    warn!(
                        "codec: declared length {} exceeds {MAX_PAYLOAD}, clamping",
                        header.len
                    );
                }
                self.payload.clear();
                self.state = DecoderState::ReadingPayload {
                    header,
                    collected: 0,
                };
                if header.len == 0 {
                    return self.finish(header);
                }
                None
            }
            DecoderState::ReadingPayload { header, collected } => {
                let header = *header;
                if *collected < MAX_PAYLOAD {
                    // Bounded by the check above.
                    let _ = self.payload.push(byte);
                }
                *collected += 1;
                if *collected < header.len as usize {
                    return None;
                }
                self.finish(header)
            }
        }
    }

    /// Feed a slice, returning every frame it completes.
    pub fn feed(&mut self, data: &[u8]) -> std::vec::Vec<Frame> {
        data.iter().filter_map(|&b| self.push(b)).collect()
    }

    /// Reset decoder state (e.g. after a line break or reconnect).
    pub fn reset(&mut self) {
        self.state = DecoderState::ReadingHeader { collected: 0 };
        self.payload.clear();
    }

    fn finish(&mut self, header: Header) -> Option<Frame> {
        self.state = DecoderState::ReadingHeader { collected: 0 };
        let (Some(dst), Some(src)) = (NodeId::from_addr(header.dst), NodeId::from_addr(header.src))
        else {
            warn!(
                "codec: dropping frame with unknown address dst={} src={}",
                header.dst, header.src
            );
            return None;
        };
        Some(Frame {
            dst,
            src,
            payload: core::mem::take(&mut self.payload),
        })
    }
}
