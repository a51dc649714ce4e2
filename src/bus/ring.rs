//! Ring node: timed frame receive with store-and-forward relaying.
//!
//! Every node reads bytes from its upstream neighbour and writes to its
//! downstream neighbour. A frame for another node is relayed byte by byte as
//! it arrives; a frame for this node is buffered and delivered.
//!
//! ```text
//!   ┌──────┐    ┌────┐    ┌─────┐    ┌─────┐
//!   │ MSTR │ ─▶ │ HB │ ─▶ │ CRY │ ─▶ │ MTR │ ─┐
//!   └──────┘    └────┘    └─────┘    └─────┘  │
//!      ▲──────────────────────────────────────┘
//! ```
//!
//! Each byte must arrive within `byte_timeout` of the previous one. A frame
//! that stalls mid-way is reported as truncated; when it was being relayed,
//! its partial bytes have already gone downstream.
//!
//! A frame that comes back to the node that sent it has been round the whole
//! ring unclaimed and is dropped. The master also drops frames for addresses
//! outside the ring, so a corrupted header cannot circulate forever.

use core::time::Duration;

use log::{debug, trace, warn};

use super::codec::{Frame, HEADER_SIZE, Header, MAX_PAYLOAD, NodeId, Payload};
use super::transport::Transport;
use crate::app::ports::{ClockPort, Deadline};
use crate::config::BusConfig;
use crate::error::TransportError;

/// Outcome of one [`RingNode::receive`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// A complete frame addressed to this node.
    Delivered(Frame),
    /// A frame for another address was relayed downstream.
    Forwarded { dst: u8, len: u8 },
    /// An unclaimed frame was read off the line and discarded.
    Dropped { dst: u8, src: u8, len: u8 },
}

/// Per-node link counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub delivered: u32,
    pub forwarded: u32,
    /// Unclaimed frames taken off the ring.
    pub dropped: u32,
    /// Receive calls that ended in a byte timeout, including idle polls.
    pub timeouts: u32,
    /// Frames that stalled after the header, delivered or relayed.
    pub truncated: u32,
}

pub struct RingNode<T: Transport, C: ClockPort> {
    local: NodeId,
    transport: T,
    clock: C,
    byte_timeout: Duration,
    poll_interval: Duration,
    stats: LinkStats,
}

impl<T: Transport, C: ClockPort> RingNode<T, C> {
    pub fn new(local: NodeId, transport: T, clock: C, bus: &BusConfig) -> Self {
        Self {
            local,
            transport,
            clock,
            byte_timeout: bus.byte_timeout(),
            poll_interval: bus.poll_interval(),
            stats: LinkStats::default(),
        }
    }

    pub fn local(&self) -> NodeId {
        self.local
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Whether an upstream byte is already waiting.
    pub fn has_input(&mut self) -> Result<bool, TransportError> {
        self.transport.has_input().map_err(|e| {
            debug!("{}: input check failed: {e:?}", self.local);
            TransportError::Link
        })
    }

    // ── Send ──────────────────────────────────────────────────

    /// Write `[dst][src][len][payload]` downstream.
    ///
    /// Payloads longer than [`MAX_PAYLOAD`] are cut to that length.
    pub fn send(&mut self, dst: NodeId, src: NodeId, payload: &[u8]) -> Result<(), TransportError> {
        let payload = if payload.len() > MAX_PAYLOAD {
            warn!(
                "{}: payload of {} bytes cut to {MAX_PAYLOAD}",
                self.local,
                payload.len()
            );
            &payload[..MAX_PAYLOAD]
        } else {
            payload
        };
        let header = Header {
            dst: dst.addr(),
            src: src.addr(),
            len: payload.len() as u8,
        };
        trace!("{}: tx {:?} {:02x?}", self.local, header, payload);
        self.write_all(&header.to_bytes())?;
        self.write_all(payload)?;
        self.flush()
    }

    /// Send an already-built frame.
    pub fn send_frame(&mut self, frame: &Frame) -> Result<(), TransportError> {
        self.send(frame.dst, frame.src, &frame.payload)
    }

    // ── Receive ───────────────────────────────────────────────

    /// Read one frame, relaying it if it is not addressed to this node.
    pub fn receive(&mut self) -> Result<Received, TransportError> {
        let mut raw = [0u8; HEADER_SIZE];
        for slot in &mut raw {
            *slot = self.recv_byte()?;
        }
        let header = Header::from_bytes(raw);
        if header.dst == self.local.addr() {
            self.deliver(header)
        } else if self.unclaimed(header) {
            self.discard(header)
        } else {
            self.forward(header)
        }
    }

    /// A frame this node sent that nobody took, or one for an address
    /// outside the ring reaching the master.
    fn unclaimed(&self, header: Header) -> bool {
        header.src == self.local.addr()
            || (self.local == NodeId::Master && NodeId::from_addr(header.dst).is_none())
    }

    fn deliver(&mut self, header: Header) -> Result<Received, TransportError> {
        if header.len as usize > MAX_PAYLOAD {
            warn!(
                "{}: declared length {} exceeds {MAX_PAYLOAD}, clamping",
                self.local, header.len
            );
        }
        let mut payload = Payload::new();
        for received in 0..header.len {
            match self.recv_byte() {
                Ok(byte) => {
                    if payload.len() < MAX_PAYLOAD {
                        // Bounded by the length check.
                        let _ = payload.push(byte);
                    }
                }
                Err(TransportError::TimedOut) => {
                    self.stats.truncated = self.stats.truncated.saturating_add(1);
                    warn!(
                        "{}: frame from {} truncated at {received}/{}",
                        self.local, header.src, header.len
                    );
                    return Err(TransportError::FrameTruncated {
                        declared: header.len,
                        received,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        let src = NodeId::from_addr(header.src).ok_or(TransportError::UnknownSource(header.src))?;
        self.stats.delivered = self.stats.delivered.saturating_add(1);
        trace!("{}: rx from {src} {:02x?}", self.local, payload.as_slice());
        Ok(Received::Delivered(Frame {
            dst: self.local,
            src,
            payload,
        }))
    }

    fn discard(&mut self, header: Header) -> Result<Received, TransportError> {
        for received in 0..header.len {
            match self.recv_byte() {
                Ok(_) => {}
                Err(TransportError::TimedOut) => {
                    self.stats.truncated = self.stats.truncated.saturating_add(1);
                    return Err(TransportError::FrameTruncated {
                        declared: header.len,
                        received,
                    });
                }
                Err(e) => return Err(e),
            }
        }
        self.stats.dropped = self.stats.dropped.saturating_add(1);
        warn!(
            "{}: dropped unclaimed frame dst={} src={} len={}",
            self.local, header.dst, header.src, header.len
        );
        Ok(Received::Dropped {
            dst: header.dst,
            src: header.src,
            len: header.len,
        })
    }

    fn forward(&mut self, header: Header) -> Result<Received, TransportError> {
        self.write_all(&header.to_bytes())?;
        for relayed in 0..header.len {
            match self.recv_byte() {
                Ok(byte) => self.write_all(&[byte])?,
                Err(TransportError::TimedOut) => {
                    self.stats.truncated = self.stats.truncated.saturating_add(1);
                    warn!(
                        "{}: relay for dst={} truncated at {relayed}/{}",
                        self.local, header.dst, header.len
                    );
                    // Push out what was relayed so far; the stall is reported regardless.
                    let _ = self.flush();
                    return Err(TransportError::ForwardTruncated {
                        declared: header.len,
                        relayed,
                    });
                }
                Err(e) => return Err(e),
            }
        }
        self.flush()?;
        self.stats.forwarded = self.stats.forwarded.saturating_add(1);
        trace!(
            "{}: forwarded {}B to dst={}",
            self.local, header.len, header.dst
        );
        Ok(Received::Forwarded {
            dst: header.dst,
            len: header.len,
        })
    }

    /// Read one byte, polling until `byte_timeout` elapses.
    fn recv_byte(&mut self) -> Result<u8, TransportError> {
        let deadline = Deadline::after(&self.clock, self.byte_timeout);
        loop {
            match self.transport.poll_byte() {
                Ok(Some(byte)) => return Ok(byte),
                Ok(None) => {}
                Err(e) => {
                    debug!("{}: read failed: {e:?}", self.local);
                    return Err(TransportError::Link);
                }
            }
            if deadline.expired(&self.clock) {
                self.stats.timeouts = self.stats.timeouts.saturating_add(1);
                return Err(TransportError::TimedOut);
            }
            self.clock.sleep(self.poll_interval);
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.transport.send(data).map_err(|e| {
            debug!("{}: write failed: {e:?}", self.local);
            TransportError::Link
        })
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        self.transport.flush().map_err(|e| {
            debug!("{}: flush failed: {e:?}", self.local);
            TransportError::Link
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::adapters::time::ManualClock;

    /// Scripted link: reads pop from `rx`, writes append to `tx`.
    #[derive(Default)]
    struct Script {
        rx: VecDeque<u8>,
        tx: Vec<u8>,
    }

    impl Transport for Script {
        type Error = ();

        fn poll_byte(&mut self) -> Result<Option<u8>, ()> {
            Ok(self.rx.pop_front())
        }

        fn send(&mut self, data: &[u8]) -> Result<(), ()> {
            self.tx.extend_from_slice(data);
            Ok(())
        }

        fn has_input(&mut self) -> Result<bool, ()> {
            Ok(!self.rx.is_empty())
        }
    }

    fn node(local: NodeId, rx: &[u8]) -> RingNode<Script, ManualClock> {
        let script = Script {
            rx: rx.iter().copied().collect(),
            tx: Vec::new(),
        };
        RingNode::new(local, script, ManualClock::new(), &BusConfig::default())
    }

    #[test]
    fn send_writes_header_then_payload() {
        let mut n = node(NodeId::Master, &[]);
        n.send(NodeId::Motor, NodeId::Master, b"M\x01\x02").unwrap();
        assert_eq!(n.transport().tx, vec![3, 0, 3, b'M', 1, 2]);
    }

    #[test]
    fn delivers_frame_for_local_node() {
        let mut n = node(NodeId::Heartbeat, &[1, 0, 1, b'H']);
        let got = n.receive().unwrap();
        let expected = Frame::new(NodeId::Heartbeat, NodeId::Master, b"H").unwrap();
        assert_eq!(got, Received::Delivered(expected));
        assert!(n.transport().tx.is_empty());
        assert_eq!(n.stats().delivered, 1);
    }

    #[test]
    fn forwards_foreign_frame_verbatim() {
        let bytes = [3, 0, 3, b'M', 4, 4];
        let mut n = node(NodeId::Heartbeat, &bytes);
        assert_eq!(n.receive().unwrap(), Received::Forwarded { dst: 3, len: 3 });
        assert_eq!(n.transport().tx, bytes.to_vec());
        assert_eq!(n.stats().forwarded, 1);
    }

    #[test]
    fn idle_line_times_out_after_byte_timeout() {
        let mut n = node(NodeId::Crying, &[]);
        let start = n.clock().now();
        assert_eq!(n.receive(), Err(TransportError::TimedOut));
        let waited = n.clock().now() - start;
        assert!(waited >= Duration::from_millis(20));
        assert!(waited <= Duration::from_millis(22));
    }

    #[test]
    fn stalled_payload_reports_truncation() {
        let mut n = node(NodeId::Master, &[0, 1, 2, b'H']);
        assert_eq!(
            n.receive(),
            Err(TransportError::FrameTruncated {
                declared: 2,
                received: 1
            })
        );
        assert_eq!(n.stats().truncated, 1);
    }

    #[test]
    fn stalled_relay_leaves_partial_frame_downstream() {
        let mut n = node(NodeId::Crying, &[0, 3, 2, b'R']);
        assert_eq!(
            n.receive(),
            Err(TransportError::ForwardTruncated {
                declared: 2,
                relayed: 1
            })
        );
        assert_eq!(n.transport().tx, vec![0, 3, 2, b'R']);
    }

    #[test]
    fn overlong_frame_is_clamped_and_drained() {
        let mut bytes = vec![2, 0, 12];
        bytes.extend(0..12u8);
        bytes.extend_from_slice(&[2, 0, 1, b'C']);
        let mut n = node(NodeId::Crying, &bytes);

        let Received::Delivered(first) = n.receive().unwrap() else {
            panic!("expected delivery");
        };
        assert_eq!(first.payload.as_slice(), &[0, 1, 2, 3, 4, 5, 6, 7]);

        let Received::Delivered(second) = n.receive().unwrap() else {
            panic!("expected delivery");
        };
        assert_eq!(second.payload.as_slice(), b"C");
    }

    #[test]
    fn unknown_source_is_rejected_after_draining() {
        let mut n = node(NodeId::Master, &[0, 7, 1, b'A', 0, 1, 1, b'A']);
        assert_eq!(n.receive(), Err(TransportError::UnknownSource(7)));
        assert!(matches!(n.receive(), Ok(Received::Delivered(_))));
    }

    #[test]
    fn frame_back_at_its_sender_is_dropped() {
        // Master's own motor command came all the way round.
        let mut n = node(NodeId::Master, &[3, 0, 3, b'M', 1, 1, 0, 1, 1, b'A']);
        assert_eq!(
            n.receive().unwrap(),
            Received::Dropped {
                dst: 3,
                src: 0,
                len: 3
            }
        );
        assert!(n.transport().tx.is_empty());
        assert_eq!(n.stats().dropped, 1);
        // The line stays in sync for the next frame.
        assert!(matches!(n.receive(), Ok(Received::Delivered(_))));

        let mut hb = node(NodeId::Heartbeat, &[0, 1, 1, b'A']);
        assert!(matches!(hb.receive(), Ok(Received::Dropped { .. })));
        assert!(hb.transport().tx.is_empty());
    }

    #[test]
    fn master_drops_frames_for_unknown_addresses() {
        let mut master = node(NodeId::Master, &[9, 2, 1, b'C']);
        assert_eq!(
            master.receive().unwrap(),
            Received::Dropped {
                dst: 9,
                src: 2,
                len: 1
            }
        );
        assert!(master.transport().tx.is_empty());

        // Peripherals still relay them.
        let mut cry = node(NodeId::Crying, &[9, 1, 1, b'C']);
        assert_eq!(cry.receive().unwrap(), Received::Forwarded { dst: 9, len: 1 });
        assert_eq!(cry.transport().tx, vec![9, 1, 1, b'C']);
    }

    #[test]
    fn has_input_reflects_queued_bytes() {
        let mut n = node(NodeId::Motor, &[3]);
        assert!(n.has_input().unwrap());
        assert_eq!(n.receive(), Err(TransportError::TimedOut));
        assert!(!n.has_input().unwrap());
    }

    #[test]
    fn zero_length_frame_delivers_empty_payload() {
        let mut n = node(NodeId::Motor, &[3, 0, 0]);
        let Received::Delivered(frame) = n.receive().unwrap() else {
            panic!("expected delivery");
        };
        assert!(frame.is_empty());
    }
}
