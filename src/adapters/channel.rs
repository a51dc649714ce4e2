//! In-process ring over `std::sync::mpsc` channels.
//!
//! [`ring`] wires `count` transports so node `i` writes to node `i + 1`
//! and the last node writes back to node 0, mirroring the UART wiring.
//! Used to run all four nodes as threads on one host.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use crate::bus::transport::Transport;

/// The downstream neighbour hung up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disconnected;

pub struct ChannelTransport {
    tx: Sender<u8>,
    rx: Receiver<u8>,
    pending: VecDeque<u8>,
    upstream_gone: bool,
}

impl ChannelTransport {
    pub fn new(tx: Sender<u8>, rx: Receiver<u8>) -> Self {
        Self {
            tx,
            rx,
            pending: VecDeque::new(),
            upstream_gone: false,
        }
    }

    fn pull(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(byte) => self.pending.push_back(byte),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.upstream_gone = true;
                    break;
                }
            }
        }
    }
}

/// Build a closed ring of `count` transports. Index `i` is node `i`.
pub fn ring(count: usize) -> Vec<ChannelTransport> {
    let (senders, receivers): (Vec<_>, Vec<_>) = (0..count).map(|_| mpsc::channel::<u8>()).unzip();
    // Node i receives on channel i and sends on channel i + 1.
    let mut receivers: VecDeque<Receiver<u8>> = receivers.into();
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let tx = senders[(i + 1) % count].clone();
        if let Some(rx) = receivers.pop_front() {
            out.push(ChannelTransport::new(tx, rx));
        }
    }
    out
}

impl Transport for ChannelTransport {
    type Error = Disconnected;

    fn poll_byte(&mut self) -> Result<Option<u8>, Disconnected> {
        if self.has_input()? {
            Ok(self.pending.pop_front())
        } else {
            Ok(None)
        }
    }

    fn send(&mut self, data: &[u8]) -> Result<(), Disconnected> {
        for &byte in data {
            self.tx.send(byte).map_err(|_| Disconnected)?;
        }
        Ok(())
    }

    /// Reports [`Disconnected`] once the upstream sender is gone and every
    /// byte it sent has been read.
    fn has_input(&mut self) -> Result<bool, Disconnected> {
        self.pull();
        if self.pending.is_empty() && self.upstream_gone {
            return Err(Disconnected);
        }
        Ok(!self.pending.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_links_each_node_to_the_next() {
        let mut nodes = ring(3);
        nodes[0].send(&[1, 2]).unwrap();
        nodes[2].send(&[9]).unwrap();

        assert_eq!(nodes[1].poll_byte().unwrap(), Some(1));
        assert_eq!(nodes[1].poll_byte().unwrap(), Some(2));
        assert_eq!(nodes[0].poll_byte().unwrap(), Some(9));
        assert_eq!(nodes[2].poll_byte().unwrap(), None);
    }

    #[test]
    fn has_input_sees_queued_bytes() {
        let mut nodes = ring(2);
        assert!(!nodes[1].has_input().unwrap());
        nodes[0].send(&[5, 6]).unwrap();
        assert!(nodes[1].has_input().unwrap());
        assert_eq!(nodes[1].poll_byte().unwrap(), Some(5));
        assert!(nodes[1].has_input().unwrap());
        assert_eq!(nodes[1].poll_byte().unwrap(), Some(6));
        assert!(!nodes[1].has_input().unwrap());
    }

    #[test]
    fn dropped_upstream_is_reported_once_drained() {
        let mut nodes = ring(2);
        nodes[0].send(&[1]).unwrap();
        let mut downstream = nodes.pop().unwrap();
        // Node 0 holds the only sender into node 1.
        drop(nodes);
        assert_eq!(downstream.poll_byte(), Ok(Some(1)));
        assert_eq!(downstream.poll_byte(), Err(Disconnected));
        assert_eq!(downstream.has_input(), Err(Disconnected));
    }
}
