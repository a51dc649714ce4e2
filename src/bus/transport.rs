//! Link abstraction: the byte path between two ring neighbours.
//!
//! A node reads from its upstream neighbour and writes to its downstream
//! one. Reads never block: [`Transport::poll_byte`] yields `None` on a quiet
//! line and [`RingNode`](super::ring::RingNode) applies its own per-byte
//! deadline on top.
//!
//! Links: [`SerialTransport`](crate::adapters::serial::SerialTransport) on
//! the node boards, [`ChannelTransport`](crate::adapters::channel::ChannelTransport)
//! for an in-process ring.

pub trait Transport {
    type Error: core::fmt::Debug;

    /// Next byte from upstream, or `None` while the line is quiet.
    fn poll_byte(&mut self) -> Result<Option<u8>, Self::Error>;

    /// Hand all of `data` to the downstream neighbour.
    fn send(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Push anything still buffered onto the line.
    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// True when an upstream byte is already waiting. May pull from the
    /// driver; never waits longer than the link's own read timeout.
    fn has_input(&mut self) -> Result<bool, Self::Error>;
}

/// A link with nothing attached: writes vanish, reads stay quiet.
pub struct NullTransport;

impl Transport for NullTransport {
    type Error = ();

    fn poll_byte(&mut self) -> Result<Option<u8>, ()> {
        Ok(None)
    }

    fn send(&mut self, _data: &[u8]) -> Result<(), ()> {
        Ok(())
    }

    fn has_input(&mut self) -> Result<bool, ()> {
        Ok(false)
    }
}
