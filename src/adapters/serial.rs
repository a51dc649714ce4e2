//! UART transport for the node boards.
//!
//! Each node owns one port: bytes are read from the upstream neighbour and
//! written to the downstream one over the same full-duplex UART, so the
//! physical ring is TX of node N wired to RX of node N+1.
//!
//! The port is opened with a short read timeout. A read that times out is
//! reported as "no data" so [`RingNode`](crate::bus::ring::RingNode) can
//! apply its own per-byte deadline on top.

use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::time::Duration;

use log::{debug, info};
use serial2::SerialPort;

use crate::bus::transport::Transport;

/// Bytes pulled from the driver per read call.
const READ_CHUNK: usize = 64;

pub struct SerialTransport {
    port: SerialPort,
    rx: VecDeque<u8>,
}

impl SerialTransport {
    /// Open `path` at `baud` (8N1) and discard anything already buffered.
    pub fn open(path: impl AsRef<Path>, baud: u32, read_timeout: Duration) -> io::Result<Self> {
        let path = path.as_ref();
        let mut port = SerialPort::open(path, baud)?;
        port.set_read_timeout(read_timeout)?;
        port.discard_input_buffer()?;
        info!("serial: opened {} at {baud} baud", path.display());
        Ok(Self {
            port,
            rx: VecDeque::with_capacity(READ_CHUNK),
        })
    }

    /// Names of the ports the OS reports.
    pub fn available_ports() -> io::Result<Vec<String>> {
        Ok(SerialPort::available_ports()?
            .into_iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect())
    }

    fn fill(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        match self.port.read(&mut chunk) {
            Ok(n) => {
                self.rx.extend(&chunk[..n]);
                Ok(())
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

impl Transport for SerialTransport {
    type Error = io::Error;

    fn poll_byte(&mut self) -> Result<Option<u8>, io::Error> {
        if self.rx.is_empty() {
            self.fill()?;
        }
        Ok(self.rx.pop_front())
    }

    fn send(&mut self, data: &[u8]) -> Result<(), io::Error> {
        self.port.write_all(data).inspect_err(|e| {
            debug!("serial: write of {} bytes failed: {e}", data.len());
        })
    }

    fn flush(&mut self) -> Result<(), io::Error> {
        self.port.flush()
    }

    fn has_input(&mut self) -> Result<bool, io::Error> {
        if self.rx.is_empty() {
            self.fill()?;
        }
        Ok(!self.rx.is_empty())
    }
}
