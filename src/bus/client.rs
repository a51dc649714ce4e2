//! Master-side sensor query client.
//!
//! Sends a command frame and polls the ring for the matching reply. Replies
//! are matched by source address and reply tag only; anything else that
//! reaches the master (late replies from an earlier query, noise, frames
//! that cannot be decoded) is logged and skipped.

use core::time::Duration;

use log::{debug, trace};

use super::codec::NodeId;
use super::command::{Command, Reply};
use super::ring::{Received, RingNode};
use super::transport::Transport;
use crate::app::ports::{ClockPort, Deadline};
use crate::control::grid::GridCell;
use crate::error::{QueryError, TransportError};

pub struct SensorQueryClient<T: Transport, C: ClockPort> {
    node: RingNode<T, C>,
    timeout: Duration,
}

impl<T: Transport, C: ClockPort> SensorQueryClient<T, C> {
    /// Wrap a master ring node. `timeout` bounds every typed query.
    pub fn new(node: RingNode<T, C>, timeout: Duration) -> Self {
        Self { node, timeout }
    }

    pub fn node(&self) -> &RingNode<T, C> {
        &self.node
    }

    /// Send `cmd` to `dst` and wait up to `timeout` for its reply.
    ///
    /// The deadline is checked between frames, so a reply that is already
    /// arriving when it passes is still read to completion.
    pub fn query(&mut self, dst: NodeId, cmd: Command, timeout: Duration) -> Result<Reply, QueryError> {
        let src = self.node.local();
        self.node
            .send(dst, src, &cmd.encode())
            .map_err(QueryError::SendFailed)?;

        let tag = cmd.tag();
        let deadline = Deadline::after(self.node.clock(), timeout);
        loop {
            match self.node.receive() {
                Ok(Received::Delivered(frame)) if frame.src == dst => {
                    match Reply::decode(&frame.payload) {
                        Ok(reply) if reply.tag() == tag => return Ok(reply),
                        Ok(reply) => debug!("query: ignoring {reply:?} from {dst}, want '{}'", char::from(tag)),
                        Err(e) => debug!("query: ignoring undecodable reply from {dst}: {e}"),
                    }
                }
                Ok(Received::Delivered(frame)) => {
                    debug!("query: ignoring frame from {} while waiting on {dst}", frame.src);
                }
                Ok(Received::Forwarded { .. } | Received::Dropped { .. }) | Err(TransportError::TimedOut) => {}
                Err(e) => {
                    trace!("query: receive error {e}");
                    self.node.clock().sleep(self.node.poll_interval());
                }
            }
            if deadline.expired(self.node.clock()) {
                return Err(QueryError::Timeout { node: dst, tag });
            }
        }
    }

    /// Liveness check.
    pub fn ping(&mut self, dst: NodeId) -> Result<(), QueryError> {
        self.query(dst, Command::Ping, self.timeout).map(|_| ())
    }

    /// Random probe; returns the node's random byte.
    pub fn random(&mut self, dst: NodeId) -> Result<u8, QueryError> {
        self.query_value(dst, Command::RandomProbe)
    }

    pub fn heartbeat(&mut self) -> Result<u8, QueryError> {
        self.query_value(NodeId::Heartbeat, Command::HeartbeatQuery)
    }

    pub fn crying(&mut self) -> Result<u8, QueryError> {
        self.query_value(NodeId::Crying, Command::CryingQuery)
    }

    /// Fire-and-forget motor command; the motor never replies.
    pub fn command_motor(&mut self, cell: GridCell) -> Result<(), QueryError> {
        let src = self.node.local();
        self.node
            .send(NodeId::Motor, src, &Command::motor(cell).encode())
            .map_err(QueryError::SendFailed)
    }

    fn query_value(&mut self, dst: NodeId, cmd: Command) -> Result<u8, QueryError> {
        let reply = self.query(dst, cmd, self.timeout)?;
        // A tag match on R/H/C always carries a data byte.
        Ok(reply.value().unwrap_or_default())
    }
}
