//! Application core: domain orchestration, I/O only through ports.
//!
//! This module contains the node services for the lullaby ring: the
//! controller (boot ping, communication check, control loop) and the three
//! peripheral roles. All interaction with hardware and time happens through
//! **port traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod events;
pub mod peripheral;
pub mod ports;
pub mod service;
