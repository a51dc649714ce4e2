//! Lullaby: closed-loop infant soothing over a serial ring.
//!
//! Four nodes share a unidirectional ring: the master runs the
//! anchor-search controller, the heartbeat and crying nodes answer sensor
//! queries, and the motor node drives the rocker. The [`sim`] module is an
//! offline plant for exercising the controller without hardware.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod bus;
pub mod config;
pub mod control;
pub mod error;
pub mod safety;
pub mod sim;
