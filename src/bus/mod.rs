//! Serial ring bus.
//!
//! Four nodes share one unidirectional ring. Every frame travels downstream
//! until it reaches its destination, relayed byte by byte by each node in
//! between.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                        Bus Stack                           │
//! │                                                            │
//! │  ┌───────────┐   ┌──────────┐   ┌───────────────────────┐ │
//! │  │ Transport │──▶│   Ring   │──▶│ SensorQueryClient     │ │
//! │  │ (trait)   │   │ (framing,│   │  (master)             │ │
//! │  └───────────┘   │ forward) │   ├───────────────────────┤ │
//! │                  └──────────┘   │ PeripheralNode        │ │
//! │                       ▲         │  (HB / CRY / MTR)     │ │
//! │                  ┌──────────┐   └───────────────────────┘ │
//! │                  │  Codec   │                              │
//! │                  │ Command  │                              │
//! │                  └──────────┘                              │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod client;
pub mod codec;
pub mod command;
pub mod ring;
pub mod transport;
