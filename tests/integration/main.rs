//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a subsystem against
//! mock or in-process adapters. All tests run on the host with no serial
//! hardware required.

mod controller_service_tests;
mod mock_hw;
mod ring_tests;
