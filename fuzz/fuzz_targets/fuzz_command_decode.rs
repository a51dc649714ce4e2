//! Fuzz target: `Command::decode` / `Reply::decode`
//!
//! Any payload must decode to a value or an error without panicking, and
//! a decoded value must re-encode to a prefix of the input.
//!
//! cargo fuzz run fuzz_command_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use lullaby::bus::command::{Command, Reply};

fuzz_target!(|data: &[u8]| {
    if let Ok(cmd) = Command::decode(data) {
        let encoded = cmd.encode();
        assert!(data.starts_with(&encoded));
    }
    if let Ok(reply) = Reply::decode(data) {
        let encoded = reply.encode();
        assert!(data.starts_with(&encoded));
    }
});
