//! Fuzz target: `FrameDecoder::feed`
//!
//! Drives arbitrary byte sequences into the streaming ring decoder and
//! asserts that it never panics, never yields an oversize payload, and
//! behaves the same after a reset.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use lullaby::bus::codec::{FrameDecoder, MAX_PAYLOAD};

fuzz_target!(|data: &[u8]| {
    let mut decoder = FrameDecoder::new();

    let first = decoder.feed(data);
    for frame in &first {
        assert!(frame.payload.len() <= MAX_PAYLOAD, "payload exceeds MAX_PAYLOAD");
        // Re-encoding a decoded frame must decode to the same frame.
        let mut again = FrameDecoder::new();
        assert_eq!(again.feed(&frame.encode()), vec![frame.clone()]);
    }

    decoder.reset();
    let second = decoder.feed(data);
    assert_eq!(first, second, "reset decoder must replay identically");
});
