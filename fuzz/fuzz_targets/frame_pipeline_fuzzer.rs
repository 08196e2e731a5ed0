//! Fuzz target for the encode -> decode pipeline.
//!
//! Encodes arbitrary server events and feeds them back through the decoder,
//! checking the pipeline never produces a `Malformed` sentinel for a frame the
//! server itself emitted.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use parlor_proto::{ChatEntry, ServerEvent};

#[derive(Debug, Arbitrary)]
struct Line {
    from: String,
    text: String,
}

fuzz_target!(|lines: Vec<Line>| {
    let entries: Vec<ChatEntry> =
        lines.into_iter().map(|l| ChatEntry { from: l.from, text: l.text }).collect();

    let event = ServerEvent::History { entries };
    let Ok(encoded) = event.encode() else { return };

    let decoded = ServerEvent::decode(&encoded);
    assert!(!matches!(decoded, ServerEvent::Malformed { .. }));
});
