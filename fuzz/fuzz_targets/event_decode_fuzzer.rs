//! Fuzz target for `ServerEvent::decode`
//!
//! The decoder is a total function: every input must normalize to exactly one
//! typed event (`Malformed` for garbage). This fuzzer hunts for:
//! - Panics on malformed or adversarial JSON
//! - Payload shapes that bypass the legacy/structured normalization
//!
//! The fuzzer should NEVER panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use parlor_proto::ServerEvent;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = ServerEvent::decode(text);
    }
});
