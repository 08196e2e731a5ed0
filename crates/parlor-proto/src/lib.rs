//! Wire codec for the Parlor chat-room protocol.
//!
//! Frames are text, one JSON object per frame. Outbound frames (client to
//! server) are [`ClientFrame`]; inbound frames normalize to [`ServerEvent`].
//!
//! The protocol grew out of two wire generations that both remain in use:
//!
//! - the current encoding tags frames with `"type":"response"` /
//!   `"type":"error"` and carries a structured payload, and
//! - the legacy encoding delivers everything as `{from, text}` pairs, with a
//!   reserved `"system"` sender for protocol notices.
//!
//! [`ServerEvent::decode`] accepts both and produces the same typed events, so
//! nothing above the codec needs to know which generation the server speaks.
//!
//! Decoding is total: a frame that matches no known shape yields the local
//! [`ServerEvent::Malformed`] sentinel instead of an error. A single corrupt
//! frame must never tear down an otherwise healthy session.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod errors;
mod inbound;
mod outbound;

pub use errors::{ProtoError, Result};
pub use inbound::{ChatEntry, RejectReason, ServerEvent};
pub use outbound::{ClientFrame, RoomChoice};

/// Reserved sender name for protocol-level notices on the legacy channel.
pub const SYSTEM_SENDER: &str = "system";

/// Accepted capacity range for created rooms, enforced on both sides of the
/// wire: locally before the Init frame goes out, and again by the server.
pub const CAPACITY_RANGE: std::ops::RangeInclusive<u32> = 1..=20;
