//! Outbound client frames.
//!
//! Two envelopes cover everything a client ever sends: one `init` frame
//! immediately after the transport opens, then any number of `message` frames
//! while joined. Field names are fixed by the wire contract
//! (`displayName`/`roomData` camel case, `choice` as `"1"`/`"2"`).

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Whether the client wants to create a fresh room or join an existing one.
///
/// Serialized as `"1"` (create) / `"2"` (join) on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomChoice {
    /// Create a new room; `room_data` carries the capacity.
    #[serde(rename = "1")]
    Create,
    /// Join an existing room; `room_data` carries the room identifier.
    #[serde(rename = "2")]
    Join,
}

/// A frame sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    /// Join/create handshake. Sent exactly once, right after the transport
    /// reports open, never before.
    #[serde(rename = "init")]
    Init {
        /// Client-generated opaque session identifier.
        id: String,
        /// Trimmed display name.
        #[serde(rename = "displayName")]
        display_name: String,
        /// Create or join.
        choice: RoomChoice,
        /// Capacity (create) or room identifier (join), as a string.
        #[serde(rename = "roomData")]
        room_data: String,
    },

    /// A chat line. Only valid while joined; `text` is non-empty and trimmed
    /// by the sender.
    #[serde(rename = "message")]
    Chat {
        /// Message payload.
        text: String,
    },
}

impl ClientFrame {
    /// Serialize into a single text frame.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
