//! Inbound server events and the normalizing decoder.
//!
//! Every server frame, regardless of wire generation, decodes to exactly one
//! [`ServerEvent`]. The decoder is a total function: it never panics and never
//! returns an error. Frames that match no known shape become the local
//! [`ServerEvent::Malformed`] sentinel, which callers log and drop.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::{
    SYSTEM_SENDER,
    errors::{ProtoError, Result},
};

/// Wire sentinel for a missing room.
const REJECT_ROOM_NOT_FOUND: &str = "room-not-found";
/// Wire sentinel for a room at capacity.
const REJECT_ROOM_FULL: &str = "room-full";
/// Wire sentinel for an out-of-range capacity.
const REJECT_INVALID_CAPACITY: &str = "invalid-capacity";
/// Wire sentinel for a session identifier already in use.
const REJECT_DUPLICATE_IDENTITY: &str = "duplicate-uuid";

/// Legacy system-channel prefix announcing a successful join.
const LEGACY_JOINED_PREFIX: &str = "joined-room";

/// Server-declared terminal failure of a join/create attempt.
///
/// Distinct from transport errors: a rejection is an application-level verdict
/// and always ends the connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The requested room identifier does not exist.
    RoomNotFound,
    /// The room is already at capacity.
    RoomFull,
    /// The requested capacity is outside the accepted range.
    InvalidCapacity,
    /// The supplied session identifier is already registered.
    DuplicateIdentity,
}

impl RejectReason {
    /// Map a wire sentinel to a reason. `None` for unknown sentinels.
    pub fn from_sentinel(sentinel: &str) -> Option<Self> {
        match sentinel {
            REJECT_ROOM_NOT_FOUND => Some(Self::RoomNotFound),
            REJECT_ROOM_FULL => Some(Self::RoomFull),
            REJECT_INVALID_CAPACITY => Some(Self::InvalidCapacity),
            REJECT_DUPLICATE_IDENTITY => Some(Self::DuplicateIdentity),
            _ => None,
        }
    }

    /// The sentinel string used on the wire for this reason.
    pub fn sentinel(self) -> &'static str {
        match self {
            Self::RoomNotFound => REJECT_ROOM_NOT_FOUND,
            Self::RoomFull => REJECT_ROOM_FULL,
            Self::InvalidCapacity => REJECT_INVALID_CAPACITY,
            Self::DuplicateIdentity => REJECT_DUPLICATE_IDENTITY,
        }
    }

    /// Message shown to the user when this rejection arrives.
    pub fn user_message(self) -> &'static str {
        match self {
            Self::RoomNotFound => "room does not exist",
            Self::RoomFull => "room is already full",
            Self::InvalidCapacity => "capacity must be 1-20",
            Self::DuplicateIdentity => "duplicate session detected",
        }
    }
}

/// One replayed or live chat line as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    /// Display name of the originator.
    pub from: String,
    /// Message payload.
    pub text: String,
}

/// A server frame normalized to its typed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// The join/create handshake succeeded.
    Joined {
        /// Canonical room identifier assigned by the server.
        room_id: String,
    },

    /// Replay of prior chat lines, in delivery order. Servers may send the
    /// whole history as one batch or one entry per frame; both land here.
    History {
        /// Replayed lines, oldest first.
        entries: Vec<ChatEntry>,
    },

    /// A live chat line.
    Message {
        /// Display name of the originator.
        from: String,
        /// Message payload.
        text: String,
    },

    /// Current room occupancy. Replaces any previously received value.
    Occupancy {
        /// Current occupant count.
        current: u32,
        /// Capacity ceiling.
        max: u32,
    },

    /// The join/create handshake was refused.
    Rejected(RejectReason),

    /// Application-level error not tied to the join handshake.
    ProtocolError {
        /// Server-supplied description.
        message: String,
    },

    /// The frame failed to parse as any known event. Local sentinel, never
    /// produced by a well-formed server frame.
    Malformed {
        /// What the decoder objected to.
        detail: String,
    },
}

impl ServerEvent {
    /// Decode one text frame into its typed event.
    ///
    /// Total: any input yields exactly one event. Unknown shapes become
    /// [`ServerEvent::Malformed`].
    pub fn decode(text: &str) -> Self {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(err) => return Self::Malformed { detail: format!("invalid JSON: {err}") },
        };

        let Some(frame) = value.as_object() else {
            return Self::Malformed { detail: "frame is not a JSON object".to_string() };
        };

        match frame.get("type").and_then(Value::as_str) {
            Some("response") => Self::decode_response(frame),
            Some("error") => Self::decode_error(frame),
            Some(other) => Self::Malformed { detail: format!("unknown frame type {other:?}") },
            // No type tag: the legacy {from, text} channel.
            None => Self::decode_legacy(frame),
        }
    }

    /// Serialize into the structured wire encoding.
    ///
    /// # Errors
    ///
    /// [`ProtoError::NotEncodable`] for [`ServerEvent::Malformed`], which is a
    /// local sentinel with no wire representation.
    pub fn encode(&self) -> Result<String> {
        let value = match self {
            Self::Joined { room_id } => {
                // Historical servers carry roomID as a bare integer; keep
                // numeric identifiers numeric on the wire.
                let room_id = room_id
                    .parse::<u64>()
                    .map_or_else(|_| Value::from(room_id.clone()), Value::from);
                json!({ "type": "response", "event": "joined", "payload": { "roomID": room_id } })
            },
            Self::History { entries } => {
                let payload = if let [entry] = entries.as_slice() {
                    serde_json::to_value(entry)?
                } else {
                    serde_json::to_value(entries)?
                };
                json!({ "type": "response", "event": "history", "payload": payload })
            },
            Self::Message { from, text } => {
                json!({
                    "type": "response",
                    "event": "message",
                    "payload": { "from": from, "text": text },
                })
            },
            Self::Occupancy { current, max } => {
                json!({
                    "type": "response",
                    "event": "occupancy",
                    "payload": { "current": current, "max": max },
                })
            },
            Self::Rejected(reason) => {
                json!({ "type": "error", "message": reason.sentinel() })
            },
            Self::ProtocolError { message } => {
                json!({ "type": "error", "message": message })
            },
            Self::Malformed { .. } => {
                return Err(ProtoError::NotEncodable("Malformed is a local sentinel"));
            },
        };

        Ok(serde_json::to_string(&value)?)
    }

    fn decode_response(frame: &Map<String, Value>) -> Self {
        let Some(event) = frame.get("event").and_then(Value::as_str) else {
            return Self::Malformed { detail: "response frame without event tag".to_string() };
        };
        let payload = frame.get("payload").unwrap_or(&Value::Null);

        match event {
            "joined" => match payload.get("roomID") {
                Some(Value::String(id)) if !id.is_empty() => Self::Joined { room_id: id.clone() },
                Some(Value::Number(id)) => Self::Joined { room_id: id.to_string() },
                _ => Self::Malformed { detail: "joined response without roomID".to_string() },
            },
            "history" => Self::decode_history(payload),
            "message" => chat_entry(payload).map_or_else(
                || Self::Malformed { detail: "message response without from/text".to_string() },
                |entry| Self::Message { from: entry.from, text: entry.text },
            ),
            "occupancy" => {
                let current = payload.get("current").and_then(Value::as_u64);
                let max = payload.get("max").and_then(Value::as_u64);
                match (current, max) {
                    (Some(current), Some(max)) => {
                        match (u32::try_from(current), u32::try_from(max)) {
                            (Ok(current), Ok(max)) => Self::Occupancy { current, max },
                            _ => Self::Malformed {
                                detail: "occupancy counts out of range".to_string(),
                            },
                        }
                    },
                    _ => Self::Malformed { detail: "occupancy without current/max".to_string() },
                }
            },
            other => Self::Malformed { detail: format!("unknown response event {other:?}") },
        }
    }

    /// History payloads come in two shapes: a single `{from, text}` object or
    /// an array of them. Neither shape is guaranteed by the server.
    fn decode_history(payload: &Value) -> Self {
        if let Some(items) = payload.as_array() {
            let mut entries = Vec::with_capacity(items.len());
            for item in items {
                match chat_entry(item) {
                    Some(entry) => entries.push(entry),
                    None => {
                        return Self::Malformed {
                            detail: "history batch entry without from/text".to_string(),
                        };
                    },
                }
            }
            return Self::History { entries };
        }

        chat_entry(payload).map_or_else(
            || Self::Malformed { detail: "history payload without from/text".to_string() },
            |entry| Self::History { entries: vec![entry] },
        )
    }

    fn decode_error(frame: &Map<String, Value>) -> Self {
        let Some(message) = frame.get("message").and_then(Value::as_str) else {
            return Self::Malformed { detail: "error frame without message".to_string() };
        };

        RejectReason::from_sentinel(message).map_or_else(
            || Self::ProtocolError { message: message.to_string() },
            Self::Rejected,
        )
    }

    /// Legacy channel: `{from, text}` with a reserved `"system"` sender for
    /// protocol notices.
    fn decode_legacy(frame: &Map<String, Value>) -> Self {
        let from = frame.get("from").and_then(Value::as_str);
        let text = frame.get("text").and_then(Value::as_str);
        let (Some(from), Some(text)) = (from, text) else {
            return Self::Malformed { detail: "frame matches no known shape".to_string() };
        };

        if from != SYSTEM_SENDER {
            return Self::Message { from: from.to_string(), text: text.to_string() };
        }

        if let Some(reason) = RejectReason::from_sentinel(text) {
            return Self::Rejected(reason);
        }

        if let Some(rest) = text.strip_prefix(LEGACY_JOINED_PREFIX) {
            let room_id = rest.trim();
            if room_id.is_empty() {
                return Self::Malformed {
                    detail: "legacy joined notice without room id".to_string(),
                };
            }
            return Self::Joined { room_id: room_id.to_string() };
        }

        // Any other system text is a protocol notice shown inline.
        Self::Message { from: from.to_string(), text: text.to_string() }
    }
}

/// Extract a `{from, text}` pair. `None` if either field is missing.
fn chat_entry(value: &Value) -> Option<ChatEntry> {
    let from = value.get("from")?.as_str()?;
    let text = value.get("text")?.as_str()?;
    Some(ChatEntry { from: from.to_string(), text: text.to_string() })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn decode_joined_with_numeric_room_id() {
        let event =
            ServerEvent::decode(r#"{"type":"response","event":"joined","payload":{"roomID":42}}"#);
        assert_eq!(event, ServerEvent::Joined { room_id: "42".to_string() });
    }

    #[test]
    fn decode_joined_with_string_room_id() {
        let event = ServerEvent::decode(
            r#"{"type":"response","event":"joined","payload":{"roomID":"42"}}"#,
        );
        assert_eq!(event, ServerEvent::Joined { room_id: "42".to_string() });
    }

    #[test]
    fn decode_history_single_entry() {
        let event = ServerEvent::decode(
            r#"{"type":"response","event":"history","payload":{"from":"Alice","text":"hi"}}"#,
        );
        assert_eq!(event, ServerEvent::History {
            entries: vec![ChatEntry { from: "Alice".to_string(), text: "hi".to_string() }],
        });
    }

    #[test]
    fn decode_history_batch() {
        let event = ServerEvent::decode(
            r#"{"type":"response","event":"history","payload":[
                {"from":"Alice","text":"a"},
                {"from":"Bob","text":"b"}
            ]}"#,
        );
        match event {
            ServerEvent::History { entries } => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0].from, "Alice");
                assert_eq!(entries[1].text, "b");
            },
            other => panic!("expected History, got {other:?}"),
        }
    }

    #[test]
    fn decode_message() {
        let event = ServerEvent::decode(
            r#"{"type":"response","event":"message","payload":{"from":"Bob","text":"yo"}}"#,
        );
        assert_eq!(event, ServerEvent::Message { from: "Bob".to_string(), text: "yo".to_string() });
    }

    #[test]
    fn decode_occupancy() {
        let event = ServerEvent::decode(
            r#"{"type":"response","event":"occupancy","payload":{"current":2,"max":5}}"#,
        );
        assert_eq!(event, ServerEvent::Occupancy { current: 2, max: 5 });
    }

    #[test]
    fn structured_rejection_normalizes() {
        let event = ServerEvent::decode(r#"{"type":"error","message":"room-full"}"#);
        assert_eq!(event, ServerEvent::Rejected(RejectReason::RoomFull));
    }

    #[test]
    fn legacy_rejection_normalizes_to_same_event() {
        let legacy = ServerEvent::decode(r#"{"from":"system","text":"duplicate-uuid"}"#);
        let structured = ServerEvent::decode(r#"{"type":"error","message":"duplicate-uuid"}"#);
        assert_eq!(legacy, structured);
        assert_eq!(legacy, ServerEvent::Rejected(RejectReason::DuplicateIdentity));
    }

    #[test]
    fn legacy_joined_notice() {
        let event = ServerEvent::decode(r#"{"from":"system","text":"joined-room 12345"}"#);
        assert_eq!(event, ServerEvent::Joined { room_id: "12345".to_string() });
    }

    #[test]
    fn legacy_system_notice_is_a_message() {
        let event = ServerEvent::decode(r#"{"from":"system","text":"server restarting soon"}"#);
        assert_eq!(event, ServerEvent::Message {
            from: "system".to_string(),
            text: "server restarting soon".to_string(),
        });
    }

    #[test]
    fn legacy_chat_line() {
        let event = ServerEvent::decode(r#"{"from":"Alice","text":"hello"}"#);
        assert_eq!(
            event,
            ServerEvent::Message { from: "Alice".to_string(), text: "hello".to_string() }
        );
    }

    #[test]
    fn unknown_error_message_is_protocol_error() {
        let event = ServerEvent::decode(r#"{"type":"error","message":"rate limited"}"#);
        assert_eq!(event, ServerEvent::ProtocolError { message: "rate limited".to_string() });
    }

    #[test]
    fn garbage_is_malformed_not_panic() {
        for frame in [
            "",
            "not json",
            "[1,2,3]",
            "42",
            r#"{"type":"response"}"#,
            r#"{"type":"response","event":"joined","payload":{}}"#,
            r#"{"type":"response","event":"occupancy","payload":{"current":-1,"max":5}}"#,
            r#"{"type":"teapot"}"#,
            r#"{"from":"system","text":"joined-room"}"#,
            r#"{"text":"orphan"}"#,
        ] {
            let event = ServerEvent::decode(frame);
            assert!(matches!(event, ServerEvent::Malformed { .. }), "frame {frame:?} -> {event:?}");
        }
    }

    #[test]
    fn encode_rejection_uses_structured_form() {
        let encoded = ServerEvent::Rejected(RejectReason::InvalidCapacity).encode().unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["message"], "invalid-capacity");
    }

    #[test]
    fn encode_joined_keeps_numeric_ids_numeric() {
        let encoded = ServerEvent::Joined { room_id: "42".to_string() }.encode().unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["payload"]["roomID"], 42);
    }

    #[test]
    fn encode_single_history_entry_as_object() {
        let event = ServerEvent::History {
            entries: vec![ChatEntry { from: "Alice".to_string(), text: "hi".to_string() }],
        };
        let value: Value = serde_json::from_str(&event.encode().unwrap()).unwrap();
        assert!(value["payload"].is_object());
        assert_eq!(ServerEvent::decode(&event.encode().unwrap()), event);
    }

    #[test]
    fn malformed_is_not_encodable() {
        let result = ServerEvent::Malformed { detail: "x".to_string() }.encode();
        assert!(matches!(result, Err(ProtoError::NotEncodable(_))));
    }

    #[test]
    fn reject_reason_messages() {
        assert_eq!(RejectReason::RoomNotFound.user_message(), "room does not exist");
        assert_eq!(RejectReason::RoomFull.user_message(), "room is already full");
        assert_eq!(RejectReason::InvalidCapacity.user_message(), "capacity must be 1-20");
        assert_eq!(RejectReason::DuplicateIdentity.user_message(), "duplicate session detected");
    }
}
