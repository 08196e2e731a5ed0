//! Chat history storage abstraction.
//!
//! Trait-based abstraction for persisting room history. The trait is
//! synchronous (no async) to maintain a clean synchronous API design;
//! implementations share internal state via `Arc`, so clones access the same
//! underlying storage.

mod jsonl;
mod memory;

pub use jsonl::JsonlHistory;
pub use memory::MemoryHistory;
use parlor_proto::ChatEntry;
use thiserror::Error;

/// Errors from history storage backends.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Filesystem operation failed.
    #[error("history I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Entry (de)serialization failed.
    #[error("history serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Timestamp formatting failed.
    #[error("timestamp formatting failed: {0}")]
    Timestamp(#[from] time::error::Format),
}

/// Storage abstraction for room chat history.
///
/// Must be `Clone` (shared across connection tasks), `Send + Sync`, and
/// synchronous. The history a room accumulates lives exactly as long as the
/// room: [`HistoryStore::remove_room`] is called when the last occupant
/// leaves.
pub trait HistoryStore: Clone + Send + Sync + 'static {
    /// Append one chat line to a room's history.
    fn append(&self, room_id: u32, entry: &ChatEntry) -> Result<(), HistoryError>;

    /// All stored lines for a room, oldest first.
    ///
    /// A room with no stored history replays as empty — absence is not an
    /// error.
    fn replay(&self, room_id: u32) -> Result<Vec<ChatEntry>, HistoryError>;

    /// Drop a room's history entirely. Idempotent.
    fn remove_room(&self, room_id: u32) -> Result<(), HistoryError>;
}
