//! In-memory history storage for tests and ephemeral deployments.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use parlor_proto::ChatEntry;

use super::{HistoryError, HistoryStore};

/// History kept in a shared map; clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    rooms: Arc<Mutex<HashMap<u32, Vec<ChatEntry>>>>,
}

impl MemoryHistory {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistory {
    fn append(&self, room_id: u32, entry: &ChatEntry) -> Result<(), HistoryError> {
        let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        rooms.entry(room_id).or_default().push(entry.clone());
        Ok(())
    }

    fn replay(&self, room_id: u32) -> Result<Vec<ChatEntry>, HistoryError> {
        let rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(rooms.get(&room_id).cloned().unwrap_or_default())
    }

    fn remove_room(&self, room_id: u32) -> Result<(), HistoryError> {
        let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        rooms.remove(&room_id);
        Ok(())
    }
}
