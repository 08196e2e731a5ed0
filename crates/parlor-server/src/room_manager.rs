//! Room manager: capacity-bounded rooms and per-room broadcast.
//!
//! Rooms are created explicitly with a capacity in the accepted range and
//! keyed by a random five-digit identifier, unique among live rooms. Each
//! room owns a broadcast channel; connection tasks subscribe on join and fan
//! frames out through it. A room is dropped the moment its last occupant
//! leaves.

use std::collections::HashMap;

use parlor_proto::{CAPACITY_RANGE, RejectReason};
use rand::Rng;
use thiserror::Error;
use tokio::sync::broadcast;

/// Five-digit room identifier range.
const ROOM_ID_RANGE: std::ops::RangeInclusive<u32> = 10_000..=99_999;

/// Broadcast backlog per room before slow subscribers start lagging.
const ROOM_CHANNEL_CAPACITY: usize = 100;

/// Why a create/join request was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JoinError {
    /// The requested room identifier does not exist.
    #[error("room {0:?} does not exist")]
    RoomNotFound(String),

    /// The room is already at capacity.
    #[error("room {0} is already full")]
    RoomFull(u32),

    /// The requested capacity does not parse or is out of range.
    #[error("capacity {0:?} outside accepted range")]
    InvalidCapacity(String),
}

impl JoinError {
    /// The wire-level rejection this error maps to.
    pub fn reject_reason(&self) -> RejectReason {
        match self {
            Self::RoomNotFound(_) => RejectReason::RoomNotFound,
            Self::RoomFull(_) => RejectReason::RoomFull,
            Self::InvalidCapacity(_) => RejectReason::InvalidCapacity,
        }
    }
}

/// Result of a successful create or join.
#[derive(Debug)]
pub struct JoinInfo {
    /// Identifier of the joined room.
    pub room_id: u32,
    /// Occupant count after the join.
    pub current: u32,
    /// Capacity ceiling.
    pub max: u32,
    /// The room's broadcast channel.
    pub broadcast: broadcast::Sender<String>,
}

/// Result of leaving a room.
#[derive(Debug)]
pub struct Departure {
    /// Whether the room emptied and was dropped.
    pub emptied: bool,
    /// Occupant count after the departure.
    pub current: u32,
    /// Capacity ceiling.
    pub max: u32,
    /// The room's broadcast channel, for the occupancy update to the
    /// remaining occupants.
    pub broadcast: broadcast::Sender<String>,
}

/// One live room.
#[derive(Debug)]
struct Room {
    capacity: u32,
    occupants: Vec<String>,
    broadcast: broadcast::Sender<String>,
}

impl Room {
    fn is_full(&self) -> bool {
        self.occupants.len() as u32 >= self.capacity
    }
}

/// All live rooms, keyed by identifier.
#[derive(Debug, Default)]
pub struct RoomManager {
    rooms: HashMap<u32, Room>,
}

impl RoomManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a room and join the creator to it.
    ///
    /// `capacity_text` is the raw `roomData` string from the Init frame; it
    /// is re-validated here even though clients check locally.
    pub fn create_room(
        &mut self,
        capacity_text: &str,
        session_id: &str,
    ) -> Result<JoinInfo, JoinError> {
        let capacity: u32 = capacity_text
            .trim()
            .parse()
            .map_err(|_| JoinError::InvalidCapacity(capacity_text.to_string()))?;
        if !CAPACITY_RANGE.contains(&capacity) {
            return Err(JoinError::InvalidCapacity(capacity_text.to_string()));
        }

        let room_id = self.allocate_room_id();
        let (broadcast, _) = broadcast::channel(ROOM_CHANNEL_CAPACITY);
        self.rooms.insert(room_id, Room {
            capacity,
            occupants: vec![session_id.to_string()],
            broadcast: broadcast.clone(),
        });

        Ok(JoinInfo { room_id, current: 1, max: capacity, broadcast })
    }

    /// Join an existing room.
    ///
    /// `room_text` is the raw `roomData` string; anything that does not name
    /// a live room is `RoomNotFound` (room existence is a server-side check
    /// by nature).
    pub fn join_room(&mut self, room_text: &str, session_id: &str) -> Result<JoinInfo, JoinError> {
        let room_id: u32 = room_text
            .trim()
            .parse()
            .map_err(|_| JoinError::RoomNotFound(room_text.to_string()))?;

        let room = self
            .rooms
            .get_mut(&room_id)
            .ok_or_else(|| JoinError::RoomNotFound(room_text.to_string()))?;

        if room.is_full() {
            return Err(JoinError::RoomFull(room_id));
        }

        room.occupants.push(session_id.to_string());
        Ok(JoinInfo {
            room_id,
            current: room.occupants.len() as u32,
            max: room.capacity,
            broadcast: room.broadcast.clone(),
        })
    }

    /// Remove an occupant. Drops the room once it empties.
    ///
    /// Returns `None` if the room or occupant is unknown.
    pub fn leave_room(&mut self, room_id: u32, session_id: &str) -> Option<Departure> {
        let room = self.rooms.get_mut(&room_id)?;
        let index = room.occupants.iter().position(|id| id == session_id)?;
        room.occupants.remove(index);

        let current = room.occupants.len() as u32;
        let max = room.capacity;
        let broadcast = room.broadcast.clone();

        let emptied = room.occupants.is_empty();
        if emptied {
            self.rooms.remove(&room_id);
        }

        Some(Departure { emptied, current, max, broadcast })
    }

    /// Current `(occupants, capacity)` for a room. `None` if unknown.
    pub fn occupancy(&self, room_id: u32) -> Option<(u32, u32)> {
        let room = self.rooms.get(&room_id)?;
        Some((room.occupants.len() as u32, room.capacity))
    }

    /// Whether a room is live.
    pub fn contains(&self, room_id: u32) -> bool {
        self.rooms.contains_key(&room_id)
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Pick a five-digit identifier not used by any live room.
    fn allocate_room_id(&self) -> u32 {
        let mut rng = rand::rng();
        loop {
            let candidate = rng.random_range(ROOM_ID_RANGE);
            if !self.rooms.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn create_allocates_five_digit_id() {
        let mut rooms = RoomManager::new();
        let info = rooms.create_room("3", "alice").unwrap();

        assert!(ROOM_ID_RANGE.contains(&info.room_id));
        assert_eq!((info.current, info.max), (1, 3));
        assert_eq!(rooms.room_count(), 1);
    }

    #[test]
    fn create_rejects_bad_capacity() {
        let mut rooms = RoomManager::new();
        for capacity in ["0", "21", "abc", "", "-3"] {
            let err = rooms.create_room(capacity, "alice").unwrap_err();
            assert_eq!(err.reject_reason(), RejectReason::InvalidCapacity, "capacity {capacity}");
        }
        assert_eq!(rooms.room_count(), 0);
    }

    #[test]
    fn join_unknown_room_is_not_found() {
        let mut rooms = RoomManager::new();
        let err = rooms.join_room("77777", "bob").unwrap_err();
        assert_eq!(err.reject_reason(), RejectReason::RoomNotFound);

        let err = rooms.join_room("not-a-number", "bob").unwrap_err();
        assert_eq!(err.reject_reason(), RejectReason::RoomNotFound);
    }

    #[test]
    fn join_fills_up_to_capacity() {
        let mut rooms = RoomManager::new();
        let info = rooms.create_room("2", "alice").unwrap();
        let room_text = info.room_id.to_string();

        let second = rooms.join_room(&room_text, "bob").unwrap();
        assert_eq!((second.current, second.max), (2, 2));

        let err = rooms.join_room(&room_text, "carol").unwrap_err();
        assert_eq!(err.reject_reason(), RejectReason::RoomFull);
    }

    #[test]
    fn leave_reopens_a_full_room() {
        let mut rooms = RoomManager::new();
        let info = rooms.create_room("2", "alice").unwrap();
        let room_text = info.room_id.to_string();
        rooms.join_room(&room_text, "bob").unwrap();

        let departure = rooms.leave_room(info.room_id, "bob").unwrap();
        assert!(!departure.emptied);
        assert_eq!(departure.current, 1);

        rooms.join_room(&room_text, "carol").unwrap();
    }

    #[test]
    fn last_departure_drops_the_room() {
        let mut rooms = RoomManager::new();
        let info = rooms.create_room("3", "alice").unwrap();

        let departure = rooms.leave_room(info.room_id, "alice").unwrap();
        assert!(departure.emptied);
        assert_eq!(departure.current, 0);
        assert!(!rooms.contains(info.room_id));
    }

    #[test]
    fn leave_with_unknown_occupant_is_none() {
        let mut rooms = RoomManager::new();
        let info = rooms.create_room("3", "alice").unwrap();
        assert!(rooms.leave_room(info.room_id, "stranger").is_none());
        assert!(rooms.leave_room(55_555, "alice").is_none());
    }

    #[test]
    fn occupancy_tracks_joins() {
        let mut rooms = RoomManager::new();
        let info = rooms.create_room("5", "alice").unwrap();
        rooms.join_room(&info.room_id.to_string(), "bob").unwrap();

        assert_eq!(rooms.occupancy(info.room_id), Some((2, 5)));
        assert_eq!(rooms.occupancy(11_111), None);
    }

    #[test]
    fn allocated_ids_are_unique_among_live_rooms() {
        let mut rooms = RoomManager::new();
        let mut seen = std::collections::HashSet::new();
        for i in 0..50 {
            let info = rooms.create_room("20", &format!("user-{i}")).unwrap();
            assert!(seen.insert(info.room_id), "room id {} reused", info.room_id);
        }
    }
}
