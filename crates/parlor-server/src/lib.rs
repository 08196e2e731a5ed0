//! Parlor chat-room server.
//!
//! Companion server for the Parlor protocol: rooms are created with a bounded
//! capacity, joined by identifier, and torn down when the last occupant
//! leaves. Clients connect over WebSocket, complete the Init handshake, and
//! exchange JSON text frames; two plain HTTP endpoints expose the aggregate
//! chatter counter and per-room history.
//!
//! # Components
//!
//! - [`ChatterRegistry`]: Session identity bookkeeping and duplicate detection
//! - [`RoomManager`]: Capacity-bounded rooms with per-room broadcast channels
//! - [`HistoryStore`]: Pluggable chat history persistence
//! - [`ChatterCounter`]: File-backed cumulative join counter
//! - [`router`]: The axum application serving `/ws`, `/chatters`, `/history`

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod counter;
mod registry;
mod room_manager;
pub mod storage;
mod ws;

pub use counter::{ChatterCounter, CounterError};
pub use registry::{Chatter, ChatterRegistry};
pub use room_manager::{Departure, JoinError, JoinInfo, RoomManager};
pub use storage::{HistoryError, HistoryStore, JsonlHistory, MemoryHistory};
pub use ws::{AppState, router};
