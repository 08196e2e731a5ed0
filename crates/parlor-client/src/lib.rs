//! Client
//!
//! Action-based session state machine for the Parlor chat protocol. Manages
//! the join/create handshake, the in-room message log, and occupancy state
//! for one connection attempt at a time.
//!
//! # Architecture
//!
//! The session follows the Sans-IO and Action-Based patterns: the caller feeds
//! events ([`SessionEvent`]) into [`Session::handle`], which mutates pure state
//! and returns actions ([`SessionAction`]) for the caller to execute. The
//! presentation layer observes results through readouts ([`Session::phase`],
//! [`Session::notice`], [`Session::log`]), never through return values.
//!
//! # Components
//!
//! - [`Session`]: The session state machine
//! - [`RoomLog`]: Bounded, order-preserving chat log for the current room
//! - [`SessionId`]: Process-unique opaque connection identity
//! - [`SessionEvent`] / [`SessionAction`]: The event/action vocabulary
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::connect`]: WebSocket transport with a channel interface
//! - [`driver::SessionDriver`]: Serialized event loop around a [`Session`]
//! - [`counter::ChatterCountPoller`]: Out-of-band aggregate occupancy poll

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod event;
mod identity;
mod log;
mod session;

#[cfg(feature = "transport")]
pub mod counter;
#[cfg(feature = "transport")]
pub mod driver;
#[cfg(feature = "transport")]
pub mod transport;

pub use event::{ConnectForm, SessionAction, SessionEvent};
pub use identity::SessionId;
pub use log::{ChatLine, Origin, ROOM_LOG_CAP, RoomLog};
pub use parlor_proto::{CAPACITY_RANGE, RejectReason, RoomChoice, ServerEvent};
pub use session::{Occupancy, Phase, Session, SessionConfig};
