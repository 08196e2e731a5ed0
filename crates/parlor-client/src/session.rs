//! Session state machine.
//!
//! Owns the lifecycle of one connection attempt: local validation of the
//! join/create form, the handshake against the server, and reconciliation of
//! history/occupancy/message events into a consistent room view.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ submitConnect ┌────────────┐ transportOpen ┌──────────────┐
//! │ Idle │──────────────>│ Connecting │──────────────>│ AwaitingJoin │
//! └──────┘               └────────────┘               └──────────────┘
//!    ↑                                                   │         │
//!    │            Rejected / close / timeout             │         │ Joined
//!    ├───────────────────────────────────────────────────┘         ↓
//!    │                     close / reset                      ┌────────┐
//!    └────────────────────────────────────────────────────────│ Joined │
//!                                                             └────────┘
//! ```
//!
//! `Closed` (not shown) is terminal and reachable from every state via
//! `Shutdown`. All effects are returned as [`SessionAction`]s; the machine
//! performs no I/O of its own.

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use parlor_proto::{CAPACITY_RANGE, ClientFrame, RejectReason, RoomChoice, ServerEvent};

use crate::{
    event::{ConnectForm, SessionAction, SessionEvent},
    identity::SessionId,
    log::{ChatLine, RoomLog},
};

/// Notice shown when a form field is empty after trimming.
const NOTICE_EMPTY_FIELDS: &str = "fill all fields";

/// Notice shown when an established session loses its transport.
const NOTICE_DISCONNECTED: &str = "disconnected from server";

/// Notice shown when the join timeout elapses.
const NOTICE_NO_RESPONSE: &str = "no response from server";

/// Current phase of the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No connection attempt in progress. The only re-entrant state.
    Idle,
    /// Transport dial in progress.
    Connecting,
    /// Init sent, waiting for the server's verdict.
    AwaitingJoin,
    /// Actively chatting in a room.
    Joined,
    /// Session torn down for good. Terminal.
    Closed,
}

/// Live room occupancy as last reported by the server.
///
/// Replaces in place; absent before the first occupancy event. The stored
/// value always satisfies `current <= max` — events violating the bound are
/// dropped as protocol noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupancy {
    /// Current occupant count.
    pub current: u32,
    /// Capacity ceiling.
    pub max: u32,
}

/// Session configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionConfig {
    /// How long to wait in `AwaitingJoin` before giving up.
    ///
    /// `None` (the default) waits indefinitely, matching the behavior of the
    /// original client. When set, the caller must feed `Tick` events for the
    /// timeout to fire.
    pub join_timeout: Option<Duration>,
}

/// Validated connect parameters, held from submit until the Init frame goes
/// out.
#[derive(Debug, Clone)]
struct ConnectProfile {
    display_name: String,
    choice: RoomChoice,
    room_data: String,
}

/// Session state machine.
///
/// Pure state machine — no I/O, no clocks of its own. Feed it events via
/// [`Session::handle`], execute the returned actions, and observe results
/// through the readout methods.
///
/// Generic over `I` (Instant type) to support real time in production and
/// fabricated time in tests.
#[derive(Debug, Clone)]
pub struct Session<I = Instant>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    config: SessionConfig,
    phase: Phase,
    /// Identity for the current attempt. Fresh per attempt, never reused.
    session_id: Option<SessionId>,
    /// Validated form, consumed to build the Init frame on transport open.
    profile: Option<ConnectProfile>,
    /// Canonical room identifier, assigned by the server on join.
    room_id: Option<String>,
    log: RoomLog,
    occupancy: Option<Occupancy>,
    /// Single user-facing notification channel; newest supersedes older.
    notice: Option<String>,
    /// When the machine entered `AwaitingJoin`, for timeout checks.
    awaiting_since: Option<I>,
}

impl<I> Default for Session<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl<I> Session<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Create an idle session with the given configuration.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
            session_id: None,
            profile: None,
            room_id: None,
            log: RoomLog::new(),
            occupancy: None,
            notice: None,
            awaiting_since: None,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Latest user-facing notification. `None` when there is nothing to show.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Room identifier assigned by the server. `None` until joined.
    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    /// Latest occupancy report. `None` before the first occupancy event.
    pub fn occupancy(&self) -> Option<Occupancy> {
        self.occupancy
    }

    /// The room message log for rendering.
    pub fn log(&self) -> &RoomLog {
        &self.log
    }

    /// Trimmed display name of the current attempt, for origin
    /// classification. `None` while idle.
    pub fn display_name(&self) -> Option<&str> {
        self.profile.as_ref().map(|p| p.display_name.as_str())
    }

    /// Identity of the current attempt. `None` while idle.
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Process an event and return resulting actions.
    pub fn handle(&mut self, event: SessionEvent<I>) -> Vec<SessionAction> {
        if self.phase == Phase::Closed {
            return vec![log_action("ignoring event after shutdown")];
        }

        match event {
            SessionEvent::SubmitConnect { form } => self.handle_submit_connect(&form),
            SessionEvent::SendChat { text } => self.handle_send_chat(&text),
            SessionEvent::TransportOpen { now } => self.handle_transport_open(now),
            SessionEvent::TransportClosed { error } => self.handle_transport_closed(error),
            SessionEvent::FrameReceived(event) => self.handle_frame(event),
            SessionEvent::Tick { now } => self.handle_tick(now),
            SessionEvent::Reset => self.handle_reset(),
            SessionEvent::Shutdown => self.handle_shutdown(),
        }
    }

    /// Validate the form and, if sound, start a fresh connection attempt.
    ///
    /// Submitting while an attempt is live forces a full reset first so a
    /// session never has two transports (the only cancellation primitive is
    /// closing the transport).
    fn handle_submit_connect(&mut self, form: &ConnectForm) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        if self.phase != Phase::Idle {
            actions.extend(self.reset_to_idle(true));
            actions.push(log_action("restarting: previous attempt abandoned"));
        }

        match validate_form(form) {
            Err(notice) => {
                self.notice = Some(notice.to_string());
                actions
            },
            Ok(profile) => {
                self.notice = None;
                self.session_id = Some(SessionId::generate());
                self.profile = Some(profile);
                self.phase = Phase::Connecting;
                actions.push(SessionAction::OpenTransport);
                actions
            },
        }
    }

    /// Chat is only sent while joined with non-empty trimmed text; anything
    /// else is dropped without feedback (no retry, no queueing).
    fn handle_send_chat(&mut self, text: &str) -> Vec<SessionAction> {
        if self.phase != Phase::Joined {
            return vec![log_action("dropping chat line: not joined")];
        }

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return vec![log_action("dropping empty chat line")];
        }

        vec![SessionAction::SendFrame(ClientFrame::Chat { text: trimmed.to_string() })]
    }

    /// On open, synthesize exactly one Init frame from the stored profile.
    fn handle_transport_open(&mut self, now: I) -> Vec<SessionAction> {
        if self.phase != Phase::Connecting {
            return vec![log_action("ignoring transport open outside Connecting")];
        }

        let (Some(session_id), Some(profile)) = (&self.session_id, &self.profile) else {
            // Unreachable while Connecting, but a lost profile must not leave
            // a half-open attempt behind.
            let mut actions = self.reset_to_idle(true);
            actions.push(log_action("connecting without profile, resetting"));
            return actions;
        };

        let init = ClientFrame::Init {
            id: session_id.to_string(),
            display_name: profile.display_name.clone(),
            choice: profile.choice,
            room_data: profile.room_data.clone(),
        };

        self.phase = Phase::AwaitingJoin;
        self.awaiting_since = Some(now);
        vec![SessionAction::SendFrame(init)]
    }

    /// A close interrupting an established session is surfaced; a close in
    /// any earlier phase resets silently (the post-rejection close has
    /// already been reported by the rejection itself).
    fn handle_transport_closed(&mut self, error: bool) -> Vec<SessionAction> {
        match self.phase {
            Phase::Idle | Phase::Closed => {
                vec![log_action("ignoring transport close while inactive")]
            },
            Phase::Connecting | Phase::AwaitingJoin => {
                let mut actions = self.reset_to_idle(false);
                actions.push(log_action(if error {
                    "transport failed before join, resetting"
                } else {
                    "transport closed before join, resetting"
                }));
                actions
            },
            Phase::Joined => {
                let mut actions = self.reset_to_idle(false);
                self.notice = Some(NOTICE_DISCONNECTED.to_string());
                actions.push(log_action("transport lost while joined"));
                actions
            },
        }
    }

    fn handle_frame(&mut self, event: ServerEvent) -> Vec<SessionAction> {
        match event {
            ServerEvent::Rejected(reason) => self.handle_rejected(reason),
            ServerEvent::Joined { room_id } => self.handle_joined(room_id),
            ServerEvent::History { entries } => {
                if self.phase != Phase::Joined {
                    return vec![log_action("ignoring history outside Joined")];
                }
                for entry in entries {
                    self.log.append(ChatLine { sender: entry.from, text: entry.text });
                }
                vec![]
            },
            ServerEvent::Message { from, text } => {
                if self.phase != Phase::Joined {
                    return vec![log_action("ignoring message outside Joined")];
                }
                self.log.append(ChatLine { sender: from, text });
                vec![]
            },
            ServerEvent::Occupancy { current, max } => {
                if self.phase != Phase::Joined {
                    return vec![log_action("ignoring occupancy outside Joined")];
                }
                if current > max {
                    return vec![log_action("ignoring occupancy with current > max")];
                }
                self.occupancy = Some(Occupancy { current, max });
                vec![]
            },
            ServerEvent::ProtocolError { message } => {
                // Recoverable: the server has not closed the channel, so the
                // session keeps its phase.
                self.notice = Some(message);
                vec![]
            },
            ServerEvent::Malformed { detail } => {
                vec![log_action(format!("ignoring malformed frame: {detail}"))]
            },
        }
    }

    /// A rejection resolves the join episode: reset everything, discard the
    /// identity, and surface the mapped message. Terminal events after the
    /// first are ignored — an `AwaitingJoin` episode resolves at most once.
    fn handle_rejected(&mut self, reason: RejectReason) -> Vec<SessionAction> {
        if self.phase != Phase::AwaitingJoin {
            return vec![log_action("ignoring rejection outside AwaitingJoin")];
        }

        let mut actions = self.reset_to_idle(true);
        self.notice = Some(reason.user_message().to_string());
        actions.push(log_action(format!("join rejected: {}", reason.sentinel())));
        actions
    }

    fn handle_joined(&mut self, room_id: String) -> Vec<SessionAction> {
        if self.phase != Phase::AwaitingJoin {
            return vec![log_action("ignoring joined event outside AwaitingJoin")];
        }

        self.room_id = Some(room_id);
        self.log.clear();
        self.occupancy = None;
        self.notice = None;
        self.awaiting_since = None;
        self.phase = Phase::Joined;
        vec![]
    }

    fn handle_tick(&mut self, now: I) -> Vec<SessionAction> {
        if self.phase != Phase::AwaitingJoin {
            return vec![];
        }
        let (Some(timeout), Some(since)) = (self.config.join_timeout, self.awaiting_since) else {
            return vec![];
        };
        if now - since <= timeout {
            return vec![];
        }

        let mut actions = self.reset_to_idle(true);
        self.notice = Some(NOTICE_NO_RESPONSE.to_string());
        actions.push(log_action("join timed out, resetting"));
        actions
    }

    fn handle_reset(&mut self) -> Vec<SessionAction> {
        let close = !matches!(self.phase, Phase::Idle);
        let actions = self.reset_to_idle(close);
        self.notice = None;
        actions
    }

    fn handle_shutdown(&mut self) -> Vec<SessionAction> {
        let close = !matches!(self.phase, Phase::Idle);
        let mut actions = self.reset_to_idle(close);
        self.notice = None;
        self.phase = Phase::Closed;
        actions.push(log_action("session shut down"));
        actions
    }

    /// Clear every piece of per-attempt state and return to `Idle`.
    ///
    /// The notice is left untouched so callers can set or clear it after the
    /// reset. The session identity is discarded — a future attempt must
    /// generate a new one.
    fn reset_to_idle(&mut self, close_transport: bool) -> Vec<SessionAction> {
        self.phase = Phase::Idle;
        self.session_id = None;
        self.profile = None;
        self.room_id = None;
        self.log.clear();
        self.occupancy = None;
        self.awaiting_since = None;

        if close_transport { vec![SessionAction::CloseTransport] } else { vec![] }
    }
}

/// Trim and validate the connect form. The only transition guarded purely by
/// local, pre-network validation.
fn validate_form(form: &ConnectForm) -> Result<ConnectProfile, &'static str> {
    let display_name = form.display_name.trim();
    let room_data = form.room_data.trim();

    if display_name.is_empty() || room_data.is_empty() {
        return Err(NOTICE_EMPTY_FIELDS);
    }

    if form.choice == RoomChoice::Create {
        let capacity: u32 = room_data
            .parse()
            .map_err(|_| RejectReason::InvalidCapacity.user_message())?;
        if !CAPACITY_RANGE.contains(&capacity) {
            return Err(RejectReason::InvalidCapacity.user_message());
        }
    }

    Ok(ConnectProfile {
        display_name: display_name.to_string(),
        choice: form.choice,
        room_data: room_data.to_string(),
    })
}

fn log_action(message: impl Into<String>) -> SessionAction {
    SessionAction::Log { message: message.into() }
}
