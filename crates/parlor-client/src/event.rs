//! Session events and actions.

use parlor_proto::{ClientFrame, RoomChoice, ServerEvent};

/// Raw connect form as captured by the presentation layer.
///
/// Untrimmed and unvalidated; the session machine validates on
/// [`SessionEvent::SubmitConnect`] before any network I/O happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectForm {
    /// Display name as typed.
    pub display_name: String,
    /// Create or join.
    pub choice: RoomChoice,
    /// Capacity (create) or room identifier (join) as typed.
    pub room_data: String,
}

/// Events the caller feeds into the session.
///
/// The caller is responsible for:
/// - Forwarding user intents (connect, send chat, reset)
/// - Relaying transport lifecycle callbacks
/// - Decoding inbound frames and delivering the typed events
/// - Driving time forward via ticks when a join timeout is configured
///
/// Generic over `I` (Instant type) to support both production
/// (`std::time::Instant`) and simulated time in tests.
#[derive(Debug, Clone)]
pub enum SessionEvent<I = std::time::Instant> {
    /// User submitted the join/create form.
    SubmitConnect {
        /// Raw form contents.
        form: ConnectForm,
    },

    /// User wants to send a chat line.
    SendChat {
        /// Message text as typed.
        text: String,
    },

    /// The transport reports the connection is open.
    TransportOpen {
        /// Current time, used as the join-wait starting point.
        now: I,
    },

    /// The transport closed or failed.
    ///
    /// Close and error collapse into one event; `error` only affects logging.
    TransportClosed {
        /// Whether the close was caused by a transport error.
        error: bool,
    },

    /// A decoded inbound frame.
    FrameReceived(ServerEvent),

    /// Time tick for join-timeout processing.
    ///
    /// Only meaningful when [`crate::SessionConfig::join_timeout`] is set;
    /// harmless otherwise.
    Tick {
        /// Current time.
        now: I,
    },

    /// Abandon the current attempt and return to idle. Always available,
    /// idempotent.
    Reset,

    /// Tear the session down for good. Every later event is ignored.
    Shutdown,
}

/// Actions the session produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Dial the server. The caller must deliver `TransportOpen` or
    /// `TransportClosed` back into the session.
    OpenTransport,

    /// Send one frame over the open transport.
    SendFrame(ClientFrame),

    /// Close the transport, dropping any in-flight dial.
    CloseTransport,

    /// Log message for diagnostics.
    Log {
        /// Log message.
        message: String,
    },
}
