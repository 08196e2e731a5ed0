//! Serialized event loop around a [`Session`].
//!
//! The driver is the single consumer the concurrency model requires: user
//! intents and transport callbacks both funnel through [`SessionDriver`]
//! methods, which take `&mut self`, so the session, its log, and occupancy
//! are only ever mutated from one place. No method blocks the presentation
//! layer on protocol results — outcomes are observed by reading
//! [`SessionDriver::session`] afterwards.

use std::{collections::VecDeque, time::Instant};

use parlor_proto::ServerEvent;

use crate::{
    ConnectForm, Session, SessionAction, SessionConfig, SessionEvent,
    transport::{self, ConnectedTransport, TransportEvent},
};

/// Owns a [`Session`] plus its live transport and executes session actions.
pub struct SessionDriver {
    /// WebSocket endpoint, e.g. `ws://localhost:9002/ws`.
    endpoint: String,
    session: Session,
    transport: Option<ConnectedTransport>,
}

impl SessionDriver {
    /// Create a driver for the given endpoint with default configuration.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_config(endpoint, SessionConfig::default())
    }

    /// Create a driver with explicit session configuration.
    pub fn with_config(endpoint: impl Into<String>, config: SessionConfig) -> Self {
        Self { endpoint: endpoint.into(), session: Session::new(config), transport: None }
    }

    /// The session, for state readouts.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Submit the join/create form.
    pub async fn submit_connect(&mut self, form: ConnectForm) {
        self.dispatch(SessionEvent::SubmitConnect { form }).await;
    }

    /// Send a chat line.
    pub async fn send_chat(&mut self, text: impl Into<String>) {
        self.dispatch(SessionEvent::SendChat { text: text.into() }).await;
    }

    /// Abandon the current attempt.
    pub async fn reset(&mut self) {
        self.dispatch(SessionEvent::Reset).await;
    }

    /// Tear the session down for good.
    pub async fn shutdown(&mut self) {
        self.dispatch(SessionEvent::Shutdown).await;
    }

    /// Drive join-timeout processing.
    pub async fn tick(&mut self) {
        self.dispatch(SessionEvent::Tick { now: Instant::now() }).await;
    }

    /// Wait for the next transport event and feed it through the session.
    ///
    /// Returns `false` when no transport is live, so callers can `select!`
    /// this against their own input sources without spinning.
    pub async fn next_event(&mut self) -> bool {
        let received = match self.transport.as_mut() {
            None => return false,
            Some(t) => t.from_server.recv().await,
        };

        match received {
            Some(TransportEvent::Opened) => {
                self.dispatch(SessionEvent::TransportOpen { now: Instant::now() }).await;
            },
            Some(TransportEvent::Frame(text)) => {
                let event = ServerEvent::decode(&text);
                self.dispatch(SessionEvent::FrameReceived(event)).await;
            },
            Some(TransportEvent::Closed { error }) => {
                self.transport = None;
                self.dispatch(SessionEvent::TransportClosed { error }).await;
            },
            // Connection task gone without a close event: treat as failure.
            None => {
                self.transport = None;
                self.dispatch(SessionEvent::TransportClosed { error: true }).await;
            },
        }
        true
    }

    /// Feed one event into the session and execute the resulting actions.
    ///
    /// Actions may produce follow-up events (a failed dial becomes
    /// `TransportClosed`); those are processed in the same pass, keeping the
    /// whole cascade on this single call stack.
    async fn dispatch(&mut self, event: SessionEvent) {
        let mut pending: VecDeque<SessionAction> = self.session.handle(event).into();

        while let Some(action) = pending.pop_front() {
            match action {
                SessionAction::OpenTransport => match transport::connect(&self.endpoint).await {
                    Ok(connected) => self.transport = Some(connected),
                    Err(err) => {
                        tracing::warn!("dial failed: {err}");
                        pending.extend(
                            self.session.handle(SessionEvent::TransportClosed { error: true }),
                        );
                    },
                },
                SessionAction::SendFrame(frame) => {
                    let encoded = match frame.encode() {
                        Ok(encoded) => encoded,
                        Err(err) => {
                            tracing::warn!("frame encode failed: {err}");
                            continue;
                        },
                    };
                    let Some(transport) = self.transport.as_ref() else {
                        tracing::debug!("dropping frame: no live transport");
                        continue;
                    };
                    if transport.to_server.send(encoded).await.is_err() {
                        self.transport = None;
                        pending.extend(
                            self.session.handle(SessionEvent::TransportClosed { error: true }),
                        );
                    }
                },
                SessionAction::CloseTransport => {
                    if let Some(transport) = self.transport.take() {
                        transport.stop();
                    }
                },
                SessionAction::Log { message } => tracing::debug!("{message}"),
            }
        }
    }
}
