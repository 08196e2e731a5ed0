//! WebSocket endpoint and plain HTTP endpoints.
//!
//! `GET /ws` upgrades to the chat protocol: the first frame must be an Init,
//! which is answered with a rejection (structured `{"type":"error"}`
//! encoding) or a `joined` response followed by the room's history replayed
//! one line per frame. After that the connection participates in the room's
//! broadcast until either side closes.
//!
//! `GET /chatters` serves the aggregate join counter for out-of-band polling;
//! `GET /history?roomId=N` serves a room's history as a JSON array.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::Response,
    routing::get,
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use parlor_proto::{ChatEntry, ClientFrame, ProtoError, RejectReason, RoomChoice, ServerEvent};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::{Mutex, broadcast};
use uuid::Uuid;

use crate::{
    counter::ChatterCounter,
    registry::ChatterRegistry,
    room_manager::{JoinInfo, RoomManager},
    storage::{HistoryError, HistoryStore},
};

/// Shared state behind every endpoint.
///
/// Registry and room manager sit behind async mutexes; the history store and
/// counter synchronize internally.
#[derive(Clone)]
pub struct AppState<H: HistoryStore> {
    registry: Arc<Mutex<ChatterRegistry>>,
    rooms: Arc<Mutex<RoomManager>>,
    history: H,
    counter: ChatterCounter,
}

impl<H: HistoryStore> AppState<H> {
    /// Create fresh server state.
    pub fn new(history: H, counter: ChatterCounter) -> Self {
        Self {
            registry: Arc::new(Mutex::new(ChatterRegistry::new())),
            rooms: Arc::new(Mutex::new(RoomManager::new())),
            history,
            counter,
        }
    }
}

/// Build the axum application.
pub fn router<H: HistoryStore>(state: AppState<H>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler::<H>))
        .route("/chatters", get(chatters_handler::<H>))
        .route("/history", get(history_handler::<H>))
        .with_state(state)
}

/// Errors that end a websocket connection.
#[derive(Debug, Error)]
enum SocketError {
    #[error("websocket error: {0}")]
    Ws(#[from] axum::Error),

    #[error(transparent)]
    Codec(#[from] ProtoError),

    #[error(transparent)]
    History(#[from] HistoryError),
}

async fn ws_handler<H: HistoryStore>(
    ws: WebSocketUpgrade,
    State(state): State<AppState<H>>,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        if let Err(err) = serve_socket(socket, state).await {
            tracing::debug!("connection ended: {err}");
        }
    })
}

async fn serve_socket<H: HistoryStore>(
    socket: WebSocket,
    state: AppState<H>,
) -> Result<(), SocketError> {
    let (mut sink, mut stream) = socket.split();

    let Some((id, display_name, choice, room_data)) = read_init(&mut stream).await? else {
        return Ok(());
    };
    // Clients are expected to send an identifier; synthesize one for those
    // that don't rather than refusing them.
    let session_id = if id.is_empty() { Uuid::new_v4().to_string() } else { id };

    {
        let mut registry = state.registry.lock().await;
        if !registry.register(&session_id, &display_name) {
            drop(registry);
            tracing::debug!("duplicate session id {session_id}");
            send_event(&mut sink, &ServerEvent::Rejected(RejectReason::DuplicateIdentity)).await?;
            return Ok(());
        }
    }

    let join = {
        let outcome = {
            let mut rooms = state.rooms.lock().await;
            match choice {
                RoomChoice::Create => rooms.create_room(&room_data, &session_id),
                RoomChoice::Join => rooms.join_room(&room_data, &session_id),
            }
        };
        match outcome {
            Ok(join) => join,
            Err(err) => {
                state.registry.lock().await.unregister(&session_id);
                tracing::debug!("join refused for {session_id}: {err}");
                send_event(&mut sink, &ServerEvent::Rejected(err.reject_reason())).await?;
                return Ok(());
            },
        }
    };
    state.registry.lock().await.assign_room(&session_id, join.room_id);

    if let Err(err) = state.counter.increment() {
        tracing::warn!("chatter counter update failed: {err}");
    }
    tracing::info!(
        "{display_name} ({session_id}) joined room {} ({}/{})",
        join.room_id,
        join.current,
        join.max
    );

    let result = run_room_loop(&mut sink, &mut stream, &state, &join, &display_name).await;

    // Cleanup runs however the loop ended.
    let departure = state.rooms.lock().await.leave_room(join.room_id, &session_id);
    if let Some(departure) = departure {
        if departure.emptied {
            if let Err(err) = state.history.remove_room(join.room_id) {
                tracing::warn!("history cleanup failed: {err}");
            }
            tracing::info!("room {} deleted (empty)", join.room_id);
        } else {
            broadcast_event(&departure.broadcast, &ServerEvent::Occupancy {
                current: departure.current,
                max: departure.max,
            });
        }
    }
    state.registry.lock().await.unregister(&session_id);
    tracing::info!("{display_name} ({session_id}) left room {}", join.room_id);

    result
}

/// Wait for the Init frame. `None` drops the connection: the protocol allows
/// nothing before a well-formed Init.
async fn read_init(
    stream: &mut SplitStream<WebSocket>,
) -> Result<Option<(String, String, RoomChoice, String)>, SocketError> {
    while let Some(message) = stream.next().await {
        match message? {
            Message::Text(text) => {
                return match serde_json::from_str::<ClientFrame>(text.as_str()) {
                    Ok(ClientFrame::Init { id, display_name, choice, room_data }) => {
                        Ok(Some((id, display_name, choice, room_data)))
                    },
                    Ok(ClientFrame::Chat { .. }) | Err(_) => {
                        tracing::debug!("expected init as first frame");
                        Ok(None)
                    },
                };
            },
            Message::Close(_) => return Ok(None),
            _ => {},
        }
    }
    Ok(None)
}

/// The joined portion of the connection: confirmation, history replay, then
/// live traffic in both directions.
async fn run_room_loop<H: HistoryStore>(
    sink: &mut SplitSink<WebSocket, Message>,
    stream: &mut SplitStream<WebSocket>,
    state: &AppState<H>,
    join: &JoinInfo,
    display_name: &str,
) -> Result<(), SocketError> {
    // Subscribe before announcing occupancy so we see our own update.
    let mut updates = join.broadcast.subscribe();

    send_event(sink, &ServerEvent::Joined { room_id: join.room_id.to_string() }).await?;

    // Replayed one line per frame, the way the original server streams it.
    for entry in state.history.replay(join.room_id)? {
        send_event(sink, &ServerEvent::History { entries: vec![entry] }).await?;
    }

    broadcast_event(&join.broadcast, &ServerEvent::Occupancy {
        current: join.current,
        max: join.max,
    });

    loop {
        tokio::select! {
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ClientFrame>(text.as_str()) {
                        Ok(ClientFrame::Chat { text }) => {
                            let trimmed = text.trim();
                            if trimmed.is_empty() {
                                continue;
                            }
                            let entry = ChatEntry {
                                from: display_name.to_string(),
                                text: trimmed.to_string(),
                            };
                            if let Err(err) = state.history.append(join.room_id, &entry) {
                                tracing::warn!("history append failed: {err}");
                            }
                            broadcast_event(&join.broadcast, &ServerEvent::Message {
                                from: entry.from,
                                text: entry.text,
                            });
                        },
                        Ok(ClientFrame::Init { .. }) => {
                            tracing::debug!("ignoring duplicate init from {display_name}");
                        },
                        // One corrupt frame is not worth the connection.
                        Err(err) => tracing::debug!("ignoring unparseable frame: {err}"),
                    }
                },
                Some(Ok(Message::Close(_))) | None => return Ok(()),
                Some(Ok(_)) => {},
                Some(Err(err)) => {
                    tracing::debug!("websocket receive failed: {err}");
                    return Ok(());
                },
            },
            update = updates.recv() => match update {
                Ok(frame) => {
                    if sink.send(Message::Text(frame.into())).await.is_err() {
                        return Ok(());
                    }
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("{display_name} lagged, dropped {skipped} frames");
                },
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            },
        }
    }
}

async fn send_event(
    sink: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> Result<(), SocketError> {
    let frame = event.encode()?;
    sink.send(Message::Text(frame.into())).await?;
    Ok(())
}

/// Fan an event out to every subscriber of a room channel.
///
/// A send error only means the room has no subscribers right now.
fn broadcast_event(channel: &broadcast::Sender<String>, event: &ServerEvent) {
    match event.encode() {
        Ok(frame) => {
            let _ = channel.send(frame);
        },
        Err(err) => tracing::warn!("failed to encode broadcast frame: {err}"),
    }
}

async fn chatters_handler<H: HistoryStore>(
    State(state): State<AppState<H>>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    match state.counter.current() {
        Ok(count) => Ok(Json(serde_json::json!({ "count": count }))),
        Err(err) => {
            tracing::warn!("counter read failed: {err}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        },
    }
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    #[serde(rename = "roomId")]
    room_id: String,
}

async fn history_handler<H: HistoryStore>(
    Query(query): Query<HistoryQuery>,
    State(state): State<AppState<H>>,
) -> Result<Json<Vec<ChatEntry>>, StatusCode> {
    let room_id: u32 = query.room_id.parse().map_err(|_| StatusCode::BAD_REQUEST)?;

    let live = state.rooms.lock().await.contains(room_id);
    let entries = state.history.replay(room_id).map_err(|err| {
        tracing::warn!("history read failed: {err}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    if !live && entries.is_empty() {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(entries))
}
