//! WebSocket transport for the session.
//!
//! Provides [`connect`] which dials the server and exposes the connection as
//! a channel pair. This is a thin layer that just moves text frames —
//! protocol logic stays in the Sans-IO [`crate::Session`].

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),
}

/// Lifecycle and data events delivered by the connection task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is open and frames may be sent.
    Opened,
    /// One inbound text frame.
    Frame(String),
    /// The connection ended. `error` distinguishes failures from clean
    /// closes; both are delivered exactly once, as the final event.
    Closed {
        /// Whether the close was caused by a transport error.
        error: bool,
    },
}

/// Handle to a live WebSocket connection.
///
/// Frames move through the channels; an internal task owns the socket I/O.
/// Dropping the handle (or calling [`ConnectedTransport::stop`]) tears the
/// connection down.
pub struct ConnectedTransport {
    /// Send encoded frames to the server.
    pub to_server: mpsc::Sender<String>,
    /// Receive transport events, ending with a single `Closed`.
    pub from_server: mpsc::Receiver<TransportEvent>,
    /// Abort handle to stop the connection task.
    abort_handle: tokio::task::AbortHandle,
}

impl ConnectedTransport {
    /// Stop the connection task.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

impl Drop for ConnectedTransport {
    fn drop(&mut self) {
        self.abort_handle.abort();
    }
}

/// Dial a Parlor server over WebSocket.
///
/// Returns a [`ConnectedTransport`] once the WebSocket handshake completes.
/// The connection task immediately emits [`TransportEvent::Opened`].
pub async fn connect(url: &str) -> Result<ConnectedTransport, TransportError> {
    let (stream, _response) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| TransportError::Connection(e.to_string()))?;

    let (to_server_tx, to_server_rx) = mpsc::channel::<String>(32);
    let (from_server_tx, from_server_rx) = mpsc::channel::<TransportEvent>(32);

    let handle = tokio::spawn(run_connection(stream, to_server_rx, from_server_tx));

    Ok(ConnectedTransport {
        to_server: to_server_tx,
        from_server: from_server_rx,
        abort_handle: handle.abort_handle(),
    })
}

/// Run the connection, bridging between channels and the socket.
async fn run_connection(
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut to_server: mpsc::Receiver<String>,
    from_server: mpsc::Sender<TransportEvent>,
) {
    let (mut sink, mut source) = stream.split();

    if from_server.send(TransportEvent::Opened).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            outbound = to_server.recv() => match outbound {
                Some(text) => {
                    if let Err(err) = sink.send(Message::Text(text.into())).await {
                        tracing::debug!("websocket send failed: {err}");
                        let _ = from_server.send(TransportEvent::Closed { error: true }).await;
                        return;
                    }
                },
                // Sender dropped: close gracefully.
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    let _ = from_server.send(TransportEvent::Closed { error: false }).await;
                    return;
                },
            },
            inbound = source.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    if from_server
                        .send(TransportEvent::Frame(text.as_str().to_owned()))
                        .await
                        .is_err()
                    {
                        return;
                    }
                },
                Some(Ok(Message::Close(_))) | None => {
                    let _ = from_server.send(TransportEvent::Closed { error: false }).await;
                    return;
                },
                // Pings are answered by tungstenite; binary frames are not
                // part of this protocol.
                Some(Ok(_)) => {},
                Some(Err(err)) => {
                    tracing::debug!("websocket receive failed: {err}");
                    let _ = from_server.send(TransportEvent::Closed { error: true }).await;
                    return;
                },
            },
        }
    }
}
