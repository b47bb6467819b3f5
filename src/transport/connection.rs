//! WebSocket connection and event loop.
//!
//! A [`Connection`] wraps one accepted WebSocket, device or client, and
//! feeds everything it reads into the owning session's queue.
//!
//! # Event Loop
//!
//! The connection spawns a tokio task that handles:
//!
//! - Incoming frames, decoded per [`PeerRole`] into session inputs
//! - Outgoing frames queued by the bridge through the channel traits
//! - Shutdown, on request or when the socket closes
//!
//! The connected input is queued before the loop starts, so the session sees
//! the attachment before any event from it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use futures_util::{SinkExt, StreamExt};
use serde_json::to_string;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, trace, warn};

use crate::bridge::{SessionHandle, SessionInput};
use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::{
    ClientEvent, ClientFrame, DeviceEvent, DeviceOutbound, InboundMessage, ensure_non_empty,
};

use super::channel::{ClientChannel, DeviceChannel, ReadyState};

// ============================================================================
// PeerRole
// ============================================================================

/// Which side of the bridge a connection belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerRole {
    /// The instrumented device.
    Device,
    /// The DevTools frontend.
    Client,
}

impl fmt::Display for PeerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device => f.write_str("device"),
            Self::Client => f.write_str("client"),
        }
    }
}

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Write a text frame.
    Send(String),
    /// Close the socket.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// WebSocket connection attached to a session.
///
/// # Thread Safety
///
/// `Connection` is `Send + Sync`; writes are queued to the event loop and
/// never block.
pub struct Connection {
    /// Attachment identity.
    id: ConnectionId,
    /// Device or client.
    role: PeerRole,
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Shared readiness (written by the event loop).
    ready_state: Arc<AtomicU8>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("ready_state", &self.ready_state())
            .finish()
    }
}

impl Connection {
    /// Attaches an upgraded WebSocket to `session` and starts its event loop.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] if the session no longer accepts input.
    pub(crate) fn attach(
        ws_stream: WebSocketStream<TcpStream>,
        role: PeerRole,
        session: SessionHandle,
    ) -> Result<Arc<Self>> {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let ready_state = Arc::new(AtomicU8::new(ReadyState::Open as u8));

        let connection = Arc::new(Self {
            id: ConnectionId::next(),
            role,
            command_tx,
            ready_state: Arc::clone(&ready_state),
        });

        let connected = match role {
            PeerRole::Device => SessionInput::DeviceConnected {
                connection_id: connection.id,
                channel: Arc::clone(&connection) as Arc<dyn DeviceChannel>,
            },
            PeerRole::Client => SessionInput::ClientConnected {
                connection_id: connection.id,
                channel: Arc::clone(&connection) as Arc<dyn ClientChannel>,
            },
        };
        session.dispatch(connected)?;

        if role == PeerRole::Client {
            session.dispatch(SessionInput::ClientEvent {
                connection_id: connection.id,
                event: ClientEvent::Open,
            })?;
        }

        tokio::spawn(Self::run_event_loop(
            ws_stream,
            connection.id,
            role,
            command_rx,
            ready_state,
            session,
        ));

        Ok(connection)
    }

    /// Returns the connection ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the peer role.
    #[inline]
    #[must_use]
    pub fn role(&self) -> PeerRole {
        self.role
    }

    /// Queues a text frame.
    fn queue_text(&self, text: String) -> Result<()> {
        self.command_tx
            .send(ConnectionCommand::Send(text))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Requests a graceful close.
    fn shutdown(&self) {
        if ReadyState::from_u8(self.ready_state.load(Ordering::SeqCst)).is_open() {
            self.ready_state
                .store(ReadyState::Closing as u8, Ordering::SeqCst);
        }
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        ws_stream: WebSocketStream<TcpStream>,
        connection_id: ConnectionId,
        role: PeerRole,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        ready_state: Arc<AtomicU8>,
        session: SessionHandle,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                // Incoming frames from the peer
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            let frame = ClientFrame::Text(text.as_str().to_owned());
                            Self::handle_incoming(frame, connection_id, role, &session);
                        }

                        Some(Ok(Message::Binary(bytes))) => {
                            let frame = ClientFrame::Binary(bytes.to_vec());
                            Self::handle_incoming(frame, connection_id, role, &session);
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!(%connection_id, %role, "WebSocket closed by remote");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(%connection_id, %role, error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!(%connection_id, %role, "WebSocket stream ended");
                            break;
                        }

                        // Ignore Ping, Pong, Frame
                        _ => {}
                    }
                }

                // Frames queued by the bridge
                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send(text)) => {
                            if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                                warn!(%connection_id, %role, error = %e, "Failed to send frame");
                                break;
                            }
                            trace!(%connection_id, %role, "Frame sent");
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!(%connection_id, %role, "Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }

                        None => {
                            debug!(%connection_id, %role, "Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        ready_state.store(ReadyState::Closed as u8, Ordering::SeqCst);

        let disconnected = match role {
            PeerRole::Device => SessionInput::DeviceDisconnected(connection_id),
            PeerRole::Client => SessionInput::ClientDisconnected(connection_id),
        };
        let _ = session.dispatch(disconnected);

        debug!(%connection_id, %role, "Event loop terminated");
    }

    /// Decodes one incoming frame and queues it for the session.
    fn handle_incoming(
        frame: ClientFrame,
        connection_id: ConnectionId,
        role: PeerRole,
        session: &SessionHandle,
    ) {
        let payload = match &frame {
            ClientFrame::Text(text) => Some(text.as_bytes()),
            ClientFrame::Binary(bytes) => Some(bytes.as_slice()),
            ClientFrame::Json(_) => None,
        };
        if let Some(payload) = payload
            && let Err(e) = ensure_non_empty(payload)
        {
            trace!(%connection_id, %role, error = %e, "Skipping frame");
            return;
        }

        let input = match role {
            PeerRole::Device => {
                let decoded = match frame {
                    ClientFrame::Text(text) => DeviceEvent::from_text(&text),
                    ClientFrame::Binary(bytes) => {
                        serde_json::from_slice::<DeviceEvent>(&bytes).map_err(Error::from)
                    }
                    ClientFrame::Json(value) => {
                        serde_json::from_value::<DeviceEvent>(value).map_err(Error::from)
                    }
                };
                match decoded {
                    Ok(event) => SessionInput::DeviceEvent {
                        connection_id,
                        event,
                    },
                    Err(e) => {
                        warn!(%connection_id, error = %e, "Failed to parse device frame");
                        return;
                    }
                }
            }
            PeerRole::Client => SessionInput::ClientEvent {
                connection_id,
                event: ClientEvent::Message(frame),
            },
        };

        if let Err(e) = session.dispatch(input) {
            debug!(%connection_id, error = %e, "Session gone, dropping frame");
        }
    }
}

// ============================================================================
// Channel Implementations
// ============================================================================

impl DeviceChannel for Connection {
    fn send_command(&self, message: &InboundMessage) -> Result<()> {
        let json = to_string(&DeviceOutbound::Command(message))?;
        self.queue_text(json)
    }

    fn close(&self) {
        self.shutdown();
    }
}

impl ClientChannel for Connection {
    fn ready_state(&self) -> ReadyState {
        ReadyState::from_u8(self.ready_state.load(Ordering::SeqCst))
    }

    fn send_text(&self, text: String) -> Result<()> {
        if !ClientChannel::ready_state(self).is_open() {
            return Err(Error::ChannelNotOpen);
        }
        self.queue_text(text)
    }

    fn close(&self) {
        self.shutdown();
    }
}

impl Connection {
    /// Current readiness of the socket.
    #[inline]
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        ClientChannel::ready_state(self)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::bridge::testing::RecordingClient;
    use crate::bridge::{MiddlewareRegistry, SessionBridge, SessionWorker};
    use crate::config::BridgeConfig;
    use crate::identifiers::SessionId;

    fn session_with_client() -> (SessionHandle, ConnectionId, Arc<RecordingClient>) {
        let bridge = SessionBridge::new(
            SessionId::new("frames").expect("valid session id"),
            &BridgeConfig::default(),
            Arc::new(MiddlewareRegistry::new()),
        );
        let handle = SessionWorker::spawn(bridge);
        let connection_id = ConnectionId::next();
        let client = RecordingClient::open();
        handle
            .dispatch(SessionInput::ClientConnected {
                connection_id,
                channel: client.clone(),
            })
            .expect("dispatch");
        (handle, connection_id, client)
    }

    #[test]
    fn test_peer_role_display() {
        assert_eq!(PeerRole::Device.to_string(), "device");
        assert_eq!(PeerRole::Client.to_string(), "client");
    }

    #[tokio::test]
    async fn test_json_frame_reaches_session() {
        let (handle, connection_id, client) = session_with_client();

        let frame = ClientFrame::Json(json!({"id": 7, "method": "Page.enable"}));
        Connection::handle_incoming(frame, connection_id, PeerRole::Client, &handle);

        let status = handle.status().await.expect("status");
        assert_eq!(status.enabled_domains, vec!["Page"]);
        assert_eq!(client.sent_json(), vec![json!({"id": 7, "result": {}})]);
    }

    #[tokio::test]
    async fn test_blank_text_frame_skipped() {
        let (handle, connection_id, client) = session_with_client();

        Connection::handle_incoming(
            ClientFrame::Text("  \n".into()),
            connection_id,
            PeerRole::Client,
            &handle,
        );

        let status = handle.status().await.expect("status");
        assert!(status.enabled_domains.is_empty());
        assert!(client.sent().is_empty());
    }
}
