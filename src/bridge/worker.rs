//! Single-owner task hosting a [`SessionBridge`].
//!
//! Transports never touch the bridge directly. They push [`SessionInput`]s
//! into the session's queue and the worker applies them one at a time, which
//! gives every session a serialized event path without locking the bridge.
//!
//! ```text
//! device Connection ─┐
//!                    ├─► mpsc ─► SessionWorker ─► SessionBridge
//! client Connection ─┘             ▲
//!        Incoming notification ────┘ (ForwardToDevice)
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::identifiers::{ConnectionId, SessionId};
use crate::protocol::{ClientEvent, DeviceEvent, InboundMessage};
use crate::transport::{ClientChannel, DeviceChannel};

use super::notify::BridgeNotification;
use super::session::SessionBridge;

// ============================================================================
// SessionInput
// ============================================================================

/// One unit of work for a session worker.
pub enum SessionInput {
    /// A device transport was accepted.
    DeviceConnected {
        /// Connection being attached.
        connection_id: ConnectionId,
        /// Channel handle.
        channel: Arc<dyn DeviceChannel>,
    },

    /// A device transport went away.
    DeviceDisconnected(ConnectionId),

    /// The device emitted an event.
    DeviceEvent {
        /// Source connection.
        connection_id: ConnectionId,
        /// The event.
        event: DeviceEvent,
    },

    /// A client transport was accepted.
    ClientConnected {
        /// Connection being attached.
        connection_id: ConnectionId,
        /// Channel handle.
        channel: Arc<dyn ClientChannel>,
    },

    /// A client transport went away.
    ClientDisconnected(ConnectionId),

    /// The client emitted an event.
    ClientEvent {
        /// Source connection.
        connection_id: ConnectionId,
        /// The event.
        event: ClientEvent,
    },

    /// Send a gated client command to the device.
    ForwardToDevice(InboundMessage),

    /// Report the current session status.
    Inspect(oneshot::Sender<SessionStatus>),

    /// Close both channels and stop the worker.
    Shutdown,
}

/// Snapshot of a session's connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    /// Session ID.
    pub session_id: SessionId,
    /// Device channel attached.
    pub device_connected: bool,
    /// Client channel attached and open.
    pub client_connected: bool,
    /// Enabled domains in enable order.
    pub enabled_domains: Vec<String>,
}

// ============================================================================
// SessionHandle
// ============================================================================

/// Cloneable sender side of a session worker.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    input_tx: mpsc::UnboundedSender<SessionInput>,
}

impl SessionHandle {
    /// Returns the session ID.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Returns `true` once the worker has stopped.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.input_tx.is_closed()
    }

    /// Queues an input for the worker.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] if the worker has stopped.
    pub fn dispatch(&self, input: SessionInput) -> Result<()> {
        self.input_tx
            .send(input)
            .map_err(|_| Error::session_closed(self.session_id.clone()))
    }

    /// Asks the worker for a status snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] if the worker has stopped.
    pub async fn status(&self) -> Result<SessionStatus> {
        let (tx, rx) = oneshot::channel();
        self.dispatch(SessionInput::Inspect(tx))?;
        rx.await
            .map_err(|_| Error::session_closed(self.session_id.clone()))
    }

    /// Asks the worker to stop. Already-stopped workers are ignored.
    pub fn shutdown(&self) {
        let _ = self.input_tx.send(SessionInput::Shutdown);
    }
}

// ============================================================================
// SessionWorker
// ============================================================================

/// Spawns and runs session workers.
pub struct SessionWorker;

impl SessionWorker {
    /// Moves `bridge` into a new task and returns its handle.
    ///
    /// `Incoming` notifications are re-queued as
    /// [`SessionInput::ForwardToDevice`] through a weak sender, so the worker
    /// stops once every external handle is dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(mut bridge: SessionBridge) -> SessionHandle {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let session_id = bridge.id().clone();

        let forward = input_tx.downgrade();
        bridge.subscribe(Box::new(move |notification: &BridgeNotification| {
            if let BridgeNotification::Incoming(command) = notification
                && let Some(tx) = forward.upgrade()
            {
                let _ = tx.send(SessionInput::ForwardToDevice(command.message.clone()));
            }
        }));

        tokio::spawn(Self::run(bridge, input_rx));
        debug!(session_id = %session_id, "Session worker started");

        SessionHandle {
            session_id,
            input_tx,
        }
    }

    async fn run(mut bridge: SessionBridge, mut input_rx: mpsc::UnboundedReceiver<SessionInput>) {
        while let Some(input) = input_rx.recv().await {
            match input {
                SessionInput::DeviceConnected {
                    connection_id,
                    channel,
                } => bridge.on_device_connect(connection_id, channel),

                SessionInput::DeviceDisconnected(connection_id) => {
                    bridge.on_device_disconnect(connection_id);
                }

                SessionInput::DeviceEvent {
                    connection_id,
                    event,
                } => bridge.handle_device_event(connection_id, event),

                SessionInput::ClientConnected {
                    connection_id,
                    channel,
                } => bridge.on_client_connect(connection_id, channel),

                SessionInput::ClientDisconnected(connection_id) => {
                    bridge.on_client_disconnect(connection_id);
                }

                SessionInput::ClientEvent {
                    connection_id,
                    event,
                } => {
                    if let Err(e) = bridge.handle_client_event(connection_id, event) {
                        warn!(session_id = %bridge.id(), error = %e, "Rejected client message");
                    }
                }

                SessionInput::ForwardToDevice(message) => bridge.forward_to_device(&message),

                SessionInput::Inspect(reply) => {
                    let _ = reply.send(SessionStatus {
                        session_id: bridge.id().clone(),
                        device_connected: bridge.is_device_connected(),
                        client_connected: bridge.is_client_connected(),
                        enabled_domains: bridge.enabled_domains().to_vec(),
                    });
                }

                SessionInput::Shutdown => break,
            }
        }

        bridge.close();
        debug!(session_id = %bridge.id(), "Session worker terminated");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use serde_json::json;

    use crate::bridge::MiddlewareRegistry;
    use crate::bridge::testing::{RecordingClient, RecordingDevice};
    use crate::config::BridgeConfig;
    use crate::protocol::{ClientFrame, DeviceHandshake};

    fn spawn() -> SessionHandle {
        let bridge = SessionBridge::new(
            SessionId::new("worker").expect("valid session id"),
            &BridgeConfig::default(),
            Arc::new(MiddlewareRegistry::new()),
        );
        SessionWorker::spawn(bridge)
    }

    fn client_text(connection_id: ConnectionId, text: &str) -> SessionInput {
        SessionInput::ClientEvent {
            connection_id,
            event: ClientEvent::Message(ClientFrame::Text(text.into())),
        }
    }

    #[tokio::test]
    async fn test_status_reflects_inputs() {
        let handle = spawn();
        let device_id = ConnectionId::next();

        handle
            .dispatch(SessionInput::DeviceConnected {
                connection_id: device_id,
                channel: RecordingDevice::new(),
            })
            .expect("dispatch");
        handle
            .dispatch(SessionInput::DeviceEvent {
                connection_id: device_id,
                event: DeviceEvent::Connection(DeviceHandshake {
                    status: "ok".into(),
                    supported_domains: vec!["Network".into(), "Page".into()],
                }),
            })
            .expect("dispatch");

        let status = handle.status().await.expect("status");
        assert!(status.device_connected);
        assert!(!status.client_connected);
        assert_eq!(status.enabled_domains, vec!["Network", "Page"]);
    }

    #[tokio::test]
    async fn test_incoming_forwarded_to_device() {
        let handle = spawn();
        let device = RecordingDevice::new();
        let client_id = ConnectionId::next();

        handle
            .dispatch(SessionInput::DeviceConnected {
                connection_id: ConnectionId::next(),
                channel: device.clone(),
            })
            .expect("dispatch");
        handle
            .dispatch(SessionInput::ClientConnected {
                connection_id: client_id,
                channel: RecordingClient::open(),
            })
            .expect("dispatch");
        handle
            .dispatch(client_text(client_id, r#"{"id":1,"method":"Page.enable"}"#))
            .expect("dispatch");
        handle
            .dispatch(client_text(client_id, r#"{"id":2,"method":"Page.reload","params":{}}"#))
            .expect("dispatch");

        // The forward is queued behind the message that produced it.
        handle.status().await.expect("status");
        handle.status().await.expect("status");

        let commands = device.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].method, "Page.reload");
        assert_eq!(commands[0].params, json!({}));
    }

    #[tokio::test]
    async fn test_malformed_message_keeps_session_alive() {
        let handle = spawn();
        let client = RecordingClient::open();
        let client_id = ConnectionId::next();

        handle
            .dispatch(SessionInput::ClientConnected {
                connection_id: client_id,
                channel: client.clone(),
            })
            .expect("dispatch");
        handle.dispatch(client_text(client_id, "{not json")).expect("dispatch");
        handle
            .dispatch(client_text(client_id, r#"{"id":1,"method":"nodot"}"#))
            .expect("dispatch");
        handle
            .dispatch(client_text(client_id, r#"{"id":2,"method":"Page.enable"}"#))
            .expect("dispatch");

        let status = handle.status().await.expect("status");
        assert_eq!(status.enabled_domains, vec!["Page"]);
        assert_eq!(client.sent(), vec![r#"{"id":2,"result":{}}"#.to_string()]);
    }

    #[tokio::test]
    async fn test_shutdown_closes_channels() {
        let handle = spawn();
        let device = RecordingDevice::new();
        handle
            .dispatch(SessionInput::DeviceConnected {
                connection_id: ConnectionId::next(),
                channel: device.clone(),
            })
            .expect("dispatch");

        handle.shutdown();

        tokio::time::timeout(Duration::from_secs(1), async {
            while !handle.is_closed() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("worker stops");

        assert!(device.is_closed());
        assert!(handle.status().await.is_err());
    }
}
