//! WebSocket listeners for devices and DevTools frontends.
//!
//! [`BridgeServer`] binds two listeners and routes every accepted WebSocket
//! to the session named in its URL path.
//!
//! # Connection Flow
//!
//! 1. Bind the client listener (default 9222) and the device listener
//! 2. Accept TCP, upgrade to WebSocket, read the request path
//! 3. Take the last non-empty path segment as the session ID
//!    (`/devtools/page/<id>`, `/device/<id>`)
//! 4. Look up or create the session and attach the connection to it

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::result::Result as StdResult;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tracing::{debug, error, info, warn};

use crate::bridge::TransformRegistry;
use crate::config::BridgeConfig;
use crate::error::{Error, Result};
use crate::identifiers::SessionId;

use super::connection::{Connection, PeerRole};
use super::pool::SessionPool;

// ============================================================================
// Constants
// ============================================================================

/// Accept poll interval, bounding how long shutdown takes to notice.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// Path Routing
// ============================================================================

/// Extracts the session ID from a WebSocket request path.
///
/// Uses the last non-empty segment, percent-decoded. Query strings are
/// ignored.
///
/// # Example
///
/// ```
/// use devtools_bridge::transport::session_id_from_path;
///
/// let id = session_id_from_path("/devtools/page/abc123").unwrap();
/// assert_eq!(id.as_str(), "abc123");
/// assert!(session_id_from_path("/").is_none());
/// ```
#[must_use]
pub fn session_id_from_path(path: &str) -> Option<SessionId> {
    let path = path.split('?').next().unwrap_or_default();
    let segment = path.rsplit('/').find(|s| !s.is_empty())?;
    let decoded = urlencoding::decode(segment).ok()?;
    SessionId::new(decoded.as_ref())
}

// ============================================================================
// BridgeServer
// ============================================================================

/// Dual-listener WebSocket server feeding session bridges.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use devtools_bridge::{BridgeConfig, BridgeServer, bridge::MiddlewareRegistry};
///
/// let server = BridgeServer::bind(BridgeConfig::default(), Arc::new(MiddlewareRegistry::new())).await?;
/// println!("DevTools: {}", server.client_url(&session_id));
/// println!("Device:   {}", server.device_url(&session_id));
/// ```
pub struct BridgeServer {
    /// Sessions by ID.
    pool: SessionPool,

    /// Bound client listener address.
    client_addr: SocketAddr,

    /// Bound device listener address.
    device_addr: SocketAddr,

    /// Shutdown flag.
    shutdown: AtomicBool,
}

impl BridgeServer {
    /// Binds both listeners and starts their accept loops.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the configuration is invalid
    /// - [`Error::Io`] if binding fails
    pub async fn bind(config: BridgeConfig, registry: Arc<dyn TransformRegistry>) -> Result<Arc<Self>> {
        config.validate()?;

        let client_listener =
            TcpListener::bind(SocketAddr::new(config.bind_ip, config.client_port)).await?;
        let device_listener =
            TcpListener::bind(SocketAddr::new(config.bind_ip, config.device_port)).await?;

        let server = Arc::new(Self {
            client_addr: client_listener.local_addr()?,
            device_addr: device_listener.local_addr()?,
            pool: SessionPool::new(config, registry),
            shutdown: AtomicBool::new(false),
        });

        for (listener, role) in [
            (client_listener, PeerRole::Client),
            (device_listener, PeerRole::Device),
        ] {
            let server = Arc::clone(&server);
            tokio::spawn(async move {
                server.accept_loop(listener, role).await;
            });
        }

        info!(
            client = %server.client_addr,
            device = %server.device_addr,
            "Bridge server started"
        );

        Ok(server)
    }

    /// Returns the bound client listener address.
    #[inline]
    #[must_use]
    pub fn client_addr(&self) -> SocketAddr {
        self.client_addr
    }

    /// Returns the bound device listener address.
    #[inline]
    #[must_use]
    pub fn device_addr(&self) -> SocketAddr {
        self.device_addr
    }

    /// WebSocket URL a DevTools frontend uses for `session_id`.
    #[must_use]
    pub fn client_url(&self, session_id: &SessionId) -> String {
        format!(
            "ws://{}/devtools/page/{}",
            self.client_addr,
            urlencoding::encode(session_id.as_str())
        )
    }

    /// WebSocket URL a device uses for `session_id`.
    #[must_use]
    pub fn device_url(&self, session_id: &SessionId) -> String {
        format!(
            "ws://{}/device/{}",
            self.device_addr,
            urlencoding::encode(session_id.as_str())
        )
    }

    /// Returns the session pool.
    #[inline]
    #[must_use]
    pub fn pool(&self) -> &SessionPool {
        &self.pool
    }

    /// Stops accepting connections and stops every session.
    pub fn shutdown(&self) {
        info!("Bridge server shutting down");
        self.shutdown.store(true, Ordering::SeqCst);
        self.pool.shutdown();
    }
}

// ============================================================================
// BridgeServer - Accept Loop
// ============================================================================

impl BridgeServer {
    /// Background task that accepts new connections for one role.
    async fn accept_loop(self: Arc<Self>, listener: TcpListener, role: PeerRole) {
        debug!(%role, "Accept loop started");

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                debug!(%role, "Accept loop shutting down");
                break;
            }

            // Accept with timeout to allow checking shutdown flag
            match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
                Ok(Ok((stream, addr))) => {
                    let server = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = server.handle_connection(stream, addr, role).await {
                            warn!(error = %e, ?addr, %role, "Connection handling failed");
                        }
                    });
                }
                Ok(Err(e)) => {
                    error!(error = %e, %role, "Accept failed");
                }
                Err(_) => continue,
            }
        }

        debug!(%role, "Accept loop terminated");
    }

    /// Upgrades one TCP stream and attaches it to its session.
    async fn handle_connection(&self, stream: TcpStream, addr: SocketAddr, role: PeerRole) -> Result<()> {
        debug!(?addr, %role, "New TCP connection");

        let mut session_id = None;
        let callback = |request: &Request, response: Response| -> StdResult<Response, ErrorResponse> {
            match session_id_from_path(request.uri().path()) {
                Some(id) => {
                    session_id = Some(id);
                    Ok(response)
                }
                None => {
                    let mut rejection = ErrorResponse::new(Some("missing session id in path".into()));
                    *rejection.status_mut() = StatusCode::BAD_REQUEST;
                    Err(rejection)
                }
            }
        };

        let ws_stream = tokio_tungstenite::accept_hdr_async(stream, callback).await?;

        let session_id =
            session_id.ok_or_else(|| Error::protocol("handshake completed without session id"))?;

        let session = self.pool.get_or_create(&session_id);
        let connection = Connection::attach(ws_stream, role, session)?;

        info!(session_id = %session_id, connection_id = %connection.id(), %role, ?addr, "Connection attached");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use anyhow::Context;
    use futures_util::{SinkExt, StreamExt};
    use serde_json::{Value, json};
    use tokio::io::AsyncWriteExt;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message;

    use crate::bridge::MiddlewareRegistry;

    const STEP_TIMEOUT: Duration = Duration::from_secs(5);

    async fn start(registry: MiddlewareRegistry) -> Arc<BridgeServer> {
        let config = BridgeConfig::builder()
            .client_port(0)
            .device_port(0)
            .build()
            .expect("valid config");
        BridgeServer::bind(config, Arc::new(registry))
            .await
            .expect("bind")
    }

    async fn next_json<S>(stream: &mut S) -> Value
    where
        S: futures_util::Stream<Item = StdResult<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
    {
        loop {
            let message = timeout(STEP_TIMEOUT, stream.next())
                .await
                .expect("frame before timeout")
                .expect("stream open")
                .expect("valid frame");
            if let Message::Text(text) = message {
                return serde_json::from_str(&text).expect("JSON frame");
            }
        }
    }

    async fn wait_until<F>(server: &BridgeServer, session_id: &SessionId, check: F)
    where
        F: Fn(&crate::bridge::SessionStatus) -> bool,
    {
        timeout(STEP_TIMEOUT, async {
            loop {
                if let Ok(handle) = server.pool().get(session_id)
                    && let Ok(status) = handle.status().await
                    && check(&status)
                {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition before timeout");
    }

    #[test]
    fn test_session_id_from_path() {
        let cases = [
            ("/devtools/page/abc", Some("abc")),
            ("/device/abc/", Some("abc")),
            ("/abc?token=1", Some("abc")),
            ("/device/a%20b", Some("a b")),
            ("/", None),
            ("", None),
        ];
        for (path, expected) in cases {
            assert_eq!(
                session_id_from_path(path).as_ref().map(SessionId::as_str),
                expected,
                "{path}"
            );
        }
    }

    #[tokio::test]
    async fn test_bind_random_ports() {
        let server = start(MiddlewareRegistry::new()).await;
        assert_ne!(server.client_addr().port(), 0);
        assert_ne!(server.device_addr().port(), 0);

        let id = SessionId::new("s").expect("valid session id");
        assert!(server.client_url(&id).ends_with("/devtools/page/s"));
        assert!(server.device_url(&id).ends_with("/device/s"));
        server.shutdown();
    }

    #[tokio::test]
    async fn test_rejects_missing_session_id() {
        let server = start(MiddlewareRegistry::new()).await;
        let url = format!("ws://{}/", server.client_addr());
        assert!(connect_async(url).await.is_err());
        server.shutdown();
    }

    #[tokio::test]
    async fn test_failed_upgrade_is_websocket_error() -> anyhow::Result<()> {
        let server = start(MiddlewareRegistry::new()).await;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let mut peer = TcpStream::connect(listener.local_addr()?).await?;
        peer.write_all(b"GET /devtools/page/s HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await?;
        let (stream, addr) = listener.accept().await?;

        let err = server
            .handle_connection(stream, addr, PeerRole::Client)
            .await
            .expect_err("plain HTTP request is not an upgrade");
        assert!(matches!(err, Error::WebSocket(_)));
        assert!(err.is_connection_error());
        assert_eq!(server.pool().session_count(), 0);

        server.shutdown();
        Ok(())
    }

    #[tokio::test]
    async fn test_end_to_end_routing() -> anyhow::Result<()> {
        let mut registry = MiddlewareRegistry::new();
        registry.register("Page", "getTree", |result, _| json!({ "frameTree": result }));
        let server = start(registry).await;
        let session_id = SessionId::generate();

        // Device connects and announces its domains.
        let (mut device, _) = connect_async(server.device_url(&session_id))
            .await
            .context("device connect")?;
        device
            .send(Message::Text(
                json!({"event": "connection", "data": {"status": "ok", "supportedDomains": ["Page"]}})
                    .to_string()
                    .into(),
            ))
            .await
            .context("device handshake")?;
        wait_until(&server, &session_id, |s| s.device_connected && !s.enabled_domains.is_empty()).await;

        // Client connects and enables Network.
        let (mut client, _) = connect_async(server.client_url(&session_id))
            .await
            .context("client connect")?;
        client
            .send(Message::Text(r#"{"id":1,"method":"Network.enable"}"#.into()))
            .await
            .context("send enable")?;
        assert_eq!(next_json(&mut client).await, json!({"id": 1, "result": {}}));

        // Enabled command reaches the device.
        client
            .send(Message::Text(r#"{"id":2,"method":"Page.getTree","params":{}}"#.into()))
            .await
            .context("send command")?;
        assert_eq!(
            next_json(&mut device).await,
            json!({"event": "command", "data": {"id": 2, "method": "Page.getTree", "params": {}}})
        );

        // Device result is transformed and stripped before the client sees it.
        device
            .send(Message::Text(
                json!({"event": "result", "data": {"id": 2, "result": {"root": 1}, "_domain": "Page", "_method": "getTree"}})
                    .to_string()
                    .into(),
            ))
            .await
            .context("device result")?;
        assert_eq!(
            next_json(&mut client).await,
            json!({"id": 2, "result": {"frameTree": {"root": 1}}})
        );

        // Sessions outlive their peers: state stays until the pool drops it.
        client.close(None).await.context("client close")?;
        device.close(None).await.context("device close")?;
        wait_until(&server, &session_id, |s| !s.client_connected && !s.device_connected).await;

        let status = server.pool().get(&session_id)?.status().await?;
        assert_eq!(status.enabled_domains, vec!["Page", "Network"]);
        assert_eq!(server.pool().session_count(), 1);

        server.pool().remove(&session_id);
        assert_eq!(server.pool().session_count(), 0);

        server.shutdown();
        Ok(())
    }
}
