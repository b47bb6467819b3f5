//! Per-session protocol bridge.
//!
//! [`SessionBridge`] is a plain state machine. It owns the device and client
//! attachments plus the enabled-domain set, and every operation takes
//! `&mut self`, so a single owner (see [`SessionWorker`]) serializes all
//! access without locks.
//!
//! # Routing
//!
//! | Inbound method | Action |
//! |----------------|--------|
//! | `X.enable` (X supported) | enable X, acknowledge `{id, result: {}}` |
//! | `X.disable` | disable X, acknowledge `{id, result: {}}` |
//! | `X.*` (X not enabled) | dropped |
//! | `X.*` (X enabled) | [`BridgeNotification::Incoming`] |
//!
//! Outbound results are optionally transformed, stripped of routing metadata
//! and sent only while the client channel is open.
//!
//! [`SessionWorker`]: super::SessionWorker

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use crate::config::BridgeConfig;
use crate::error::Result;
use crate::identifiers::{ConnectionId, RequestId, SessionId};
use crate::protocol::{
    ClientEvent, DeviceEvent, DeviceHandshake, InboundMessage, OutboundMessage, split_method,
    truncate_for_log,
};
use crate::transport::{ClientChannel, DeviceChannel};

use super::domains::DomainSet;
use super::notify::{BridgeNotification, IncomingCommand, NotificationHandler, Subscribers};
use super::registry::{RequestContext, TransformRegistry};

// ============================================================================
// Constants
// ============================================================================

const ENABLE_METHOD: &str = "enable";
const DISABLE_METHOD: &str = "disable";

// ============================================================================
// Types
// ============================================================================

/// The channel currently attached on one side, tagged with its connection.
struct Attachment<C: ?Sized> {
    connection_id: ConnectionId,
    channel: Arc<C>,
}

/// Argument to [`SessionBridge::is_domain_enabled`].
#[derive(Debug, Clone, Copy)]
pub enum DomainQuery<'a> {
    /// A bare domain name.
    Domain(&'a str),
    /// A message whose `method` prefix names the domain.
    Message(&'a InboundMessage),
}

impl<'a> From<&'a str> for DomainQuery<'a> {
    #[inline]
    fn from(domain: &'a str) -> Self {
        Self::Domain(domain)
    }
}

impl<'a> From<&'a InboundMessage> for DomainQuery<'a> {
    #[inline]
    fn from(message: &'a InboundMessage) -> Self {
        Self::Message(message)
    }
}

/// What [`SessionBridge::handle_inbound`] did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundOutcome {
    /// `enable` on a supported domain; acknowledged to the client.
    Acknowledged,
    /// `disable`; acknowledged to the client.
    Disabled,
    /// Domain not enabled; silently dropped.
    Dropped,
    /// Emitted as an `Incoming` notification.
    Forwarded,
}

// ============================================================================
// SessionBridge
// ============================================================================

/// Bridge between one device channel and one client channel.
pub struct SessionBridge {
    /// Session identity, fixed at creation.
    id: SessionId,
    /// Live device transport attached.
    device_connected: bool,
    /// Client transport attached and open.
    client_connected: bool,
    /// Domains the client enabled.
    enabled_domains: DomainSet,
    /// Domains `X.enable` is accepted for.
    supported_domains: DomainSet,
    /// Current device attachment.
    device: Option<Attachment<dyn DeviceChannel>>,
    /// Current client attachment.
    client: Option<Attachment<dyn ClientChannel>>,
    /// Outbound transformation lookup.
    registry: Arc<dyn TransformRegistry>,
    /// Notification handlers.
    subscribers: Subscribers,
    /// Characters of a message body kept in logs.
    log_truncate_len: usize,
}

impl std::fmt::Debug for SessionBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBridge")
            .field("id", &self.id)
            .field("device_connected", &self.device_connected)
            .field("client_connected", &self.client_connected)
            .field("enabled_domains", &self.enabled_domains)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SessionBridge - Constructor & Accessors
// ============================================================================

impl SessionBridge {
    /// Creates a bridge with no attachments and no enabled domains.
    #[must_use]
    pub fn new(id: SessionId, config: &BridgeConfig, registry: Arc<dyn TransformRegistry>) -> Self {
        Self {
            id,
            device_connected: false,
            client_connected: false,
            enabled_domains: DomainSet::new(),
            supported_domains: config.known_domains.iter().collect(),
            device: None,
            client: None,
            registry,
            subscribers: Subscribers::default(),
            log_truncate_len: config.log_truncate_len,
        }
    }

    /// Returns the session ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Returns `true` while a device channel is attached.
    #[inline]
    #[must_use]
    pub fn is_device_connected(&self) -> bool {
        self.device_connected
    }

    /// Returns `true` while an open client channel is attached.
    #[inline]
    #[must_use]
    pub fn is_client_connected(&self) -> bool {
        self.client_connected
    }

    /// Domains enabled by the client, in enable order.
    #[inline]
    #[must_use]
    pub fn enabled_domains(&self) -> &DomainSet {
        &self.enabled_domains
    }

    /// Domains accepted by `X.enable`.
    #[inline]
    #[must_use]
    pub fn supported_domains(&self) -> &DomainSet {
        &self.supported_domains
    }

    /// Registers a notification handler.
    pub fn subscribe(&mut self, handler: NotificationHandler) {
        self.subscribers.push(handler);
    }
}

// ============================================================================
// SessionBridge - Device Lifecycle
// ============================================================================

impl SessionBridge {
    /// Attaches a device channel, releasing any previous one.
    pub fn on_device_connect(&mut self, connection_id: ConnectionId, channel: Arc<dyn DeviceChannel>) {
        let previous = self.device.replace(Attachment {
            connection_id,
            channel,
        });

        if let Some(previous) = previous {
            debug!(
                session_id = %self.id,
                old = %previous.connection_id,
                new = %connection_id,
                "Device channel replaced"
            );
            previous.channel.close();
        }

        self.device_connected = true;
        info!(session_id = %self.id, %connection_id, "Device connected");
    }

    /// Detaches the device channel if `connection_id` is the current one.
    ///
    /// Returns `false` for a stale connection.
    pub fn on_device_disconnect(&mut self, connection_id: ConnectionId) -> bool {
        if !self.is_current_device(connection_id) {
            debug!(session_id = %self.id, %connection_id, "Ignoring stale device disconnect");
            return false;
        }

        if let Some(attachment) = self.device.take() {
            attachment.channel.close();
        }
        self.device_connected = false;
        info!(session_id = %self.id, %connection_id, "Device disconnected");
        true
    }

    /// Handles one event from the device channel.
    ///
    /// Events from a connection that is no longer attached are ignored.
    pub fn handle_device_event(&mut self, connection_id: ConnectionId, event: DeviceEvent) {
        if !self.is_current_device(connection_id) {
            trace!(session_id = %self.id, %connection_id, "Ignoring event from stale device");
            return;
        }

        match event {
            DeviceEvent::Result(message) => self.send_to_client(message),
            DeviceEvent::Connection(handshake) => self.on_device_handshake(handshake),
            DeviceEvent::Debug(text) => {
                debug!(
                    target: "device",
                    session_id = %self.id,
                    "{}",
                    truncate_for_log(&text, self.log_truncate_len)
                );
            }
        }
    }

    /// Sends a command to the device, dropping it if none is attached.
    pub fn forward_to_device(&self, message: &InboundMessage) {
        let Some(device) = &self.device else {
            trace!(session_id = %self.id, method = %message.method, "No device attached, dropping");
            return;
        };

        if let Err(e) = device.channel.send_command(message) {
            debug!(session_id = %self.id, error = %e, "Device send failed");
        }
    }

    fn on_device_handshake(&mut self, handshake: DeviceHandshake) {
        info!(
            session_id = %self.id,
            status = %handshake.status,
            domains = ?handshake.supported_domains,
            "Device handshake"
        );

        for domain in &handshake.supported_domains {
            self.supported_domains.insert(domain);
        }
        self.enable_domains(&handshake.supported_domains);
    }

    fn is_current_device(&self, connection_id: ConnectionId) -> bool {
        self.device
            .as_ref()
            .is_some_and(|a| a.connection_id == connection_id)
    }
}

// ============================================================================
// SessionBridge - Client Lifecycle
// ============================================================================

impl SessionBridge {
    /// Attaches a client channel, releasing any previous one.
    ///
    /// The client counts as connected only once the channel is open.
    pub fn on_client_connect(&mut self, connection_id: ConnectionId, channel: Arc<dyn ClientChannel>) {
        let open = channel.ready_state().is_open();
        let previous = self.client.replace(Attachment {
            connection_id,
            channel,
        });

        if let Some(previous) = previous {
            debug!(
                session_id = %self.id,
                old = %previous.connection_id,
                new = %connection_id,
                "Client channel replaced"
            );
            previous.channel.close();
        }

        self.client_connected = open;
        info!(session_id = %self.id, %connection_id, open, "Client attached");
    }

    /// Detaches the client channel if `connection_id` is the current one.
    ///
    /// Returns `false` for a stale connection.
    pub fn on_client_disconnect(&mut self, connection_id: ConnectionId) -> bool {
        if !self.is_current_client(connection_id) {
            debug!(session_id = %self.id, %connection_id, "Ignoring stale client disconnect");
            return false;
        }

        if let Some(attachment) = self.client.take() {
            attachment.channel.close();
        }
        self.client_connected = false;
        info!(session_id = %self.id, %connection_id, "Client disconnected");
        true
    }

    /// Handles one event from the client channel.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if a message frame cannot be decoded or its
    /// method has no domain separator. The session is unaffected.
    pub fn handle_client_event(
        &mut self,
        connection_id: ConnectionId,
        event: ClientEvent,
    ) -> Result<Option<InboundOutcome>> {
        if !self.is_current_client(connection_id) {
            trace!(session_id = %self.id, %connection_id, "Ignoring event from stale client");
            return Ok(None);
        }

        match event {
            ClientEvent::Open => {
                self.client_connected = self
                    .client
                    .as_ref()
                    .is_some_and(|a| a.channel.ready_state().is_open());
                debug!(
                    session_id = %self.id,
                    %connection_id,
                    open = self.client_connected,
                    "Client open event"
                );
                Ok(None)
            }
            ClientEvent::Message(frame) => {
                let message = frame.decode()?;
                self.handle_inbound(message).map(Some)
            }
            ClientEvent::Close => {
                self.on_client_disconnect(connection_id);
                Ok(None)
            }
        }
    }

    fn is_current_client(&self, connection_id: ConnectionId) -> bool {
        self.client
            .as_ref()
            .is_some_and(|a| a.connection_id == connection_id)
    }
}

// ============================================================================
// SessionBridge - Domains
// ============================================================================

impl SessionBridge {
    /// Enables `domain`. Already-enabled domains are left as they are.
    pub fn enable_domain(&mut self, domain: &str) {
        if !self.enabled_domains.insert(domain) {
            debug!(session_id = %self.id, domain, "Domain already enabled");
            return;
        }

        debug!(session_id = %self.id, domain, "Domain enabled");
        self.subscribers
            .emit(&BridgeNotification::DomainEnabled(domain.to_owned()));
    }

    /// Enables each domain in order.
    pub fn enable_domains<I, S>(&mut self, domains: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for domain in domains {
            self.enable_domain(domain.as_ref());
        }
    }

    /// Disables `domain`. A domain that is not enabled is a no-op.
    pub fn disable_domain(&mut self, domain: &str) {
        if !self.enabled_domains.remove(domain) {
            trace!(session_id = %self.id, domain, "Domain not enabled");
            return;
        }

        debug!(session_id = %self.id, domain, "Domain disabled");
        self.subscribers
            .emit(&BridgeNotification::DomainDisabled(domain.to_owned()));
    }

    /// Checks a bare domain, or the domain prefix of a message's method.
    #[must_use]
    pub fn is_domain_enabled<'a>(&self, query: impl Into<DomainQuery<'a>>) -> bool {
        let domain = match query.into() {
            DomainQuery::Domain(domain) => domain,
            DomainQuery::Message(message) => message.domain(),
        };
        self.enabled_domains.contains(domain)
    }
}

// ============================================================================
// SessionBridge - Inbound
// ============================================================================

impl SessionBridge {
    /// Routes a decoded client message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedMethod`] if `method` is not `Domain.method`.
    ///
    /// [`Error::MalformedMethod`]: crate::Error::MalformedMethod
    pub fn handle_inbound(&mut self, message: InboundMessage) -> Result<InboundOutcome> {
        let (domain, method) = split_method(&message.method)?;
        let (domain, method) = (domain.to_owned(), method.to_owned());

        if method == ENABLE_METHOD && self.supported_domains.contains(&domain) {
            self.enable_domain(&domain);
            self.acknowledge(message.id);
            return Ok(InboundOutcome::Acknowledged);
        }

        if method == DISABLE_METHOD {
            self.disable_domain(&domain);
            self.acknowledge(message.id);
            return Ok(InboundOutcome::Disabled);
        }

        if !self.enabled_domains.contains(&domain) {
            trace!(session_id = %self.id, %domain, %method, "Domain not enabled, dropping");
            return Ok(InboundOutcome::Dropped);
        }

        trace!(session_id = %self.id, %domain, %method, "Incoming command");
        self.subscribers
            .emit(&BridgeNotification::Incoming(IncomingCommand {
                domain,
                method,
                message,
            }));
        Ok(InboundOutcome::Forwarded)
    }

    fn acknowledge(&self, id: RequestId) {
        self.send_to_client(OutboundMessage::acknowledge(id));
    }
}

// ============================================================================
// SessionBridge - Outbound
// ============================================================================

impl SessionBridge {
    /// Sends a result to the client.
    ///
    /// Drops the message when no client is attached or the client is not
    /// open. A registered transformation for the message's `_domain`/`_method`
    /// is applied once and its output sent with the same `id`.
    pub fn send_to_client(&self, mut message: OutboundMessage) {
        let Some(client) = &self.client else {
            trace!(session_id = %self.id, "No client attached, dropping");
            return;
        };

        if let Some((domain, method)) = message.take_route()
            && let Some(transform) = self.registry.lookup(&domain, &method)
        {
            trace!(session_id = %self.id, %domain, %method, "Applying transformation");
            let context = self.request_context(message.id);
            let result = transform(message.result, &context);
            self.send_to_client(OutboundMessage::new(message.id, result));
            return;
        }

        let text = match message.to_wire() {
            Ok(text) => text,
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "Failed to serialize outbound message");
                return;
            }
        };

        trace!(
            session_id = %self.id,
            message = %truncate_for_log(&text, self.log_truncate_len),
            "To client"
        );

        if !client.channel.ready_state().is_open() {
            trace!(session_id = %self.id, "Client not open, dropping");
            return;
        }

        if let Err(e) = client.channel.send_text(text) {
            debug!(session_id = %self.id, error = %e, "Client send failed");
        }
    }

    fn request_context(&self, request_id: Option<RequestId>) -> RequestContext {
        RequestContext {
            session_id: self.id.clone(),
            request_id,
            enabled_domains: self.enabled_domains.to_vec(),
        }
    }
}

// ============================================================================
// SessionBridge - Teardown
// ============================================================================

impl SessionBridge {
    /// Releases both channels.
    pub fn close(&mut self) {
        if let Some(device) = self.device.take() {
            device.channel.close();
        }
        if let Some(client) = self.client.take() {
            client.channel.close();
        }
        self.device_connected = false;
        self.client_connected = false;
        debug!(session_id = %self.id, "Session bridge closed");
    }
}

// ============================================================================
// Tests
// ============================================================================
