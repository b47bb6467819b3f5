//! DevTools Bridge - CDP-style relay between an instrumented device and a
//! debugging frontend.
//!
//! # Architecture
//!
//! The bridge sits between two independently connecting WebSockets:
//!
//! - **Device**: the instrumented app; sends results, a handshake listing
//!   its domains, and debug text
//! - **Client**: the DevTools frontend; sends `Domain.method` commands
//!
//! Key design principles:
//!
//! - Each session owns one [`SessionBridge`] hosted by a single worker task
//! - Commands reach the device only for domains the client enabled
//! - `Domain.enable` / `Domain.disable` are answered by the bridge itself
//! - Device results pass through an optional [`TransformRegistry`] and lose
//!   their `_domain`/`_method` routing fields before hitting the wire
//! - A missing or unopened peer means the message is dropped (no buffering)
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use devtools_bridge::{BridgeConfig, BridgeServer, MiddlewareRegistry, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = BridgeConfig::builder().client_port(9222).build()?;
//!     let server = BridgeServer::bind(config, Arc::new(MiddlewareRegistry::new())).await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | Session bridge, domain set, transformations, worker |
//! | [`config`] | [`BridgeConfig`] and its builder |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Wire messages and transport events |
//! | [`transport`] | WebSocket listeners, connections, session pool |

// ============================================================================
// Modules
// ============================================================================

/// Session bridge: domain gating and routing.
///
/// - [`SessionBridge`] - Per-session state machine
/// - [`SessionWorker`] - Task that owns a bridge
/// - [`MiddlewareRegistry`] - Outbound transformations
pub mod bridge;

/// Bridge configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Protocol message types.
pub mod protocol;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Bridge types
pub use bridge::{
    BridgeNotification, DomainSet, IncomingCommand, InboundOutcome, MiddlewareRegistry,
    RequestContext, SessionBridge, SessionHandle, SessionStatus, SessionWorker,
    TransformRegistry,
};

// Config types
pub use config::{BridgeConfig, BridgeConfigBuilder};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ConnectionId, RequestId, SessionId};

// Transport types
pub use transport::{BridgeServer, ClientChannel, DeviceChannel, ReadyState};
