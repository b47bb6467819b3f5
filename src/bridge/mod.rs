//! Session bridge: domain gating and message routing.
//!
//! One [`SessionBridge`] exists per debugging session. It mediates between the
//! device channel and the client channel, tracks which CDP domains the client
//! has enabled, and post-processes device results through a
//! [`TransformRegistry`] before they reach the client.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `domains` | Ordered, duplicate-free domain set |
//! | `notify` | Notifications emitted to external collaborators |
//! | `registry` | Outbound transformation lookup |
//! | `session` | The bridge state machine |
//! | `worker` | Task that owns a bridge and serializes its inputs |

// ============================================================================
// Submodules
// ============================================================================

/// Ordered domain set.
pub mod domains;

/// Bridge notifications.
pub mod notify;

/// Outbound transformation registry.
pub mod registry;

/// Session bridge state machine.
pub mod session;

/// Session worker task.
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use domains::DomainSet;
pub use notify::{BridgeNotification, IncomingCommand, NotificationHandler};
pub use registry::{MiddlewareRegistry, RequestContext, Transform, TransformRegistry};
pub use session::{DomainQuery, InboundOutcome, SessionBridge};
pub use worker::{SessionHandle, SessionInput, SessionStatus, SessionWorker};
