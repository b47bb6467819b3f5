//! Transport layer.
//!
//! This module handles the two WebSocket sides of every session: the
//! instrumented device and the DevTools frontend.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ws://…:9223/device/<id>   ┌──────────────┐   ws://…:9222/devtools/page/<id>   ┌──────────────┐
//! │   Device     │────────────────────────────►│ BridgeServer │◄───────────────────────────────────│   DevTools   │
//! │ (instrumented│                             │  SessionPool │                                    │   frontend   │
//! │    app)      │                             │  → worker    │                                    │              │
//! └──────────────┘                             └──────────────┘                                    └──────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `BridgeServer::bind` - Bind client and device listeners
//! 2. Accept, upgrade, extract the session ID from the path
//! 3. `SessionPool::get_or_create` - Find or spawn the session worker
//! 4. `Connection::attach` - Queue the attachment and start the event loop
//! 5. Socket close - Queue the matching disconnect
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `channel` | Channel traits consumed by the bridge |
//! | `connection` | WebSocket connection and event loop |
//! | `pool` | Sessions keyed by ID |
//! | `server` | Listeners and path routing |

// ============================================================================
// Submodules
// ============================================================================

/// Channel traits consumed by the bridge.
pub mod channel;

/// WebSocket connection and event loop.
pub mod connection;

/// Session pool keyed by SessionId.
pub mod pool;

/// Listeners and path routing.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::{ClientChannel, DeviceChannel, ReadyState};
pub use connection::{Connection, PeerRole};
pub use pool::SessionPool;
pub use server::{BridgeServer, session_id_from_path};
