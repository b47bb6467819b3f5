//! Protocol message types.
//!
//! This module defines the messages exchanged between the bridge, the
//! DevTools frontend (client) and the instrumented device.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `InboundMessage` | Client → Bridge | CDP command request |
//! | `OutboundMessage` | Bridge → Client | CDP command result |
//! | `DeviceEvent` | Device → Bridge | Result, handshake or debug text |
//! | `DeviceOutbound` | Bridge → Device | Forwarded command |
//! | `ClientEvent` | Client → Bridge | Open, message or close |
//!
//! # Method Naming
//!
//! Methods follow `Domain.methodName` format:
//!
//! - `Network.enable`
//! - `Page.reload`
//! - `Runtime.evaluate`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event` | Device and client event types |
//! | `message` | CDP request and result messages |

// ============================================================================
// Submodules
// ============================================================================

/// Device and client event types.
pub mod event;

/// CDP request and result messages.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::{
    ClientEvent, ClientFrame, DeviceEvent, DeviceHandshake, DeviceOutbound, ensure_non_empty,
    truncate_for_log,
};
pub use message::{InboundMessage, OutboundMessage, split_method};
