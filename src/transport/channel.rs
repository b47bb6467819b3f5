//! Channel contracts consumed by the session bridge.
//!
//! The bridge never owns sockets directly. It talks to whatever is attached
//! through these two traits, which the WebSocket [`Connection`] implements and
//! tests replace with in-memory fakes.
//!
//! [`Connection`]: super::Connection

// ============================================================================
// Imports
// ============================================================================

use crate::error::Result;
use crate::protocol::InboundMessage;

// ============================================================================
// ReadyState
// ============================================================================

/// Readiness of a client channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReadyState {
    /// Accepted but not yet able to send.
    Connecting = 0,
    /// Able to send.
    Open = 1,
    /// Close in progress.
    Closing = 2,
    /// Closed.
    Closed = 3,
}

impl ReadyState {
    /// Converts the raw representation back, treating unknown values as closed.
    #[inline]
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }

    /// Returns `true` for [`ReadyState::Open`].
    #[inline]
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

// ============================================================================
// DeviceChannel
// ============================================================================

/// Transport to the instrumented device.
pub trait DeviceChannel: Send + Sync {
    /// Sends a client command to the device.
    ///
    /// # Errors
    ///
    /// Returns a connection error if the channel can no longer write.
    fn send_command(&self, message: &InboundMessage) -> Result<()>;

    /// Releases the channel. Further sends are dropped.
    fn close(&self);
}

// ============================================================================
// ClientChannel
// ============================================================================

/// Transport to the DevTools frontend.
pub trait ClientChannel: Send + Sync {
    /// Current readiness.
    fn ready_state(&self) -> ReadyState;

    /// Sends a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelNotOpen`] when not open, or a connection error
    /// if the writer has gone away.
    ///
    /// [`Error::ChannelNotOpen`]: crate::Error::ChannelNotOpen
    fn send_text(&self, text: String) -> Result<()>;

    /// Releases the channel. Further sends are dropped.
    fn close(&self);
}

// ============================================================================
// Tests
// ============================================================================
