//! Error types for the DevTools bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use devtools_bridge::{Result, protocol::ClientFrame};
//!
//! fn decode(text: &str) -> Result<()> {
//!     let message = ClientFrame::Text(text.into()).decode()?;
//!     println!("{}", message.method);
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::ConnectionClosed`], [`Error::ChannelNotOpen`], [`Error::WebSocket`] |
//! | Protocol | [`Error::Protocol`], [`Error::MalformedMethod`] |
//! | Session | [`Error::SessionNotFound`], [`Error::SessionClosed`] |
//! | External | [`Error::Io`], [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::SessionId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when bridge configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Connection closed.
    ///
    /// Returned when writing to a connection whose event loop has ended.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Client channel is attached but not in the open state.
    #[error("Channel not open")]
    ChannelNotOpen,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or undecodable frame.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Method field without a `Domain.method` separator.
    #[error("Malformed method: {method:?}")]
    MalformedMethod {
        /// The offending method string.
        method: String,
    },

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// No session registered under this identifier.
    #[error("Session not found: {session_id}")]
    SessionNotFound {
        /// The missing session ID.
        session_id: SessionId,
    },

    /// The session worker has stopped accepting input.
    #[error("Session closed: {session_id}")]
    SessionClosed {
        /// The closed session ID.
        session_id: SessionId,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket handshake or stream error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a malformed method error.
    #[inline]
    pub fn malformed_method(method: impl Into<String>) -> Self {
        Self::MalformedMethod {
            method: method.into(),
        }
    }

    /// Creates a session not found error.
    #[inline]
    pub fn session_not_found(session_id: SessionId) -> Self {
        Self::SessionNotFound { session_id }
    }

    /// Creates a session closed error.
    #[inline]
    pub fn session_closed(session_id: SessionId) -> Self {
        Self::SessionClosed { session_id }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed | Self::ChannelNotOpen | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error came from a bad inbound payload.
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::Protocol { .. } | Self::MalformedMethod { .. } | Self::Json(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors affect a single message; the session keeps running.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.is_protocol_error() || matches!(self, Self::ChannelNotOpen)
    }
}

// ============================================================================
// Tests
// ============================================================================
