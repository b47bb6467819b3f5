//! Transport event types.
//!
//! Each channel kind delivers a closed set of events to its session bridge:
//!
//! | Source | Events |
//! |--------|--------|
//! | Device | `result`, `connection` (handshake), `debug` |
//! | Client | `Open`, `Message`, `Close` |
//!
//! Device frames are JSON envelopes tagged by `event`:
//!
//! ```json
//! { "event": "connection", "data": { "status": "ok", "supportedDomains": ["Network"] } }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Value, from_slice, from_str, from_value};

use crate::error::{Error, Result};

use super::{InboundMessage, OutboundMessage};

// ============================================================================
// DeviceEvent
// ============================================================================

/// An event emitted by the device channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum DeviceEvent {
    /// Result message destined for the client.
    Result(OutboundMessage),

    /// Initial handshake announcing the device's domains.
    Connection(DeviceHandshake),

    /// Free-form debug text from the device.
    Debug(String),
}

impl DeviceEvent {
    /// Decodes a device text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the frame is not a known envelope.
    #[inline]
    pub fn from_text(text: &str) -> Result<Self> {
        Ok(from_str(text)?)
    }
}

/// Payload of the device `connection` event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceHandshake {
    /// Status reported by the device.
    pub status: String,

    /// Domains the device can serve.
    #[serde(default)]
    pub supported_domains: Vec<String>,
}

// ============================================================================
// DeviceOutbound
// ============================================================================

/// A frame sent from the bridge to the device.
///
/// # Format
///
/// ```json
/// { "event": "command", "data": { "id": 2, "method": "Page.reload" } }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum DeviceOutbound<'a> {
    /// Client command forwarded for execution on the device.
    Command(&'a InboundMessage),
}

// ============================================================================
// ClientEvent
// ============================================================================

/// An event emitted by the client channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// The channel finished its handshake and can send.
    Open,

    /// An inbound protocol frame.
    Message(ClientFrame),

    /// The channel closed.
    Close,
}

/// Raw inbound client payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientFrame {
    /// UTF-8 text frame.
    Text(String),

    /// Binary frame holding UTF-8 JSON.
    Binary(Vec<u8>),

    /// Already-decoded JSON value.
    Json(Value),
}

impl ClientFrame {
    /// Decodes the frame into an [`InboundMessage`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the payload is not a valid message.
    pub fn decode(self) -> Result<InboundMessage> {
        let message = match self {
            Self::Text(text) => from_str(&text)?,
            Self::Binary(bytes) => from_slice(&bytes)?,
            Self::Json(value) => from_value(value)?,
        };
        Ok(message)
    }
}

// ============================================================================
// Log Truncation
// ============================================================================

/// Shortens `text` to at most `max_chars` characters for log output.
///
/// Appends a `…(N more)` marker when characters were cut.
#[must_use]
pub fn truncate_for_log(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        None => Cow::Borrowed(text),
        Some((cut, _)) => {
            let remaining = text[cut..].chars().count();
            Cow::Owned(format!("{}…({remaining} more)", &text[..cut]))
        }
    }
}

/// Rejects frames that cannot carry a protocol message.
///
/// # Errors
///
/// Returns [`Error::Protocol`] for an empty payload.
#[inline]
pub fn ensure_non_empty(payload: &[u8]) -> Result<()> {
    if payload.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::protocol("empty frame"));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
