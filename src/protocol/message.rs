//! CDP wire messages.
//!
//! Defines the client-facing message shapes:
//!
//! - [`InboundMessage`]: request from the frontend, `{id, method, params}`
//! - [`OutboundMessage`]: result for the frontend, `{id?, result}`

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, to_string};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

// ============================================================================
// Method Helpers
// ============================================================================

/// Splits a `Domain.method` string at the first `.`.
///
/// # Errors
///
/// Returns [`Error::MalformedMethod`] if there is no separator or either
/// side is empty.
///
/// # Example
///
/// ```
/// use devtools_bridge::protocol::split_method;
///
/// let (domain, method) = split_method("Network.enable").unwrap();
/// assert_eq!((domain, method), ("Network", "enable"));
/// assert!(split_method("Network").is_err());
/// ```
pub fn split_method(method: &str) -> Result<(&str, &str)> {
    match method.split_once('.') {
        Some((domain, name)) if !domain.is_empty() && !name.is_empty() => Ok((domain, name)),
        _ => Err(Error::malformed_method(method)),
    }
}

// ============================================================================
// InboundMessage
// ============================================================================

/// A command request from the DevTools frontend.
///
/// # Format
///
/// ```json
/// {
///   "id": 1,
///   "method": "Network.enable",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Correlation ID echoed in the response.
    pub id: RequestId,

    /// Method in `Domain.method` format.
    pub method: String,

    /// Method parameters.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl InboundMessage {
    /// Creates a message with empty params.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method: method.into(),
            params: Value::Null,
        }
    }

    /// Sets the params object.
    #[inline]
    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    /// Returns the substring before the first `.` (the whole method if none).
    #[inline]
    #[must_use]
    pub fn domain(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }

    /// Splits the method into domain and method name.
    ///
    /// # Errors
    ///
    /// See [`split_method`].
    #[inline]
    pub fn split(&self) -> Result<(&str, &str)> {
        split_method(&self.method)
    }
}

// ============================================================================
// OutboundMessage
// ============================================================================

/// A result travelling from the device (or the bridge) to the frontend.
///
/// `_domain` and `_method` are server-side routing metadata selecting a
/// transformation. They are accepted on input and never serialized.
///
/// # Format
///
/// ```json
/// {
///   "id": 5,
///   "result": { ... }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Correlation ID of the request being answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,

    /// Result payload.
    #[serde(default)]
    pub result: Value,

    /// Domain of the transformation to apply.
    #[serde(default, rename = "_domain", skip_serializing)]
    pub domain: Option<String>,

    /// Method of the transformation to apply.
    #[serde(default, rename = "_method", skip_serializing)]
    pub method: Option<String>,
}

impl OutboundMessage {
    /// Creates a message without routing metadata.
    #[inline]
    #[must_use]
    pub fn new(id: Option<RequestId>, result: Value) -> Self {
        Self {
            id,
            result,
            domain: None,
            method: None,
        }
    }

    /// Creates the `{id, result: {}}` acknowledgement for a request.
    #[inline]
    #[must_use]
    pub fn acknowledge(id: RequestId) -> Self {
        Self::new(Some(id), Value::Object(Map::new()))
    }

    /// Attaches transformation routing metadata.
    #[inline]
    #[must_use]
    pub fn with_route(mut self, domain: impl Into<String>, method: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self.method = Some(method.into());
        self
    }

    /// Removes and returns the routing pair if both halves are present.
    #[inline]
    pub fn take_route(&mut self) -> Option<(String, String)> {
        self.domain.take().zip(self.method.take())
    }

    /// Serializes the wire form (private fields omitted).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    #[inline]
    pub fn to_wire(&self) -> Result<String> {
        Ok(to_string(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
