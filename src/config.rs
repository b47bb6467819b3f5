//! Bridge configuration.
//!
//! [`BridgeConfig`] holds listener addresses, the domain names recognized as
//! supported before any device handshake, and logging limits. Use
//! [`BridgeConfig::builder()`] for a validated instance.
//!
//! # Example
//!
//! ```
//! use devtools_bridge::BridgeConfig;
//!
//! # fn example() -> devtools_bridge::Result<()> {
//! let config = BridgeConfig::builder()
//!     .client_port(9222)
//!     .device_port(9300)
//!     .known_domains(["Network", "Page"])
//!     .build()?;
//!
//! assert_eq!(config.client_port, 9222);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Historical DevTools frontend port.
pub const DEFAULT_CLIENT_PORT: u16 = 9222;

/// Default port the instrumented device connects to.
pub const DEFAULT_DEVICE_PORT: u16 = 9223;

/// Default number of characters kept when logging a message body.
pub const DEFAULT_LOG_TRUNCATE_LEN: usize = 500;

/// Domains accepted by `Domain.enable` before the device announces its own.
pub const DEFAULT_KNOWN_DOMAINS: &[&str] = &[
    "Console", "CSS", "DOM", "DOMStorage", "Debugger", "Inspector", "Log", "Network",
    "Overlay", "Page", "Profiler", "Runtime", "Storage",
];

// ============================================================================
// BridgeConfig
// ============================================================================

/// Runtime configuration shared by every session bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Address both listeners bind to.
    pub bind_ip: IpAddr,

    /// Port for DevTools frontend connections (0 for random).
    pub client_port: u16,

    /// Port for device connections (0 for random).
    pub device_port: u16,

    /// Domains recognized as supported at session creation.
    pub known_domains: Vec<String>,

    /// Maximum characters of a message body written to the log.
    pub log_truncate_len: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            client_port: DEFAULT_CLIENT_PORT,
            device_port: DEFAULT_DEVICE_PORT,
            known_domains: DEFAULT_KNOWN_DOMAINS.iter().map(|d| (*d).to_string()).collect(),
            log_truncate_len: DEFAULT_LOG_TRUNCATE_LEN,
        }
    }
}

impl BridgeConfig {
    /// Creates a builder seeded with defaults.
    #[inline]
    #[must_use]
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::new()
    }

    /// Checks the configuration for values the bridge cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if:
    /// - `log_truncate_len` is zero
    /// - both ports are the same non-zero value
    /// - a known domain name is empty or contains `.`
    pub fn validate(&self) -> Result<()> {
        if self.log_truncate_len == 0 {
            return Err(Error::config("log_truncate_len must be greater than zero"));
        }

        if self.client_port != 0 && self.client_port == self.device_port {
            return Err(Error::config(format!(
                "client and device listeners cannot share port {}",
                self.client_port
            )));
        }

        if let Some(bad) = self
            .known_domains
            .iter()
            .find(|d| d.is_empty() || d.contains('.'))
        {
            return Err(Error::config(format!("invalid domain name: {bad:?}")));
        }

        Ok(())
    }
}

// ============================================================================
// BridgeConfigBuilder
// ============================================================================

/// Fluent builder for [`BridgeConfig`].
#[derive(Debug, Default, Clone)]
pub struct BridgeConfigBuilder {
    config: BridgeConfig,
}

impl BridgeConfigBuilder {
    /// Creates a builder with default values.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bind address for both listeners.
    #[inline]
    #[must_use]
    pub fn bind_ip(mut self, ip: IpAddr) -> Self {
        self.config.bind_ip = ip;
        self
    }

    /// Sets the DevTools frontend port.
    #[inline]
    #[must_use]
    pub fn client_port(mut self, port: u16) -> Self {
        self.config.client_port = port;
        self
    }

    /// Sets the device port.
    #[inline]
    #[must_use]
    pub fn device_port(mut self, port: u16) -> Self {
        self.config.device_port = port;
        self
    }

    /// Replaces the known domain list.
    #[must_use]
    pub fn known_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.known_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    /// Appends one domain to the known list.
    #[must_use]
    pub fn known_domain(mut self, domain: impl Into<String>) -> Self {
        self.config.known_domains.push(domain.into());
        self
    }

    /// Sets the log truncation length.
    #[inline]
    #[must_use]
    pub fn log_truncate_len(mut self, len: usize) -> Self {
        self.config.log_truncate_len = len;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// See [`BridgeConfig::validate`].
    pub fn build(self) -> Result<BridgeConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ============================================================================
// Tests
// ============================================================================
