//! Lookup settings with compile-time defaults and runtime overrides
//!
//! Default values are compile-time constants. A process-wide override can be
//! installed once at startup (the CLI does this from its arguments); the
//! accessor functions return the override when present and the constants
//! otherwise.

use once_cell::sync::OnceCell;
use std::time::Duration;

/// Default whois endpoint of the bulk lookup service
pub const DEFAULT_WHOIS_SERVER: &str = "whois.cymru.com:43";
/// Default TCP connect timeout in milliseconds
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Line terminator of the whois session protocol
pub const LINE_TERMINATOR: &str = "\r\n";
/// Prefix of service-reported error lines
pub const ERROR_MARKER: &str = "Error:";
/// Longest response line accepted from the whois service, terminator included
pub const MAX_LINE_LEN: usize = 4096;

/// Zone answering IPv4 origin queries
pub const ORIGIN_ZONE: &str = "origin.asn.cymru.com";
/// Zone answering IPv6 origin queries
pub const ORIGIN6_ZONE: &str = "origin6.asn.cymru.com";
/// Zone answering ASN queries
pub const ASN_ZONE: &str = "asn.cymru.com";

/// Process-wide overrides for the lookup defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupSettings {
    /// Whois endpoint as `host:port`
    pub whois_server: String,
    /// TCP connect timeout for whois sessions
    pub connect_timeout: Duration,
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            whois_server: DEFAULT_WHOIS_SERVER.to_string(),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
        }
    }
}

// Runtime override storage - set once at program startup
static OVERRIDE_SETTINGS: OnceCell<LookupSettings> = OnceCell::new();

/// Get the whois endpoint
pub fn whois_server() -> String {
    OVERRIDE_SETTINGS
        .get()
        .map(|s| s.whois_server.clone())
        .unwrap_or_else(|| DEFAULT_WHOIS_SERVER.to_string())
}

/// Get the whois connect timeout
pub fn connect_timeout() -> Duration {
    OVERRIDE_SETTINGS
        .get()
        .map(|s| s.connect_timeout)
        .unwrap_or_else(|| Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS))
}

/// Install the global settings
///
/// Returns the rejected value if settings were already installed.
pub fn set_settings(settings: LookupSettings) -> Result<(), LookupSettings> {
    OVERRIDE_SETTINGS.set(settings)
}

/// Check if custom settings have been installed
pub fn is_custom_settings_set() -> bool {
    OVERRIDE_SETTINGS.get().is_some()
}

/// Per-client configuration for a whois session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Whois endpoint as `host:port`
    pub server: String,
    /// TCP connect timeout
    pub connect_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server: whois_server(),
            connect_timeout: connect_timeout(),
        }
    }
}

impl SessionConfig {
    /// Create a new SessionConfig builder
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.server.is_empty() {
            return Err("server must be specified".to_string());
        }
        if self.connect_timeout.is_zero() {
            return Err("connect_timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Builder for SessionConfig
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
        }
    }

    /// Set the whois endpoint
    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.config.server = server.into();
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<SessionConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
