//! Configuration management for wardbeds
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files. Command-line flags override both.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::registry::memory::DEFAULT_BED_COUNT;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote registry the client talks to
    pub registry: RegistryConfig,

    /// Availability view behaviour
    pub availability: AvailabilityConfig,

    /// Session lifecycle
    pub session: SessionConfig,

    /// Reference registry server
    pub server: ServerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Registry client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// API base URL
    pub base_url: String,

    /// Bearer token (skips login when set)
    pub token: Option<String>,

    /// Login email
    pub email: Option<String>,

    /// Login password
    pub password: Option<String>,

    /// Transport timeout in seconds; unset means no client-side timeout
    pub request_timeout_secs: Option<u64>,
}

/// Availability view configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailabilityConfig {
    /// Background resync interval in seconds
    pub resync_interval_secs: u64,

    /// How long success messages stay visible, in seconds
    pub success_message_secs: u64,
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle time before the session is ended, in seconds
    pub idle_timeout_secs: u64,
}

/// Reference registry server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_address: String,

    /// Beds created by `initialize`
    pub bed_count: u32,

    /// Static token accepted on every bed route
    pub access_token: Option<String>,

    /// Login email accepted by `/api/auth/login`
    pub login_email: Option<String>,

    /// Login password accepted by `/api/auth/login`
    pub login_password: Option<String>,

    /// Enable CORS for API
    pub enable_cors: bool,

    /// Enable request logging
    pub enable_request_logging: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("http://localhost:8080/api"),
            token: None,
            email: None,
            password: None,
            request_timeout_secs: None,
        }
    }
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self {
            resync_interval_secs: 30,
            success_message_secs: 3,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 4 * 60,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: String::from("0.0.0.0:8080"),
            bed_count: DEFAULT_BED_COUNT,
            access_token: None,
            login_email: None,
            login_password: None,
            enable_cors: true,
            enable_request_logging: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let registry = RegistryConfig {
            base_url: std::env::var("WARDBEDS_BASE_URL").unwrap_or(defaults.registry.base_url),
            token: std::env::var("WARDBEDS_TOKEN").ok(),
            email: std::env::var("WARDBEDS_EMAIL").ok(),
            password: std::env::var("WARDBEDS_PASSWORD").ok(),
            request_timeout_secs: env_parse("WARDBEDS_REQUEST_TIMEOUT"),
        };

        let availability = AvailabilityConfig {
            resync_interval_secs: env_parse("WARDBEDS_RESYNC_INTERVAL")
                .unwrap_or(defaults.availability.resync_interval_secs),
            success_message_secs: env_parse("WARDBEDS_SUCCESS_MESSAGE_SECS")
                .unwrap_or(defaults.availability.success_message_secs),
        };

        let session = SessionConfig {
            idle_timeout_secs: env_parse("WARDBEDS_IDLE_TIMEOUT")
                .unwrap_or(defaults.session.idle_timeout_secs),
        };

        let server = ServerConfig {
            bind_address: std::env::var("WARDBEDS_BIND_ADDRESS")
                .unwrap_or(defaults.server.bind_address),
            bed_count: env_parse("WARDBEDS_BED_COUNT").unwrap_or(defaults.server.bed_count),
            access_token: std::env::var("WARDBEDS_ACCESS_TOKEN").ok(),
            login_email: std::env::var("WARDBEDS_LOGIN_EMAIL").ok(),
            login_password: std::env::var("WARDBEDS_LOGIN_PASSWORD").ok(),
            ..defaults.server
        };

        let logging = LoggingConfig {
            level: std::env::var("WARDBEDS_LOG_LEVEL").unwrap_or(defaults.logging.level),
            format: std::env::var("WARDBEDS_LOG_FORMAT").unwrap_or(defaults.logging.format),
        };

        Ok(Self {
            registry,
            availability,
            session,
            server,
            logging,
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.registry.base_url)
            .with_context(|| format!("Invalid registry base_url: {}", self.registry.base_url))?;

        if self.registry.request_timeout_secs == Some(0) {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        if self.availability.resync_interval_secs == 0 {
            anyhow::bail!("resync_interval_secs must be greater than 0");
        }

        if self.availability.success_message_secs == 0 {
            anyhow::bail!("success_message_secs must be greater than 0");
        }

        if self.session.idle_timeout_secs == 0 {
            anyhow::bail!("idle_timeout_secs must be greater than 0");
        }

        if self.server.bed_count == 0 {
            anyhow::bail!("bed_count must be greater than 0");
        }

        self.server.socket_addr()?;

        if self.server.login_email.is_some() != self.server.login_password.is_some() {
            anyhow::bail!("login_email and login_password must be set together");
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.registry.request_timeout_secs.map(Duration::from_secs)
    }

    /// Get resync interval as Duration
    #[must_use]
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.availability.resync_interval_secs)
    }

    /// Get success message lifetime as Duration
    #[must_use]
    pub fn success_message_ttl(&self) -> Duration {
        Duration::from_secs(self.availability.success_message_secs)
    }

    /// Get session idle timeout as Duration
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session.idle_timeout_secs)
    }
}

impl ServerConfig {
    /// Parse the bind address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_address
            .parse()
            .with_context(|| format!("Invalid bind_address: {}", self.bind_address))
    }
}
