//! Unified error handling for the wardbeds crate
//!
//! Domain errors stay in their modules ([`RegistryError`], [`BookingError`],
//! [`ServerError`]); this enum lets them cross module boundaries as one type.
//!
//! # Usage
//!
//! ```rust,ignore
//! use wardbeds::error::{Error, ErrorCategory, WardbedsErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     match err.category() {
//!         ErrorCategory::Auth => eprintln!("Please log in again"),
//!         _ if err.is_recoverable() => eprintln!("Try again: {}", err.user_message()),
//!         _ => eprintln!("Fatal error: {err}"),
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::availability::BookingError;
pub use crate::registry::server::ServerError;
pub use crate::registry::RegistryError;

/// Common interface implemented by wardbeds error types
pub trait WardbedsErrorTrait: std::error::Error {
    /// Check if the user can retry the operation
    fn is_recoverable(&self) -> bool;

    /// Message suitable for showing to the user
    fn user_message(&self) -> String;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Local input checks, raised without a network round-trip
    Validation,
    /// Registry rejected the request (double booking, unknown bed)
    Registry,
    /// Request never completed or response was unreadable
    Transport,
    /// Credential missing or rejected
    Auth,
    /// Configuration and startup errors
    Config,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Registry => "registry",
            Self::Transport => "transport",
            Self::Auth => "auth",
            Self::Config => "config",
        }
    }
}

impl WardbedsErrorTrait for RegistryError {
    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Unauthorized | Self::InvalidUrl(_))
    }

    fn user_message(&self) -> String {
        RegistryError::user_message(self)
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Unauthorized => ErrorCategory::Auth,
            Self::Rejected { status, .. } if *status < 500 => ErrorCategory::Registry,
            Self::Rejected { .. } | Self::Transport(_) | Self::Decode(_) => {
                ErrorCategory::Transport
            }
            Self::InvalidUrl(_) => ErrorCategory::Config,
            Self::NotFound(_) | Self::AlreadyBooked(_) | Self::NotBooked(_) => {
                ErrorCategory::Registry
            }
            Self::Validation(_) => ErrorCategory::Validation,
        }
    }
}

impl WardbedsErrorTrait for BookingError {
    fn is_recoverable(&self) -> bool {
        true
    }

    fn user_message(&self) -> String {
        self.to_string()
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Validation
    }
}

/// Unified error type for the wardbeds crate
#[derive(Error, Debug)]
pub enum Error {
    /// Registry call failures
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Local booking validation failures
    #[error("Booking error: {0}")]
    Booking(#[from] BookingError),

    /// Reference server failures
    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

impl WardbedsErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Registry(e) => e.is_recoverable(),
            Self::Booking(e) => e.is_recoverable(),
            Self::Server(_) => false,
            Self::Io(_) => true,
            Self::Config(_) => false,
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::Registry(e) => WardbedsErrorTrait::user_message(e),
            Self::Booking(e) => e.user_message(),
            other => other.to_string(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Registry(e) => e.category(),
            Self::Booking(e) => e.category(),
            Self::Server(ServerError::Config(_)) | Self::Config(_) => ErrorCategory::Config,
            Self::Server(_) | Self::Io(_) => ErrorCategory::Transport,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
