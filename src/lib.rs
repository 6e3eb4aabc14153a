//! wardbeds - Hospital bed availability and booking
//!
//! A client for a remote bed registry that keeps an eventually consistent
//! local view of bed occupancy, plus a reference registry server.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`] - Bed, booking and stats types
//! - [`registry`] - Registry contract, HTTP client, in-memory store and server
//! - [`availability`] - Availability view controller, resync and rendering
//! - [`session`] - Authenticated session with idle timeout
//! - [`config`] - Configuration management and settings
//! - [`error`] - Unified error type
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wardbeds::availability::{AvailabilityController, ControllerSettings};
//! use wardbeds::registry::{ClientConfig, RegistryClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = RegistryClient::new(ClientConfig::new("http://localhost:8080/api"))?;
//!     let view = AvailabilityController::new(Arc::new(client), ControllerSettings::default());
//!     view.mount().await;
//!     println!("{} beds available", view.available_count().await);
//!     view.unmount().await;
//!     Ok(())
//! }
//! ```

pub mod availability;
pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod session;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::availability::{AvailabilityController, ControllerSettings, FormField};
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result, WardbedsErrorTrait};
    pub use crate::models::{Bed, BedState, BedStats, BookingRequest, BookingTime};
    pub use crate::registry::{BedRegistry, InMemoryRegistry, RegistryClient, RegistryError};
    pub use crate::session::Session;
}

// Direct re-exports for convenience
pub use models::{Bed, BedStats, BookingRequest};
