//! Bed registry: the authoritative store of bed resources
//!
//! The registry owns booking state. Clients never mutate beds directly; they
//! request transitions and then re-read the full set.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐        ┌──────────────────────────────┐
//! │  AvailabilityController  │        │        RegistryServer        │
//! │                          │  HTTP  │  POST /api/beds/initialize   │
//! │   RegistryClient ────────┼───────▶│  GET  /api/beds              │
//! │   (impl BedRegistry)     │        │  GET  /api/beds/available    │
//! └──────────────────────────┘        │  GET  /api/beds/booked       │
//!                                     │  GET  /api/beds/stats        │
//!                                     │  POST /api/beds/{id}/book    │
//!                                     │  POST /api/beds/{id}/unbook  │
//!                                     │                              │
//!                                     │  InMemoryRegistry            │
//!                                     │  (impl BedRegistry)          │
//!                                     └──────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use wardbeds::registry::{BedRegistry, ClientConfig, RegistryClient};
//!
//! let client = RegistryClient::new(ClientConfig::new("http://localhost:8080/api"))?;
//! client.initialize().await?;
//! let beds = client.get_all().await?;
//! ```

pub mod api;
pub mod client;
pub mod memory;
pub mod server;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Bed, BedStats, BookingRequest};

// Re-export main types
pub use client::{ClientConfig, RegistryClient};
pub use memory::InMemoryRegistry;
pub use server::RegistryServer;

/// Operations offered by a bed registry.
///
/// Every call is a single request/response and may fail.
#[async_trait]
pub trait BedRegistry: Send + Sync {
    /// Create the full bed set if none exists; no-op otherwise.
    async fn initialize(&self) -> Result<(), RegistryError>;

    /// All beds, ordered by id ascending.
    async fn get_all(&self) -> Result<Vec<Bed>, RegistryError>;

    /// Beds that are not booked.
    async fn get_available(&self) -> Result<Vec<Bed>, RegistryError>;

    /// Beds that are booked.
    async fn get_booked(&self) -> Result<Vec<Bed>, RegistryError>;

    /// Transition a bed to booked.
    async fn book(&self, id: u32, request: &BookingRequest) -> Result<Bed, RegistryError>;

    /// Transition a bed to available.
    async fn unbook(&self, id: u32) -> Result<Bed, RegistryError>;

    /// Aggregate counts.
    async fn get_stats(&self) -> Result<BedStats, RegistryError>;
}

/// Errors raised by registry calls
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Credential missing, expired or rejected
    #[error("Unauthorized")]
    Unauthorized,

    /// Registry answered with a non-success status
    #[error("Registry rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Request never produced a response
    #[error("Network error: {0}")]
    Transport(String),

    /// Response body could not be decoded
    #[error("Invalid response: {0}")]
    Decode(String),

    /// Base URL or path could not be built
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Unknown bed id
    #[error("Bed {0} not found")]
    NotFound(u32),

    /// Bed already occupied
    #[error("Bed {0} is already booked")]
    AlreadyBooked(u32),

    /// Bed already available
    #[error("Bed {0} is not booked")]
    NotBooked(u32),

    /// Booking input failed validation
    #[error("{0}")]
    Validation(String),
}

impl RegistryError {
    /// Message shown to the user; the registry's own text where it sent one.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// HTTP status the reference server answers with
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized => 401,
            Self::Rejected { status, .. } => *status,
            Self::NotFound(_) => 404,
            Self::AlreadyBooked(_) | Self::NotBooked(_) => 409,
            Self::Validation(_) => 400,
            Self::Transport(_) | Self::Decode(_) | Self::InvalidUrl(_) => 500,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Validate booking input the way the registry does.
pub fn validate_booking(request: &BookingRequest) -> Result<(), RegistryError> {
    if request.patient_name.trim().is_empty() {
        return Err(RegistryError::Validation(
            "Patient name is required".to_string(),
        ));
    }
    if request.time.trim().is_empty() {
        return Err(RegistryError::Validation("Time is required".to_string()));
    }
    if crate::models::BookingTime::parse(&request.time).is_none() {
        return Err(RegistryError::Validation(
            "Time must be in HH:MM format".to_string(),
        ));
    }
    Ok(())
}
