//! State held by the availability view

use chrono::{DateTime, Local};
use thiserror::Error;
use tokio::time::{Duration, Instant};

use crate::models::{Bed, BedStats, BookingRequest, BookingTime};

/// Independent loading flags; several may be set at once
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadingFlags {
    pub initialize: bool,
    pub booking: bool,
    pub unbooking: bool,
    pub general: bool,
}

impl LoadingFlags {
    /// Whether bed clicks are ignored.
    ///
    /// `general` (a manual refresh) does not block input.
    pub fn blocks_input(&self) -> bool {
        self.initialize || self.booking || self.unbooking
    }

    pub fn set(&mut self, kind: LoadingKind, value: bool) {
        match kind {
            LoadingKind::Initialize => self.initialize = value,
            LoadingKind::Booking => self.booking = value,
            LoadingKind::Unbooking => self.unbooking = value,
            LoadingKind::General => self.general = value,
        }
    }
}

/// Which loading flag an operation owns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingKind {
    Initialize,
    Booking,
    Unbooking,
    General,
}

/// Draft input field of the booking form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    PatientName,
    Time,
}

/// Local validation failures, raised before any registry call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    #[error("Select a bed to book")]
    NoBedSelected,

    #[error("Patient name is required")]
    MissingPatientName,

    #[error("Time is required")]
    MissingTime,

    #[error("Time must be in HH:MM format")]
    InvalidTime,
}

/// Draft booking input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingForm {
    pub patient_name: String,
    pub time: String,
}

impl BookingForm {
    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        match field {
            FormField::PatientName => self.patient_name = value.into(),
            FormField::Time => self.time = value.into(),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Whether the submit control would be enabled
    pub fn is_complete(&self) -> bool {
        !self.patient_name.trim().is_empty() && !self.time.is_empty()
    }

    /// Check the draft and build the request body
    pub fn validate(&self) -> Result<BookingRequest, BookingError> {
        if self.patient_name.trim().is_empty() {
            return Err(BookingError::MissingPatientName);
        }
        if self.time.is_empty() {
            return Err(BookingError::MissingTime);
        }
        let time = BookingTime::parse(&self.time).ok_or(BookingError::InvalidTime)?;
        Ok(BookingRequest::new(
            self.patient_name.trim(),
            time.to_string(),
        ))
    }
}

/// A success message that disappears on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessMessage {
    pub text: String,
    pub expires_at: Instant,
}

impl SuccessMessage {
    pub fn new(text: impl Into<String>, ttl: Duration) -> Self {
        Self {
            text: text.into(),
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Everything the availability view shows
#[derive(Debug, Clone, Default)]
pub struct AvailabilityState {
    /// Local projection of the registry, ordered as the registry sent it
    pub beds: Vec<Bed>,

    /// Bed chosen for booking
    pub selected_bed: Option<Bed>,

    /// Draft booking input
    pub booking_form: BookingForm,

    pub loading: LoadingFlags,

    /// Persists until the next action or form edit
    pub error: Option<String>,

    pub success: Option<SuccessMessage>,

    /// Set when the registry rejected the session credential
    pub unauthorized: bool,

    /// Wall-clock time of the last successful resync
    pub last_synced: Option<DateTime<Local>>,
}

impl AvailabilityState {
    pub fn with_beds(beds: Vec<Bed>) -> Self {
        Self {
            beds,
            ..Default::default()
        }
    }

    /// Replace the whole projection
    pub fn replace_beds(&mut self, beds: Vec<Bed>) {
        self.beds = beds;
        self.last_synced = Some(Local::now());
    }

    pub fn bed(&self, id: u32) -> Option<&Bed> {
        self.beds.iter().find(|b| b.id == id)
    }

    pub fn available_count(&self) -> usize {
        self.beds.iter().filter(|b| !b.is_booked).count()
    }

    pub fn booked_count(&self) -> usize {
        self.beds.iter().filter(|b| b.is_booked).count()
    }

    pub fn stats(&self) -> BedStats {
        BedStats::from_beds(&self.beds)
    }

    pub fn booked_beds(&self) -> impl Iterator<Item = &Bed> {
        self.beds.iter().filter(|b| b.is_booked)
    }

    pub fn is_busy(&self) -> bool {
        self.loading.blocks_input()
    }

    pub fn is_selected(&self, id: u32) -> bool {
        self.selected_bed.as_ref().is_some_and(|b| b.id == id)
    }

    pub fn set_success(&mut self, text: impl Into<String>, ttl: Duration) {
        self.success = Some(SuccessMessage::new(text, ttl));
    }

    /// Success text, unless it has expired
    pub fn success_message(&self) -> Option<&str> {
        self.success
            .as_ref()
            .filter(|s| !s.is_expired())
            .map(|s| s.text.as_str())
    }

    /// Drop an expired success message; returns whether anything changed
    pub fn prune_success(&mut self) -> bool {
        if self.success.as_ref().is_some_and(SuccessMessage::is_expired) {
            self.success = None;
            return true;
        }
        false
    }

    pub fn clear_selection(&mut self) {
        self.selected_bed = None;
        self.booking_form.clear();
    }
}
