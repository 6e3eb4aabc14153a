// Core data structures for the bed registry and its clients

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single hospital bed as held by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bed {
    /// Registry-assigned identifier, unique and immutable
    pub id: u32,

    /// Occupancy flag
    #[serde(default)]
    pub is_booked: bool,

    /// Patient occupying the bed (booked beds only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,

    /// Booking time in 24-hour `HH:MM` form (booked beds only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl Bed {
    /// Create an available bed
    pub fn available(id: u32) -> Self {
        Self {
            id,
            is_booked: false,
            patient_name: None,
            time: None,
        }
    }

    /// Create a booked bed
    pub fn booked(id: u32, patient_name: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            id,
            is_booked: true,
            patient_name: Some(patient_name.into()),
            time: Some(time.into()),
        }
    }

    /// Occupancy state derived from the wire fields
    pub fn state(&self) -> BedState {
        match (self.is_booked, non_empty(&self.patient_name), non_empty(&self.time)) {
            (true, Some(patient_name), Some(time)) => BedState::Booked {
                patient_name: patient_name.to_string(),
                time: time.to_string(),
            },
            _ => BedState::Available,
        }
    }

    /// Check the two-state invariant: available beds carry no occupant,
    /// booked beds carry both a patient name and a time.
    pub fn is_consistent(&self) -> bool {
        let name = non_empty(&self.patient_name);
        let time = non_empty(&self.time);

        if self.is_booked {
            name.is_some() && time.is_some()
        } else {
            name.is_none() && time.is_none()
        }
    }

    /// Transition to booked. The time is stored in canonical `HH:MM` form.
    pub fn book(&mut self, request: &BookingRequest) {
        let time = BookingTime::parse(&request.time)
            .map(|t| t.to_string())
            .unwrap_or_else(|| request.time.trim().to_string());

        self.is_booked = true;
        self.patient_name = Some(request.patient_name.trim().to_string());
        self.time = Some(time);
    }

    /// Transition to available, clearing the occupant
    pub fn release(&mut self) {
        self.is_booked = false;
        self.patient_name = None;
        self.time = None;
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Occupancy state of a bed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BedState {
    Available,
    Booked { patient_name: String, time: String },
}

impl BedState {
    pub fn is_booked(&self) -> bool {
        matches!(self, Self::Booked { .. })
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Booked { .. } => "booked",
        }
    }
}

/// Body of a booking request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    #[serde(default)]
    pub patient_name: String,

    #[serde(default)]
    pub time: String,
}

impl BookingRequest {
    pub fn new(patient_name: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            patient_name: patient_name.into(),
            time: time.into(),
        }
    }
}

/// Aggregate bed counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedStats {
    pub total: usize,
    pub available: usize,
    pub booked: usize,
}

impl BedStats {
    /// Count beds by state
    pub fn from_beds(beds: &[Bed]) -> Self {
        let booked = beds.iter().filter(|b| b.is_booked).count();
        Self {
            total: beds.len(),
            available: beds.len() - booked,
            booked,
        }
    }

    /// Occupancy percentage
    pub fn occupancy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.booked as f64 / self.total as f64) * 100.0
        }
    }
}

/// A validated 24-hour `HH:MM` booking time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BookingTime {
    hour: u8,
    minute: u8,
}

impl BookingTime {
    /// Parse `HH:MM` (hours 00-23, minutes 00-59)
    pub fn parse(s: &str) -> Option<Self> {
        let (hour, minute) = s.trim().split_once(':')?;
        if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
            return None;
        }
        if !hour.bytes().chain(minute.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }

        let hour: u8 = hour.parse().ok()?;
        let minute: u8 = minute.parse().ok()?;
        if hour > 23 || minute > 59 {
            return None;
        }

        Some(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Presentation form, e.g. `9:00 AM`, `12:15 AM`, `2:30 PM`
    pub fn to_12_hour(&self) -> String {
        let suffix = if self.hour >= 12 { "PM" } else { "AM" };
        let hour = match self.hour % 12 {
            0 => 12,
            h => h,
        };
        format!("{hour}:{:02} {suffix}", self.minute)
    }
}

impl fmt::Display for BookingTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Convert a stored `HH:MM` value to 12-hour display form.
///
/// Values that are not valid times are returned unchanged.
pub fn convert_to_12_hour(time: &str) -> String {
    BookingTime::parse(time)
        .map(|t| t.to_12_hour())
        .unwrap_or_else(|| time.to_string())
}
