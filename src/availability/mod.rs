//! Bed availability view
//!
//! Client-side, eventually consistent projection of the bed registry.
//!
//! - [`controller`] - operations (mount, resync, click, submit, cancel)
//! - [`state`] - view state, loading flags, draft form, messages
//! - [`sync`] - periodic full-replacement resync
//! - [`render`] - text rendering
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use wardbeds::availability::{AvailabilityController, ControllerSettings};
//! use wardbeds::registry::InMemoryRegistry;
//!
//! let view = AvailabilityController::new(Arc::new(InMemoryRegistry::default()), ControllerSettings::default());
//! view.mount().await;
//! view.click_bed(1).await;
//! println!("{}", wardbeds::availability::render::render(&view.snapshot().await));
//! ```

pub mod controller;
pub mod render;
pub mod state;
pub mod sync;

pub use controller::{AvailabilityController, ControllerSettings};
pub use state::{AvailabilityState, BookingError, BookingForm, FormField, LoadingFlags, LoadingKind};
pub use sync::ResyncTask;
