//! Availability controller
//!
//! Keeps a local projection of the bed registry and turns user intent into
//! registry calls. The projection is only ever written from a registry
//! response: every book/unbook is followed by a full refetch instead of
//! patching local state, and the periodic resync replaces the whole set.
//!
//! No registry failure escapes this type. Failures become a user-visible
//! message, and the loading flag owned by the operation is cleared on every
//! path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex, RwLock};
use tokio::time::Duration;

use crate::config::Config;
use crate::models::Bed;
use crate::registry::{BedRegistry, RegistryError};

use super::state::{AvailabilityState, BookingError, FormField, LoadingKind};
use super::sync::ResyncTask;

const INITIALIZED: &str = "Beds initialized successfully";
const INITIALIZE_FAILED: &str = "Failed to initialize beds. Please try again.";
const BOOK_FAILED: &str = "Failed to book bed. Please try again.";
const UNBOOK_FAILED: &str = "Failed to unbook bed. Please try again.";

/// Timing knobs for the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Background resync period
    pub resync_interval: Duration,

    /// Lifetime of success messages
    pub success_ttl: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            resync_interval: Duration::from_secs(30),
            success_ttl: Duration::from_secs(3),
        }
    }
}

impl From<&Config> for ControllerSettings {
    fn from(config: &Config) -> Self {
        Self {
            resync_interval: config.resync_interval(),
            success_ttl: config.success_message_ttl(),
        }
    }
}

/// Client-side controller for the bed availability view.
///
/// Cheap to clone; clones share state.
pub struct AvailabilityController<R: BedRegistry + ?Sized> {
    registry: Arc<R>,
    state: Arc<RwLock<AvailabilityState>>,
    settings: ControllerSettings,
    active: Arc<AtomicBool>,
    changes: Arc<watch::Sender<u64>>,
    resync: Arc<Mutex<Option<ResyncTask>>>,
}

impl<R: BedRegistry + ?Sized> Clone for AvailabilityController<R> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            state: self.state.clone(),
            settings: self.settings,
            active: self.active.clone(),
            changes: self.changes.clone(),
            resync: self.resync.clone(),
        }
    }
}

impl<R: BedRegistry + ?Sized + 'static> AvailabilityController<R> {
    /// Create a controller with an empty projection
    pub fn new(registry: Arc<R>, settings: ControllerSettings) -> Self {
        Self::with_beds(registry, Vec::new(), settings)
    }

    /// Create a controller seeded with beds fetched earlier
    pub fn with_beds(registry: Arc<R>, beds: Vec<Bed>, settings: ControllerSettings) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            registry,
            state: Arc::new(RwLock::new(AvailabilityState::with_beds(beds))),
            settings,
            active: Arc::new(AtomicBool::new(true)),
            changes: Arc::new(changes),
            resync: Arc::new(Mutex::new(None)),
        }
    }

    pub fn settings(&self) -> ControllerSettings {
        self.settings
    }

    /// Copy of the current state for rendering
    pub async fn snapshot(&self) -> AvailabilityState {
        self.state.read().await.clone()
    }

    /// Receiver that changes whenever the state does
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub async fn available_count(&self) -> usize {
        self.state.read().await.available_count()
    }

    pub async fn booked_count(&self) -> usize {
        self.state.read().await.booked_count()
    }

    /// Apply a state change unless the view is gone.
    ///
    /// The lock is never held across a registry call.
    async fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut AvailabilityState),
    {
        if !self.is_active() {
            tracing::debug!("View unmounted, dropping state update");
            return false;
        }

        {
            let mut state = self.state.write().await;
            f(&mut state);
        }
        self.notify();
        true
    }

    fn notify(&self) {
        self.changes.send_modify(|v| *v = v.wrapping_add(1));
    }

    /// Handle for the background task: shares the view state but not the
    /// task slot, so dropping every user handle stops the task.
    fn detached(&self) -> Self {
        Self {
            resync: Arc::new(Mutex::new(None)),
            ..self.clone()
        }
    }

    /// The registry's own message when it sent one, the fallback otherwise
    fn failure_message(&self, err: &RegistryError, fallback: &str) -> String {
        match err {
            RegistryError::Rejected { message, .. } if !message.trim().is_empty() => {
                message.clone()
            }
            RegistryError::NotFound(_)
            | RegistryError::AlreadyBooked(_)
            | RegistryError::NotBooked(_)
            | RegistryError::Validation(_) => err.to_string(),
            _ => fallback.to_string(),
        }
    }

    async fn note_unauthorized(&self, err: &RegistryError) {
        if err.is_unauthorized() {
            self.update(|s| s.unauthorized = true).await;
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Bring the view up: initialize the registry when nothing is known
    /// locally, then start the periodic resync.
    pub async fn mount(&self) {
        self.active.store(true, Ordering::SeqCst);

        if self.state.read().await.beds.is_empty() {
            self.initialize_beds().await;
        }

        let mut resync = self.resync.lock().await;
        if resync.is_none() {
            *resync = Some(ResyncTask::spawn(
                self.detached(),
                self.settings.resync_interval,
            ));
        }
    }

    /// Tear the view down. Registry calls still in flight complete, but
    /// their results are discarded.
    pub async fn unmount(&self) {
        self.active.store(false, Ordering::SeqCst);

        if let Some(task) = self.resync.lock().await.take() {
            task.stop().await;
        }
        tracing::debug!("Availability view unmounted");
    }

    // ========================================================================
    // Registry Operations
    // ========================================================================

    /// Request registry initialization, then resync
    pub async fn initialize_beds(&self) {
        self.update(|s| {
            s.loading.set(LoadingKind::Initialize, true);
            s.error = None;
        })
        .await;

        let result = self.registry.initialize().await;
        if result.is_ok() {
            self.fetch_beds_data().await;
        }

        let ttl = self.settings.success_ttl;
        match result {
            Ok(()) => {
                tracing::info!("Beds initialized");
                self.update(|s| s.set_success(INITIALIZED, ttl)).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Error initializing beds");
                self.note_unauthorized(&e).await;
                self.update(|s| s.error = Some(INITIALIZE_FAILED.to_string()))
                    .await;
            }
        }

        self.update(|s| s.loading.set(LoadingKind::Initialize, false))
            .await;
    }

    /// Replace the local projection with the registry's full bed set.
    ///
    /// Failures are logged and otherwise ignored; the next resync tries again.
    pub async fn fetch_beds_data(&self) {
        match self.registry.get_all().await {
            Ok(beds) => {
                tracing::debug!(count = beds.len(), "Resynced beds");
                self.update(|s| s.replace_beds(beds)).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Error fetching beds data");
                self.note_unauthorized(&e).await;
            }
        }
    }

    /// User-requested resync
    pub async fn refresh(&self) {
        self.update(|s| s.loading.set(LoadingKind::General, true))
            .await;
        self.fetch_beds_data().await;
        self.update(|s| s.loading.set(LoadingKind::General, false))
            .await;
    }

    // ========================================================================
    // User Actions
    // ========================================================================

    /// Click on a bed: select an available bed for booking, or immediately
    /// unbook a booked one. Ignored while initializing, booking or unbooking.
    pub async fn click_bed(&self, id: u32) {
        if !self.is_active() {
            return;
        }

        let unbook = {
            let mut state = self.state.write().await;
            if state.is_busy() {
                tracing::debug!(bed_id = id, "Ignoring click while busy");
                return;
            }
            let Some(bed) = state.bed(id).cloned() else {
                tracing::debug!(bed_id = id, "Ignoring click on unknown bed");
                return;
            };

            if bed.is_booked {
                state.loading.set(LoadingKind::Unbooking, true);
                state.error = None;
                true
            } else {
                state.selected_bed = Some(bed);
                state.booking_form.clear();
                false
            }
        };
        self.notify();

        if unbook {
            self.finish_unbook(id).await;
        }
    }

    /// Unbook a bed and resync
    pub async fn unbook_bed(&self, id: u32) {
        self.update(|s| {
            s.loading.set(LoadingKind::Unbooking, true);
            s.error = None;
        })
        .await;

        self.finish_unbook(id).await;
    }

    /// Registry half of an unbook; the `unbooking` flag is already set
    async fn finish_unbook(&self, id: u32) {
        let result = self.registry.unbook(id).await;
        if result.is_ok() {
            self.fetch_beds_data().await;
        }

        let ttl = self.settings.success_ttl;
        match result {
            Ok(_) => {
                tracing::info!(bed_id = id, "Bed unbooked");
                self.update(|s| s.set_success(format!("Bed {id} unbooked successfully"), ttl))
                    .await;
            }
            Err(e) => {
                tracing::error!(bed_id = id, error = %e, "Error unbooking bed");
                self.note_unauthorized(&e).await;
                let message = self.failure_message(&e, UNBOOK_FAILED);
                self.update(|s| s.error = Some(message)).await;
            }
        }

        self.update(|s| s.loading.set(LoadingKind::Unbooking, false))
            .await;
    }

    /// Edit a draft field; clears any visible error
    pub async fn edit_field(&self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        self.update(|s| {
            if s.loading.booking {
                return;
            }
            s.booking_form.set(field, value);
            s.error = None;
        })
        .await;
    }

    /// Validate the draft locally, then book the selected bed and resync.
    ///
    /// Validation failures make no registry call. Registry failures leave
    /// the draft in place for correction.
    pub async fn submit_booking(&self) {
        if !self.is_active() {
            return;
        }

        // Check and claim the booking flag under one lock so concurrent
        // submits cannot both reach the registry
        let claimed = {
            let mut state = self.state.write().await;
            if state.loading.booking {
                return;
            }

            let validated = state
                .selected_bed
                .as_ref()
                .map(|bed| bed.id)
                .ok_or(BookingError::NoBedSelected)
                .and_then(|id| state.booking_form.validate().map(|request| (id, request)));

            match validated {
                Ok(claimed) => {
                    state.loading.set(LoadingKind::Booking, true);
                    state.error = None;
                    Some(claimed)
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Booking rejected locally");
                    state.error = Some(e.to_string());
                    None
                }
            }
        };
        self.notify();

        let Some((id, request)) = claimed else {
            return;
        };

        let result = self.registry.book(id, &request).await;
        if result.is_ok() {
            self.fetch_beds_data().await;
        }

        let ttl = self.settings.success_ttl;
        match result {
            Ok(_) => {
                tracing::info!(bed_id = id, time = %request.time, "Bed booked");
                let message = format!(
                    "Bed {id} booked successfully for {}",
                    request.patient_name
                );
                self.update(|s| {
                    s.clear_selection();
                    s.set_success(message, ttl);
                })
                .await;
            }
            Err(e) => {
                tracing::error!(bed_id = id, error = %e, "Error booking bed");
                self.note_unauthorized(&e).await;
                let message = self.failure_message(&e, BOOK_FAILED);
                self.update(|s| s.error = Some(message)).await;
            }
        }

        self.update(|s| s.loading.set(LoadingKind::Booking, false))
            .await;
    }

    /// Drop the selection, draft and error without touching the registry
    pub async fn cancel_booking(&self) {
        self.update(|s| {
            if s.loading.booking {
                return;
            }
            s.clear_selection();
            s.error = None;
        })
        .await;
    }

    /// Clear an expired success message; notifies subscribers when it did
    pub async fn expire_messages(&self) {
        let expired = self.state.read().await.success.as_ref().is_some_and(|s| s.is_expired());
        if expired {
            self.update(|s| {
                s.prune_success();
            })
            .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BedStats, BookingRequest};
    use crate::registry::InMemoryRegistry;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    fn scenario_registry() -> Arc<InMemoryRegistry> {
        Arc::new(InMemoryRegistry::with_beds(vec![
            Bed::available(1),
            Bed::booked(2, "A", "14:30"),
        ]))
    }

    fn controller(registry: Arc<InMemoryRegistry>) -> AvailabilityController<InMemoryRegistry> {
        AvailabilityController::new(registry, ControllerSettings::default())
    }

    #[tokio::test]
    async fn test_mount_initializes_empty_registry() {
        let registry = Arc::new(InMemoryRegistry::new(4));
        let view = controller(registry.clone());

        view.mount().await;

        let state = view.snapshot().await;
        assert_eq!(state.beds.len(), 4);
        assert_eq!(state.success_message(), Some("Beds initialized successfully"));
        assert!(!state.loading.initialize);
        view.unmount().await;
    }

    #[tokio::test]
    async fn test_mount_with_known_beds_skips_initialize() {
        let registry = Arc::new(InMemoryRegistry::new(4));
        let view = AvailabilityController::with_beds(
            registry.clone(),
            vec![Bed::available(1)],
            ControllerSettings::default(),
        );

        view.mount().await;

        // Registry never initialized; local cache untouched until a resync
        assert!(registry.is_empty().await);
        assert_eq!(view.snapshot().await.beds, vec![Bed::available(1)]);
        view.unmount().await;
    }

    #[tokio::test]
    async fn test_click_available_selects_and_resets_draft() {
        let view = controller(scenario_registry());
        view.fetch_beds_data().await;
        view.edit_field(FormField::PatientName, "stale").await;

        view.click_bed(1).await;

        let state = view.snapshot().await;
        assert_eq!(state.selected_bed.as_ref().map(|b| b.id), Some(1));
        assert_eq!(state.booking_form.patient_name, "");
    }

    #[tokio::test]
    async fn test_click_booked_unbooks_without_selection() {
        let view = controller(scenario_registry());
        view.fetch_beds_data().await;

        view.click_bed(2).await;

        let state = view.snapshot().await;
        assert!(state.selected_bed.is_none());
        assert_eq!(state.bed(2), Some(&Bed::available(2)));
        assert_eq!(state.success_message(), Some("Bed 2 unbooked successfully"));
        assert!(!state.loading.unbooking);
        assert_eq!(state.available_count(), 2);
    }

    #[tokio::test]
    async fn test_submit_books_and_resyncs() {
        let view = controller(scenario_registry());
        view.fetch_beds_data().await;

        view.click_bed(1).await;
        view.edit_field(FormField::PatientName, "B").await;
        view.edit_field(FormField::Time, "09:00").await;
        view.submit_booking().await;

        let state = view.snapshot().await;
        assert_eq!(state.bed(1), Some(&Bed::booked(1, "B", "09:00")));
        assert!(state.selected_bed.is_none());
        assert_eq!(state.booking_form.patient_name, "");
        assert_eq!(
            state.success_message(),
            Some("Bed 1 booked successfully for B")
        );
        assert_eq!(state.available_count(), 0);
        assert_eq!(state.booked_count(), 2);
    }

    #[tokio::test]
    async fn test_submit_validation_fails_fast() {
        let registry = scenario_registry();
        let view = controller(registry.clone());
        view.fetch_beds_data().await;
        view.click_bed(1).await;

        view.edit_field(FormField::Time, "09:00").await;
        view.submit_booking().await;
        assert_eq!(
            view.snapshot().await.error.as_deref(),
            Some("Patient name is required")
        );

        view.edit_field(FormField::PatientName, "B").await;
        assert!(view.snapshot().await.error.is_none());
        view.edit_field(FormField::Time, "").await;
        view.submit_booking().await;
        assert_eq!(view.snapshot().await.error.as_deref(), Some("Time is required"));

        // Registry untouched
        assert_eq!(registry.get_stats().await.unwrap().booked, 1);
        assert!(view.snapshot().await.selected_bed.is_some());
    }

    #[tokio::test]
    async fn test_submit_without_selection() {
        let view = controller(scenario_registry());
        view.submit_booking().await;
        assert_eq!(
            view.snapshot().await.error.as_deref(),
            Some("Select a bed to book")
        );
    }

    #[tokio::test]
    async fn test_registry_rejection_keeps_draft() {
        let registry = scenario_registry();
        let view = controller(registry.clone());
        view.fetch_beds_data().await;
        view.click_bed(1).await;
        view.edit_field(FormField::PatientName, "B").await;
        view.edit_field(FormField::Time, "09:00").await;

        // Another session takes the bed first
        registry
            .book(1, &BookingRequest::new("C", "08:00"))
            .await
            .unwrap();

        view.submit_booking().await;

        let state = view.snapshot().await;
        assert_eq!(state.error.as_deref(), Some("Bed 1 is already booked"));
        assert_eq!(state.booking_form.patient_name, "B");
        assert_eq!(state.selected_bed.as_ref().map(|b| b.id), Some(1));
        assert!(!state.loading.booking);
    }

    #[tokio::test]
    async fn test_cancel_booking_clears_everything() {
        let view = controller(scenario_registry());
        view.fetch_beds_data().await;
        view.click_bed(1).await;
        view.edit_field(FormField::PatientName, "B").await;
        view.submit_booking().await;
        assert!(view.snapshot().await.error.is_some());

        view.cancel_booking().await;

        let state = view.snapshot().await;
        assert!(state.selected_bed.is_none());
        assert_eq!(state.booking_form.patient_name, "");
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_actions_ignored_after_unmount() {
        let registry = scenario_registry();
        let view = controller(registry.clone());
        view.fetch_beds_data().await;
        view.unmount().await;

        view.click_bed(2).await;

        assert_eq!(registry.get_stats().await.unwrap().booked, 1);
        let state = view.snapshot().await;
        assert_eq!(state.bed(2), Some(&Bed::booked(2, "A", "14:30")));
        assert!(state.success.is_none());
    }

    /// Registry whose book/unbook calls wait until released
    struct GatedRegistry {
        inner: InMemoryRegistry,
        gate: Notify,
    }

    #[async_trait]
    impl BedRegistry for GatedRegistry {
        async fn initialize(&self) -> Result<(), RegistryError> {
            self.inner.initialize().await
        }
        async fn get_all(&self) -> Result<Vec<Bed>, RegistryError> {
            self.inner.get_all().await
        }
        async fn get_available(&self) -> Result<Vec<Bed>, RegistryError> {
            self.inner.get_available().await
        }
        async fn get_booked(&self) -> Result<Vec<Bed>, RegistryError> {
            self.inner.get_booked().await
        }
        async fn book(&self, id: u32, request: &BookingRequest) -> Result<Bed, RegistryError> {
            self.gate.notified().await;
            self.inner.book(id, request).await
        }
        async fn unbook(&self, id: u32) -> Result<Bed, RegistryError> {
            self.gate.notified().await;
            self.inner.unbook(id).await
        }
        async fn get_stats(&self) -> Result<BedStats, RegistryError> {
            self.inner.get_stats().await
        }
    }

    fn gated_registry() -> Arc<GatedRegistry> {
        Arc::new(GatedRegistry {
            inner: InMemoryRegistry::with_beds(vec![
                Bed::available(1),
                Bed::booked(2, "A", "14:30"),
            ]),
            gate: Notify::new(),
        })
    }

    async fn wait_for<R, F>(view: &AvailabilityController<R>, check: F)
    where
        R: BedRegistry + ?Sized + 'static,
        F: Fn(&AvailabilityState) -> bool,
    {
        while !check(&view.snapshot().await) {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_in_flight_unbook_discarded_after_unmount() {
        let registry = gated_registry();
        let view = AvailabilityController::new(registry.clone(), ControllerSettings::default());
        view.fetch_beds_data().await;

        let pending = tokio::spawn({
            let view = view.clone();
            async move { view.click_bed(2).await }
        });
        wait_for(&view, |s| s.loading.unbooking).await;
        let before = view.snapshot().await;

        view.unmount().await;
        registry.gate.notify_one();
        pending.await.unwrap();

        // The registry applied the unbook, the view did not
        assert_eq!(registry.inner.get_stats().await.unwrap().booked, 0);
        let after = view.snapshot().await;
        assert_eq!(after.beds, before.beds);
        assert_eq!(after.bed(2), Some(&Bed::booked(2, "A", "14:30")));
        assert!(after.success.is_none());
        assert!(after.error.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_submits_book_once() {
        let registry = gated_registry();
        let view = AvailabilityController::new(registry.clone(), ControllerSettings::default());
        view.fetch_beds_data().await;
        view.click_bed(1).await;
        view.edit_field(FormField::PatientName, "B").await;
        view.edit_field(FormField::Time, "09:00").await;

        let first = tokio::spawn({
            let view = view.clone();
            async move { view.submit_booking().await }
        });
        wait_for(&view, |s| s.loading.booking).await;

        // A second submit while the first is pending is a no-op
        view.submit_booking().await;

        registry.gate.notify_one();
        first.await.unwrap();

        let state = view.snapshot().await;
        assert!(!state.loading.booking);
        assert!(state.error.is_none());
        assert_eq!(state.bed(1), Some(&Bed::booked(1, "B", "09:00")));
        assert_eq!(registry.inner.get_stats().await.unwrap().booked, 2);
    }

    #[tokio::test]
    async fn test_click_ignored_while_unbooking() {
        let registry = gated_registry();
        let view = AvailabilityController::new(registry.clone(), ControllerSettings::default());
        view.fetch_beds_data().await;

        let pending = tokio::spawn({
            let view = view.clone();
            async move { view.click_bed(2).await }
        });
        wait_for(&view, |s| s.loading.unbooking).await;

        view.click_bed(1).await;
        assert!(view.snapshot().await.selected_bed.is_none());

        registry.gate.notify_one();
        pending.await.unwrap();
        assert_eq!(view.available_count().await, 2);
    }

    #[tokio::test]
    async fn test_time_stored_in_canonical_form() {
        let registry = Arc::new(InMemoryRegistry::with_beds(vec![
            Bed::available(1),
            Bed::available(2),
        ]));
        let view = controller(registry.clone());
        view.fetch_beds_data().await;

        for (id, time) in [(1, "9:05"), (2, " 10:00 ")] {
            view.click_bed(id).await;
            view.edit_field(FormField::PatientName, "B").await;
            view.edit_field(FormField::Time, time).await;
            view.submit_booking().await;
            assert!(view.snapshot().await.error.is_none());
        }

        let beds = registry.get_all().await.unwrap();
        assert_eq!(beds[0].time.as_deref(), Some("09:05"));
        assert_eq!(beds[1].time.as_deref(), Some("10:00"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_view_stops_resync() {
        let registry = scenario_registry();
        let watcher = Arc::downgrade(&registry);
        let view = controller(registry);

        view.mount().await;
        drop(view);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(watcher.upgrade().is_none());
    }

    #[tokio::test]
    async fn test_resync_is_idempotent() {
        let view = controller(scenario_registry());
        view.fetch_beds_data().await;
        let first = view.snapshot().await.beds;
        view.fetch_beds_data().await;
        let second = view.snapshot().await.beds;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_subscribers_notified() {
        let view = controller(scenario_registry());
        let mut rx = view.subscribe();
        view.fetch_beds_data().await;
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();
        assert!(!rx.has_changed().unwrap());
    }
}
