//! Periodic resync of the availability view

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

use crate::registry::BedRegistry;

use super::controller::AvailabilityController;

/// Background task refetching the full bed set on a fixed interval.
///
/// The first refetch happens one full interval after spawning.
pub struct ResyncTask {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl ResyncTask {
    /// Start resyncing `controller` every `period`
    pub fn spawn<R>(controller: AvailabilityController<R>, period: Duration) -> Self
    where
        R: BedRegistry + ?Sized + 'static,
    {
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::debug!(period_secs = period.as_secs(), "Resync task started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        controller.fetch_beds_data().await;
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            tracing::debug!("Resync task stopped");
        });

        Self { handle, shutdown }
    }

    /// Stop the timer and wait for the task to finish
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "Resync task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bed, BookingRequest};
    use crate::availability::ControllerSettings;
    use crate::registry::InMemoryRegistry;
    use std::sync::Arc;

    fn settings() -> ControllerSettings {
        ControllerSettings {
            resync_interval: Duration::from_secs(30),
            success_ttl: Duration::from_secs(3),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_resync_picks_up_remote_changes() {
        let registry = Arc::new(InMemoryRegistry::with_beds(vec![Bed::available(1)]));
        let view = AvailabilityController::new(registry.clone(), settings());
        view.fetch_beds_data().await;

        let task = ResyncTask::spawn(view.clone(), Duration::from_secs(30));

        // Another session books the bed
        registry
            .book(1, &BookingRequest::new("A", "10:00"))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(!view.snapshot().await.beds[0].is_booked);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(view.snapshot().await.beds[0].is_booked);

        task.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_task() {
        let registry = Arc::new(InMemoryRegistry::new(2));
        let view = AvailabilityController::new(registry, settings());

        let task = ResyncTask::spawn(view, Duration::from_secs(30));
        assert!(!task.is_finished());
        task.stop().await;
    }
}
