//! In-process bed registry
//!
//! Holds the authoritative bed set behind a single write lock, so two
//! concurrent bookings of the same bed are arbitrated here: exactly one wins,
//! the other sees `AlreadyBooked`.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::models::{Bed, BedStats, BookingRequest};

use super::{validate_booking, BedRegistry, RegistryError};

/// Number of beds created by `initialize` unless configured otherwise
pub const DEFAULT_BED_COUNT: u32 = 20;

/// Authoritative bed store kept in memory
pub struct InMemoryRegistry {
    bed_count: u32,
    beds: RwLock<BTreeMap<u32, Bed>>,
}

impl InMemoryRegistry {
    /// Create an empty registry that initializes `bed_count` beds
    pub fn new(bed_count: u32) -> Self {
        Self {
            bed_count,
            beds: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a registry already holding the given beds
    pub fn with_beds(beds: impl IntoIterator<Item = Bed>) -> Self {
        let beds: BTreeMap<u32, Bed> = beds.into_iter().map(|b| (b.id, b)).collect();
        Self {
            bed_count: beds.len() as u32,
            beds: RwLock::new(beds),
        }
    }

    /// Number of beds currently held
    pub async fn len(&self) -> usize {
        self.beds.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.beds.read().await.is_empty()
    }

    async fn filtered(&self, booked: bool) -> Vec<Bed> {
        self.beds
            .read()
            .await
            .values()
            .filter(|b| b.is_booked == booked)
            .cloned()
            .collect()
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_BED_COUNT)
    }
}

#[async_trait]
impl BedRegistry for InMemoryRegistry {
    async fn initialize(&self) -> Result<(), RegistryError> {
        let mut beds = self.beds.write().await;
        if !beds.is_empty() {
            tracing::debug!(count = beds.len(), "Beds already initialized");
            return Ok(());
        }

        for id in 1..=self.bed_count {
            beds.insert(id, Bed::available(id));
        }
        tracing::info!(count = self.bed_count, "Initialized bed set");
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<Bed>, RegistryError> {
        // BTreeMap iteration is ordered by id
        Ok(self.beds.read().await.values().cloned().collect())
    }

    async fn get_available(&self) -> Result<Vec<Bed>, RegistryError> {
        Ok(self.filtered(false).await)
    }

    async fn get_booked(&self) -> Result<Vec<Bed>, RegistryError> {
        Ok(self.filtered(true).await)
    }

    async fn book(&self, id: u32, request: &BookingRequest) -> Result<Bed, RegistryError> {
        validate_booking(request)?;

        let mut beds = self.beds.write().await;
        let bed = beds.get_mut(&id).ok_or(RegistryError::NotFound(id))?;
        if bed.is_booked {
            return Err(RegistryError::AlreadyBooked(id));
        }

        bed.book(request);
        tracing::info!(bed_id = id, time = %request.time, "Bed booked");
        Ok(bed.clone())
    }

    async fn unbook(&self, id: u32) -> Result<Bed, RegistryError> {
        let mut beds = self.beds.write().await;
        let bed = beds.get_mut(&id).ok_or(RegistryError::NotFound(id))?;
        if !bed.is_booked {
            return Err(RegistryError::NotBooked(id));
        }

        bed.release();
        tracing::info!(bed_id = id, "Bed unbooked");
        Ok(bed.clone())
    }

    async fn get_stats(&self) -> Result<BedStats, RegistryError> {
        let beds = self.beds.read().await;
        let booked = beds.values().filter(|b| b.is_booked).count();
        Ok(BedStats {
            total: beds.len(),
            available: beds.len() - booked,
            booked,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_initialize_creates_ordered_beds() {
        let registry = InMemoryRegistry::new(5);
        registry.initialize().await.unwrap();

        let beds = registry.get_all().await.unwrap();
        let ids: Vec<u32> = beds.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert!(beds.iter().all(|b| !b.is_booked));
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let registry = InMemoryRegistry::new(3);
        registry.initialize().await.unwrap();
        registry
            .book(2, &BookingRequest::new("A", "14:30"))
            .await
            .unwrap();

        registry.initialize().await.unwrap();

        let beds = registry.get_all().await.unwrap();
        assert_eq!(beds.len(), 3);
        assert_eq!(beds[1], Bed::booked(2, "A", "14:30"));
    }

    #[tokio::test]
    async fn test_book_rejections() {
        let registry = InMemoryRegistry::with_beds(vec![
            Bed::available(1),
            Bed::booked(2, "A", "14:30"),
        ]);

        assert_eq!(
            registry.book(2, &BookingRequest::new("B", "09:00")).await,
            Err(RegistryError::AlreadyBooked(2))
        );
        assert_eq!(
            registry.book(9, &BookingRequest::new("B", "09:00")).await,
            Err(RegistryError::NotFound(9))
        );
        assert!(matches!(
            registry.book(1, &BookingRequest::new("", "09:00")).await,
            Err(RegistryError::Validation(_))
        ));
        assert!(matches!(
            registry.book(1, &BookingRequest::new("B", "")).await,
            Err(RegistryError::Validation(_))
        ));

        // Nothing changed
        assert_eq!(registry.get_stats().await.unwrap().booked, 1);
    }

    #[tokio::test]
    async fn test_unbook() {
        let registry = InMemoryRegistry::with_beds(vec![
            Bed::available(1),
            Bed::booked(2, "A", "14:30"),
        ]);

        let bed = registry.unbook(2).await.unwrap();
        assert_eq!(bed, Bed::available(2));

        assert_eq!(registry.unbook(2).await, Err(RegistryError::NotBooked(2)));
        assert_eq!(registry.unbook(3).await, Err(RegistryError::NotFound(3)));
    }

    #[tokio::test]
    async fn test_filters_and_stats() {
        let registry = InMemoryRegistry::with_beds(vec![
            Bed::available(1),
            Bed::booked(2, "A", "14:30"),
            Bed::available(3),
        ]);

        let available: Vec<u32> = registry
            .get_available()
            .await
            .unwrap()
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(available, vec![1, 3]);

        let booked = registry.get_booked().await.unwrap();
        assert_eq!(booked, vec![Bed::booked(2, "A", "14:30")]);

        let stats = registry.get_stats().await.unwrap();
        assert_eq!(stats, BedStats { total: 3, available: 2, booked: 1 });
    }

    #[tokio::test]
    async fn test_concurrent_bookings_single_winner() {
        let registry = Arc::new(InMemoryRegistry::with_beds(vec![Bed::available(1)]));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    registry
                        .book(1, &BookingRequest::new(format!("P{i}"), "10:00"))
                        .await
                })
            })
            .collect();

        let mut wins = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(e) => assert_eq!(e, RegistryError::AlreadyBooked(1)),
            }
        }
        assert_eq!(wins, 1);
    }
}
