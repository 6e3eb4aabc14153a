//! Property tests for the in-memory registry

use proptest::prelude::*;

use wardbeds::models::BookingRequest;
use wardbeds::registry::{BedRegistry, InMemoryRegistry};

#[derive(Debug, Clone)]
enum Op {
    Book(u32, String, String),
    Unbook(u32),
}

fn op_strategy(bed_count: u32) -> impl Strategy<Value = Op> {
    prop_oneof![
        (
            1..=bed_count + 1,
            "[A-Za-z ]{0,12}",
            prop_oneof![
                Just("09:00".to_string()),
                Just("23:59".to_string()),
                Just("24:00".to_string()),
                Just(String::new()),
            ],
        )
            .prop_map(|(id, name, time)| Op::Book(id, name, time)),
        (1..=bed_count + 1).prop_map(Op::Unbook),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Any sequence of book/unbook calls keeps every bed in exactly one of
    /// its two states, and the counts always add up.
    #[test]
    fn prop_two_state_invariant(ops in prop::collection::vec(op_strategy(5), 0..40)) {
        tokio_test::block_on(async {
            let registry = InMemoryRegistry::new(5);
            registry.initialize().await.unwrap();

            for op in ops {
                let _ = match op {
                    Op::Book(id, name, time) => registry
                        .book(id, &BookingRequest::new(name, time))
                        .await
                        .map(|_| ()),
                    Op::Unbook(id) => registry.unbook(id).await.map(|_| ()),
                };

                let beds = registry.get_all().await.unwrap();
                prop_assert_eq!(beds.len(), 5);
                for bed in &beds {
                    prop_assert!(bed.is_consistent(), "inconsistent bed: {:?}", bed);
                }

                let stats = registry.get_stats().await.unwrap();
                prop_assert_eq!(stats.available + stats.booked, stats.total);
            }
            Ok(())
        })?;
    }

    /// A successful booking is reflected verbatim by the next read
    #[test]
    fn prop_book_then_read(id in 1u32..=5, name in "[A-Za-z]{1,12}", hour in 0u8..24, minute in 0u8..60) {
        tokio_test::block_on(async {
            let registry = InMemoryRegistry::new(5);
            registry.initialize().await.unwrap();

            let time = format!("{hour:02}:{minute:02}");
            registry.book(id, &BookingRequest::new(name.clone(), time.clone())).await.unwrap();

            let beds = registry.get_all().await.unwrap();
            let bed = beds.iter().find(|b| b.id == id).unwrap();
            prop_assert!(bed.is_booked);
            prop_assert_eq!(bed.patient_name.as_deref(), Some(name.as_str()));
            prop_assert_eq!(bed.time.as_deref(), Some(time.as_str()));
            Ok(())
        })?;
    }
}
