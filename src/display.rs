//! Capacity-bounded display selection.
//!
//! Unauthorized records are never dropped in favor of authorized ones: the
//! subset takes every unauthorized record first (canonical order preserved),
//! then pads with authorized records up to capacity.

use itertools::{Either, Itertools};

use crate::ingest::TelemetryRecord;

/// One record selected for rendering, with a key that is unique within the
/// subset even when derived record ids collide.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayRecord {
    pub render_key: String,
    pub record: TelemetryRecord,
}

/// Derive the display subset from the canonical dataset. The result length
/// is always `min(capacity, dataset.len())`.
pub fn select_for_display(dataset: &[TelemetryRecord], capacity: usize) -> Vec<DisplayRecord> {
    let (unauthorized, authorized): (Vec<&TelemetryRecord>, Vec<&TelemetryRecord>) =
        dataset.iter().partition_map(|record| {
            if record.unauthorized {
                Either::Left(record)
            } else {
                Either::Right(record)
            }
        });

    unauthorized
        .into_iter()
        .chain(authorized)
        .take(capacity)
        .enumerate()
        .map(|(position, record)| DisplayRecord {
            render_key: format!("{}-{}", record.id, position),
            record: record.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, unauthorized: bool) -> TelemetryRecord {
        TelemetryRecord {
            id: id.to_string(),
            latitude: 0.0,
            longitude: 0.0,
            altitude_m: 0.0,
            velocity_kmh: 0.0,
            unauthorized,
            zone_name: if unauthorized {
                Some("Zone".to_string())
            } else {
                None
            },
        }
    }

    #[test]
    fn test_unauthorized_records_come_first_in_canonical_order() {
        let dataset = vec![
            record("a1", false),
            record("u1", true),
            record("a2", false),
            record("u2", true),
        ];

        let subset = select_for_display(&dataset, 10);
        let ids: Vec<&str> = subset.iter().map(|d| d.record.id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u2", "a1", "a2"]);
    }

    #[test]
    fn test_capacity_truncates_to_unauthorized_only() {
        let dataset = vec![
            record("a1", false),
            record("u1", true),
            record("u2", true),
            record("u3", true),
        ];

        let subset = select_for_display(&dataset, 2);
        assert_eq!(subset.len(), 2);
        assert!(subset.iter().all(|d| d.record.unauthorized));
        assert_eq!(subset[0].record.id, "u1");
        assert_eq!(subset[1].record.id, "u2");
    }

    #[test]
    fn test_render_keys_unique_for_colliding_ids() {
        let dataset = vec![record("dup", true), record("dup", true), record("dup", false)];

        let subset = select_for_display(&dataset, 3);
        let keys: Vec<&str> = subset.iter().map(|d| d.render_key.as_str()).collect();
        assert_eq!(keys, vec!["dup-0", "dup-1", "dup-2"]);
    }

    #[test]
    fn test_empty_dataset_and_zero_capacity() {
        assert!(select_for_display(&[], 10).is_empty());
        assert!(select_for_display(&[record("a", false)], 0).is_empty());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_dataset() -> impl Strategy<Value = Vec<TelemetryRecord>> {
            proptest::collection::vec(any::<bool>(), 0..64).prop_map(|flags| {
                flags
                    .iter()
                    .enumerate()
                    .map(|(i, &unauthorized)| record(&format!("r{i}"), unauthorized))
                    .collect()
            })
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(100))]

            #[test]
            fn selection_length_is_min_of_capacity_and_dataset(
                dataset in arb_dataset(),
                capacity in 0usize..96,
            ) {
                let subset = select_for_display(&dataset, capacity);
                prop_assert_eq!(subset.len(), capacity.min(dataset.len()));
            }

            #[test]
            fn all_unauthorized_records_kept_when_they_fit(
                dataset in arb_dataset(),
                capacity in 0usize..96,
            ) {
                let unauthorized = dataset.iter().filter(|r| r.unauthorized).count();
                let subset = select_for_display(&dataset, capacity);
                if unauthorized <= capacity {
                    let kept = subset.iter().filter(|d| d.record.unauthorized).count();
                    prop_assert_eq!(kept, unauthorized);
                }
            }
        }
    }
}
