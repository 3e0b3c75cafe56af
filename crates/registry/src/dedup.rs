//! Deduplication of replayed ownership events.
//!
//! Later events supersede earlier ones for the same label, so only the last
//! occurrence of each label hash survives. Output is newest-label-first.

use std::collections::HashSet;
use std::hash::Hash;

use crate::collector::OwnershipEvent;

/// Keep the last occurrence of each key, newest first.
pub fn dedupe_by_latest<T, K, F>(items: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .rev()
        .filter(|item| seen.insert(key(item)))
        .collect()
}

/// One event per distinct label hash: the latest, ordered newest first.
pub fn dedupe(events: Vec<OwnershipEvent>) -> Vec<OwnershipEvent> {
    dedupe_by_latest(events, |event| event.label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensdex_core::{Address, LabelHash};
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn event(label: u8, position: usize) -> OwnershipEvent {
        OwnershipEvent {
            label: LabelHash([label; 32]),
            owner: Address([label; 20]),
            block_number: position as u64,
            position,
        }
    }

    #[test]
    fn test_keeps_latest_occurrence() {
        let events = vec![event(1, 0), event(2, 1), event(1, 2)];
        let deduped = dedupe(events);

        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].label, LabelHash([1; 32]));
        assert_eq!(deduped[0].position, 2);
        assert_eq!(deduped[1].label, LabelHash([2; 32]));
    }

    #[test]
    fn test_empty_input() {
        assert!(dedupe(Vec::new()).is_empty());
    }

    #[test]
    fn test_output_is_newest_first() {
        let events = vec![event(1, 0), event(2, 1), event(3, 2)];
        let positions: Vec<usize> = dedupe(events).iter().map(|e| e.position).collect();
        assert_eq!(positions, vec![2, 1, 0]);
    }

    proptest! {
        #[test]
        fn prop_one_entry_per_label_with_greatest_index(labels in proptest::collection::vec(0u8..8, 0..64)) {
            let events: Vec<OwnershipEvent> = labels
                .iter()
                .enumerate()
                .map(|(position, label)| event(*label, position))
                .collect();

            let mut last_index = HashMap::new();
            for e in &events {
                last_index.insert(e.label, e.position);
            }

            let deduped = dedupe(events);
            prop_assert_eq!(deduped.len(), last_index.len());
            for e in &deduped {
                prop_assert_eq!(Some(&e.position), last_index.get(&e.label));
            }
            // newest first
            prop_assert!(deduped.windows(2).all(|w| w[0].position > w[1].position));
        }
    }
}
