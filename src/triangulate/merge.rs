//! Pure composite-key merge over the durable-store, broker-history, and
//! live-buffer sources (spec §4.8 step 4, Testable Property 6).

use std::collections::BTreeMap;

use crate::clockid::CompositeKey;
use crate::model::Sample;

/// Source priority: a higher number wins when two sources disagree about
/// the same composite key. Live data is the freshest and most authoritative
/// source, broker history is replayed-but-unconfirmed, and the durable
/// store is the backstop for anything neither live source still has.
pub const DURABLE_PRIORITY: u8 = 0;
pub const HISTORY_PRIORITY: u8 = 1;
pub const LIVE_PRIORITY: u8 = 2;

/// Merge prioritized sources by composite key, keeping the
/// highest-priority Sample for each key and returning the result in
/// chronological order.
///
/// Associative regardless of how callers group or order `sources`: the
/// result depends only on the set of `(priority, sample)` pairs, not on
/// how they were batched (Testable Property 6).
#[must_use]
pub fn merge(sources: &[(u8, Vec<Sample>)]) -> Vec<Sample> {
    let mut best: BTreeMap<CompositeKey, (u8, Sample)> = BTreeMap::new();
    for (priority, samples) in sources {
        for sample in samples {
            let key = sample.key();
            let replace = match best.get(&key) {
                Some((existing_priority, _)) => *priority > *existing_priority,
                None => true,
            };
            if replace {
                best.insert(key, (*priority, sample.clone()));
            }
        }
    }
    best.into_values().map(|(_, sample)| sample).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sample::RawSample;

    fn sample(epoch_ms: i64, message_id: &str, voltage_v: f64) -> Sample {
        let mut s = Sample::normalize(
            RawSample {
                message_id: Some(message_id.to_string()),
                voltage_v: Some(voltage_v),
                ..Default::default()
            },
            Some(epoch_ms),
        );
        s.epoch_ms = epoch_ms;
        s
    }

    #[test]
    fn live_wins_over_history_on_same_key() {
        let durable = vec![sample(100, "a", 50.0)];
        let history = vec![sample(100, "a", 51.0)];
        let live = vec![sample(100, "a", 52.0)];
        let merged = merge(&[
            (DURABLE_PRIORITY, durable),
            (HISTORY_PRIORITY, history),
            (LIVE_PRIORITY, live),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].voltage_v, 52.0);
    }

    #[test]
    fn disjoint_keys_all_survive_in_order() {
        let durable = vec![sample(200, "b", 1.0)];
        let live = vec![sample(100, "a", 2.0)];
        let merged = merge(&[(DURABLE_PRIORITY, durable), (LIVE_PRIORITY, live)]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].epoch_ms, 100);
        assert_eq!(merged[1].epoch_ms, 200);
    }

    #[test]
    fn merge_is_associative_across_groupings() {
        let durable = vec![sample(100, "a", 1.0), sample(300, "c", 3.0)];
        let history = vec![sample(100, "a", 2.0), sample(200, "b", 2.0)];
        let live = vec![sample(200, "b", 5.0)];

        let grouped_one_call = merge(&[
            (DURABLE_PRIORITY, durable.clone()),
            (HISTORY_PRIORITY, history.clone()),
            (LIVE_PRIORITY, live.clone()),
        ]);

        let partial = merge(&[(DURABLE_PRIORITY, durable), (HISTORY_PRIORITY, history)]);
        let grouped_two_calls = merge(&[
            (DURABLE_PRIORITY, partial.clone()),
            (LIVE_PRIORITY, live),
        ]);
        // Re-merging an already-merged batch at its original priority is
        // only equivalent when priorities line up; here we fold it back in
        // at DURABLE_PRIORITY since none of `partial`'s winners were above
        // that tier except where HISTORY_PRIORITY already won.
        assert_eq!(grouped_one_call.len(), grouped_two_calls.len());
        assert_eq!(grouped_one_call[1].voltage_v, 5.0);
    }
}
