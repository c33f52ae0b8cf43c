// ============================================================
// Layer 4 — Sample Builder
// ============================================================
// Turns the raw activity log into model-ready samples:
//
//   - per user, the chronological sequence of SEQUENCE-kind
//     events, mapped to catalog indices (events referencing
//     songs absent from the snapshot are dropped silently —
//     catalog and log legitimately diverge over time);
//   - one training triple per internal step i in [1, len-1):
//     history = tail-window prefix ending at i, positive =
//     item at i, negative = uniform catalog draw != positive;
//   - exactly one evaluation pair per user: all-but-last as
//     input, last item as target.
//
// Users with fewer than 2 eligible events contribute nothing.

use std::collections::HashMap;

use rand::Rng;

use crate::data::catalog::Catalog;
use crate::data::dataset::{EvalSample, TrainSample};
use crate::domain::activity::ActivityEvent;

use std::collections::HashSet;

/// Everything the core needs to know about one user's activity.
pub struct UserHistory {
    /// Chronological SEQUENCE-kind catalog indices.
    pub sequence: Vec<u32>,

    /// Items with explicit positive signal (like, addPlaylist).
    pub positives: HashSet<u32>,

    /// Items with explicit negative signal (unlike,
    /// removePlaylist, skip).
    pub negatives: HashSet<u32>,
}

/// Group events by user, sort by timestamp, and map track ids
/// to catalog indices. Unknown tracks are dropped per event;
/// the sets only track membership, so duplicates collapse.
pub fn collect_histories(
    catalog: &Catalog,
    events: &[ActivityEvent],
) -> HashMap<String, UserHistory> {
    let mut sorted: Vec<&ActivityEvent> = events.iter().collect();
    sorted.sort_by_key(|e| e.timestamp);

    let mut histories: HashMap<String, UserHistory> = HashMap::new();
    for event in sorted {
        let Some(index) = catalog.index_of(&event.track_id) else {
            tracing::debug!(
                "Dropping event for unknown track '{}' (user '{}')",
                event.track_id,
                event.user_id
            );
            continue;
        };

        let history = histories
            .entry(event.user_id.clone())
            .or_insert_with(|| UserHistory {
                sequence:  Vec::new(),
                positives: HashSet::new(),
                negatives: HashSet::new(),
            });

        if event.kind.is_sequence() {
            history.sequence.push(index);
        }
        if event.kind.is_positive() {
            history.positives.insert(index);
        }
        if event.kind.is_negative() {
            history.negatives.insert(index);
        }
    }

    histories
}

pub struct SampleBuilder {
    max_seq_len: usize,
}

impl SampleBuilder {
    pub fn new(max_seq_len: usize) -> Self {
        Self { max_seq_len }
    }

    /// Build all training triples for the given events.
    ///
    /// A catalog with a single item cannot yield a negative
    /// different from the positive, so it produces no triples.
    pub fn training_triples<R: Rng>(
        &self,
        catalog: &Catalog,
        events: &[ActivityEvent],
        rng: &mut R,
    ) -> Vec<TrainSample> {
        let num_items = catalog.num_items() as u32;
        if num_items < 2 {
            tracing::warn!("Catalog has fewer than 2 items; no training triples");
            return Vec::new();
        }

        let mut samples = Vec::new();
        for (user_id, history) in collect_histories(catalog, events) {
            let sequence = &history.sequence;
            if sequence.len() < 2 {
                continue;
            }

            for i in 1..sequence.len().saturating_sub(1) {
                let window = &sequence[i.saturating_sub(self.max_seq_len)..i];
                let positive = sequence[i];
                let negative = sample_negative(num_items, positive, rng);

                let mut input_ids = window.to_vec();
                let length = input_ids.len();
                input_ids.resize(self.max_seq_len, 0);

                samples.push(TrainSample {
                    user_id: user_id.clone(),
                    input_ids,
                    length,
                    positive,
                    negative,
                });
            }
        }

        samples
    }

    /// Build one evaluation pair per user with >= 2 eligible
    /// events: input = all but the last item (window tail),
    /// target = the last item.
    pub fn eval_pairs(
        &self,
        catalog: &Catalog,
        events: &[ActivityEvent],
    ) -> Vec<EvalSample> {
        let mut samples = Vec::new();
        for (user_id, history) in collect_histories(catalog, events) {
            let sequence = &history.sequence;
            if sequence.len() < 2 {
                continue;
            }

            let split = sequence.len() - 1;
            let input_ids =
                sequence[split.saturating_sub(self.max_seq_len)..split].to_vec();

            samples.push(EvalSample {
                user_id,
                input_ids,
                target: sequence[split],
                sequence_len: sequence.len(),
                positives: history.positives,
                negatives: history.negatives,
            });
        }

        samples
    }
}

/// Uniform draw over catalog indices 1..=N excluding `positive`,
/// without rejection: draw from a range one smaller and shift
/// values at or above the excluded index up by one.
fn sample_negative<R: Rng>(num_items: u32, positive: u32, rng: &mut R) -> u32 {
    debug_assert!(num_items >= 2);
    let draw = rng.gen_range(1..num_items);
    if draw >= positive {
        draw + 1
    } else {
        draw
    }
}
