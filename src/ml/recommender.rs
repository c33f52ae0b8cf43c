// ============================================================
// Layer 5 — Recommender (Serving Path)
// ============================================================
// Wraps an inference-backend model and a catalog snapshot and
// turns one user's history into a ranked top-K of track ids.
//
// Scores are raw dot products against the item table, then
// nudged by the user's explicit feedback: +1.0 for every item
// in the positive set, -1.0 for every item in the negative set.
// An item that is in both sets nets out to zero. The padding
// index is forced to negative infinity so it can never be
// recommended. Items already in the history stay eligible;
// repeat listening is the norm in this domain.

use anyhow::{anyhow, Result};
use burn::tensor::{Int, Tensor};
use std::collections::HashSet;

use crate::data::catalog::Catalog;
use crate::data::samples::UserHistory;
use crate::ml::model::SeqRecModel;
use crate::ml::InferBackend;

pub struct Recommender {
    model: SeqRecModel<InferBackend>,
    catalog: Catalog,
    max_seq_len: usize,
}

impl Recommender {
    pub fn new(model: SeqRecModel<InferBackend>, catalog: Catalog) -> Self {
        let max_seq_len = model.max_seq_len;
        Self {
            model,
            catalog,
            max_seq_len,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Raw catalog scores for a history window — N + 1 entries,
    /// index-aligned with the catalog, entry 0 meaningless.
    pub fn raw_scores(&self, sequence: &[u32]) -> Result<Vec<f32>> {
        let device = crate::ml::device();
        let window_start = sequence.len().saturating_sub(self.max_seq_len);
        let window = &sequence[window_start..];
        let length = window.len();

        let flat: Vec<i32> = window.iter().map(|&x| x as i32).collect();
        let input_ids = Tensor::<InferBackend, 1, Int>::from_ints(flat.as_slice(), &device)
            .reshape([1, length]);
        let lengths = Tensor::<InferBackend, 1, Int>::from_ints([length as i32], &device);

        let rep = self.model.last_hidden(input_ids, lengths);
        let scores = self.model.score_catalog(rep);
        scores
            .into_data()
            .to_vec()
            .map_err(|e| anyhow!("failed to read scores off the backend: {e:?}"))
    }

    /// Ranked catalog indices for one user, feedback nudge
    /// applied. Empty histories produce an empty ranking.
    pub fn rank(
        &self,
        sequence: &[u32],
        positives: &HashSet<u32>,
        negatives: &HashSet<u32>,
        k: usize,
    ) -> Result<Vec<u32>> {
        if sequence.is_empty() {
            return Ok(Vec::new());
        }

        let mut scores = self.raw_scores(sequence)?;
        scores[0] = f32::NEG_INFINITY;
        for &i in positives {
            scores[i as usize] += 1.0;
        }
        for &i in negatives {
            scores[i as usize] -= 1.0;
        }

        let mut ranked: Vec<u32> = (1..scores.len() as u32).collect();
        ranked.sort_by(|&a, &b| {
            scores[b as usize]
                .partial_cmp(&scores[a as usize])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(k);
        Ok(ranked)
    }

    /// Top-K track ids for one user's history.
    pub fn recommend(&self, history: &UserHistory, k: usize) -> Result<Vec<String>> {
        let ranked = self.rank(&history.sequence, &history.positives, &history.negatives, k)?;
        Ok(ranked
            .into_iter()
            .filter_map(|i| self.catalog.track_at(i).map(str::to_owned))
            .collect())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::tags::TagVectorizer;
    use crate::domain::song::Song;
    use crate::ml::model::SeqRecConfig;

    fn recommender() -> Recommender {
        let catalog = Catalog::from_songs(vec![
            Song::new("A", "rock"),
            Song::new("B", "rock, pop"),
            Song::new("C", "jazz"),
            Song::new("D", "metal"),
        ])
        .unwrap();
        let vectorizer = TagVectorizer::fit(&catalog);
        let tags = vectorizer.transform(&catalog);
        let model = SeqRecConfig::new(catalog.num_items(), vectorizer.vocab_size())
            .with_max_seq_len(6)
            .with_d_model(8)
            .with_num_heads(2)
            .with_num_blocks(1)
            .init(&tags, &Default::default());
        Recommender::new(model, catalog)
    }

    fn history(sequence: Vec<u32>) -> UserHistory {
        UserHistory {
            sequence,
            positives: HashSet::new(),
            negatives: HashSet::new(),
        }
    }

    #[test]
    fn test_empty_history_gives_empty_list() {
        let rec = recommender();
        let out = rec.recommend(&history(vec![]), 5).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_at_most_k_unique_known_tracks() {
        let rec = recommender();
        let out = rec.recommend(&history(vec![1, 2, 3]), 2).unwrap();
        assert!(out.len() <= 2);
        let unique: HashSet<&String> = out.iter().collect();
        assert_eq!(unique.len(), out.len());
        for track in &out {
            assert!(rec.catalog.index_of(track).is_some());
        }
    }

    #[test]
    fn test_k_larger_than_catalog_returns_whole_catalog() {
        let rec = recommender();
        let out = rec.recommend(&history(vec![1, 2]), 50).unwrap();
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_feedback_nudge_moves_items() {
        let rec = recommender();
        let sequence = vec![1, 2, 3];

        let mut boosted = history(sequence.clone());
        boosted.positives.insert(4);
        let with_boost = rec
            .rank(&sequence, &boosted.positives, &boosted.negatives, 1)
            .unwrap();
        // +1.0 dwarfs fresh-init dot products, so the boosted
        // item takes the top slot
        assert_eq!(with_boost, vec![4]);

        let mut buried = history(sequence.clone());
        buried.negatives.insert(4);
        let with_bury = rec
            .rank(&sequence, &buried.positives, &buried.negatives, 3)
            .unwrap();
        assert!(!with_bury.contains(&4));
    }

    #[test]
    fn test_item_in_both_sets_nets_to_raw_score() {
        let rec = recommender();
        let sequence = vec![1, 2, 3];
        let raw = rec
            .rank(&sequence, &HashSet::new(), &HashSet::new(), 4)
            .unwrap();

        let both: HashSet<u32> = [4].into_iter().collect();
        let netted = rec.rank(&sequence, &both, &both, 4).unwrap();
        assert_eq!(raw, netted);
    }

    #[test]
    fn test_padding_index_never_recommended() {
        let rec = recommender();
        let ranked = rec
            .rank(&[1, 2, 3, 4], &HashSet::new(), &HashSet::new(), 10)
            .unwrap();
        assert!(!ranked.contains(&0));
    }
}
