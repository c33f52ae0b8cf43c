// ============================================================
// Layer 4 — Sample Types + Burn Dataset
// ============================================================

use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use std::collections::HashSet;

/// One training triple: a padded history window, the item that
/// actually came next, and a uniformly sampled negative item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainSample {
    pub user_id: String,

    /// Catalog indices, right-padded with 0 to the configured
    /// maximum sequence length.
    pub input_ids: Vec<u32>,

    /// Count of non-pad positions (>= 1).
    pub length: usize,

    /// The observed next item.
    pub positive: u32,

    /// Uniform draw over the catalog, never equal to `positive`.
    pub negative: u32,
}

/// One held-out evaluation pair per user: everything but the
/// last sequence item as input, the last item as target.
#[derive(Debug, Clone)]
pub struct EvalSample {
    pub user_id: String,

    /// Unpadded history, already trimmed to the window tail.
    pub input_ids: Vec<u32>,

    /// The held-out next item.
    pub target: u32,

    /// Full sequence length before the input/target split —
    /// the evaluator's eligibility threshold applies to this,
    /// not to the (possibly window-trimmed) input.
    pub sequence_len: usize,

    /// Explicit positive/negative item sets for the re-ranking
    /// nudge at inference time.
    pub positives: HashSet<u32>,
    pub negatives: HashSet<u32>,
}

pub struct SampleDataset {
    samples: Vec<TrainSample>,
}

impl SampleDataset {
    pub fn new(samples: Vec<TrainSample>) -> Self {
        Self { samples }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

impl Dataset<TrainSample> for SampleDataset {
    fn get(&self, index: usize) -> Option<TrainSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
