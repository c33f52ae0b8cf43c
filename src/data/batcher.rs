// ============================================================
// Layer 4 — Sequence Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<TrainSample>
// into tensors for the model forward pass.
//
// All histories were right-padded to the same length by the
// sample builder, so stacking is a flatten + reshape. The true
// (non-pad) lengths ride along so the trainer can gather each
// sample's last real position, and the raw positive/negative
// ids ride along for the content-similarity loss term, which is
// computed on the CPU from catalog tag vectors.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::TrainSample;

// ─── SeqBatch ─────────────────────────────────────────────────────────────────
/// A batch of training triples ready for the model.
#[derive(Debug, Clone)]
pub struct SeqBatch<B: Backend> {
    /// Padded history windows — shape: [batch_size, max_seq_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// Non-pad counts per sample — shape: [batch_size]
    pub lengths: Tensor<B, 1, Int>,

    /// Positive item indices — shape: [batch_size]
    pub positives: Tensor<B, 1, Int>,

    /// Negative item indices — shape: [batch_size]
    pub negatives: Tensor<B, 1, Int>,

    /// Raw ids mirroring `positives` / `negatives`, for CPU-side
    /// tag-vector lookups.
    pub positive_ids: Vec<u32>,
    pub negative_ids: Vec<u32>,
}

// ─── SeqBatcher ───────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct SeqBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> SeqBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<TrainSample, SeqBatch<B>> for SeqBatcher<B> {
    fn batch(&self, items: Vec<TrainSample>) -> SeqBatch<B> {
        let batch_size = items.len();
        let seq_len = items[0].input_ids.len();

        let input_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.input_ids.iter().map(|&x| x as i32))
            .collect();
        let lengths: Vec<i32> = items.iter().map(|s| s.length as i32).collect();
        let positive_ids: Vec<u32> = items.iter().map(|s| s.positive).collect();
        let negative_ids: Vec<u32> = items.iter().map(|s| s.negative).collect();

        let input_ids = Tensor::<B, 1, Int>::from_ints(input_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);
        let lengths = Tensor::<B, 1, Int>::from_ints(lengths.as_slice(), &self.device);
        let positives = Tensor::<B, 1, Int>::from_ints(
            positive_ids.iter().map(|&x| x as i32).collect::<Vec<_>>().as_slice(),
            &self.device,
        );
        let negatives = Tensor::<B, 1, Int>::from_ints(
            negative_ids.iter().map(|&x| x as i32).collect::<Vec<_>>().as_slice(),
            &self.device,
        );

        SeqBatch {
            input_ids,
            lengths,
            positives,
            negatives,
            positive_ids,
            negative_ids,
        }
    }
}
