// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Optimizes the model on next-item triples with a composite
// objective:
//
//   L = BCE(pos, 1) + BCE(neg, 0)
//     + 3.0 * TripletMargin(anchor, pos, neg; margin 0.05)
//     + 3.0 * (1 - mean tag cosine between pos and neg)
//
// The tag term is computed from the fixed TF-IDF matrix and
// enters the total as a constant per batch. It shifts the
// reported loss without contributing gradients.
//
// The model is checkpointed after every epoch; latest wins.

use anyhow::Result;
use burn::data::dataloader::DataLoaderBuilder;
use burn::nn::loss::BinaryCrossEntropyLossConfig;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::{activation, backend::Backend, ElementConversion, Int, Tensor};
use tracing::{info, warn};

use crate::data::batcher::SeqBatcher;
use crate::data::dataset::{SampleDataset, TrainSample};
use crate::data::tags::{cosine_similarity, TagMatrix};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::model::{SeqRecConfig, SeqRecModel};
use crate::ml::TrainBackend;

pub const TRIPLET_MARGIN: f32 = 0.05;
pub const LAMBDA_TRIPLET: f32 = 3.0;
pub const LAMBDA_TAG: f32 = 3.0;

const ADAM_EPSILON: f32 = 1e-8;
const SHUFFLE_SEED: u64 = 42;

/// Hyperparameters of one training run.
pub struct TrainingParams {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
}

/// Train (or continue training) the model on the given triples
/// and persist a snapshot after every epoch.
pub fn run_training(
    model_config: &SeqRecConfig,
    params: &TrainingParams,
    samples: Vec<TrainSample>,
    tags: &TagMatrix,
    checkpoints: &CheckpointManager,
    metrics: &mut MetricsLogger,
) -> Result<SeqRecModel<TrainBackend>> {
    let device = crate::ml::device();
    let model = checkpoints.load_or_init::<TrainBackend>(model_config, tags, &device)?;

    if samples.is_empty() {
        warn!("No training triples; persisting current parameters untouched");
        checkpoints.save_model(&model)?;
        return Ok(model);
    }

    info!(
        "Training on {} triples for {} epochs (batch size {}, lr {})",
        samples.len(),
        params.epochs,
        params.batch_size,
        params.learning_rate
    );

    let dataset = SampleDataset::new(samples);
    let batcher = SeqBatcher::<TrainBackend>::new(device.clone());
    let loader = DataLoaderBuilder::new(batcher)
        .batch_size(params.batch_size)
        .shuffle(SHUFFLE_SEED)
        .num_workers(1)
        .build(dataset);

    let bce = BinaryCrossEntropyLossConfig::new()
        .with_logits(true)
        .init(&device);
    let mut optim = AdamConfig::new()
        .with_epsilon(ADAM_EPSILON)
        .init();

    let mut model = model;
    for epoch in 1..=params.epochs {
        let mut loss_sum = 0.0f32;
        let mut tag_cos_sum = 0.0f32;
        let mut pos_cos_sum = 0.0f32;
        let mut neg_cos_sum = 0.0f32;
        let mut batches = 0usize;

        for batch in loader.iter() {
            let batch_size = batch.positive_ids.len();
            let out = model.forward_train(
                batch.input_ids,
                batch.lengths,
                batch.positives,
                batch.negatives,
            );

            let pos_targets =
                Tensor::<TrainBackend, 1, Int>::ones([batch_size], &device);
            let neg_targets =
                Tensor::<TrainBackend, 1, Int>::zeros([batch_size], &device);
            let loss_bce = bce.forward(out.pos_logits.clone(), pos_targets)
                + bce.forward(out.neg_logits.clone(), neg_targets);

            let triplet = triplet_margin_loss(
                out.anchor.clone(),
                out.pos_emb.clone(),
                out.neg_emb.clone(),
            );

            let tag_cos = mean_tag_cosine(tags, &batch.positive_ids, &batch.negative_ids);

            let loss = loss_bce
                + triplet.mul_scalar(LAMBDA_TRIPLET)
                + Tensor::<TrainBackend, 1>::from_floats(
                    [LAMBDA_TAG * (1.0 - tag_cos)],
                    &device,
                );

            loss_sum += loss.clone().into_scalar().elem::<f32>();
            tag_cos_sum += tag_cos;
            pos_cos_sum += mean_cosine(out.anchor.clone(), out.pos_emb);
            neg_cos_sum += mean_cosine(out.anchor, out.neg_emb);
            batches += 1;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(params.learning_rate, model, grads);
        }

        let denom = batches.max(1) as f32;
        let epoch_metrics = EpochMetrics {
            epoch,
            loss: loss_sum / denom,
            tag_cosine: tag_cos_sum / denom,
            anchor_pos_cosine: pos_cos_sum / denom,
            anchor_neg_cosine: neg_cos_sum / denom,
        };

        info!(
            "Epoch {}/{}: loss {:.4}, tag cos {:.4}, anchor/pos cos {:.4}, anchor/neg cos {:.4}",
            epoch,
            params.epochs,
            epoch_metrics.loss,
            epoch_metrics.tag_cosine,
            epoch_metrics.anchor_pos_cosine,
            epoch_metrics.anchor_neg_cosine
        );

        metrics.log(&epoch_metrics)?;
        checkpoints.save_model(&model)?;
    }

    Ok(model)
}

/// Mean of relu(d(a, p) - d(a, n) + margin) over the batch,
/// with euclidean distances.
fn triplet_margin_loss<B: Backend>(
    anchor: Tensor<B, 2>,
    positive: Tensor<B, 2>,
    negative: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let d_pos = euclidean_distance(anchor.clone(), positive);
    let d_neg = euclidean_distance(anchor, negative);
    activation::relu(d_pos - d_neg + TRIPLET_MARGIN).mean()
}

/// Row-wise euclidean distance between two [batch, d] tensors.
/// The epsilon keeps the sqrt differentiable at zero distance.
fn euclidean_distance<B: Backend>(a: Tensor<B, 2>, b: Tensor<B, 2>) -> Tensor<B, 1> {
    let diff = a - b;
    let [n, _] = diff.dims();
    (diff.clone() * diff)
        .sum_dim(1)
        .reshape([n])
        .add_scalar(1e-12)
        .sqrt()
}

/// Mean row-wise cosine between two [batch, d] tensors, read
/// back as a scalar diagnostic.
fn mean_cosine<B: Backend>(a: Tensor<B, 2>, b: Tensor<B, 2>) -> f32 {
    let [n, _] = a.dims();
    let dot = (a.clone() * b.clone()).sum_dim(1).reshape([n]);
    let norm_a = (a.clone() * a).sum_dim(1).reshape([n]).sqrt();
    let norm_b = (b.clone() * b).sum_dim(1).reshape([n]).sqrt();
    (dot / (norm_a * norm_b).add_scalar(1e-8))
        .mean()
        .into_scalar()
        .elem::<f32>()
}

/// Mean cosine between the tag vectors of paired positive and
/// negative items.
fn mean_tag_cosine(tags: &TagMatrix, positives: &[u32], negatives: &[u32]) -> f32 {
    let sum: f32 = positives
        .iter()
        .zip(negatives)
        .map(|(&p, &n)| cosine_similarity(tags.row(p), tags.row(n)))
        .sum();
    sum / positives.len().max(1) as f32
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::catalog::Catalog;
    use crate::data::samples::SampleBuilder;
    use crate::data::tags::TagVectorizer;
    use crate::domain::activity::{ActivityEvent, ActivityKind};
    use crate::domain::song::Song;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    fn fixture() -> (Catalog, TagMatrix, Vec<TrainSample>, SeqRecConfig) {
        let catalog = Catalog::from_songs(vec![
            Song::new("A", "rock"),
            Song::new("B", "rock, pop"),
            Song::new("C", "jazz"),
            Song::new("D", "metal"),
        ])
        .unwrap();
        let vectorizer = TagVectorizer::fit(&catalog);
        let tags = vectorizer.transform(&catalog);

        let events: Vec<ActivityEvent> = (0..12)
            .map(|i| {
                ActivityEvent::new("u1", ["A", "B", "C", "D"][i % 4], ActivityKind::Play, i as i64)
            })
            .collect();
        let mut rng = StdRng::seed_from_u64(3);
        let samples =
            SampleBuilder::new(6).training_triples(&catalog, &events, &mut rng);
        assert!(!samples.is_empty());

        let config = SeqRecConfig::new(catalog.num_items(), vectorizer.vocab_size())
            .with_max_seq_len(6)
            .with_d_model(8)
            .with_num_heads(2)
            .with_num_blocks(1)
            .with_dropout(0.0);

        (catalog, tags, samples, config)
    }

    #[test]
    fn test_one_epoch_persists_snapshot_and_keeps_padding_zero() {
        let (_, tags, samples, config) = fixture();
        let dir = TempDir::new().unwrap();
        let checkpoints = CheckpointManager::new(dir.path());
        let mut metrics = MetricsLogger::new(dir.path().join("metrics.csv"));

        let params = TrainingParams {
            epochs: 1,
            batch_size: 4,
            learning_rate: 1e-3,
        };
        let model =
            run_training(&config, &params, samples, &tags, &checkpoints, &mut metrics)
                .unwrap();

        assert!(checkpoints.has_model());

        // Row 0 of the item table never receives gradient
        let d_model = config.d_model;
        let row0: Vec<f32> = model
            .item_emb
            .weight
            .val()
            .slice([0..1, 0..d_model])
            .into_data()
            .to_vec()
            .unwrap();
        assert!(row0.iter().all(|&x| x == 0.0), "padding row moved: {row0:?}");

        let csv = std::fs::read_to_string(dir.path().join("metrics.csv")).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "epoch,loss,tag_cosine,anchor_pos_cosine,anchor_neg_cosine");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_empty_sample_set_still_persists_model() {
        let (_, tags, _, config) = fixture();
        let dir = TempDir::new().unwrap();
        let checkpoints = CheckpointManager::new(dir.path());
        let mut metrics = MetricsLogger::new(dir.path().join("metrics.csv"));

        let params = TrainingParams {
            epochs: 3,
            batch_size: 4,
            learning_rate: 1e-3,
        };
        run_training(&config, &params, Vec::new(), &tags, &checkpoints, &mut metrics)
            .unwrap();
        assert!(checkpoints.has_model());
    }

    #[test]
    fn test_triplet_loss_is_zero_when_negative_is_far() {
        type B = crate::ml::InferBackend;
        let device = Default::default();
        let anchor = Tensor::<B, 2>::from_floats([[1.0, 0.0]], &device);
        let positive = Tensor::<B, 2>::from_floats([[1.0, 0.0]], &device);
        let negative = Tensor::<B, 2>::from_floats([[-5.0, 0.0]], &device);
        let loss: f32 = triplet_margin_loss(anchor, positive, negative)
            .into_scalar()
            .elem();
        assert!(loss.abs() < 1e-5);
    }

    #[test]
    fn test_triplet_loss_penalizes_near_negative() {
        type B = crate::ml::InferBackend;
        let device = Default::default();
        let anchor = Tensor::<B, 2>::from_floats([[1.0, 0.0]], &device);
        let positive = Tensor::<B, 2>::from_floats([[0.0, 1.0]], &device);
        let negative = Tensor::<B, 2>::from_floats([[1.0, 0.0]], &device);
        let loss: f32 = triplet_margin_loss(anchor, positive, negative)
            .into_scalar()
            .elem();
        // d_pos = sqrt(2), d_neg = 0, margin 0.05
        assert!((loss - (2.0f32.sqrt() + TRIPLET_MARGIN)).abs() < 1e-4);
    }
}
