// ============================================================
// Layer 5 — Sequential Recommendation Model
// ============================================================
// A causal self-attention next-item predictor. Each input item
// embedding is fused with a linear projection of the item's
// TF-IDF tag vector before entering the encoder stack:
//
//   fused = alpha * item_emb + (1 - alpha) * proj(tag_vec)
//
// where alpha is a trainable scalar. The fused sequence is
// scaled by sqrt(d_model), given learned positional embeddings,
// and pushed through N pre-norm blocks of causal multi-head
// attention plus a per-position feed-forward.
//
// Index 0 is the padding sentinel: row 0 of the item table, the
// positional table, and the tag matrix are all zero, and pad
// positions get position index 0.

use burn::config::Config;
use burn::module::{Module, Param};
use burn::nn::attention::{
    generate_autoregressive_mask, MhaInput, MultiHeadAttention, MultiHeadAttentionConfig,
};
use burn::nn::{
    Dropout, DropoutConfig, Embedding, LayerNorm, LayerNormConfig, Linear, LinearConfig,
};
use burn::tensor::{activation, backend::Backend, Bool, Distribution, Int, Tensor};

use crate::data::tags::TagMatrix;

/// Value of the fusion weight at initialization. The item
/// embedding contributes little at first and the tag projection
/// dominates; training moves alpha from there.
pub const ALPHA_INIT: f32 = 0.1;

const LAYER_NORM_EPS: f64 = 1e-8;
const EMB_INIT_STD: f64 = 0.02;

// ─── SeqRecConfig ─────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct SeqRecConfig {
    /// Number of real catalog items N (padding row excluded).
    pub num_items: usize,

    /// Width of the TF-IDF tag vectors for this catalog snapshot.
    pub tag_dim: usize,

    #[config(default = 100)]
    pub max_seq_len: usize,

    #[config(default = 128)]
    pub d_model: usize,

    #[config(default = 8)]
    pub num_heads: usize,

    #[config(default = 3)]
    pub num_blocks: usize,

    #[config(default = 0.4)]
    pub dropout: f64,
}

impl SeqRecConfig {
    /// Initialize the model with fresh parameters and the tag
    /// matrix baked in as a constant.
    pub fn init<B: Backend>(&self, tags: &TagMatrix, device: &B::Device) -> SeqRecModel<B> {
        let blocks = (0..self.num_blocks)
            .map(|_| EncoderBlock::new(self.d_model, self.num_heads, self.dropout, device))
            .collect();

        SeqRecModel {
            item_emb: padded_embedding::<B>(self.num_items + 1, self.d_model, device),
            pos_emb: padded_embedding::<B>(self.max_seq_len + 1, self.d_model, device),
            feature_proj: LinearConfig::new(self.tag_dim, self.d_model).init(device),
            alpha: Param::from_tensor(Tensor::from_floats([ALPHA_INIT], device)),
            tag_features: tag_tensor::<B>(tags, device),
            blocks,
            final_norm: LayerNormConfig::new(self.d_model)
                .with_epsilon(LAYER_NORM_EPS)
                .init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            max_seq_len: self.max_seq_len,
        }
    }
}

// ─── SeqRecModel ──────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct SeqRecModel<B: Backend> {
    pub item_emb: Embedding<B>,
    pub pos_emb: Embedding<B>,
    pub feature_proj: Linear<B>,
    pub alpha: Param<Tensor<B, 1>>,

    /// Constant [N + 1, V] tag matrix, row-aligned with the item
    /// table. Not a trainable parameter.
    pub tag_features: Tensor<B, 2>,

    pub blocks: Vec<EncoderBlock<B>>,
    pub final_norm: LayerNorm<B>,
    pub dropout: Dropout,
    pub max_seq_len: usize,
}

/// Everything the composite loss needs from one forward pass.
pub struct TrainOutput<B: Backend> {
    /// Dot product of each anchor with its positive — [batch]
    pub pos_logits: Tensor<B, 1>,

    /// Dot product of each anchor with its negative — [batch]
    pub neg_logits: Tensor<B, 1>,

    /// Last-position sequence representations — [batch, d_model]
    pub anchor: Tensor<B, 2>,

    /// Positive / negative item embeddings — [batch, d_model]
    pub pos_emb: Tensor<B, 2>,
    pub neg_emb: Tensor<B, 2>,
}

impl<B: Backend> SeqRecModel<B> {
    /// Encode a batch of padded sequences into per-position
    /// hidden states — [batch, seq_len, d_model].
    pub fn forward(&self, input_ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = input_ids.dims();
        let device = input_ids.device();

        let item = self.item_emb.forward(input_ids.clone());
        let [_, _, d_model] = item.dims();

        // Tag rows for each input position, projected to d_model
        let tag_dim = self.tag_features.dims()[1];
        let tag_rows = self
            .tag_features
            .clone()
            .select(0, input_ids.clone().reshape([batch_size * seq_len]))
            .reshape([batch_size, seq_len, tag_dim]);
        let tag_proj = self.feature_proj.forward(tag_rows);

        let alpha = self.alpha.val().reshape([1, 1, 1]);
        let complement = alpha.clone().neg().add_scalar(1.0);
        let fused = item * alpha.expand([batch_size, seq_len, d_model])
            + tag_proj * complement.expand([batch_size, seq_len, d_model]);
        let fused = fused.mul_scalar((d_model as f32).sqrt());

        // 1-based positions where non-pad, 0 at pads
        let positions = Tensor::<B, 1, Int>::arange(1..(seq_len as i64 + 1), &device)
            .reshape([1, seq_len])
            .expand([batch_size, seq_len]);
        let non_pad = input_ids.equal_elem(0).bool_not().int();
        let positions = (positions * non_pad).clamp(0i64, self.max_seq_len as i64);

        let mut x = self.dropout.forward(fused + self.pos_emb.forward(positions));

        let mask = generate_autoregressive_mask::<B>(batch_size, seq_len, &device);
        for block in &self.blocks {
            x = block.forward(x, mask.clone());
        }

        self.final_norm.forward(x)
    }

    /// The hidden state at each sequence's last non-pad position
    /// — [batch, d_model].
    pub fn last_hidden(
        &self,
        input_ids: Tensor<B, 2, Int>,
        lengths: Tensor<B, 1, Int>,
    ) -> Tensor<B, 2> {
        let hidden = self.forward(input_ids);
        let [batch_size, _, d_model] = hidden.dims();

        let idx = lengths
            .sub_scalar(1)
            .clamp_min(0)
            .reshape([batch_size, 1, 1])
            .expand([batch_size, 1, d_model]);
        hidden.gather(1, idx).reshape([batch_size, d_model])
    }

    /// Embedding rows for a batch of item indices — [batch, d_model].
    pub fn item_embeddings(&self, ids: Tensor<B, 1, Int>) -> Tensor<B, 2> {
        self.item_emb.weight.val().select(0, ids)
    }

    /// Scores against every row of the item table, padding row
    /// included — [batch, N + 1].
    pub fn score_catalog(&self, rep: Tensor<B, 2>) -> Tensor<B, 2> {
        rep.matmul(self.item_emb.weight.val().transpose())
    }

    /// One training forward pass over a batch of triples.
    pub fn forward_train(
        &self,
        input_ids: Tensor<B, 2, Int>,
        lengths: Tensor<B, 1, Int>,
        positives: Tensor<B, 1, Int>,
        negatives: Tensor<B, 1, Int>,
    ) -> TrainOutput<B> {
        let [batch_size, _] = input_ids.dims();

        let anchor = self.last_hidden(input_ids, lengths);
        let pos_emb = self.item_embeddings(positives);
        let neg_emb = self.item_embeddings(negatives);

        let pos_logits = (anchor.clone() * pos_emb.clone())
            .sum_dim(1)
            .reshape([batch_size]);
        let neg_logits = (anchor.clone() * neg_emb.clone())
            .sum_dim(1)
            .reshape([batch_size]);

        TrainOutput {
            pos_logits,
            neg_logits,
            anchor,
            pos_emb,
            neg_emb,
        }
    }
}

// ─── EncoderBlock ─────────────────────────────────────────────────────────────
/// One pre-norm causal block. The attention query is the normed
/// input while key and value are the raw input; the feed-forward
/// residual wraps its own normed input.
#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    attn_norm: LayerNorm<B>,
    attn: MultiHeadAttention<B>,
    ffn_norm: LayerNorm<B>,
    ffn: PositionWiseFeedForward<B>,
}

impl<B: Backend> EncoderBlock<B> {
    fn new(d_model: usize, num_heads: usize, dropout: f64, device: &B::Device) -> Self {
        Self {
            attn_norm: LayerNormConfig::new(d_model)
                .with_epsilon(LAYER_NORM_EPS)
                .init(device),
            attn: MultiHeadAttentionConfig::new(d_model, num_heads)
                .with_dropout(dropout)
                .init(device),
            ffn_norm: LayerNormConfig::new(d_model)
                .with_epsilon(LAYER_NORM_EPS)
                .init(device),
            ffn: PositionWiseFeedForward::new(d_model, dropout, device),
        }
    }

    fn forward(&self, input: Tensor<B, 3>, mask: Tensor<B, 3, Bool>) -> Tensor<B, 3> {
        let query = self.attn_norm.forward(input.clone());
        let attn = self
            .attn
            .forward(MhaInput::new(query.clone(), input.clone(), input).mask_attn(mask));
        let x = query + attn.context;
        self.ffn.forward(self.ffn_norm.forward(x))
    }
}

/// Two pointwise layers with an inner residual:
/// out = x + drop(w2(relu(drop(w1(x))))).
#[derive(Module, Debug)]
pub struct PositionWiseFeedForward<B: Backend> {
    conv1: Linear<B>,
    conv2: Linear<B>,
    dropout: Dropout,
}

impl<B: Backend> PositionWiseFeedForward<B> {
    fn new(d_model: usize, dropout: f64, device: &B::Device) -> Self {
        Self {
            conv1: LinearConfig::new(d_model, d_model).init(device),
            conv2: LinearConfig::new(d_model, d_model).init(device),
            dropout: DropoutConfig::new(dropout).init(),
        }
    }

    fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 3> {
        let x = self.dropout.forward(self.conv1.forward(input.clone()));
        let x = activation::relu(x);
        let x = self.dropout.forward(self.conv2.forward(x));
        x + input
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────
/// A fresh embedding table with N(0, 0.02) weights and row 0
/// forced to zero.
fn padded_embedding<B: Backend>(rows: usize, cols: usize, device: &B::Device) -> Embedding<B> {
    let weight = Tensor::random([rows, cols], Distribution::Normal(0.0, EMB_INIT_STD), device)
        .slice_assign([0..1, 0..cols], Tensor::zeros([1, cols], device));
    Embedding {
        weight: Param::from_tensor(weight),
    }
}

/// Lift the tag matrix into a backend tensor, padding row first.
fn tag_tensor<B: Backend>(tags: &TagMatrix, device: &B::Device) -> Tensor<B, 2> {
    let rows = tags.num_rows();
    let dim = tags.dim();
    let flat: Vec<f32> = tags.rows().iter().flat_map(|r| r.iter().copied()).collect();
    Tensor::<B, 1>::from_floats(flat.as_slice(), device).reshape([rows, dim])
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::catalog::Catalog;
    use crate::data::tags::TagVectorizer;
    use crate::domain::song::Song;
    use crate::ml::InferBackend;

    fn tiny_model() -> SeqRecModel<InferBackend> {
        let catalog = Catalog::from_songs(vec![
            Song::new("A", "rock"),
            Song::new("B", "rock, pop"),
            Song::new("C", "jazz"),
            Song::new("D", "metal, doom"),
            Song::new("E", ""),
        ])
        .unwrap();
        let vectorizer = TagVectorizer::fit(&catalog);
        let tags = vectorizer.transform(&catalog);

        SeqRecConfig::new(catalog.num_items(), vectorizer.vocab_size())
            .with_max_seq_len(8)
            .with_d_model(16)
            .with_num_heads(2)
            .with_num_blocks(2)
            .init(&tags, &Default::default())
    }

    fn ids(model_device: &<InferBackend as Backend>::Device, rows: &[Vec<i32>]) -> Tensor<InferBackend, 2, Int> {
        let cols = rows[0].len();
        let flat: Vec<i32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Tensor::<InferBackend, 1, Int>::from_ints(flat.as_slice(), model_device)
            .reshape([rows.len(), cols])
    }

    #[test]
    fn test_padding_rows_are_zero_at_init() {
        let model = tiny_model();
        let item_row0: Vec<f32> = model
            .item_emb
            .weight
            .val()
            .slice([0..1])
            .into_data()
            .to_vec()
            .unwrap();
        assert!(item_row0.iter().all(|&x| x == 0.0));

        let pos_row0: Vec<f32> = model
            .pos_emb
            .weight
            .val()
            .slice([0..1])
            .into_data()
            .to_vec()
            .unwrap();
        assert!(pos_row0.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_causal_mask_blocks_future_positions() {
        let model = tiny_model();
        let device = Default::default();

        // Same prefix, different suffix
        let a = ids(&device, &[vec![1, 2, 3, 4]]);
        let b = ids(&device, &[vec![1, 2, 5, 1]]);

        let ha = model.forward(a);
        let hb = model.forward(b);

        let prefix_a: Vec<f32> = ha.slice([0..1, 0..2]).into_data().to_vec().unwrap();
        let prefix_b: Vec<f32> = hb.slice([0..1, 0..2]).into_data().to_vec().unwrap();
        for (x, y) in prefix_a.iter().zip(&prefix_b) {
            assert!((x - y).abs() < 1e-5, "prefix hidden state leaked: {x} vs {y}");
        }
    }

    #[test]
    fn test_trailing_padding_does_not_change_last_hidden() {
        let model = tiny_model();
        let device: <InferBackend as Backend>::Device = Default::default();

        let padded = ids(&device, &[vec![1, 2, 0, 0]]);
        let tight = ids(&device, &[vec![1, 2]]);
        let lengths = Tensor::<InferBackend, 1, Int>::from_ints([2], &device);

        let from_padded: Vec<f32> = model
            .last_hidden(padded, lengths.clone())
            .into_data()
            .to_vec()
            .unwrap();
        let from_tight: Vec<f32> = model
            .last_hidden(tight, lengths)
            .into_data()
            .to_vec()
            .unwrap();

        for (x, y) in from_padded.iter().zip(&from_tight) {
            assert!((x - y).abs() < 1e-5);
        }
    }

    #[test]
    fn test_score_catalog_width_includes_padding_row() {
        let model = tiny_model();
        let device: <InferBackend as Backend>::Device = Default::default();

        let input = ids(&device, &[vec![1, 2, 3, 0]]);
        let lengths = Tensor::<InferBackend, 1, Int>::from_ints([3], &device);
        let rep = model.last_hidden(input, lengths);
        let scores = model.score_catalog(rep);
        assert_eq!(scores.dims(), [1, 6]);
    }

    #[test]
    fn test_forward_train_logit_shapes() {
        let model = tiny_model();
        let device: <InferBackend as Backend>::Device = Default::default();

        let input = ids(&device, &[vec![1, 2, 0, 0], vec![3, 4, 5, 0]]);
        let lengths = Tensor::<InferBackend, 1, Int>::from_ints([2, 3], &device);
        let positives = Tensor::<InferBackend, 1, Int>::from_ints([3, 1], &device);
        let negatives = Tensor::<InferBackend, 1, Int>::from_ints([4, 2], &device);

        let out = model.forward_train(input, lengths, positives, negatives);
        assert_eq!(out.pos_logits.dims(), [2]);
        assert_eq!(out.neg_logits.dims(), [2]);
        assert_eq!(out.anchor.dims(), [2, 16]);
        assert_eq!(out.pos_emb.dims(), [2, 16]);
    }

    #[test]
    fn test_alpha_initializes_low() {
        let model = tiny_model();
        let alpha: Vec<f32> = model.alpha.val().into_data().to_vec().unwrap();
        assert_eq!(alpha.len(), 1);
        assert!((alpha[0] - ALPHA_INIT).abs() < 1e-6);
    }
}
