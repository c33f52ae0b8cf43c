// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `recommend` and
// `evaluate`, and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, etc.)

use clap::{Args, Subcommand};

use crate::application::evaluate_use_case::EvaluateConfig;
use crate::application::recommend_use_case::RecommendConfig;
use crate::application::train_use_case::TrainConfig;

/// The top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the recommendation model on the activity log
    Train(TrainArgs),

    /// Print top-K recommendations for one user
    Recommend(RecommendArgs),

    /// Compute offline quality metrics over all eligible users
    Evaluate(EvaluateArgs),
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// CSV file with the song catalog
    #[arg(long, default_value = "data/songs.csv")]
    pub songs: String,

    /// CSV file with the user activity log
    #[arg(long, default_value = "data/activity.csv")]
    pub activity: String,

    /// Directory to save model snapshots
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// CSV file receiving one row of diagnostics per epoch
    #[arg(long, default_value = "checkpoints/metrics.csv")]
    pub metrics: String,

    /// Maximum history window fed to the encoder
    #[arg(long, default_value_t = 100)]
    pub max_seq_len: usize,

    /// Number of triples processed together in one step
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Number of full passes through the training triples
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Fixed learning rate, no schedule
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Hidden dimension of the encoder
    /// Every item is represented as a vector of this size
    #[arg(long, default_value_t = 128)]
    pub d_model: usize,

    /// Number of attention heads
    /// d_model must be divisible by num_heads
    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    /// Number of stacked encoder blocks
    #[arg(long, default_value_t = 3)]
    pub num_blocks: usize,

    /// Dropout probability during training
    #[arg(long, default_value_t = 0.4)]
    pub dropout: f64,

    /// Train only on events not yet marked as consumed
    #[arg(long, default_value_t = false)]
    pub only_new: bool,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            songs_csv:      a.songs,
            activity_csv:   a.activity,
            checkpoint_dir: a.checkpoint_dir,
            metrics_csv:    a.metrics,
            max_seq_len:    a.max_seq_len,
            batch_size:     a.batch_size,
            epochs:         a.epochs,
            lr:             a.lr,
            d_model:        a.d_model,
            num_heads:      a.num_heads,
            num_blocks:     a.num_blocks,
            dropout:        a.dropout,
            only_new:       a.only_new,
        }
    }
}

/// All arguments for the `recommend` command
#[derive(Args, Debug)]
pub struct RecommendArgs {
    /// The user to recommend for
    #[arg(long)]
    pub user: String,

    /// Number of tracks to return
    #[arg(long, default_value_t = 10)]
    pub k: usize,

    /// CSV file with the song catalog
    #[arg(long, default_value = "data/songs.csv")]
    pub songs: String,

    /// CSV file with the user activity log
    #[arg(long, default_value = "data/activity.csv")]
    pub activity: String,

    /// Directory where model snapshots were saved
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,
}

impl From<RecommendArgs> for RecommendConfig {
    fn from(a: RecommendArgs) -> Self {
        RecommendConfig {
            songs_csv:      a.songs,
            activity_csv:   a.activity,
            checkpoint_dir: a.checkpoint_dir,
            user_id:        a.user,
            k:              a.k,
        }
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Recommendation depth per user
    #[arg(long, default_value_t = 10)]
    pub k: usize,

    /// Tag-similarity neighborhood size for the hit rate
    #[arg(long, default_value_t = 50)]
    pub n: usize,

    /// CSV file with the song catalog
    #[arg(long, default_value = "data/songs.csv")]
    pub songs: String,

    /// CSV file with the user activity log
    #[arg(long, default_value = "data/activity.csv")]
    pub activity: String,

    /// Directory where model snapshots were saved
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,
}

impl From<EvaluateArgs> for EvaluateConfig {
    fn from(a: EvaluateArgs) -> Self {
        EvaluateConfig {
            songs_csv:      a.songs,
            activity_csv:   a.activity,
            checkpoint_dir: a.checkpoint_dir,
            k:              a.k,
            n:              a.n,
        }
    }
}
