// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load song catalog          (Layer 4 - data)
//   Step 2: Load activity events       (Layer 4 - data)
//   Step 3: Build item index           (Layer 4 - data)
//   Step 4: Fit tag vectorizer         (Layer 4 - data)
//   Step 5: Build training triples     (Layer 4 - data)
//   Step 6: Save model config          (Layer 6 - infra)
//   Step 7: Run training loop          (Layer 5 - ml)
//   Step 8: Mark events consumed       (Layer 4 - data)

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::data::catalog::Catalog;
use crate::data::loader::{CsvActivitySource, CsvSongSource};
use crate::data::samples::SampleBuilder;
use crate::data::tags::TagVectorizer;
use crate::domain::traits::{ActivitySource, SongSource};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::MetricsLogger;
use crate::ml::model::SeqRecConfig;
use crate::ml::trainer::{run_training, TrainingParams};

// ─── Training Configuration ──────────────────────────────────────────────────
// All knobs for one training run. Serialisable so a run can be
// reproduced from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub songs_csv:      String,
    pub activity_csv:   String,
    pub checkpoint_dir: String,
    pub metrics_csv:    String,
    pub max_seq_len:    usize,
    pub batch_size:     usize,
    pub epochs:         usize,
    pub lr:             f64,
    pub d_model:        usize,
    pub num_heads:      usize,
    pub num_blocks:     usize,
    pub dropout:        f64,

    /// Restrict training to events not yet marked consumed.
    pub only_new:       bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            songs_csv:      "data/songs.csv".to_string(),
            activity_csv:   "data/activity.csv".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            metrics_csv:    "checkpoints/metrics.csv".to_string(),
            max_seq_len:    100,
            batch_size:     32,
            epochs:         10,
            lr:             1e-3,
            d_model:        128,
            num_heads:      8,
            num_blocks:     3,
            dropout:        0.4,
            only_new:       false,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end.
    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;

        // ── Step 1: Load the song catalog ────────────────────────────────────
        let song_source = CsvSongSource::new(&cfg.songs_csv);
        let songs = song_source.load_all()?;

        // ── Step 2: Load activity events ─────────────────────────────────────
        let activity_source = CsvActivitySource::new(&cfg.activity_csv);
        let mut events = activity_source.load_all()?;
        if cfg.only_new {
            let before = events.len();
            events.retain(|e| !e.trained_on);
            tracing::info!(
                "Incremental mode: {} of {} events not yet consumed",
                events.len(),
                before
            );
        }

        // ── Step 3: Build the item index ─────────────────────────────────────
        // Fatal on an empty catalog; there is nothing to embed.
        let catalog = Catalog::from_songs(songs)?;
        tracing::info!("Catalog holds {} items", catalog.num_items());

        // ── Step 4: Fit the tag vectorizer ───────────────────────────────────
        let vectorizer = TagVectorizer::fit(&catalog);
        let tags = vectorizer.transform(&catalog);
        tracing::info!("Tag vocabulary size: {}", vectorizer.vocab_size());

        // ── Step 5: Build training triples ───────────────────────────────────
        let builder = SampleBuilder::new(cfg.max_seq_len);
        let mut rng = rand::thread_rng();
        let samples = builder.training_triples(&catalog, &events, &mut rng);
        tracing::info!("Built {} training triples", samples.len());

        // ── Step 6: Save the model architecture ──────────────────────────────
        // The serving path rebuilds the model from this file.
        let model_config = SeqRecConfig::new(catalog.num_items(), vectorizer.vocab_size())
            .with_max_seq_len(cfg.max_seq_len)
            .with_d_model(cfg.d_model)
            .with_num_heads(cfg.num_heads)
            .with_num_blocks(cfg.num_blocks)
            .with_dropout(cfg.dropout);
        let checkpoints = CheckpointManager::new(&cfg.checkpoint_dir);
        checkpoints.save_config(&model_config)?;

        // ── Step 7: Run the training loop ────────────────────────────────────
        let params = TrainingParams {
            epochs: cfg.epochs,
            batch_size: cfg.batch_size,
            learning_rate: cfg.lr,
        };
        let mut metrics = MetricsLogger::new(&cfg.metrics_csv);
        run_training(&model_config, &params, samples, &tags, &checkpoints, &mut metrics)?;

        // ── Step 8: Mark events consumed ─────────────────────────────────────
        // Incremental mode only, and only after a fully
        // successful run, so a failed run can be retried on the
        // same events. Full runs leave the flags untouched.
        if cfg.only_new {
            activity_source.mark_all_trained()?;
        }

        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::TempDir;

    fn write(path: &std::path::Path, contents: &str) {
        let mut file = std::fs::File::create(path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    fn setup(dir: &TempDir) -> TrainConfig {
        let songs = dir.path().join("songs.csv");
        let activity = dir.path().join("activity.csv");
        write(
            &songs,
            "track_id,name,artist,tags,year\n\
             A,Alpha,X,rock,1990\n\
             B,Beta,X,\"rock, pop\",1992\n\
             C,Gamma,Y,jazz,2001\n\
             D,Delta,Y,metal,2010\n",
        );
        let mut rows = String::from("user_id,track_id,activity_type,timestamp\n");
        for i in 0..10 {
            rows.push_str(&format!("u1,{},play,{}\n", ["A", "B", "C", "D"][i % 4], i));
        }
        write(&activity, &rows);

        TrainConfig {
            songs_csv: songs.to_string_lossy().into_owned(),
            activity_csv: activity.to_string_lossy().into_owned(),
            checkpoint_dir: dir.path().join("ckpt").to_string_lossy().into_owned(),
            metrics_csv: dir.path().join("metrics.csv").to_string_lossy().into_owned(),
            max_seq_len: 6,
            batch_size: 4,
            epochs: 1,
            lr: 1e-3,
            d_model: 8,
            num_heads: 2,
            num_blocks: 1,
            dropout: 0.0,
            only_new: false,
        }
    }

    #[test]
    fn test_full_run_persists_snapshot_and_leaves_events_unmarked() {
        let dir = TempDir::new().unwrap();
        let config = setup(&dir);
        TrainUseCase::new(config.clone()).execute().unwrap();

        let checkpoints = CheckpointManager::new(&config.checkpoint_dir);
        assert!(checkpoints.has_model());
        assert!(checkpoints.load_config().is_ok());
        assert!(std::path::Path::new(&config.metrics_csv).exists());

        // A full run never flips the consumed flag; only
        // incremental runs do.
        let events = CsvActivitySource::new(&config.activity_csv)
            .load_all()
            .unwrap();
        assert!(events.iter().all(|e| !e.trained_on));
    }

    #[test]
    fn test_only_new_marks_events_consumed_exactly_once() {
        let dir = TempDir::new().unwrap();
        let mut config = setup(&dir);
        config.only_new = true;
        TrainUseCase::new(config.clone()).execute().unwrap();

        let events = CsvActivitySource::new(&config.activity_csv)
            .load_all()
            .unwrap();
        assert!(events.iter().all(|e| e.trained_on));

        // Second incremental run sees zero fresh events and must
        // still succeed, leaving the snapshot in place.
        TrainUseCase::new(config.clone()).execute().unwrap();
        assert!(CheckpointManager::new(&config.checkpoint_dir).has_model());
    }
}
