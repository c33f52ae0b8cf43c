// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Persists the model as a single versionless snapshot: the
// latest save wins. Two artifacts live in the snapshot
// directory:
//
//   model.mpk          — all parameters (CompactRecorder)
//   model_config.json  — the architecture the blob was built for
//
// Loading a blob into a mismatched architecture is a hard
// failure. The cold-start policy is load-or-init: a missing
// snapshot yields fresh parameters which are persisted
// immediately so the serving path always has a file to read.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use burn::module::Module;
use burn::record::CompactRecorder;
use burn::tensor::backend::Backend;
use tracing::info;

use crate::data::tags::TagMatrix;
use crate::ml::model::{SeqRecConfig, SeqRecModel};

// CompactRecorder appends its own ".mpk" extension to the stem
const MODEL_STEM: &str = "model";
const MODEL_FILE: &str = "model.mpk";
const CONFIG_FILE: &str = "model_config.json";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn has_model(&self) -> bool {
        self.dir.join(MODEL_FILE).exists()
    }

    /// Persist the current parameters, replacing any previous
    /// snapshot.
    pub fn save_model<B: Backend>(&self, model: &SeqRecModel<B>) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        model
            .clone()
            .save_file(self.dir.join(MODEL_STEM), &CompactRecorder::new())
            .map_err(|e| anyhow!("failed to write model snapshot: {e}"))?;
        Ok(())
    }

    /// Load parameters into a model built from `config`. Shape
    /// mismatches surface as errors from the recorder.
    pub fn load_model<B: Backend>(
        &self,
        config: &SeqRecConfig,
        tags: &TagMatrix,
        device: &B::Device,
    ) -> Result<SeqRecModel<B>> {
        let model = config.init::<B>(tags, device);
        model
            .load_file(self.dir.join(MODEL_STEM), &CompactRecorder::new(), device)
            .map_err(|e| anyhow!("failed to load model snapshot: {e}"))
    }

    /// Load the snapshot if one exists; otherwise initialize
    /// fresh parameters and persist them immediately.
    pub fn load_or_init<B: Backend>(
        &self,
        config: &SeqRecConfig,
        tags: &TagMatrix,
        device: &B::Device,
    ) -> Result<SeqRecModel<B>> {
        if self.has_model() {
            info!("Loading model snapshot from {}", self.dir.display());
            return self.load_model(config, tags, device);
        }

        info!("No model snapshot found; initializing fresh parameters");
        let model = config.init::<B>(tags, device);
        self.save_model(&model)?;
        Ok(model)
    }

    pub fn save_config(&self, config: &SeqRecConfig) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let json = serde_json::to_string_pretty(config)?;
        fs::write(self.dir.join(CONFIG_FILE), json)
            .with_context(|| format!("Failed to write {}", CONFIG_FILE))?;
        Ok(())
    }

    /// Load the persisted architecture, or fall back to the
    /// default architecture for this catalog snapshot and
    /// persist it.
    pub fn load_or_init_config(&self, num_items: usize, tag_dim: usize) -> Result<SeqRecConfig> {
        if self.dir.join(CONFIG_FILE).exists() {
            return self.load_config();
        }
        let config = SeqRecConfig::new(num_items, tag_dim);
        self.save_config(&config)?;
        Ok(config)
    }

    pub fn load_config(&self) -> Result<SeqRecConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }
}
