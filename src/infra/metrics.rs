// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per training epoch. The file is created
// (and any previous run's file truncated) on the first row of
// a run, so each run owns its metrics file.

use std::fs::{self, File};
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

/// One row of training diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub loss: f32,
    pub tag_cosine: f32,
    pub anchor_pos_cosine: f32,
    pub anchor_neg_cosine: f32,
}

pub struct MetricsLogger {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
}

impl MetricsLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
        }
    }

    pub fn log(&mut self, metrics: &EpochMetrics) -> Result<()> {
        let writer = match &mut self.writer {
            Some(writer) => writer,
            None => {
                if let Some(parent) = self.path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let file = File::create(&self.path).with_context(|| {
                    format!("Failed to create metrics file {}", self.path.display())
                })?;
                self.writer.insert(csv::Writer::from_writer(file))
            }
        };

        writer.serialize(metrics)?;
        writer.flush()?;
        Ok(())
    }
}
