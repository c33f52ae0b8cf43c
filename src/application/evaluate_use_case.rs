// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Offline evaluation over the full activity log: one held-out
// split per eligible user, served by the latest snapshot, then
// the metric summary is printed.

use std::path::Path;

use anyhow::Result;

use crate::application::service::RecommenderService;
use crate::data::loader::{CsvActivitySource, CsvSongSource};
use crate::data::samples::SampleBuilder;
use crate::domain::traits::ActivitySource;
use crate::ml::evaluator::evaluate;

pub struct EvaluateConfig {
    pub songs_csv:      String,
    pub activity_csv:   String,
    pub checkpoint_dir: String,

    /// Recommendation depth per user.
    pub k: usize,

    /// Tag-similarity neighborhood size for the hit rate.
    pub n: usize,
}

pub struct EvaluateUseCase {
    config: EvaluateConfig,
}

impl EvaluateUseCase {
    pub fn new(config: EvaluateConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;

        let song_source = CsvSongSource::new(&cfg.songs_csv);
        let service =
            RecommenderService::start(&song_source, Path::new(&cfg.checkpoint_dir))?;

        let events = CsvActivitySource::new(&cfg.activity_csv).load_all()?;
        let builder = SampleBuilder::new(service.model_config().max_seq_len);
        let samples = builder.eval_pairs(service.recommender().catalog(), &events);

        let report = evaluate(
            service.recommender(),
            &samples,
            &events,
            service.tags(),
            cfg.k,
            cfg.n,
        )?;
        report.print_summary();
        Ok(())
    }
}
