// ============================================================
// Layer 2 — RecommendUseCase
// ============================================================
// Serving path for one user: start the service, distill the
// user's history from the activity log, print the top-K.

use std::path::Path;

use anyhow::Result;

use crate::application::service::RecommenderService;
use crate::data::loader::{CsvActivitySource, CsvSongSource};
use crate::domain::traits::ActivitySource;

pub struct RecommendConfig {
    pub songs_csv:      String,
    pub activity_csv:   String,
    pub checkpoint_dir: String,
    pub user_id:        String,
    pub k:              usize,
}

pub struct RecommendUseCase {
    config: RecommendConfig,
}

impl RecommendUseCase {
    pub fn new(config: RecommendConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;

        let song_source = CsvSongSource::new(&cfg.songs_csv);
        let service =
            RecommenderService::start(&song_source, Path::new(&cfg.checkpoint_dir))?;

        let events = CsvActivitySource::new(&cfg.activity_csv).load_all()?;
        let recommendations = service.recommend_for(&events, &cfg.user_id, cfg.k)?;

        if recommendations.is_empty() {
            println!("No recommendations for '{}' (no listening history)", cfg.user_id);
            return Ok(());
        }

        println!("Top {} for '{}':", recommendations.len(), cfg.user_id);
        for (rank, track_id) in recommendations.iter().enumerate() {
            match service.recommender().catalog().index_of(track_id) {
                Some(index) => {
                    let song = service
                        .recommender()
                        .catalog()
                        .song_at(index)
                        .map(|s| format!("{} by {}", s.name, s.artist))
                        .unwrap_or_default();
                    println!("{:>3}. {}  {}", rank + 1, track_id, song);
                }
                None => println!("{:>3}. {}", rank + 1, track_id),
            }
        }
        Ok(())
    }
}
