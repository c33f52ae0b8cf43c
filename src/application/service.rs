// ============================================================
// Layer 2 — RecommenderService
// ============================================================
// Explicit serving lifecycle:
//
//   construct-from-catalog -> load-or-init weights -> ready
//
// The service owns an immutable model snapshot. After a
// training run, `reload` builds a fresh Recommender from the
// latest snapshot and swaps it in whole; the previous snapshot
// is never mutated in place.

use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::data::catalog::Catalog;
use crate::data::samples::{collect_histories, UserHistory};
use crate::data::tags::{TagMatrix, TagVectorizer};
use crate::domain::activity::ActivityEvent;
use crate::domain::traits::SongSource;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::SeqRecConfig;
use crate::ml::recommender::Recommender;
use crate::ml::InferBackend;

pub struct RecommenderService {
    checkpoints: CheckpointManager,
    model_config: SeqRecConfig,
    tags: TagMatrix,
    recommender: Recommender,
}

impl RecommenderService {
    /// Build the catalog and tag features from the song source,
    /// then load the latest snapshot (initializing and
    /// persisting fresh weights when none exists).
    pub fn start(song_source: &dyn SongSource, checkpoint_dir: &Path) -> Result<Self> {
        let songs = song_source.load_all()?;
        let catalog = Catalog::from_songs(songs)?;
        let vectorizer = TagVectorizer::fit(&catalog);
        let tags = vectorizer.transform(&catalog);

        let checkpoints = CheckpointManager::new(checkpoint_dir);
        let model_config =
            checkpoints.load_or_init_config(catalog.num_items(), vectorizer.vocab_size())?;
        let model = checkpoints.load_or_init::<InferBackend>(
            &model_config,
            &tags,
            &crate::ml::device(),
        )?;

        info!(
            "Recommender ready: {} items, d_model {}",
            catalog.num_items(),
            model_config.d_model
        );

        Ok(Self {
            checkpoints,
            model_config,
            tags,
            recommender: Recommender::new(model, catalog),
        })
    }

    /// Swap in the latest persisted snapshot. The catalog and
    /// tag features are rebuilt against it; readers holding the
    /// old Recommender are unaffected.
    pub fn reload(&mut self, song_source: &dyn SongSource) -> Result<()> {
        let songs = song_source.load_all()?;
        let catalog = Catalog::from_songs(songs)?;
        let model = self.checkpoints.load_model::<InferBackend>(
            &self.model_config,
            &self.tags,
            &crate::ml::device(),
        )?;
        self.recommender = Recommender::new(model, catalog);
        info!("Reloaded model snapshot");
        Ok(())
    }

    pub fn recommender(&self) -> &Recommender {
        &self.recommender
    }

    pub fn tags(&self) -> &TagMatrix {
        &self.tags
    }

    pub fn model_config(&self) -> &SeqRecConfig {
        &self.model_config
    }

    /// History for one user, distilled from the activity log.
    /// Users absent from the log get an empty history.
    pub fn history_for(&self, events: &[ActivityEvent], user_id: &str) -> UserHistory {
        collect_histories(self.recommender.catalog(), events)
            .remove(user_id)
            .unwrap_or_else(|| UserHistory {
                sequence: Vec::new(),
                positives: Default::default(),
                negatives: Default::default(),
            })
    }

    /// Top-K track ids for one user.
    pub fn recommend_for(
        &self,
        events: &[ActivityEvent],
        user_id: &str,
        k: usize,
    ) -> Result<Vec<String>> {
        let history = self.history_for(events, user_id);
        self.recommender.recommend(&history, k)
    }
}
