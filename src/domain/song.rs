// ============================================================
// Layer 3 — Song Domain Type
// ============================================================
// A single catalog item. The recommender core only consumes
// `track_id` (the stable external identifier) and `tags` (a
// comma-delimited content description); the remaining fields
// are carried for display and log messages.

use serde::{Deserialize, Serialize};

/// One song from the catalog.
///
/// The source CSV carries many more audio-feature columns
/// (danceability, energy, tempo, ...) — those are ignored on
/// import because nothing in the ranking core reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Song {
    /// Stable external identifier — what callers see in results
    pub track_id: String,

    /// Display name
    pub name: String,

    /// Display artist
    pub artist: String,

    /// Comma-delimited tag string, e.g. "rock, indie, 90s"
    /// Feeds the TF-IDF content fingerprint.
    #[serde(default)]
    pub tags: String,

    /// Release year — auxiliary, unused by the ranking core
    #[serde(default)]
    pub year: i32,
}

impl Song {
    pub fn new(track_id: impl Into<String>, tags: impl Into<String>) -> Self {
        Self {
            track_id: track_id.into(),
            name:     String::new(),
            artist:   String::new(),
            tags:     tags.into(),
            year:     0,
        }
    }
}
