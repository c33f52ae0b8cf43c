// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The recommender core treats data access as an external
// collaborator behind two narrow seams: a catalog of songs and
// an ordered activity log. By programming against these traits
// the core never learns where the data lives.
//
// Implementations:
//   - CsvSongSource / CsvActivitySource → flat files (Layer 4)
//   - a future database-backed source would slot in unchanged

use anyhow::Result;
use crate::domain::activity::ActivityEvent;
use crate::domain::song::Song;

// ─── SongSource ───────────────────────────────────────────────────────────────
/// Any component that can produce the full song catalog.
pub trait SongSource {
    /// Load every song available from this source.
    fn load_all(&self) -> Result<Vec<Song>>;
}

// ─── ActivitySource ───────────────────────────────────────────────────────────
/// Any component that can produce the activity log and mark
/// events as consumed by training.
pub trait ActivitySource {
    /// Load every logged event, in no particular order —
    /// the sample builder sorts by timestamp itself.
    fn load_all(&self) -> Result<Vec<ActivityEvent>>;

    /// Flag every event as trained-on. Called after a successful
    /// incremental training run so the next `--only-new` pass
    /// skips them.
    fn mark_all_trained(&self) -> Result<()>;
}
