// ============================================================
// Layer 4 — CSV Sources
// ============================================================
// File-backed implementations of the domain source traits. Rows
// that fail to deserialize (missing columns, unknown activity
// kinds) are skipped with a warning rather than failing the
// whole load; extra columns are ignored.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::domain::activity::ActivityEvent;
use crate::domain::song::Song;
use crate::domain::traits::{ActivitySource, SongSource};

// ─── CsvSongSource ────────────────────────────────────────────────────────────
pub struct CsvSongSource {
    path: PathBuf,
}

impl CsvSongSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SongSource for CsvSongSource {
    fn load_all(&self) -> Result<Vec<Song>> {
        let songs = read_rows::<Song>(&self.path, "song")?;
        info!("Loaded {} songs from {}", songs.len(), self.path.display());
        Ok(songs)
    }
}

// ─── CsvActivitySource ────────────────────────────────────────────────────────
pub struct CsvActivitySource {
    path: PathBuf,
}

impl CsvActivitySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ActivitySource for CsvActivitySource {
    fn load_all(&self) -> Result<Vec<ActivityEvent>> {
        let events = read_rows::<ActivityEvent>(&self.path, "activity")?;
        info!(
            "Loaded {} activity events from {}",
            events.len(),
            self.path.display()
        );
        Ok(events)
    }

    /// Flip `trained_on` on every row and rewrite the file in
    /// place. Rows that failed to parse on load are lost, which
    /// is acceptable: they could never be trained on anyway.
    fn mark_all_trained(&self) -> Result<()> {
        let mut events = self.load_all()?;
        for event in events.iter_mut() {
            event.trained_on = true;
        }

        let file = File::create(&self.path)
            .with_context(|| format!("Failed to rewrite {}", self.path.display()))?;
        let mut writer = csv::Writer::from_writer(file);
        for event in &events {
            writer.serialize(event)?;
        }
        writer.flush()?;
        info!("Marked {} activity events as trained", events.len());
        Ok(())
    }
}

/// Deserialize every row of a headered CSV file, skipping rows
/// that fail with a warning.
fn read_rows<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<Vec<T>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file {}", what, path.display()))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut rows = Vec::new();
    for (i, record) in reader.deserialize::<T>().enumerate() {
        match record {
            Ok(row) => rows.push(row),
            Err(e) => warn!("Skipping malformed {} row {}: {}", what, i + 1, e),
        }
    }
    Ok(rows)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::activity::ActivityKind;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    fn write_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_songs_tolerate_extra_columns_and_missing_tags() {
        let file = write_file(
            "track_id,name,artist,tags,year,tempo,energy\n\
             t1,Song One,Artist A,\"rock, indie\",1999,120,0.8\n\
             t2,Song Two,Artist B,,2005,98,0.4\n",
        );
        let source = CsvSongSource::new(file.path());
        let songs = source.load_all().unwrap();
        assert_eq!(songs.len(), 2);
        assert_eq!(songs[0].track_id, "t1");
        assert_eq!(songs[0].tags, "rock, indie");
        assert_eq!(songs[1].tags, "");
        assert_eq!(songs[1].year, 2005);
    }

    #[test]
    fn test_unknown_activity_kind_skips_row_only() {
        let file = write_file(
            "user_id,track_id,activity_type,timestamp\n\
             u1,t1,play,100\n\
             u1,t2,search,200\n\
             u1,t3,like,300\n",
        );
        let source = CsvActivitySource::new(file.path());
        let events = source.load_all().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, ActivityKind::Play);
        assert_eq!(events[1].kind, ActivityKind::Like);
        assert!(!events[0].trained_on);
    }

    #[test]
    fn test_mark_all_trained_rewrites_file() {
        let file = write_file(
            "user_id,track_id,activity_type,timestamp,trained_on\n\
             u1,t1,play,100,false\n\
             u2,t2,skip,200,false\n",
        );
        let source = CsvActivitySource::new(file.path());
        source.mark_all_trained().unwrap();

        let events = source.load_all().unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.trained_on));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let source = CsvSongSource::new("/nonexistent/songs.csv");
        assert!(source.load_all().is_err());
    }
}
