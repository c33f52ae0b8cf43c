// ============================================================
// Layer 4 — Catalog Index
// ============================================================
// Assigns each song a contiguous integer index 1..=N for the
// embedding table. Index 0 is reserved as the padding sentinel
// and never corresponds to a real song.
//
// Index assignment is deterministic only within one catalog
// snapshot: the index of a song is its position in the loaded
// song list plus one. A model snapshot is therefore only valid
// against the catalog it was built from.

use std::collections::HashMap;

use thiserror::Error;

use crate::domain::song::Song;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// Model construction must not proceed without items.
    #[error("empty catalog: cannot build an item index from zero songs")]
    EmptyCatalog,
}

/// The fixed item index for one catalog snapshot.
#[derive(Debug)]
pub struct Catalog {
    songs: Vec<Song>,
    index_by_track: HashMap<String, u32>,
}

impl Catalog {
    /// Build the index from a full catalog snapshot.
    /// Fails with `EmptyCatalog` if there are no songs.
    pub fn from_songs(songs: Vec<Song>) -> Result<Self, CatalogError> {
        if songs.is_empty() {
            return Err(CatalogError::EmptyCatalog);
        }

        let mut index_by_track = HashMap::with_capacity(songs.len());
        for (i, song) in songs.iter().enumerate() {
            // 1-based: index 0 stays free for padding
            index_by_track.insert(song.track_id.clone(), (i + 1) as u32);
        }

        Ok(Self { songs, index_by_track })
    }

    /// Number of real items N (padding excluded).
    pub fn num_items(&self) -> usize {
        self.songs.len()
    }

    /// Catalog index for an external track id, if present in
    /// this snapshot.
    pub fn index_of(&self, track_id: &str) -> Option<u32> {
        self.index_by_track.get(track_id).copied()
    }

    /// The song at a 1-based catalog index.
    pub fn song_at(&self, index: u32) -> Option<&Song> {
        if index == 0 {
            return None;
        }
        self.songs.get(index as usize - 1)
    }

    /// External track id at a 1-based catalog index.
    pub fn track_at(&self, index: u32) -> Option<&str> {
        self.song_at(index).map(|s| s.track_id.as_str())
    }

    /// All songs, in index order (position i holds index i+1).
    pub fn songs(&self) -> &[Song] {
        &self.songs
    }
}
