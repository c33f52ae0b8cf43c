// ============================================================
// Layer 3 — Activity Events
// ============================================================
// The activity log is the behavioral input to the recommender.
// Each event records that a user did something to a song at a
// point in time.
//
// The kind is a closed enum, not a free string: adding a new
// activity kind is a compile-time decision, and every match on
// it is exhaustive. Kinds partition into three non-exclusive
// sets used by the core:
//   SEQUENCE — play, like, addPlaylist   (behavioral sequence)
//   POSITIVE — like, addPlaylist         (explicit positive)
//   NEGATIVE — unlike, removePlaylist, skip (explicit negative)

use serde::{Deserialize, Serialize};

/// Everything a user can do to a song, as logged upstream.
/// Serde names match the wire/CSV spelling of the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityKind {
    #[serde(rename = "play")]
    Play,
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "unlike")]
    Unlike,
    #[serde(rename = "skip")]
    Skip,
    #[serde(rename = "addPlaylist")]
    AddPlaylist,
    #[serde(rename = "removePlaylist")]
    RemovePlaylist,
}

impl ActivityKind {
    /// Kinds that form the behavioral sequence used for
    /// next-item prediction.
    pub fn is_sequence(self) -> bool {
        matches!(self, Self::Play | Self::Like | Self::AddPlaylist)
    }

    /// Kinds that are an explicit positive signal.
    pub fn is_positive(self) -> bool {
        matches!(self, Self::Like | Self::AddPlaylist)
    }

    /// Kinds that are an explicit negative signal.
    pub fn is_negative(self) -> bool {
        matches!(self, Self::Unlike | Self::RemovePlaylist | Self::Skip)
    }
}

/// One logged activity event. Immutable once logged; only the
/// `trained_on` flag changes, after a training run consumes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub user_id: String,

    /// External song id — may reference a song no longer in the
    /// catalog snapshot, in which case the event is dropped from
    /// sequence construction.
    pub track_id: String,

    #[serde(rename = "activity_type")]
    pub kind: ActivityKind,

    /// Unix timestamp (seconds). Orders the behavioral sequence.
    pub timestamp: i64,

    /// Already consumed by a prior training pass — supports
    /// incremental (`--only-new`) training.
    #[serde(default)]
    pub trained_on: bool,
}

impl ActivityEvent {
    pub fn new(
        user_id: impl Into<String>,
        track_id: impl Into<String>,
        kind: ActivityKind,
        timestamp: i64,
    ) -> Self {
        Self {
            user_id:    user_id.into(),
            track_id:   track_id.into(),
            kind,
            timestamp,
            trained_on: false,
        }
    }
}
