use super::TrackId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stages of a sync cycle, in the order they complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    Authenticated,
    ArtistsDiscovered,
    ReleasesCollected,
    TracksSelected,
    PlaylistRewritten,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncStage::Authenticated => "authenticate",
            SyncStage::ArtistsDiscovered => "discover artists",
            SyncStage::ReleasesCollected => "collect releases",
            SyncStage::TracksSelected => "select tracks",
            SyncStage::PlaylistRewritten => "rewrite playlist",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncState {
    Started,
    Reached { stage: SyncStage },
    Done,
    Failed { stage: SyncStage, error: String },
}

impl SyncState {
    /// Stage the next transition is expected to complete.
    pub fn next_stage(&self) -> Option<SyncStage> {
        match self {
            SyncState::Started => Some(SyncStage::Authenticated),
            SyncState::Reached { stage } => match stage {
                SyncStage::Authenticated => Some(SyncStage::ArtistsDiscovered),
                SyncStage::ArtistsDiscovered => Some(SyncStage::ReleasesCollected),
                SyncStage::ReleasesCollected => Some(SyncStage::TracksSelected),
                SyncStage::TracksSelected => Some(SyncStage::PlaylistRewritten),
                SyncStage::PlaylistRewritten => None,
            },
            SyncState::Done | SyncState::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub user_id: String,
    pub playlist_id: String,
    pub artists: usize,
    pub releases: usize,
    pub removed: usize,
    pub added: Vec<TrackId>,
    pub state: SyncState,
}
