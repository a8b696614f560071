use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtistRef {
    pub id: String,
    pub name: String,
    #[serde(rename = "url")]
    pub external_url: String,
    #[serde(rename = "iconUrl")]
    pub icon_url: Option<String>,
}

/// An artist seen in the user's recent listening history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayedArtist {
    #[serde(flatten)]
    pub artist: ArtistRef,
    pub play_count: u32,
    pub last_played_at: DateTime<Utc>,
}

/// One entry of the recently-played feed, reduced to what discovery needs.
#[derive(Debug, Clone)]
pub struct PlayedItem {
    pub artist_ids: Vec<String>,
    pub played_at: DateTime<Utc>,
}
