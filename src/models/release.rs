use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type TrackId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlbumType {
    Album,
    Single,
    AppearsOn,
    Compilation,
}

impl AlbumType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlbumType::Album => "album",
            AlbumType::Single => "single",
            AlbumType::AppearsOn => "appears_on",
            AlbumType::Compilation => "compilation",
        }
    }
}

/// An album or single from an artist's catalog. Its tracks are fetched separately.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Release {
    pub id: String,
    pub name: String,
    pub artist_ids: Vec<String>,
    pub released_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    pub artist_names: Vec<String>,
    /// Zero-based position within the release.
    pub position: u32,
}

impl Track {
    pub fn primary_artist(&self) -> &str {
        self.artist_names.first().map(String::as_str).unwrap_or("")
    }

    /// Key used to collapse explicit/clean editions of the same song.
    pub fn identifier(&self) -> String {
        format!("{}{}", self.primary_artist(), self.name)
    }
}
