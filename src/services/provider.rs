//! Narrow view of the streaming service used by the sync engine.
//!
//! Everything the engine needs from the outside world goes through
//! [`CatalogProvider`], so tests can swap in a fake.

use crate::error::Result;
use crate::models::{AlbumType, ArtistRef, PlayedItem, Release, Track, TrackId, UserRecord};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Maximum number of ids accepted by one replace/add call.
pub const PLAYLIST_BATCH_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderUser {
    pub id: String,
    pub country: String,
}

/// An authenticated session for one user.
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn current_user(&self) -> Result<ProviderUser>;

    /// One page of followed artists, starting after the artist id `after`.
    async fn followed_artists(&self, after: Option<&str>, limit: u32) -> Result<Vec<ArtistRef>>;

    async fn recently_played(&self, after: DateTime<Utc>, limit: u32) -> Result<Vec<PlayedItem>>;

    async fn get_artist(&self, artist_id: &str) -> Result<ArtistRef>;

    async fn artist_albums(
        &self,
        artist_id: &str,
        country: &str,
        limit: u32,
        offset: u32,
        types: &[AlbumType],
    ) -> Result<Vec<Release>>;

    /// Tracks of a release in album order.
    async fn album_tracks(&self, album_id: &str) -> Result<Vec<Track>>;

    async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<TrackId>>;

    async fn remove_tracks(&self, playlist_id: &str, track_ids: &[TrackId]) -> Result<()>;

    /// Overwrite the playlist with at most [`PLAYLIST_BATCH_LIMIT`] tracks.
    async fn replace_tracks(&self, playlist_id: &str, track_ids: &[TrackId]) -> Result<()>;

    /// Append at most [`PLAYLIST_BATCH_LIMIT`] tracks.
    async fn add_tracks(&self, playlist_id: &str, track_ids: &[TrackId]) -> Result<()>;

    /// Returns the new playlist's id.
    async fn create_playlist(&self, user_id: &str, name: &str, description: &str)
        -> Result<String>;

    async fn set_playlist_description(&self, playlist_id: &str, description: &str) -> Result<()>;
}

/// Opens provider sessions from stored user credentials.
#[async_trait::async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, user: &UserRecord) -> Result<Arc<dyn CatalogProvider>>;

    /// Session for a token that is not stored yet, as handed over at registration.
    fn for_token(&self, access_token: &str) -> Arc<dyn CatalogProvider>;
}
