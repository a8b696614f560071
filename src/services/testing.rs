//! In-memory stand-ins for the provider and user store, used by unit tests.

use crate::error::{AppError, Result};
use crate::models::{
    AlbumType, ArtistRef, Credentials, PlayedItem, Release, Track, TrackId, UserPreferences,
    UserRecord,
};
use crate::services::provider::{
    CatalogProvider, ProviderUser, SessionFactory, PLAYLIST_BATCH_LIMIT,
};
use crate::services::user_store::UserStore;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CurrentUser,
    FollowedArtists { after: Option<String> },
    RecentlyPlayed,
    GetArtist(String),
    ArtistAlbums { artist_id: String, offset: u32, limit: u32 },
    AlbumTracks(String),
    PlaylistTracks(String),
    Remove(Vec<TrackId>),
    Replace(Vec<TrackId>),
    Add(Vec<TrackId>),
    CreatePlaylist(String),
    SetDescription(String),
}

#[derive(Debug, Clone, Copy)]
pub enum FailWith {
    Provider,
    Auth,
    RateLimit,
}

type FailPredicate = Box<dyn Fn(&Call) -> bool + Send + Sync>;

#[derive(Default)]
struct FakeState {
    followed: Vec<ArtistRef>,
    recent: Vec<PlayedItem>,
    artists: HashMap<String, ArtistRef>,
    albums: HashMap<String, Vec<Release>>,
    tracks: HashMap<String, Vec<Track>>,
    playlists: HashMap<String, Vec<TrackId>>,
    calls: Vec<Call>,
    call_times: Vec<Instant>,
    next_playlist: u32,
}

pub struct FakeProvider {
    user: ProviderUser,
    state: Mutex<FakeState>,
    failures: Mutex<Vec<(FailPredicate, FailWith)>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            user: ProviderUser {
                id: "user-1".to_string(),
                country: "JP".to_string(),
            },
            state: Mutex::new(FakeState::default()),
            failures: Mutex::new(Vec::new()),
        }
    }

    pub fn follow(&self, artist: ArtistRef) {
        let mut state = self.state.lock().unwrap();
        state.artists.insert(artist.id.clone(), artist.clone());
        state.followed.push(artist);
    }

    pub fn know_artist(&self, artist: ArtistRef) {
        self.state.lock().unwrap().artists.insert(artist.id.clone(), artist);
    }

    pub fn add_release(&self, release: Release, tracks: Vec<Track>) {
        let mut state = self.state.lock().unwrap();
        for artist_id in &release.artist_ids {
            state
                .albums
                .entry(artist_id.clone())
                .or_default()
                .push(release.clone());
        }
        state.tracks.insert(release.id.clone(), tracks);
    }

    pub fn add_recent(&self, item: PlayedItem) {
        self.state.lock().unwrap().recent.push(item);
    }

    pub fn set_playlist(&self, playlist_id: &str, tracks: Vec<TrackId>) {
        self.state
            .lock()
            .unwrap()
            .playlists
            .insert(playlist_id.to_string(), tracks);
    }

    pub fn playlist(&self, playlist_id: &str) -> Vec<TrackId> {
        self.state
            .lock()
            .unwrap()
            .playlists
            .get(playlist_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// When each recorded call arrived, in call order.
    pub fn call_times(&self) -> Vec<Instant> {
        self.state.lock().unwrap().call_times.clone()
    }

    pub fn clear_calls(&self) {
        let mut state = self.state.lock().unwrap();
        state.calls.clear();
        state.call_times.clear();
    }

    /// Make every call matching `predicate` fail.
    pub fn fail_when(&self, predicate: impl Fn(&Call) -> bool + Send + Sync + 'static, with: FailWith) {
        self.failures.lock().unwrap().push((Box::new(predicate), with));
    }

    fn record(&self, call: Call) -> Result<()> {
        let failure = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .find(|(predicate, _)| predicate(&call))
            .map(|(_, with)| *with);
        {
            let mut state = self.state.lock().unwrap();
            state.calls.push(call.clone());
            state.call_times.push(Instant::now());
        }

        match failure {
            None => Ok(()),
            Some(FailWith::Provider) => Err(AppError::provider(format!("{:?}", call), "injected failure")),
            Some(FailWith::Auth) => Err(AppError::Auth("token revoked".to_string())),
            Some(FailWith::RateLimit) => Err(AppError::RateLimitExceeded { retry_after: Some(1) }),
        }
    }

    fn check_batch(track_ids: &[TrackId]) -> Result<()> {
        if track_ids.len() > PLAYLIST_BATCH_LIMIT {
            return Err(AppError::Validation(format!(
                "batch of {} exceeds {}",
                track_ids.len(),
                PLAYLIST_BATCH_LIMIT
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CatalogProvider for FakeProvider {
    async fn current_user(&self) -> Result<ProviderUser> {
        self.record(Call::CurrentUser)?;
        Ok(self.user.clone())
    }

    async fn followed_artists(&self, after: Option<&str>, limit: u32) -> Result<Vec<ArtistRef>> {
        self.record(Call::FollowedArtists {
            after: after.map(str::to_string),
        })?;
        let state = self.state.lock().unwrap();
        let start = match after {
            Some(id) => state
                .followed
                .iter()
                .position(|a| a.id == id)
                .map(|i| i + 1)
                .unwrap_or(state.followed.len()),
            None => 0,
        };
        Ok(state
            .followed
            .iter()
            .skip(start)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn recently_played(&self, after: DateTime<Utc>, limit: u32) -> Result<Vec<PlayedItem>> {
        self.record(Call::RecentlyPlayed)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .recent
            .iter()
            .filter(|item| item.played_at > after)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn get_artist(&self, artist_id: &str) -> Result<ArtistRef> {
        self.record(Call::GetArtist(artist_id.to_string()))?;
        self.state
            .lock()
            .unwrap()
            .artists
            .get(artist_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("artist {}", artist_id)))
    }

    async fn artist_albums(
        &self,
        artist_id: &str,
        _country: &str,
        limit: u32,
        offset: u32,
        _types: &[AlbumType],
    ) -> Result<Vec<Release>> {
        self.record(Call::ArtistAlbums {
            artist_id: artist_id.to_string(),
            offset,
            limit,
        })?;
        let state = self.state.lock().unwrap();
        Ok(state
            .albums
            .get(artist_id)
            .map(|albums| {
                albums
                    .iter()
                    .skip(offset as usize)
                    .take(limit as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn album_tracks(&self, album_id: &str) -> Result<Vec<Track>> {
        self.record(Call::AlbumTracks(album_id.to_string()))?;
        self.state
            .lock()
            .unwrap()
            .tracks
            .get(album_id)
            .cloned()
            .ok_or_else(|| AppError::provider("album_tracks", format!("unknown album {}", album_id)))
    }

    async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<TrackId>> {
        self.record(Call::PlaylistTracks(playlist_id.to_string()))?;
        Ok(self.playlist(playlist_id))
    }

    async fn remove_tracks(&self, playlist_id: &str, track_ids: &[TrackId]) -> Result<()> {
        self.record(Call::Remove(track_ids.to_vec()))?;
        let mut state = self.state.lock().unwrap();
        if let Some(tracks) = state.playlists.get_mut(playlist_id) {
            tracks.retain(|id| !track_ids.contains(id));
        }
        Ok(())
    }

    async fn replace_tracks(&self, playlist_id: &str, track_ids: &[TrackId]) -> Result<()> {
        self.record(Call::Replace(track_ids.to_vec()))?;
        Self::check_batch(track_ids)?;
        self.state
            .lock()
            .unwrap()
            .playlists
            .insert(playlist_id.to_string(), track_ids.to_vec());
        Ok(())
    }

    async fn add_tracks(&self, playlist_id: &str, track_ids: &[TrackId]) -> Result<()> {
        self.record(Call::Add(track_ids.to_vec()))?;
        Self::check_batch(track_ids)?;
        self.state
            .lock()
            .unwrap()
            .playlists
            .entry(playlist_id.to_string())
            .or_default()
            .extend(track_ids.iter().cloned());
        Ok(())
    }

    async fn create_playlist(&self, _user_id: &str, name: &str, _description: &str) -> Result<String> {
        self.record(Call::CreatePlaylist(name.to_string()))?;
        let mut state = self.state.lock().unwrap();
        state.next_playlist += 1;
        let id = format!("playlist-{}", state.next_playlist);
        state.playlists.insert(id.clone(), Vec::new());
        Ok(id)
    }

    async fn set_playlist_description(&self, _playlist_id: &str, description: &str) -> Result<()> {
        self.record(Call::SetDescription(description.to_string()))
    }
}

/// Hands out the same fake session for every user.
pub struct FakeSessions {
    pub provider: Arc<FakeProvider>,
}

#[async_trait::async_trait]
impl SessionFactory for FakeSessions {
    async fn open(&self, user: &UserRecord) -> Result<Arc<dyn CatalogProvider>> {
        if user.credentials.is_expired(Utc::now()) {
            return Err(AppError::Auth(format!("session for {} has expired", user.user_id)));
        }
        Ok(self.for_token(&user.credentials.access_token))
    }

    fn for_token(&self, _access_token: &str) -> Arc<dyn CatalogProvider> {
        self.provider.clone()
    }
}

#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<String, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn with_users(users: Vec<UserRecord>) -> Self {
        Self {
            users: Mutex::new(users.into_iter().map(|u| (u.user_id.clone(), u)).collect()),
        }
    }
}

#[async_trait::async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_user(&self, user_id: &str) -> Result<UserRecord> {
        self.users
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    async fn find_user(&self, user_id: &str) -> Result<Option<UserRecord>> {
        Ok(self.users.lock().unwrap().get(user_id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        let mut users: Vec<_> = self.users.lock().unwrap().values().cloned().collect();
        users.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(users)
    }

    async fn upsert_user(
        &self,
        user_id: &str,
        playlist_id: &str,
        credentials: &Credentials,
    ) -> Result<UserRecord> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .entry(user_id.to_string())
            .or_insert_with(|| UserRecord {
                user_id: user_id.to_string(),
                playlist_id: playlist_id.to_string(),
                preferences: UserPreferences::default(),
                credentials: credentials.clone(),
            });
        user.playlist_id = playlist_id.to_string();
        user.credentials = credentials.clone();
        Ok(user.clone())
    }

    async fn update_preferences(
        &self,
        user_id: &str,
        preferences: UserPreferences,
    ) -> Result<UserRecord> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;
        user.preferences = preferences;
        Ok(user.clone())
    }
}

pub fn artist(id: &str, name: &str) -> ArtistRef {
    ArtistRef {
        id: id.to_string(),
        name: name.to_string(),
        external_url: format!("https://open.spotify.com/artist/{}", id),
        icon_url: None,
    }
}

pub fn release(id: &str, artist_id: &str, released_at: DateTime<Utc>) -> Release {
    Release {
        id: id.to_string(),
        name: format!("Release {}", id),
        artist_ids: vec![artist_id.to_string()],
        released_at,
    }
}

pub fn track(id: &str, name: &str, artist_name: &str) -> Track {
    Track {
        id: id.to_string(),
        name: name.to_string(),
        artist_names: vec![artist_name.to_string()],
        position: 0,
    }
}

pub fn user(user_id: &str, playlist_id: &str, preferences: UserPreferences) -> UserRecord {
    UserRecord {
        user_id: user_id.to_string(),
        playlist_id: playlist_id.to_string(),
        preferences,
        credentials: Credentials {
            access_token: "access".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: "refresh".to_string(),
            expiry: Utc::now() + Duration::hours(1),
        },
    }
}

pub fn ids(prefix: &str, count: usize) -> Vec<TrackId> {
    (0..count).map(|i| format!("{}{}", prefix, i)).collect()
}
