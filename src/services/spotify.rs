use crate::error::{AppError, Result};
use crate::models::{AlbumType, ArtistRef, PlayedItem, Release, Track, TrackId, UserRecord};
use crate::services::provider::{CatalogProvider, ProviderUser, SessionFactory};
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// Spotify caps removals at 100 tracks per request.
const REMOVE_CHUNK: usize = 100;
const PLAYLIST_PAGE_SIZE: u32 = 100;
const ALBUM_TRACKS_LIMIT: u32 = 50;

#[derive(Debug, Deserialize)]
struct MeResponse {
    id: String,
    #[serde(default)]
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Image {
    url: String,
}

#[derive(Debug, Deserialize)]
struct FullArtist {
    id: String,
    name: String,
    #[serde(default)]
    external_urls: HashMap<String, String>,
    #[serde(default)]
    images: Vec<Image>,
}

impl From<FullArtist> for ArtistRef {
    fn from(artist: FullArtist) -> Self {
        ArtistRef {
            external_url: artist.external_urls.get("spotify").cloned().unwrap_or_default(),
            icon_url: artist.images.into_iter().next().map(|i| i.url),
            id: artist.id,
            name: artist.name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FollowingResponse {
    artists: Paging<FullArtist>,
}

#[derive(Debug, Deserialize)]
struct Paging<T> {
    items: Vec<T>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SimpleArtist {
    #[serde(default)]
    id: Option<String>,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RecentlyPlayedItem {
    track: SimpleTrack,
    played_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct SimpleTrack {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    artists: Vec<SimpleArtist>,
}

#[derive(Debug, Deserialize)]
struct SimpleAlbum {
    id: String,
    name: String,
    #[serde(default)]
    artists: Vec<SimpleArtist>,
    release_date: String,
    #[serde(default)]
    release_date_precision: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    track: Option<PlaylistTrack>,
}

#[derive(Debug, Deserialize)]
struct PlaylistTrack {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedPlaylist {
    id: String,
}

/// Midnight UTC of the first day covered by a Spotify release date.
/// Dates come with year, month or day precision ("2021", "2021-03", "2021-03-25").
pub fn parse_release_date(date: &str, precision: Option<&str>) -> Option<DateTime<Utc>> {
    let precision = precision.unwrap_or(match date.len() {
        4 => "year",
        7 => "month",
        _ => "day",
    });
    let full = match precision {
        "year" => format!("{}-01-01", date),
        "month" => format!("{}-01", date),
        _ => date.to_string(),
    };
    NaiveDate::parse_from_str(&full, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn track_uri(track_id: &str) -> String {
    format!("spotify:track:{}", track_id)
}

/// Spotify Web API session for one user.
#[derive(Debug, Clone)]
pub struct SpotifyClient {
    base_url: String,
    access_token: String,
    client: Client,
}

impl SpotifyClient {
    pub fn new(client: Client, base_url: String, access_token: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
            client,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.access_token)
    }

    /// Send a request and map non-success statuses onto the error taxonomy.
    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| AppError::provider(operation, format!("Request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::UNAUTHORIZED => Err(AppError::Auth(format!(
                "Spotify rejected the session during {}",
                operation
            ))),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse().ok());
                tracing::warn!("Spotify throttled {} (retry after {:?}s)", operation, retry_after);
                Err(AppError::RateLimitExceeded { retry_after })
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                tracing::error!("Spotify API error during {}: {} - {}", operation, status, body);
                Err(AppError::provider(
                    operation,
                    format!("API returned status: {} - {}", status, body),
                ))
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, operation: &str, request: RequestBuilder) -> Result<T> {
        self.send(operation, request)
            .await?
            .json()
            .await
            .map_err(|e| AppError::provider(operation, format!("Failed to parse response: {}", e)))
    }
}

#[async_trait::async_trait]
impl CatalogProvider for SpotifyClient {
    async fn current_user(&self) -> Result<ProviderUser> {
        let me: MeResponse = self
            .get_json("current_user", self.request(Method::GET, "/me"))
            .await?;
        Ok(ProviderUser {
            id: me.id,
            // `from_token` lets the API pick the market of the session's user
            country: me.country.unwrap_or_else(|| "from_token".to_string()),
        })
    }

    async fn followed_artists(&self, after: Option<&str>, limit: u32) -> Result<Vec<ArtistRef>> {
        let mut request = self
            .request(Method::GET, "/me/following")
            .query(&[("type", "artist".to_string()), ("limit", limit.to_string())]);
        if let Some(after) = after {
            request = request.query(&[("after", after)]);
        }

        let page: FollowingResponse = self.get_json("followed_artists", request).await?;
        Ok(page.artists.items.into_iter().map(ArtistRef::from).collect())
    }

    async fn recently_played(&self, after: DateTime<Utc>, limit: u32) -> Result<Vec<PlayedItem>> {
        let request = self.request(Method::GET, "/me/player/recently-played").query(&[
            ("limit", limit.to_string()),
            ("after", after.timestamp_millis().to_string()),
        ]);

        let page: Paging<RecentlyPlayedItem> = self.get_json("recently_played", request).await?;
        Ok(page
            .items
            .into_iter()
            .map(|item| PlayedItem {
                artist_ids: item.track.artists.into_iter().filter_map(|a| a.id).collect(),
                played_at: item.played_at,
            })
            .collect())
    }

    async fn get_artist(&self, artist_id: &str) -> Result<ArtistRef> {
        let artist: FullArtist = self
            .get_json("get_artist", self.request(Method::GET, &format!("/artists/{}", artist_id)))
            .await?;
        Ok(artist.into())
    }

    async fn artist_albums(
        &self,
        artist_id: &str,
        country: &str,
        limit: u32,
        offset: u32,
        types: &[AlbumType],
    ) -> Result<Vec<Release>> {
        let groups = types.iter().map(AlbumType::as_str).collect::<Vec<_>>().join(",");
        let request = self
            .request(Method::GET, &format!("/artists/{}/albums", artist_id))
            .query(&[
                ("include_groups", groups),
                ("market", country.to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ]);

        let page: Paging<SimpleAlbum> = self.get_json("artist_albums", request).await?;
        let mut releases = Vec::with_capacity(page.items.len());
        for album in page.items {
            let Some(released_at) =
                parse_release_date(&album.release_date, album.release_date_precision.as_deref())
            else {
                tracing::warn!(
                    "Skipping album {} with unparseable release date {:?}",
                    album.id,
                    album.release_date
                );
                continue;
            };
            releases.push(Release {
                id: album.id,
                name: album.name,
                artist_ids: album.artists.into_iter().filter_map(|a| a.id).collect(),
                released_at,
            });
        }
        Ok(releases)
    }

    async fn album_tracks(&self, album_id: &str) -> Result<Vec<Track>> {
        let request = self
            .request(Method::GET, &format!("/albums/{}/tracks", album_id))
            .query(&[("limit", ALBUM_TRACKS_LIMIT)]);

        let page: Paging<SimpleTrack> = self.get_json("album_tracks", request).await?;
        Ok(page
            .items
            .into_iter()
            .filter_map(|t| {
                let id = t.id?;
                Some((id, t.name, t.artists))
            })
            .enumerate()
            .map(|(position, (id, name, artists))| Track {
                id,
                name,
                artist_names: artists.into_iter().map(|a| a.name).collect(),
                position: position as u32,
            })
            .collect())
    }

    async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<TrackId>> {
        let mut track_ids = Vec::new();
        let mut offset = 0;

        loop {
            let request = self
                .request(Method::GET, &format!("/playlists/{}/tracks", playlist_id))
                .query(&[
                    ("fields", "items(track(id)),next".to_string()),
                    ("limit", PLAYLIST_PAGE_SIZE.to_string()),
                    ("offset", offset.to_string()),
                ]);
            let page: Paging<PlaylistItem> = self.get_json("playlist_tracks", request).await?;

            let page_len = page.items.len() as u32;
            track_ids.extend(page.items.into_iter().filter_map(|i| i.track.and_then(|t| t.id)));

            if page.next.is_none() || page_len == 0 {
                break;
            }
            offset += page_len;
        }

        Ok(track_ids)
    }

    async fn remove_tracks(&self, playlist_id: &str, track_ids: &[TrackId]) -> Result<()> {
        for chunk in track_ids.chunks(REMOVE_CHUNK) {
            let tracks: Vec<_> = chunk.iter().map(|id| json!({ "uri": track_uri(id) })).collect();
            let request = self
                .request(Method::DELETE, &format!("/playlists/{}/tracks", playlist_id))
                .json(&json!({ "tracks": tracks }));
            self.send("remove_tracks", request).await?;
        }
        Ok(())
    }

    async fn replace_tracks(&self, playlist_id: &str, track_ids: &[TrackId]) -> Result<()> {
        let uris: Vec<_> = track_ids.iter().map(|id| track_uri(id)).collect();
        let request = self
            .request(Method::PUT, &format!("/playlists/{}/tracks", playlist_id))
            .json(&json!({ "uris": uris }));
        self.send("replace_tracks", request).await?;
        Ok(())
    }

    async fn add_tracks(&self, playlist_id: &str, track_ids: &[TrackId]) -> Result<()> {
        let uris: Vec<_> = track_ids.iter().map(|id| track_uri(id)).collect();
        let request = self
            .request(Method::POST, &format!("/playlists/{}/tracks", playlist_id))
            .json(&json!({ "uris": uris }));
        self.send("add_tracks", request).await?;
        Ok(())
    }

    async fn create_playlist(&self, user_id: &str, name: &str, description: &str) -> Result<String> {
        let request = self
            .request(Method::POST, &format!("/users/{}/playlists", user_id))
            .json(&json!({
                "name": name,
                "description": description,
                "public": true,
            }));
        let created: CreatedPlaylist = self.get_json("create_playlist", request).await?;
        tracing::info!("Created playlist {} for user {}", created.id, user_id);
        Ok(created.id)
    }

    async fn set_playlist_description(&self, playlist_id: &str, description: &str) -> Result<()> {
        let request = self
            .request(Method::PUT, &format!("/playlists/{}", playlist_id))
            .json(&json!({ "description": description }));
        self.send("set_playlist_description", request).await?;
        Ok(())
    }
}

/// Builds Spotify sessions from stored credentials. Refreshing expired tokens
/// is the login flow's job; an expired token is reported as an auth error.
pub struct SpotifySessions {
    client: Client,
    base_url: String,
}

impl SpotifySessions {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    fn session_for_token(&self, access_token: &str) -> SpotifyClient {
        SpotifyClient::new(self.client.clone(), self.base_url.clone(), access_token.to_string())
    }
}

#[async_trait::async_trait]
impl SessionFactory for SpotifySessions {
    async fn open(&self, user: &UserRecord) -> Result<Arc<dyn CatalogProvider>> {
        if user.credentials.is_expired(Utc::now()) {
            return Err(AppError::Auth(format!(
                "Access token for {} expired at {}",
                user.user_id, user.credentials.expiry
            )));
        }
        Ok(self.for_token(&user.credentials.access_token))
    }

    fn for_token(&self, access_token: &str) -> Arc<dyn CatalogProvider> {
        Arc::new(self.session_for_token(access_token))
    }
}
