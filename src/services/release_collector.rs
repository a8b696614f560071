use crate::error::{AppError, Result};
use crate::models::{AlbumType, ArtistRef, Release};
use crate::services::pacer::Pacer;
use crate::services::provider::CatalogProvider;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Largest page the artist-albums endpoint is asked for.
const ALBUM_PAGE_SIZE: u32 = 10;
const RELEASE_TYPES: [AlbumType; 2] = [AlbumType::Album, AlbumType::Single];

pub struct ReleaseCollector {
    pacer: Arc<Pacer>,
    albums_per_artist: u32,
}

impl ReleaseCollector {
    pub fn new(pacer: Arc<Pacer>, albums_per_artist: u32) -> Self {
        Self {
            pacer,
            albums_per_artist,
        }
    }

    /// Releases published strictly after `now - window_days`, in artist order
    /// and then catalog order. The first failing artist aborts the collection.
    pub async fn collect_releases(
        &self,
        provider: &dyn CatalogProvider,
        artists: &[ArtistRef],
        window_days: i64,
        country: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Release>> {
        let cutoff = Duration::try_days(window_days)
            .and_then(|window| now.checked_sub_signed(window))
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("Release window of {} days is out of range", window_days))
            })?;
        let mut releases = Vec::new();

        for artist in artists {
            let catalog = self.artist_catalog(provider, &artist.id, country).await?;
            let before = releases.len();
            releases.extend(catalog.into_iter().filter(|r| r.released_at > cutoff));

            if releases.len() > before {
                tracing::debug!(
                    "{} new release(s) from {} ({})",
                    releases.len() - before,
                    artist.name,
                    artist.id
                );
            }
        }

        tracing::info!(
            "Collected {} release(s) after {} from {} artist(s)",
            releases.len(),
            cutoff,
            artists.len()
        );
        Ok(releases)
    }

    /// Up to `albums_per_artist` of the artist's most recent albums and singles.
    async fn artist_catalog(
        &self,
        provider: &dyn CatalogProvider,
        artist_id: &str,
        country: &str,
    ) -> Result<Vec<Release>> {
        let mut catalog = Vec::new();
        let mut offset = 0;

        while offset < self.albums_per_artist {
            let limit = ALBUM_PAGE_SIZE.min(self.albums_per_artist - offset);
            self.pacer.wait().await;
            let page = provider
                .artist_albums(artist_id, country, limit, offset, &RELEASE_TYPES)
                .await?;

            let page_len = page.len() as u32;
            catalog.extend(page);
            if page_len < limit {
                break;
            }
            offset += limit;
        }

        Ok(catalog)
    }
}
