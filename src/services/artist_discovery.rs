use crate::error::Result;
use crate::models::{ArtistRef, PlayedArtist};
use crate::services::pacer::Pacer;
use crate::services::provider::CatalogProvider;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Page size of the followed-artists endpoint.
const FOLLOWED_PAGE_SIZE: u32 = 50;
const RECENTLY_PLAYED_LIMIT: u32 = 50;

pub struct ArtistDiscovery {
    pacer: Arc<Pacer>,
}

impl ArtistDiscovery {
    pub fn new(pacer: Arc<Pacer>) -> Self {
        Self { pacer }
    }

    /// Every artist the user follows, in provider order.
    pub async fn followed_artists(&self, provider: &dyn CatalogProvider) -> Result<Vec<ArtistRef>> {
        let mut artists: Vec<ArtistRef> = Vec::new();

        loop {
            let after = artists.last().map(|a| a.id.clone());
            self.pacer.wait().await;
            let page = provider
                .followed_artists(after.as_deref(), FOLLOWED_PAGE_SIZE)
                .await?;

            let page_len = page.len();
            artists.extend(page);

            if page_len < FOLLOWED_PAGE_SIZE as usize {
                break;
            }
        }

        tracing::debug!("Discovered {} followed artists", artists.len());
        Ok(artists)
    }

    /// Artists behind the tracks played within `window` before `now`, with how
    /// often each appeared. Ordered by first appearance.
    pub async fn recently_played_artists(
        &self,
        provider: &dyn CatalogProvider,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<PlayedArtist>> {
        let since = chrono::Duration::from_std(window)
            .ok()
            .and_then(|window| now.checked_sub_signed(window))
            .ok_or_else(|| anyhow::anyhow!("Invalid recently played window: {:?}", window))?;

        self.pacer.wait().await;
        let items = provider
            .recently_played(since, RECENTLY_PLAYED_LIMIT)
            .await?;

        let mut order: Vec<String> = Vec::new();
        let mut seen: HashMap<String, (u32, DateTime<Utc>)> = HashMap::new();
        for item in &items {
            for artist_id in &item.artist_ids {
                let (count, last) = seen
                    .entry(artist_id.clone())
                    .or_insert((0, item.played_at));
                if *count == 0 {
                    order.push(artist_id.clone());
                }
                *count += 1;
                *last = (*last).max(item.played_at);
            }
        }

        let mut played = Vec::with_capacity(order.len());
        for artist_id in order {
            self.pacer.wait().await;
            let artist = provider.get_artist(&artist_id).await?;
            let (play_count, last_played_at) = seen[&artist_id];
            played.push(PlayedArtist {
                artist,
                play_count,
                last_played_at,
            });
        }

        Ok(played)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlayedItem;
    use crate::services::testing::{artist, Call, FailWith, FakeProvider};

    fn discovery() -> ArtistDiscovery {
        ArtistDiscovery::new(Arc::new(Pacer::unpaced()))
    }

    #[tokio::test]
    async fn test_followed_artists_walks_cursor_pages() {
        let provider = FakeProvider::new();
        for i in 0..120 {
            provider.follow(artist(&format!("a{}", i), &format!("Artist {}", i)));
        }

        let artists = discovery().followed_artists(&provider).await.unwrap();

        assert_eq!(artists.len(), 120);
        assert_eq!(artists[0].id, "a0");
        assert_eq!(artists[119].id, "a119");
        assert_eq!(
            provider.calls(),
            vec![
                Call::FollowedArtists { after: None },
                Call::FollowedArtists { after: Some("a49".into()) },
                Call::FollowedArtists { after: Some("a99".into()) },
            ]
        );
    }

    #[tokio::test]
    async fn test_exact_page_multiple_needs_one_empty_page() {
        let provider = FakeProvider::new();
        for i in 0..50 {
            provider.follow(artist(&format!("a{}", i), "A"));
        }

        let artists = discovery().followed_artists(&provider).await.unwrap();

        assert_eq!(artists.len(), 50);
        assert_eq!(provider.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_followed_artists_propagates_errors() {
        let provider = FakeProvider::new();
        provider.fail_when(|c| matches!(c, Call::FollowedArtists { .. }), FailWith::Auth);

        let err = discovery().followed_artists(&provider).await.unwrap_err();
        assert!(matches!(err, crate::error::AppError::Auth(_)));
    }

    #[tokio::test]
    async fn test_recently_played_counts_plays_per_artist() {
        let provider = FakeProvider::new();
        provider.know_artist(artist("a1", "One"));
        provider.know_artist(artist("a2", "Two"));
        let now = Utc::now();
        let played = |artists: &[&str], mins_ago: i64| PlayedItem {
            artist_ids: artists.iter().map(|a| a.to_string()).collect(),
            played_at: now - chrono::Duration::minutes(mins_ago),
        };
        provider.add_recent(played(&["a2"], 1));
        provider.add_recent(played(&["a1", "a2"], 2));
        provider.add_recent(played(&["a2"], 3));
        // outside the window
        provider.add_recent(played(&["a1"], 90));

        let artists = discovery()
            .recently_played_artists(&provider, Duration::from_secs(20 * 60), now)
            .await
            .unwrap();

        assert_eq!(artists.len(), 2);
        assert_eq!(artists[0].artist.id, "a2");
        assert_eq!(artists[0].play_count, 3);
        assert_eq!(artists[0].last_played_at, now - chrono::Duration::minutes(1));
        assert_eq!(artists[1].artist.id, "a1");
        assert_eq!(artists[1].play_count, 1);
        assert_eq!(artists[1].last_played_at, now - chrono::Duration::minutes(2));

        let lookups = provider
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::GetArtist(_)))
            .count();
        assert_eq!(lookups, 2);
    }
}
