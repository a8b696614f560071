use crate::error::Result;
use crate::models::TrackId;
use crate::services::pacer::Pacer;
use crate::services::provider::{CatalogProvider, PLAYLIST_BATCH_LIMIT};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RewriteSummary {
    pub removed: usize,
    pub written: usize,
    pub batches: usize,
}

/// Split `track_ids` into write batches. The first batch replaces the
/// playlist contents and the rest are appended. An empty list still yields
/// one (empty) replace batch.
pub fn write_batches(track_ids: &[TrackId]) -> Vec<&[TrackId]> {
    if track_ids.is_empty() {
        return vec![track_ids];
    }
    track_ids.chunks(PLAYLIST_BATCH_LIMIT).collect()
}

pub struct PlaylistRewriter {
    pacer: Arc<Pacer>,
}

impl PlaylistRewriter {
    pub fn new(pacer: Arc<Pacer>) -> Self {
        Self { pacer }
    }

    /// Clear the playlist and write `new_track_ids` into it.
    ///
    /// Fails on the first failing call and leaves the playlist as that call
    /// left it; the next sync repairs it since contents are re-read each run.
    pub async fn rewrite_playlist(
        &self,
        provider: &dyn CatalogProvider,
        playlist_id: &str,
        existing_track_ids: &[TrackId],
        new_track_ids: &[TrackId],
    ) -> Result<RewriteSummary> {
        if !existing_track_ids.is_empty() {
            self.pacer.wait().await;
            provider.remove_tracks(playlist_id, existing_track_ids).await?;
            tracing::debug!(
                "Removed {} track(s) from playlist {}",
                existing_track_ids.len(),
                playlist_id
            );
        }

        let batches = write_batches(new_track_ids);
        for (i, batch) in batches.iter().enumerate() {
            self.pacer.wait().await;
            if i == 0 {
                provider.replace_tracks(playlist_id, batch).await?;
            } else {
                provider.add_tracks(playlist_id, batch).await?;
            }
        }

        tracing::info!(
            "Rewrote playlist {}: removed {}, wrote {} in {} batch(es)",
            playlist_id,
            existing_track_ids.len(),
            new_track_ids.len(),
            batches.len()
        );

        Ok(RewriteSummary {
            removed: existing_track_ids.len(),
            written: new_track_ids.len(),
            batches: batches.len(),
        })
    }
}
