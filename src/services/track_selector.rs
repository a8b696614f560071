use crate::error::Result;
use crate::models::{Release, Track, TrackId, UserPreferences};
use crate::services::pacer::Pacer;
use crate::services::provider::CatalogProvider;
use std::collections::HashSet;
use std::sync::Arc;

/// Outcome of running one representative track through the filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    DuplicateId,
    AlreadyInPlaylist,
    DuplicateIdentifier,
    ExcludedByPreference,
}

/// Deduplication state for one selection run.
///
/// A track is admitted only if its raw id, its artist+title identifier and its
/// absence from the playlist's previous contents all test new.
pub struct TrackFilter<'a> {
    existing: &'a HashSet<TrackId>,
    preferences: UserPreferences,
    seen_ids: HashSet<TrackId>,
    seen_identifiers: HashSet<String>,
}

impl<'a> TrackFilter<'a> {
    pub fn new(existing: &'a HashSet<TrackId>, preferences: UserPreferences) -> Self {
        Self {
            existing,
            preferences,
            seen_ids: HashSet::new(),
            seen_identifiers: HashSet::new(),
        }
    }

    pub fn admit(&mut self, track: &Track) -> Admission {
        if !self.seen_ids.insert(track.id.clone()) {
            return Admission::DuplicateId;
        }
        if self.existing.contains(&track.id) {
            return Admission::AlreadyInPlaylist;
        }
        // recorded before the preference check: an excluded song still blocks its other editions
        if !self.seen_identifiers.insert(track.identifier()) {
            return Admission::DuplicateIdentifier;
        }
        if should_exclude(&self.preferences, &track.name) {
            return Admission::ExcludedByPreference;
        }
        Admission::Accepted
    }
}

pub fn should_exclude(preferences: &UserPreferences, track_name: &str) -> bool {
    preferences.should_exclude(track_name)
}

pub struct TrackSelector {
    pacer: Arc<Pacer>,
}

impl TrackSelector {
    pub fn new(pacer: Arc<Pacer>) -> Self {
        Self { pacer }
    }

    /// One track per release, deduplicated and filtered, in release order.
    pub async fn select_tracks(
        &self,
        provider: &dyn CatalogProvider,
        releases: &[Release],
        existing: &HashSet<TrackId>,
        preferences: UserPreferences,
    ) -> Result<Vec<TrackId>> {
        let mut filter = TrackFilter::new(existing, preferences);
        let mut selected = Vec::new();

        for release in releases {
            self.pacer.wait().await;
            let tracks = provider.album_tracks(&release.id).await?;

            let Some(track) = tracks.first() else {
                tracing::warn!("Release {} ({}) has no tracks, skipping", release.name, release.id);
                continue;
            };

            match filter.admit(track) {
                Admission::Accepted => selected.push(track.id.clone()),
                reason => tracing::debug!(
                    "Skipping '{}' by {} from {}: {:?}",
                    track.name,
                    track.primary_artist(),
                    release.id,
                    reason
                ),
            }
        }

        tracing::info!(
            "Selected {} track(s) from {} release(s)",
            selected.len(),
            releases.len()
        );
        Ok(selected)
    }
}
