use crate::config::SyncConfig;
use crate::error::{AppError, Result};
use crate::models::{SyncReport, SyncStage, SyncState, TrackId, UserPreferences};
use crate::services::artist_discovery::ArtistDiscovery;
use crate::services::pacer::Pacer;
use crate::services::playlist_rewriter::PlaylistRewriter;
use crate::services::provider::{CatalogProvider, SessionFactory};
use crate::services::release_collector::ReleaseCollector;
use crate::services::track_selector::TrackSelector;
use crate::services::user_store::UserStore;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Everything one sync invocation needs. Owned by that invocation only.
pub struct SyncContext {
    pub user_id: String,
    pub playlist_id: String,
    pub country: String,
    pub preferences: UserPreferences,
    pub session: Arc<dyn CatalogProvider>,
}

/// Tracks the linear stage progression of one run.
struct StageTracker {
    run_id: Uuid,
    user_id: String,
    state: SyncState,
}

impl StageTracker {
    fn new(user_id: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            state: SyncState::Started,
        }
    }

    fn pending(&self) -> SyncStage {
        // the tracker is only consulted while a stage is outstanding
        self.state.next_stage().unwrap_or(SyncStage::PlaylistRewritten)
    }

    fn reached(&mut self, stage: SyncStage) {
        tracing::debug!(run = %self.run_id, user = %self.user_id, "Sync stage reached: {:?}", stage);
        self.state = SyncState::Reached { stage };
    }

    /// Wrap `error` with the stage that was being attempted.
    fn fail(&mut self, error: AppError) -> AppError {
        let stage = self.pending();
        tracing::error!(run = %self.run_id, user = %self.user_id, "Sync failed at {}: {}", stage, error);
        self.state = SyncState::Failed {
            stage,
            error: error.to_string(),
        };
        AppError::SyncFailed {
            stage,
            source: Box::new(error),
        }
    }
}

pub struct SyncService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionFactory>,
    config: SyncConfig,
    pacer: Arc<Pacer>,
    discovery: ArtistDiscovery,
    collector: ReleaseCollector,
    selector: TrackSelector,
    rewriter: PlaylistRewriter,
}

impl SyncService {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionFactory>,
        pacer: Arc<Pacer>,
        config: SyncConfig,
    ) -> Self {
        Self {
            users,
            sessions,
            discovery: ArtistDiscovery::new(pacer.clone()),
            collector: ReleaseCollector::new(pacer.clone(), config.albums_per_artist),
            selector: TrackSelector::new(pacer.clone()),
            rewriter: PlaylistRewriter::new(pacer.clone()),
            pacer,
            config,
        }
    }

    pub fn discovery(&self) -> &ArtistDiscovery {
        &self.discovery
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Create the "New Releases" playlist on a freshly registered account.
    pub async fn provision_playlist(
        &self,
        session: &dyn CatalogProvider,
        user_id: &str,
    ) -> Result<String> {
        self.pacer.wait().await;
        let playlist_id = session
            .create_playlist(user_id, &self.config.playlist_name, &self.config.playlist_description)
            .await?;

        self.pacer.wait().await;
        session
            .set_playlist_description(&playlist_id, &self.config.playlist_description)
            .await?;

        tracing::info!("Created playlist {} for {}", playlist_id, user_id);
        Ok(playlist_id)
    }

    /// Run one sync cycle for `user_id`.
    ///
    /// Fails fast: the first error stops the pipeline and is returned as
    /// [`AppError::SyncFailed`] naming the stage that was being attempted.
    ///
    /// A cycle that selects no new tracks leaves a non-empty playlist as it
    /// is, so last cycle's releases stay listed until something newer arrives.
    pub async fn sync_user_playlist(&self, user_id: &str) -> Result<SyncReport> {
        let mut tracker = StageTracker::new(user_id);
        tracing::info!(run = %tracker.run_id, user = %user_id, "Starting playlist sync");

        let ctx = match self.authenticate(user_id).await {
            Ok(ctx) => ctx,
            Err(e) => return Err(tracker.fail(e)),
        };
        tracker.reached(SyncStage::Authenticated);

        match self.run_pipeline(&ctx, &mut tracker).await {
            Ok(report) => Ok(report),
            Err(e) => Err(tracker.fail(e)),
        }
    }

    async fn authenticate(&self, user_id: &str) -> Result<SyncContext> {
        let user = self.users.get_user(user_id).await?;
        let session = self.sessions.open(&user).await?;
        self.pacer.wait().await;
        let profile = session.current_user().await?;

        Ok(SyncContext {
            user_id: user.user_id,
            playlist_id: user.playlist_id,
            country: profile.country,
            preferences: user.preferences,
            session,
        })
    }

    async fn run_pipeline(&self, ctx: &SyncContext, tracker: &mut StageTracker) -> Result<SyncReport> {
        let provider = ctx.session.as_ref();

        let artists = self.discovery.followed_artists(provider).await?;
        tracker.reached(SyncStage::ArtistsDiscovered);

        let releases = self
            .collector
            .collect_releases(provider, &artists, self.config.window_days, &ctx.country, Utc::now())
            .await?;
        tracker.reached(SyncStage::ReleasesCollected);

        self.pacer.wait().await;
        let existing: Vec<TrackId> = provider.playlist_tracks(&ctx.playlist_id).await?;
        let existing_set: HashSet<TrackId> = existing.iter().cloned().collect();
        let added = self
            .selector
            .select_tracks(provider, &releases, &existing_set, ctx.preferences)
            .await?;
        tracker.reached(SyncStage::TracksSelected);

        // nothing new: keep last cycle's tracks rather than blanking the playlist
        let removed = if added.is_empty() && !existing.is_empty() {
            tracing::info!(
                user = %ctx.user_id,
                "No new tracks; leaving playlist {} untouched",
                ctx.playlist_id
            );
            0
        } else {
            self.rewriter
                .rewrite_playlist(provider, &ctx.playlist_id, &existing, &added)
                .await?
                .removed
        };
        tracker.reached(SyncStage::PlaylistRewritten);

        tracker.state = SyncState::Done;
        tracing::info!(
            run = %tracker.run_id,
            user = %ctx.user_id,
            "Sync done: {} artists, {} releases, {} tracks added",
            artists.len(),
            releases.len(),
            added.len()
        );

        Ok(SyncReport {
            user_id: ctx.user_id.clone(),
            playlist_id: ctx.playlist_id.clone(),
            artists: artists.len(),
            releases: releases.len(),
            removed,
            added,
            state: tracker.state.clone(),
        })
    }
}
