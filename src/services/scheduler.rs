use crate::error::Result;
use crate::services::sync_orchestrator::SyncService;
use crate::services::user_store::UserStore;
use futures::{stream, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CycleOutcome {
    pub succeeded: usize,
    pub failed: usize,
}

/// Runs a sync cycle for every stored user on a fixed interval.
pub struct SyncScheduler {
    sync: Arc<SyncService>,
    users: Arc<dyn UserStore>,
    interval: Duration,
    concurrency: usize,
}

impl SyncScheduler {
    pub fn new(
        sync: Arc<SyncService>,
        users: Arc<dyn UserStore>,
        interval: Duration,
        concurrency: usize,
    ) -> Self {
        Self {
            sync,
            users,
            interval,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn run(self) {
        if self.interval.is_zero() {
            tracing::error!("Sync interval is zero; scheduled syncs are disabled");
            return;
        }
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.run_cycle().await {
                Ok(outcome) => tracing::info!(
                    "Sync cycle finished: {} succeeded, {} failed",
                    outcome.succeeded,
                    outcome.failed
                ),
                Err(e) => tracing::error!("Failed to start sync cycle: {:?}", e),
            }
        }
    }

    /// Sync every user once. Individual failures are logged and counted;
    /// only failing to list users aborts the cycle.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let users = self.users.list_users().await?;
        tracing::info!("Starting sync cycle for {} user(s)", users.len());

        let results: Vec<bool> = stream::iter(users)
            .map(|user| {
                let sync = self.sync.clone();
                async move {
                    match sync.sync_user_playlist(&user.user_id).await {
                        Ok(_) => true,
                        Err(e) => {
                            tracing::warn!(
                                stage = ?e.failed_stage(),
                                "Sync for user {} failed: {}",
                                user.user_id,
                                e
                            );
                            false
                        }
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let succeeded = results.iter().filter(|ok| **ok).count();
        Ok(CycleOutcome {
            succeeded,
            failed: results.len() - succeeded,
        })
    }
}
