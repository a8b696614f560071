pub mod artist_discovery;
pub mod pacer;
pub mod playlist_rewriter;
pub mod provider;
pub mod release_collector;
pub mod scheduler;
pub mod spotify;
pub mod sync_orchestrator;
pub mod track_selector;
pub mod user_store;

#[cfg(test)]
pub mod testing;

pub use pacer::Pacer;
pub use provider::{CatalogProvider, SessionFactory};
pub use scheduler::SyncScheduler;
pub use spotify::SpotifySessions;
pub use sync_orchestrator::SyncService;
pub use user_store::{PgUserStore, UserStore};
