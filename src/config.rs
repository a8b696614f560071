use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Longest release window accepted from the environment (about ten years).
pub const MAX_WINDOW_DAYS: i64 = 3650;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub spotify_api_base: String,
    /// Bearer token required by the admin API.
    pub admin_token: String,
    pub server_host: String,
    pub server_port: u16,
    /// Allowed CORS origins (comma-separated). Use "*" for any origin (development only).
    pub cors_origins: Vec<String>,
    pub sync: SyncConfig,
    pub sync_interval: Duration,
    pub sync_concurrency: usize,
}

/// Knobs for a single sync cycle, passed explicitly into the orchestrator.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Releases older than this many days are ignored.
    pub window_days: i64,
    /// Spacing between successive catalog/playlist calls.
    pub call_interval: Duration,
    pub albums_per_artist: u32,
    pub playlist_name: String,
    pub playlist_description: String,
    pub recently_played_window: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            window_days: 7,
            call_interval: Duration::from_millis(500),
            albums_per_artist: 10,
            playlist_name: "New Releases".to_string(),
            playlist_description: "New releases from the artists you follow".to_string(),
            recently_played_window: Duration::from_secs(20 * 60),
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(1..=MAX_WINDOW_DAYS).contains(&self.window_days) {
            return Err(anyhow::anyhow!(
                "SYNC_WINDOW_DAYS must be between 1 and {}, got {}",
                MAX_WINDOW_DAYS,
                self.window_days
            ));
        }
        if self.albums_per_artist == 0 {
            return Err(anyhow::anyhow!("ALBUMS_PER_ARTIST must be positive"));
        }
        Ok(())
    }
}

/// Scheduler period for `hours`. Zero would make the ticker panic.
pub fn sync_interval(hours: u64) -> Result<Duration, anyhow::Error> {
    if hours == 0 {
        return Err(anyhow::anyhow!("SYNC_INTERVAL_HOURS must be at least 1"));
    }
    hours
        .checked_mul(3600)
        .map(Duration::from_secs)
        .ok_or_else(|| anyhow::anyhow!("SYNC_INTERVAL_HOURS is too large: {}", hours))
}

fn minutes(key: &str, count: u64) -> Result<Duration, anyhow::Error> {
    count
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| anyhow::anyhow!("{} is too large: {}", key, count))
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        // ADMIN_TOKEN is required - no insecure defaults
        let admin_token = env::var("ADMIN_TOKEN")
            .map_err(|_| anyhow::anyhow!("ADMIN_TOKEN environment variable must be set"))?;

        if admin_token.len() < 16 {
            return Err(anyhow::anyhow!(
                "ADMIN_TOKEN must be at least 16 characters long. \
                Generate one with: openssl rand -base64 32"
            ));
        }

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable must be set"))?;

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let defaults = SyncConfig::default();
        let sync = SyncConfig {
            window_days: parse_or("SYNC_WINDOW_DAYS", defaults.window_days),
            call_interval: Duration::from_millis(parse_or("CATALOG_CALL_INTERVAL_MS", 500)),
            albums_per_artist: parse_or("ALBUMS_PER_ARTIST", defaults.albums_per_artist),
            playlist_name: env::var("PLAYLIST_NAME").unwrap_or(defaults.playlist_name),
            playlist_description: env::var("PLAYLIST_DESCRIPTION")
                .unwrap_or(defaults.playlist_description),
            recently_played_window: minutes(
                "RECENTLY_PLAYED_MINUTES",
                parse_or("RECENTLY_PLAYED_MINUTES", 20),
            )?,
        };
        sync.validate()?;

        let interval = sync_interval(parse_or("SYNC_INTERVAL_HOURS", 168))?;

        Ok(Config {
            database_url,
            spotify_api_base: env::var("SPOTIFY_API_BASE")
                .unwrap_or_else(|_| "https://api.spotify.com/v1".to_string()),
            admin_token,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: parse_or("SERVER_PORT", 8000),
            cors_origins,
            sync,
            sync_interval: interval,
            sync_concurrency: parse_or::<usize>("SYNC_CONCURRENCY", 4).max(1),
        })
    }
}
