use crate::error::{AppError, Result};
use crate::models::{Credentials, UserPreferences, UserRecord};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

/// Persistence for user records. The sync engine only reads; the admin API
/// registers users and edits preferences.
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<UserRecord>;

    async fn find_user(&self, user_id: &str) -> Result<Option<UserRecord>>;

    async fn list_users(&self) -> Result<Vec<UserRecord>>;

    /// Insert a user or refresh the stored credentials of an existing one.
    /// Preferences of an existing user are left untouched.
    async fn upsert_user(
        &self,
        user_id: &str,
        playlist_id: &str,
        credentials: &Credentials,
    ) -> Result<UserRecord>;

    async fn update_preferences(
        &self,
        user_id: &str,
        preferences: UserPreferences,
    ) -> Result<UserRecord>;
}

#[derive(Debug, FromRow)]
struct UserRow {
    user_id: String,
    access_token: String,
    token_type: String,
    refresh_token: String,
    expiry: DateTime<Utc>,
    playlist_id: String,
    exclude_remix: bool,
    exclude_acoustic: bool,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        UserRecord {
            user_id: row.user_id,
            playlist_id: row.playlist_id,
            preferences: UserPreferences {
                exclude_remix: row.exclude_remix,
                exclude_acoustic: row.exclude_acoustic,
            },
            credentials: Credentials {
                access_token: row.access_token,
                token_type: row.token_type,
                refresh_token: row.refresh_token,
                expiry: row.expiry,
            },
        }
    }
}

const USER_COLUMNS: &str = "user_id, access_token, token_type, refresh_token, expiry, \
                            playlist_id, exclude_remix, exclude_acoustic";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl UserStore for PgUserStore {
    async fn get_user(&self, user_id: &str) -> Result<UserRecord> {
        self.find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    async fn find_user(&self, user_id: &str) -> Result<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(UserRecord::from))
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY user_id"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(UserRecord::from).collect())
    }

    async fn upsert_user(
        &self,
        user_id: &str,
        playlist_id: &str,
        credentials: &Credentials,
    ) -> Result<UserRecord> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (user_id, access_token, token_type, refresh_token, expiry, playlist_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                token_type = EXCLUDED.token_type,
                refresh_token = EXCLUDED.refresh_token,
                expiry = EXCLUDED.expiry,
                playlist_id = EXCLUDED.playlist_id,
                updated_at = NOW()
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&credentials.access_token)
        .bind(&credentials.token_type)
        .bind(&credentials.refresh_token)
        .bind(credentials.expiry)
        .bind(playlist_id)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    async fn update_preferences(
        &self,
        user_id: &str,
        preferences: UserPreferences,
    ) -> Result<UserRecord> {
        sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET exclude_remix = $2, exclude_acoustic = $3, updated_at = NOW()
             WHERE user_id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(preferences.exclude_remix)
        .bind(preferences.exclude_acoustic)
        .fetch_optional(&self.db)
        .await?
        .map(UserRecord::from)
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }
}
