use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserPreferences {
    pub exclude_remix: bool,
    pub exclude_acoustic: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            exclude_remix: true,
            exclude_acoustic: true,
        }
    }
}

impl UserPreferences {
    /// Whether a track with this name is filtered out by the user's preferences.
    ///
    /// Matching is a plain substring check on the two literal capitalizations
    /// ("Remix"/"remix", "Acoustic"/"acoustic"); "REMIX" does not match.
    pub fn should_exclude(&self, track_name: &str) -> bool {
        let remix = self.exclude_remix
            && (track_name.contains("Remix") || track_name.contains("remix"));
        let acoustic = self.exclude_acoustic
            && (track_name.contains("Acoustic") || track_name.contains("acoustic"));
        remix || acoustic
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: String,
    pub expiry: DateTime<Utc>,
}

impl Credentials {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry <= now
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: String,
    pub playlist_id: String,
    pub preferences: UserPreferences,
    pub credentials: Credentials,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterUserRequest {
    #[validate(length(min = 1, max = 255))]
    pub user_id: String,
    #[validate(length(min = 1))]
    pub access_token: String,
    #[validate(length(min = 1, max = 32))]
    pub token_type: String,
    #[validate(length(min = 1))]
    pub refresh_token: String,
    pub expiry: DateTime<Utc>,
    /// Reuse an existing playlist instead of creating a new one.
    #[validate(length(min = 1, max = 255))]
    pub playlist_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePreferencesRequest {
    pub exclude_remix: Option<bool>,
    pub exclude_acoustic: Option<bool>,
}

impl UpdatePreferencesRequest {
    pub fn apply(&self, current: UserPreferences) -> UserPreferences {
        UserPreferences {
            exclude_remix: self.exclude_remix.unwrap_or(current.exclude_remix),
            exclude_acoustic: self.exclude_acoustic.unwrap_or(current.exclude_acoustic),
        }
    }
}
