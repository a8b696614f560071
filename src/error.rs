use crate::models::SyncStage;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Provider error during {operation}: {message}")]
    Provider { operation: String, message: String },

    /// The provider throttled us. Callers should back off and retry later.
    #[error("Rate limit exceeded (retry after {retry_after:?}s)")]
    RateLimitExceeded { retry_after: Option<u64> },

    #[error("Sync failed at {stage}: {source}")]
    SyncFailed {
        stage: SyncStage,
        #[source]
        source: Box<AppError>,
    },

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn provider(operation: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Provider {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Stage reported by a failed sync, if this error came out of the orchestrator.
    pub fn failed_stage(&self) -> Option<SyncStage> {
        match self {
            AppError::SyncFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(_) | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Provider { .. } => StatusCode::BAD_GATEWAY,
            AppError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::SyncFailed { source, .. } => source.status(),
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                json!({ "error": "Database error" })
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                json!({ "error": "Internal server error" })
            }
            AppError::SyncFailed { stage, source } => {
                tracing::warn!("Sync failed at {}: {}", stage, source);
                json!({ "error": source.to_string(), "stage": stage })
            }
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
