use crate::api::AppState;
use crate::error::AppError;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;

/// Admin-only routes require `Authorization: Bearer <ADMIN_TOKEN>`.
pub struct RequireAdmin;

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized)?;

        if token.as_bytes() != state.admin_token.as_bytes() {
            tracing::warn!("Rejected admin request with invalid token");
            return Err(AppError::Unauthorized);
        }

        Ok(RequireAdmin)
    }
}
