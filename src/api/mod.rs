pub mod middleware;
pub mod users;

use crate::services::{SessionFactory, SyncService, UserStore};
use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

pub use users::user_routes;

pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionFactory>,
    pub sync: Arc<SyncService>,
    pub admin_token: String,
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", user_routes())
        .with_state(state)
}
