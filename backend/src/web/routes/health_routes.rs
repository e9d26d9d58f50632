use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::web::AppState;

async fn health_check_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn create_health_router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check_handler))
}
