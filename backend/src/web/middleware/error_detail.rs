use axum::{
    body::Body as AxumBody,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::web::AppState;

/// Message of an internal failure, attached to 500 responses by `AppError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail(pub String);

/// Rewrites 500 bodies to carry the internal message when the environment
/// allows it. Production responses keep the generic body.
pub async fn expose_error_detail(
    State(state): State<Arc<AppState>>,
    req: Request<AxumBody>,
    next: Next,
) -> Response {
    let mut response = next.run(req).await;
    let Some(ErrorDetail(detail)) = response.extensions_mut().remove::<ErrorDetail>() else {
        return response;
    };
    if !state.config.environment.exposes_error_detail() {
        return response;
    }
    (response.status(), Json(serde_json::json!({ "error": detail }))).into_response()
}
