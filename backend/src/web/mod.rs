use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::db::services::ItemRepository;
use crate::server::config::ServerConfig;
use crate::web::middleware::error_detail;
use crate::web::routes::{health_routes, item_routes};

pub use crate::web::error::AppError;

pub mod assets;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;

/// Largest accepted request body.
pub const BODY_LIMIT_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub items: Arc<dyn ItemRepository>,
    pub config: Arc<ServerConfig>,
}

const CORS_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

/// `*` allows any origin without credentials; an explicit list enables them.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins = config.cors_origins();
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(CORS_METHODS)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "Skipping CORS origin that is not a valid header value.");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(CORS_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .allow_credentials(true)
}

fn security_header(name: HeaderName, value: &'static str) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::if_not_present(name, HeaderValue::from_static(value))
}

pub fn create_axum_router(items: Arc<dyn ItemRepository>, config: Arc<ServerConfig>) -> Router {
    let cors = build_cors_layer(&config);
    let app_state = Arc::new(AppState { items, config });

    Router::new()
        .merge(health_routes::create_health_router())
        .merge(item_routes::create_items_router())
        .fallback(assets::static_fallback_handler)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            error_detail::expose_error_detail,
        ))
        .with_state(app_state)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(security_header(header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .layer(security_header(header::X_FRAME_OPTIONS, "DENY"))
        .layer(security_header(header::REFERRER_POLICY, "no-referrer"))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
