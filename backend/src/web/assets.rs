use axum::{
    http::{header, Method, Uri},
    response::{IntoResponse, Response},
};
use rust_embed::{EmbeddedFile, RustEmbed};
use std::path::Path;

use crate::web::AppError;

const INDEX_HTML: &str = "index.html";

/// The browser client, compiled into the binary.
#[derive(RustEmbed, Clone)]
#[folder = "../frontend/dist"]
pub struct Assets;

fn not_found() -> Response {
    AppError::NotFound("Not Found".to_string()).into_response()
}

fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

fn asset_response(path: &str, file: EmbeddedFile) -> Response {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    (
        [(header::CONTENT_TYPE, mime.as_ref().to_string())],
        file.data.into_owned(),
    )
        .into_response()
}

/// Router fallback. Unknown API paths get a JSON 404; any other extensionless
/// GET is answered with `index.html` so the client can route it.
pub async fn static_fallback_handler(method: Method, uri: Uri) -> Response {
    if is_api_path(uri.path()) || !(method == Method::GET || method == Method::HEAD) {
        return not_found();
    }

    let path = match uri.path().trim_start_matches('/') {
        "" => INDEX_HTML,
        path => path,
    };

    if let Some(file) = Assets::get(path) {
        return asset_response(path, file);
    }
    if Path::new(path).extension().is_none() {
        if let Some(index) = Assets::get(INDEX_HTML) {
            return asset_response(INDEX_HTML, index);
        }
    }
    not_found()
}
