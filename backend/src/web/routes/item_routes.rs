use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, MethodRouter},
    Json, Router,
};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::db::models::{Item, ItemPage};
use crate::web::extract::{ItemId, ValidatedJson, ValidatedQuery};
use crate::web::models::item_models::{CreateItemBody, ListItemsParams, UpdateItemBody};
use crate::web::{AppError, AppState};

// --- Route Handlers ---

#[instrument(skip(app_state, query))]
async fn list_items_handler(
    State(app_state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<ListItemsParams>,
) -> Result<Json<ItemPage>, AppError> {
    let page = app_state.items.list(&query).await?;
    Ok(Json(page))
}

#[instrument(skip(app_state))]
async fn get_item_handler(
    State(app_state): State<Arc<AppState>>,
    ItemId(id): ItemId,
) -> Result<Json<Item>, AppError> {
    app_state
        .items
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(AppError::item_not_found)
}

#[instrument(skip(app_state, new_item))]
async fn create_item_handler(
    State(app_state): State<Arc<AppState>>,
    ValidatedJson(new_item): ValidatedJson<CreateItemBody>,
) -> Result<(StatusCode, Json<Item>), AppError> {
    let item = app_state.items.create(new_item).await?;
    info!(item_id = item.id, "Item created.");
    Ok((StatusCode::CREATED, Json(item)))
}

#[instrument(skip(app_state, changes))]
async fn update_item_handler(
    State(app_state): State<Arc<AppState>>,
    ItemId(id): ItemId,
    ValidatedJson(changes): ValidatedJson<UpdateItemBody>,
) -> Result<Json<Item>, AppError> {
    app_state
        .items
        .update(id, changes)
        .await?
        .map(Json)
        .ok_or_else(AppError::item_not_found)
}

#[instrument(skip(app_state))]
async fn delete_item_handler(
    State(app_state): State<Arc<AppState>>,
    ItemId(id): ItemId,
) -> Result<StatusCode, AppError> {
    if app_state.items.delete(id).await? {
        info!(item_id = id, "Item deleted.");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::item_not_found())
    }
}

// --- Router ---

fn collection_routes() -> MethodRouter<Arc<AppState>> {
    get(list_items_handler).post(create_item_handler)
}

/// Item routes with absolute paths. The collection answers with and without
/// a trailing slash.
pub fn create_items_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/items", collection_routes())
        .route("/api/items/", collection_routes())
        .route(
            "/api/items/{id}",
            get(get_item_handler)
                .put(update_item_handler)
                .delete(delete_item_handler),
        )
}
