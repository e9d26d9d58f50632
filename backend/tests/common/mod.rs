#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use inventory_backend::db::models::{Item, ItemChanges, ItemPage, ItemQuery, NewItem};
use inventory_backend::db::services::ItemRepository;
use inventory_backend::server::config::{Environment, ServerConfig};
use inventory_backend::web::create_axum_router;
use serde_json::Value;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// In-process stand-in for the PostgreSQL repository. Search is a
/// case-insensitive word-prefix match over title and description.
#[derive(Default)]
pub struct MemoryItemRepository {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    next_id: i32,
    items: Vec<Item>,
}

fn words(item: &Item) -> Vec<String> {
    let text = format!("{} {}", item.title, item.description.as_deref().unwrap_or(""));
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn matches(item: &Item, query: &ItemQuery) -> bool {
    if let Some(status) = query.status {
        if item.status != status {
            return false;
        }
    }
    if let Some(category) = &query.category {
        if item.category.as_ref() != Some(category) {
            return false;
        }
    }
    if let Some(q) = &query.q {
        let words = words(item);
        let terms: Vec<String> = q
            .split_whitespace()
            .map(|t| t.chars().filter(|c| c.is_alphanumeric()).collect::<String>().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        return terms.iter().all(|term| words.iter().any(|w| w.starts_with(term.as_str())));
    }
    true
}

#[async_trait]
impl ItemRepository for MemoryItemRepository {
    async fn create(&self, item: NewItem) -> sqlx::Result<Item> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let now = Utc::now();
        let created = Item {
            id: state.next_id,
            title: item.title,
            description: item.description,
            category: item.category,
            price: item.price,
            quantity: item.quantity,
            tags: item.tags,
            status: item.status,
            created_at: now,
            updated_at: now,
        };
        state.items.push(created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: i32) -> sqlx::Result<Option<Item>> {
        let state = self.state.lock().unwrap();
        Ok(state.items.iter().find(|item| item.id == id).cloned())
    }

    async fn update(&self, id: i32, changes: ItemChanges) -> sqlx::Result<Option<Item>> {
        let mut state = self.state.lock().unwrap();
        let Some(item) = state.items.iter_mut().find(|item| item.id == id) else {
            return Ok(None);
        };
        if changes.is_empty() {
            return Ok(Some(item.clone()));
        }
        if let Some(title) = changes.title {
            item.title = title;
        }
        if let Some(description) = changes.description {
            item.description = description;
        }
        if let Some(category) = changes.category {
            item.category = category;
        }
        if let Some(price) = changes.price {
            item.price = price;
        }
        if let Some(quantity) = changes.quantity {
            item.quantity = quantity;
        }
        if let Some(tags) = changes.tags {
            item.tags = tags;
        }
        if let Some(status) = changes.status {
            item.status = status;
        }
        item.updated_at = Utc::now();
        Ok(Some(item.clone()))
    }

    async fn delete(&self, id: i32) -> sqlx::Result<bool> {
        let mut state = self.state.lock().unwrap();
        let before = state.items.len();
        state.items.retain(|item| item.id != id);
        Ok(state.items.len() < before)
    }

    async fn list(&self, query: &ItemQuery) -> sqlx::Result<ItemPage> {
        let state = self.state.lock().unwrap();
        let mut found: Vec<Item> = state.items.iter().filter(|i| matches(i, query)).cloned().collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = found.len() as i64;
        let items = found
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.page_size as usize)
            .collect();
        Ok(ItemPage { items, total, page: query.page, page_size: query.page_size })
    }
}

/// Repository whose every call fails as an exhausted pool would.
pub struct FailingItemRepository;

#[async_trait]
impl ItemRepository for FailingItemRepository {
    async fn create(&self, _item: NewItem) -> sqlx::Result<Item> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn get_by_id(&self, _id: i32) -> sqlx::Result<Option<Item>> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn update(&self, _id: i32, _changes: ItemChanges) -> sqlx::Result<Option<Item>> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn delete(&self, _id: i32) -> sqlx::Result<bool> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn list(&self, _query: &ItemQuery) -> sqlx::Result<ItemPage> {
        Err(sqlx::Error::PoolTimedOut)
    }
}

pub fn test_config(environment: Environment, cors_origin: &str) -> Arc<ServerConfig> {
    Arc::new(ServerConfig {
        environment,
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 4000,
        database_url: "postgres://localhost/inventory_test".to_string(),
        database_max_connections: 1,
        cors_origin: cors_origin.to_string(),
        log_dir: None,
    })
}

pub fn memory_app() -> Router {
    create_axum_router(
        Arc::new(MemoryItemRepository::default()),
        test_config(Environment::Test, "*"),
    )
}

pub fn failing_app(environment: Environment) -> Router {
    create_axum_router(Arc::new(FailingItemRepository), test_config(environment, "*"))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        if self.bytes.is_empty() {
            return Value::Null;
        }
        serde_json::from_slice(&self.bytes).expect("response body should be JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub async fn send_request(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.expect("body should be readable").to_bytes();
    TestResponse { status, headers, bytes }
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");
    send_request(app, request).await
}

pub async fn send_raw(app: &Router, method: Method, uri: &str, content_type: &str, body: impl Into<Body>) -> TestResponse {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type)
        .body(body.into())
        .expect("request should build");
    send_request(app, request).await
}

/// Creates an item through the API and returns its JSON representation.
pub async fn create_item(app: &Router, body: Value) -> Value {
    let response = send(app, Method::POST, "/api/items", Some(body)).await;
    assert_eq!(response.status, StatusCode::CREATED, "create failed: {}", response.text());
    response.json()
}
