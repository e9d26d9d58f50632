use async_trait::async_trait;
use sqlx::{PgPool, Result};
use tracing::{debug, instrument};

use super::item_query::{self, ITEM_COLUMNS};
use crate::db::models::{Item, ItemChanges, ItemPage, ItemQuery, NewItem};

/// Storage operations for inventory items.
///
/// Absent rows are reported as `None` / `false`, never as errors; an `Err`
/// always means the store itself failed.
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Inserts a row and returns it with its generated id and timestamps.
    async fn create(&self, item: NewItem) -> Result<Item>;

    async fn get_by_id(&self, id: i32) -> Result<Option<Item>>;

    /// Applies a partial update. An empty change set reads the current row.
    async fn update(&self, id: i32, changes: ItemChanges) -> Result<Option<Item>>;

    /// Hard delete. Returns whether a row was removed.
    async fn delete(&self, id: i32) -> Result<bool>;

    /// Counts and fetches one page of matching rows. The two statements run
    /// independently, so `total` may lag a concurrent write.
    async fn list(&self, query: &ItemQuery) -> Result<ItemPage>;
}

/// PostgreSQL-backed [`ItemRepository`].
#[derive(Clone)]
pub struct PgItemRepository {
    db_pool: PgPool,
}

impl PgItemRepository {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl ItemRepository for PgItemRepository {
    #[instrument(skip(self, item), fields(title = %item.title))]
    async fn create(&self, item: NewItem) -> Result<Item> {
        let sql = format!(
            r#"
            INSERT INTO items (title, description, category, price, quantity, tags, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ITEM_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, Item>(&sql)
            .bind(item.title)
            .bind(item.description)
            .bind(item.category)
            .bind(item.price)
            .bind(item.quantity)
            .bind(item.tags)
            .bind(item.status.as_str())
            .fetch_one(&self.db_pool)
            .await?;
        debug!(item_id = created.id, "Item created.");
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: i32) -> Result<Option<Item>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1");
        sqlx::query_as::<_, Item>(&sql)
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, id: i32, changes: ItemChanges) -> Result<Option<Item>> {
        let Some(mut builder) = item_query::update_query(id, &changes) else {
            debug!("Empty change set; returning the current row.");
            return self.get_by_id(id).await;
        };
        builder
            .build_query_as::<Item>()
            .fetch_optional(&self.db_pool)
            .await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> Result<bool> {
        let rows_affected = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?
            .rows_affected();
        Ok(rows_affected > 0)
    }

    #[instrument(skip(self, query), fields(page = query.page, page_size = query.page_size))]
    async fn list(&self, query: &ItemQuery) -> Result<ItemPage> {
        let total: i64 = item_query::count_query(query)
            .build_query_scalar::<i64>()
            .fetch_one(&self.db_pool)
            .await?;

        let items = item_query::page_query(query)
            .build_query_as::<Item>()
            .fetch_all(&self.db_pool)
            .await?;

        debug!(total, returned = items.len(), "Listed items.");
        Ok(ItemPage {
            items,
            total,
            page: query.page,
            page_size: query.page_size,
        })
    }
}
