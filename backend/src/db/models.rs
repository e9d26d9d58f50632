use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle status of an inventory item.
/// Stored as lowercase text in the `items.status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Active,
    Inactive,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 2] = [ItemStatus::Active, ItemStatus::Inactive];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Active => "active",
            ItemStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown item status '{0}'")]
pub struct UnknownItemStatus(pub String);

impl FromStr for ItemStatus {
    type Err = UnknownItemStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownItemStatus(s.to_string()))
    }
}

impl TryFrom<String> for ItemStatus {
    type Error = UnknownItemStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// An inventory item.
/// Corresponds to the `items` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Item {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Decimal, // NUMERIC(10,2), serialized as a string ("9.99")
    pub quantity: i32,
    pub tags: Option<Vec<String>>,
    #[sqlx(try_from = "String")]
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated values for inserting a new item. Defaults are already applied.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub tags: Option<Vec<String>>,
    pub status: ItemStatus,
}

/// A partial update. `None` leaves the column untouched; for the nullable
/// columns `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
    pub tags: Option<Option<Vec<String>>>,
    pub status: Option<ItemStatus>,
}

impl ItemChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.price.is_none()
            && self.quantity.is_none()
            && self.tags.is_none()
            && self.status.is_none()
    }
}

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Filter and pagination parameters for listing items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    pub q: Option<String>,
    pub page: u32,
    pub page_size: u32,
    pub status: Option<ItemStatus>,
    pub category: Option<String>,
}

impl Default for ItemQuery {
    fn default() -> Self {
        Self {
            q: None,
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            status: None,
            category: None,
        }
    }
}

impl ItemQuery {
    /// Number of rows to skip for the requested page.
    pub fn offset(&self) -> i64 {
        (i64::from(self.page.max(1)) - 1) * i64::from(self.page_size)
    }
}

/// Pagination envelope returned by the list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPage {
    pub items: Vec<Item>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}
