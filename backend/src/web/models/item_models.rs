use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::borrow::Cow;
use std::str::FromStr;
use validator::{Validate, ValidationError};

use crate::db::models::{
    ItemChanges, ItemQuery, ItemStatus, NewItem, DEFAULT_PAGE, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
use crate::web::error::FieldErrors;
use crate::web::extract::IntoValidated;

const TITLE_REQUIRED: &str = "Title is required";
const TITLE_TYPE: &str = "Title must be a string";
const DESCRIPTION_TYPE: &str = "Description must be a string";
const CATEGORY_TYPE: &str = "Category must be a string";
const PRICE_REQUIRED: &str = "Price is required";
const PRICE_TYPE: &str = "Price must be a number";
const PRICE_NEGATIVE: &str = "Price must be >= 0";
const PRICE_TOO_LARGE: &str = "Price must be at most 99999999.99";
const QUANTITY_INVALID: &str = "Quantity must be a non-negative integer";
const TAGS_TYPE: &str = "Tags must be a list of strings";
const TOO_MANY_TAGS: &str = "At most 50 tags are allowed";
const TAG_LENGTH: &str = "Each tag must be between 1 and 50 characters";
const PAGE_INVALID: &str = "Page must be an integer >= 1";
const PAGE_SIZE_INVALID: &str = "Page size must be an integer between 1 and 100";
const STATUS_INVALID: &str = "Status must be one of: active, inactive";

const MAX_TAGS: usize = 50;
const MAX_TAG_CHARS: usize = 50;

// --- Request/Response Structs ---

/// Item fields as they arrive on the wire. Values stay untyped until
/// conversion so a wrongly typed field is reported under its own key.
/// `None` is an absent key, `Some(Value::Null)` an explicit `null`.
#[derive(Debug, Default, Deserialize)]
pub struct ItemBody {
    #[serde(default, deserialize_with = "present")]
    title: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    description: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    category: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    price: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    quantity: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    tags: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    status: Option<Value>,
}

/// Body of `POST /api/items`.
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct CreateItemBody(ItemBody);

/// Body of `PUT /api/items/{id}`. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct UpdateItemBody(ItemBody);

/// Typed create request; `null` counts as absent.
#[derive(Debug, Default, Validate)]
pub struct CreateItemRequest {
    #[validate(
        required(message = "Title is required"),
        length(min = 1, max = 255, message = "Title must be between 1 and 255 characters")
    )]
    pub title: Option<String>,
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,
    #[validate(length(max = 100, message = "Category must be at most 100 characters"))]
    pub category: Option<String>,
    #[validate(required(message = "Price is required"), custom = "validate_price")]
    pub price: Option<Decimal>,
    #[validate(range(min = 0, message = "Quantity must be a non-negative integer"))]
    pub quantity: Option<i32>,
    #[validate(custom = "validate_tags")]
    pub tags: Option<Vec<String>>,
    pub status: Option<ItemStatus>,
}

/// Typed update request. `Some(None)` clears a nullable column.
#[derive(Debug, Default, Validate)]
pub struct UpdateItemRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<Option<String>>,
    #[validate(length(max = 100, message = "Category must be at most 100 characters"))]
    pub category: Option<Option<String>>,
    #[validate(custom = "validate_price")]
    pub price: Option<Decimal>,
    #[validate(range(min = 0, message = "Quantity must be a non-negative integer"))]
    pub quantity: Option<i32>,
    #[validate(custom = "validate_tags")]
    pub tags: Option<Option<Vec<String>>>,
    pub status: Option<ItemStatus>,
}

/// Raw query string of `GET /api/items`. Everything arrives as text so that
/// malformed numbers surface as field errors.
#[derive(Debug, Default, Deserialize)]
pub struct ListItemsParams {
    pub q: Option<String>,
    pub page: Option<String>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
}

// --- Validation ---

fn rule_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

/// Rounds to the two fractional digits stored by the `price` column.
fn normalize_price(price: Decimal) -> Decimal {
    let mut rounded = price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

fn max_price() -> Decimal {
    Decimal::new(9_999_999_999, 2)
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(rule_error("range", PRICE_NEGATIVE));
    }
    if normalize_price(*price) > max_price() {
        return Err(rule_error("range", PRICE_TOO_LARGE));
    }
    Ok(())
}

fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    if tags.len() > MAX_TAGS {
        return Err(rule_error("length", TOO_MANY_TAGS));
    }
    if tags
        .iter()
        .any(|tag| tag.is_empty() || tag.chars().count() > MAX_TAG_CHARS)
    {
        return Err(rule_error("length", TAG_LENGTH));
    }
    Ok(())
}

// --- Deserialization helpers ---

/// Keeps an explicit `null` as `Some(Value::Null)`; absence is handled by
/// `#[serde(default)]`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

// --- Coercion ---

fn text(message: &'static str) -> impl FnOnce(Value) -> Result<String, &'static str> {
    move |value| match value {
        Value::String(text) => Ok(text),
        _ => Err(message),
    }
}

/// Accepts a JSON number or a numeric string.
fn price(value: Value) -> Result<Decimal, &'static str> {
    let raw = match value {
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.trim().to_string(),
        _ => return Err(PRICE_TYPE),
    };
    if raw.is_empty() {
        return Err(PRICE_TYPE);
    }
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(|_| match raw.parse::<f64>() {
            Ok(parsed) if parsed.is_finite() && parsed < 0.0 => PRICE_NEGATIVE,
            Ok(parsed) if parsed.is_finite() => PRICE_TOO_LARGE,
            _ => PRICE_TYPE,
        })
}

/// Accepts a JSON integer (including `3.0`) or an integer string. Range is
/// checked by the request's `range` rule.
fn quantity(value: Value) -> Result<i32, &'static str> {
    let parsed = match &value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() <= i32::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed
        .and_then(|n| i32::try_from(n).ok())
        .ok_or(QUANTITY_INVALID)
}

fn tags(value: Value) -> Result<Vec<String>, &'static str> {
    match value {
        Value::Array(entries) => entries
            .into_iter()
            .map(|entry| match entry {
                Value::String(tag) => Ok(tag),
                _ => Err(TAGS_TYPE),
            })
            .collect(),
        _ => Err(TAGS_TYPE),
    }
}

fn status(value: Value) -> Result<ItemStatus, &'static str> {
    match value {
        Value::String(text) => text.parse().map_err(|_| STATUS_INVALID),
        _ => Err(STATUS_INVALID),
    }
}

/// Converts a supplied value, recording a failure under `key`.
fn field<T>(
    errors: &mut FieldErrors,
    key: &'static str,
    raw: Option<Value>,
    convert: impl FnOnce(Value) -> Result<T, &'static str>,
) -> Option<T> {
    match convert(raw?) {
        Ok(value) => Some(value),
        Err(message) => {
            errors.insert(key, message);
            None
        }
    }
}

/// Like [`field`], but an explicit `null` becomes `Some(None)`.
fn nullable_field<T>(
    errors: &mut FieldErrors,
    key: &'static str,
    raw: Option<Value>,
    convert: impl FnOnce(Value) -> Result<T, &'static str>,
) -> Option<Option<T>> {
    match raw? {
        Value::Null => Some(None),
        value => field(errors, key, Some(value), convert).map(Some),
    }
}

fn non_null(raw: Option<Value>) -> Option<Value> {
    raw.filter(|value| !value.is_null())
}

impl CreateItemRequest {
    fn from_body(body: ItemBody, errors: &mut FieldErrors) -> Self {
        Self {
            title: field(errors, "title", non_null(body.title), text(TITLE_TYPE)),
            description: field(errors, "description", non_null(body.description), text(DESCRIPTION_TYPE)),
            category: field(errors, "category", non_null(body.category), text(CATEGORY_TYPE)),
            price: field(errors, "price", non_null(body.price), price),
            quantity: field(errors, "quantity", non_null(body.quantity), quantity),
            tags: field(errors, "tags", non_null(body.tags), tags),
            status: field(errors, "status", non_null(body.status), status),
        }
    }
}

impl UpdateItemRequest {
    /// `null` for a non-nullable column fails that column's type check.
    fn from_body(body: ItemBody, errors: &mut FieldErrors) -> Self {
        Self {
            title: field(errors, "title", body.title, text(TITLE_TYPE)),
            description: nullable_field(errors, "description", body.description, text(DESCRIPTION_TYPE)),
            category: nullable_field(errors, "category", body.category, text(CATEGORY_TYPE)),
            price: field(errors, "price", body.price, price),
            quantity: field(errors, "quantity", body.quantity, quantity),
            tags: nullable_field(errors, "tags", body.tags, tags),
            status: field(errors, "status", body.status, status),
        }
    }
}

// --- Conversions ---

/// Runs the declarative rules after the type checks. Type errors win when a
/// field has both.
fn check(request: &impl Validate, mut errors: FieldErrors) -> Result<(), FieldErrors> {
    if let Err(rules) = request.validate() {
        errors.merge(FieldErrors::from(rules));
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

impl IntoValidated for CreateItemBody {
    type Output = NewItem;

    fn into_validated(self) -> Result<NewItem, FieldErrors> {
        let mut errors = FieldErrors::default();
        let request = CreateItemRequest::from_body(self.0, &mut errors);
        check(&request, errors)?;
        let title = request.title.ok_or_else(|| FieldErrors::single("title", TITLE_REQUIRED))?;
        let price = request.price.ok_or_else(|| FieldErrors::single("price", PRICE_REQUIRED))?;

        Ok(NewItem {
            title,
            description: request.description,
            category: request.category,
            price: normalize_price(price),
            quantity: request.quantity.unwrap_or(0),
            tags: request.tags,
            status: request.status.unwrap_or_default(),
        })
    }
}

impl IntoValidated for UpdateItemBody {
    type Output = ItemChanges;

    fn into_validated(self) -> Result<ItemChanges, FieldErrors> {
        let mut errors = FieldErrors::default();
        let request = UpdateItemRequest::from_body(self.0, &mut errors);
        check(&request, errors)?;
        Ok(ItemChanges {
            title: request.title,
            description: request.description,
            category: request.category,
            price: request.price.map(normalize_price),
            quantity: request.quantity,
            tags: request.tags,
            status: request.status,
        })
    }
}

/// Empty strings count as "not supplied".
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_bounded(raw: Option<String>, default: u32, max: u32) -> Result<u32, ()> {
    match raw {
        None => Ok(default),
        Some(text) => match text.trim().parse::<u32>() {
            Ok(value) if (1..=max).contains(&value) => Ok(value),
            _ => Err(()),
        },
    }
}

impl IntoValidated for ListItemsParams {
    type Output = ItemQuery;

    fn into_validated(self) -> Result<ItemQuery, FieldErrors> {
        let mut errors = FieldErrors::default();

        let page = parse_bounded(self.page, DEFAULT_PAGE, u32::MAX).unwrap_or_else(|_| {
            errors.insert("page", PAGE_INVALID);
            DEFAULT_PAGE
        });
        let page_size =
            parse_bounded(self.page_size, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE).unwrap_or_else(|_| {
                errors.insert("pageSize", PAGE_SIZE_INVALID);
                DEFAULT_PAGE_SIZE
            });
        let status = match non_empty(self.status) {
            None => None,
            Some(raw) => match raw.trim().parse::<ItemStatus>() {
                Ok(status) => Some(status),
                Err(_) => {
                    errors.insert("status", STATUS_INVALID);
                    None
                }
            },
        };

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(ItemQuery {
            q: non_empty(self.q),
            page,
            page_size,
            status,
            category: non_empty(self.category),
        })
    }
}
