//! SQL builders for the `items` table.
//!
//! Every builder walks a fixed set of typed fields and emits bound
//! placeholders; user input never reaches the SQL text.

use sqlx::{Postgres, QueryBuilder};

use crate::db::models::{ItemChanges, ItemQuery};

pub const ITEM_COLUMNS: &str =
    "id, title, description, category, price, quantity, tags, status, created_at, updated_at";

/// The indexed document expression. Must match `idx_items_search`.
const SEARCH_DOCUMENT: &str =
    "to_tsvector('english', coalesce(title, '') || ' ' || coalesce(description, ''))";

// Characters with meaning in to_tsquery syntax.
const TSQUERY_OPERATORS: &[char] = &['\'', ':', '&', '|', '!', '(', ')', '\\', '*', '<', '>'];

/// Turns free text into a prefix-matching tsquery (`widg gad` -> `widg:* & gad:*`).
/// Returns `None` when nothing searchable is left after sanitising.
pub fn search_expression(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .map(|c| if TSQUERY_OPERATORS.contains(&c) { ' ' } else { c })
        .collect();

    let terms: Vec<String> = cleaned
        .split_whitespace()
        .map(|term| format!("{term}:*"))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" & "))
    }
}

/// Appends the WHERE clause for `query`. Nothing is pushed when no filter is set.
pub fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ItemQuery) {
    let mut has_condition = false;

    if let Some(expression) = query.q.as_deref().and_then(search_expression) {
        push_conjunction(builder, &mut has_condition);
        builder.push(SEARCH_DOCUMENT);
        builder.push(" @@ to_tsquery('english', ");
        builder.push_bind(expression);
        builder.push(")");
    }
    if let Some(status) = query.status {
        push_conjunction(builder, &mut has_condition);
        builder.push("status = ");
        builder.push_bind(status.as_str());
    }
    if let Some(category) = &query.category {
        push_conjunction(builder, &mut has_condition);
        builder.push("category = ");
        builder.push_bind(category.clone());
    }
}

fn push_conjunction(builder: &mut QueryBuilder<'_, Postgres>, has_condition: &mut bool) {
    builder.push(if *has_condition { " AND " } else { " WHERE " });
    *has_condition = true;
}

/// `SELECT COUNT(*)` over the filtered set, ignoring pagination.
pub fn count_query(query: &ItemQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM items");
    push_filters(&mut builder, query);
    builder
}

/// One page of the filtered set, newest first with `id` as tie-breaker.
pub fn page_query(query: &ItemQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {ITEM_COLUMNS} FROM items"));
    push_filters(&mut builder, query);
    builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
    builder.push_bind(i64::from(query.page_size));
    builder.push(" OFFSET ");
    builder.push_bind(query.offset());
    builder
}

/// `UPDATE ... RETURNING` touching only the supplied columns.
/// Returns `None` for an empty change set.
pub fn update_query(id: i32, changes: &ItemChanges) -> Option<QueryBuilder<'static, Postgres>> {
    if changes.is_empty() {
        return None;
    }

    let mut builder = QueryBuilder::new("UPDATE items SET ");
    let mut set = builder.separated(", ");
    if let Some(title) = &changes.title {
        set.push("title = ");
        set.push_bind_unseparated(title.clone());
    }
    if let Some(description) = &changes.description {
        set.push("description = ");
        set.push_bind_unseparated(description.clone());
    }
    if let Some(category) = &changes.category {
        set.push("category = ");
        set.push_bind_unseparated(category.clone());
    }
    if let Some(price) = changes.price {
        set.push("price = ");
        set.push_bind_unseparated(price);
    }
    if let Some(quantity) = changes.quantity {
        set.push("quantity = ");
        set.push_bind_unseparated(quantity);
    }
    if let Some(tags) = &changes.tags {
        set.push("tags = ");
        set.push_bind_unseparated(tags.clone());
    }
    if let Some(status) = changes.status {
        set.push("status = ");
        set.push_bind_unseparated(status.as_str());
    }
    set.push("updated_at = NOW()");

    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(format!(" RETURNING {ITEM_COLUMNS}"));
    Some(builder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::ItemStatus;
    use rust_decimal::Decimal;

    #[test]
    fn search_expression_appends_prefix_wildcard() {
        assert_eq!(search_expression("widg").as_deref(), Some("widg:*"));
        assert_eq!(search_expression("  widg   gad ").as_deref(), Some("widg:* & gad:*"));
    }

    #[test]
    fn search_expression_strips_quotes_and_colons() {
        assert_eq!(search_expression("it's").as_deref(), Some("it:* & s:*"));
        assert_eq!(search_expression("a:b").as_deref(), Some("a:* & b:*"));
        assert_eq!(search_expression("x & (y | !z)").as_deref(), Some("x:* & y:* & z:*"));
    }

    #[test]
    fn search_expression_without_terms_is_dropped() {
        assert_eq!(search_expression(""), None);
        assert_eq!(search_expression(" ' : "), None);
    }

    #[test]
    fn unfiltered_queries_have_no_where_clause() {
        let query = ItemQuery::default();
        assert_eq!(count_query(&query).sql(), "SELECT COUNT(*) FROM items");
        assert_eq!(
            page_query(&query).sql(),
            format!("SELECT {ITEM_COLUMNS} FROM items ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2")
        );
    }

    #[test]
    fn filters_are_conjunctive_and_positional() {
        let query = ItemQuery {
            q: Some("widg".into()),
            status: Some(ItemStatus::Inactive),
            category: Some("tools".into()),
            ..ItemQuery::default()
        };
        assert_eq!(
            count_query(&query).sql(),
            format!(
                "SELECT COUNT(*) FROM items WHERE {SEARCH_DOCUMENT} @@ to_tsquery('english', $1) \
                 AND status = $2 AND category = $3"
            )
        );
        assert!(page_query(&query)
            .sql()
            .ends_with("AND category = $3 ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"));
    }

    #[test]
    fn blank_search_does_not_add_a_filter() {
        let query = ItemQuery {
            q: Some(" :: ".into()),
            category: Some("tools".into()),
            ..ItemQuery::default()
        };
        assert_eq!(count_query(&query).sql(), "SELECT COUNT(*) FROM items WHERE category = $1");
    }

    #[test]
    fn empty_changes_build_no_update() {
        assert!(update_query(1, &ItemChanges::default()).is_none());
    }

    #[test]
    fn update_sets_only_supplied_fields() {
        let changes = ItemChanges {
            title: Some("Widget".into()),
            price: Some(Decimal::new(999, 2)),
            ..ItemChanges::default()
        };
        let builder = update_query(7, &changes).unwrap();
        assert_eq!(
            builder.sql(),
            format!(
                "UPDATE items SET title = $1, price = $2, updated_at = NOW() WHERE id = $3 RETURNING {ITEM_COLUMNS}"
            )
        );
    }

    #[test]
    fn update_can_clear_nullable_columns() {
        let changes = ItemChanges {
            description: Some(None),
            tags: Some(None),
            status: Some(ItemStatus::Inactive),
            ..ItemChanges::default()
        };
        let builder = update_query(7, &changes).unwrap();
        assert!(builder
            .sql()
            .starts_with("UPDATE items SET description = $1, tags = $2, status = $3, updated_at = NOW() WHERE id = $4"));
    }
}
