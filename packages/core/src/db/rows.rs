//! Row decoding
//!
//! Column lists and `libsql::Row` → model conversions shared by every query.
//! Decoders take a column offset so joined selects can decode several models
//! from one row.

use crate::db::DatabaseError;
use crate::models::{PageContent, PageNode, Space};
use chrono::{DateTime, Utc};
use libsql::Row;

pub const SPACE_COLUMNS: [&str; 13] = [
    "id",
    "name",
    "space_key",
    "default_lang",
    "fallback_lang",
    "homepage_id",
    "description",
    "avatar",
    "status",
    "creator_id",
    "created_at",
    "updated_at",
    "multilingual",
];

pub const NODE_COLUMNS: [&str; 7] = [
    "id",
    "parent_id",
    "space_id",
    "lft",
    "rgt",
    "depth",
    "children_count",
];

pub const CONTENT_COLUMNS: [&str; 14] = [
    "id",
    "page_id",
    "space_id",
    "creator_id",
    "lang",
    "version",
    "status",
    "title",
    "short_title",
    "body",
    "html",
    "created_at",
    "updated_at",
    "deleted_at",
];

/// Comma-separated column list, each qualified with `alias.`
///
/// ```rust
/// # use docspace_core::db::rows::{select_list, NODE_COLUMNS};
/// assert!(select_list("n", &NODE_COLUMNS).starts_with("n.id, n.parent_id"));
/// ```
pub fn select_list(alias: &str, columns: &[&str]) -> String {
    columns
        .iter()
        .map(|column| format!("{}.{}", alias, column))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Current time as stored in the database (unix seconds)
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}

fn timestamp(value: i64, column: &'static str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::from_timestamp(value, 0)
        .ok_or_else(|| DatabaseError::row_decode(column, format!("invalid timestamp {}", value)))
}

macro_rules! column {
    ($row:expr, $idx:expr, $name:literal) => {
        $row.get($idx)
            .map_err(|e| DatabaseError::row_decode($name, e))?
    };
}

/// Decode a space from `SPACE_COLUMNS` starting at `offset`
pub fn space_at(row: &Row, offset: i32) -> Result<Space, DatabaseError> {
    let status: String = column!(row, offset + 8, "status");

    Ok(Space {
        id: column!(row, offset, "id"),
        name: column!(row, offset + 1, "name"),
        key: column!(row, offset + 2, "space_key"),
        default_lang: column!(row, offset + 3, "default_lang"),
        fallback_lang: column!(row, offset + 4, "fallback_lang"),
        homepage_id: column!(row, offset + 5, "homepage_id"),
        description: column!(row, offset + 6, "description"),
        avatar: column!(row, offset + 7, "avatar"),
        status: status
            .parse()
            .map_err(|e| DatabaseError::row_decode("status", e))?,
        creator_id: column!(row, offset + 9, "creator_id"),
        created_at: timestamp(column!(row, offset + 10, "created_at"), "created_at")?,
        updated_at: timestamp(column!(row, offset + 11, "updated_at"), "updated_at")?,
        multilingual: {
            let flag: i64 = column!(row, offset + 12, "multilingual");
            flag != 0
        },
        homepage: None,
    })
}

/// Decode a page node from `NODE_COLUMNS` starting at `offset`
pub fn node_at(row: &Row, offset: i32) -> Result<PageNode, DatabaseError> {
    Ok(PageNode {
        id: column!(row, offset, "id"),
        parent_id: column!(row, offset + 1, "parent_id"),
        space_id: column!(row, offset + 2, "space_id"),
        lft: column!(row, offset + 3, "lft"),
        rgt: column!(row, offset + 4, "rgt"),
        depth: column!(row, offset + 5, "depth"),
        children_count: column!(row, offset + 6, "children_count"),
    })
}

/// Decode a content row from `CONTENT_COLUMNS` starting at `offset`
pub fn content_at(row: &Row, offset: i32) -> Result<PageContent, DatabaseError> {
    let status: String = column!(row, offset + 6, "status");
    let deleted_at: i64 = column!(row, offset + 13, "deleted_at");

    Ok(PageContent {
        id: column!(row, offset, "id"),
        page_id: column!(row, offset + 1, "page_id"),
        space_id: column!(row, offset + 2, "space_id"),
        creator_id: column!(row, offset + 3, "creator_id"),
        lang: column!(row, offset + 4, "lang"),
        version: column!(row, offset + 5, "version"),
        status: status
            .parse()
            .map_err(|e| DatabaseError::row_decode("status", e))?,
        title: column!(row, offset + 7, "title"),
        short_title: column!(row, offset + 8, "short_title"),
        body: column!(row, offset + 9, "body"),
        html: column!(row, offset + 10, "html"),
        created_at: timestamp(column!(row, offset + 11, "created_at"), "created_at")?,
        updated_at: timestamp(column!(row, offset + 12, "updated_at"), "updated_at")?,
        deleted_at: match deleted_at {
            0 => None,
            ts => Some(timestamp(ts, "deleted_at")?),
        },
    })
}

/// Drain `rows`, decoding each with `decode`
pub async fn collect<T>(
    mut rows: libsql::Rows,
    decode: impl Fn(&Row) -> Result<T, DatabaseError>,
) -> Result<Vec<T>, DatabaseError> {
    let mut items = Vec::new();
    while let Some(row) = rows
        .next()
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to read row: {}", e)))?
    {
        items.push(decode(&row)?);
    }
    Ok(items)
}

/// First row of `rows`, decoded with `decode`
pub async fn first<T>(
    mut rows: libsql::Rows,
    decode: impl Fn(&Row) -> Result<T, DatabaseError>,
) -> Result<Option<T>, DatabaseError> {
    match rows
        .next()
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to read row: {}", e)))?
    {
        Some(row) => Ok(Some(decode(&row)?)),
        None => Ok(None),
    }
}

/// Single integer result (`COUNT(*)`, `MAX(..)`); `NULL` reads as 0
pub async fn scalar(mut rows: libsql::Rows) -> Result<i64, DatabaseError> {
    let row = rows
        .next()
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to read row: {}", e)))?;
    match row {
        Some(row) => {
            let value: Option<i64> = column!(row, 0, "scalar");
            Ok(value.unwrap_or(0))
        }
        None => Ok(0),
    }
}
