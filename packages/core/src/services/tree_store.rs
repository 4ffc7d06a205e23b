//! Structural Tree Store
//!
//! Owns page node identity and the nested-set encoding of each space's forest.
//!
//! # Insertion
//!
//! A child is always appended as the last child of its parent. The insertion
//! point `p` is the parent's current `rgt`; every interval bound `>= p` in the
//! space moves right by 2 (this covers the parent itself and all of its
//! ancestors), and the new node takes `[p, p + 1]`.
//!
//! The shift, the insert and the parent's `children_count` update happen on a
//! connection that is inside a `BEGIN IMMEDIATE` transaction. The parent is
//! re-read on that connection, so the interval arithmetic never works on a
//! stale snapshot even when several writers target the same space.
//!
//! The `*_in` variants take the caller's connection and never begin or finish a
//! transaction themselves; they are used to compose larger units of work
//! (space creation, page creation).

use crate::db::rows::{self, NODE_COLUMNS};
use crate::db::{DatabaseError, DatabaseService};
use crate::models::PageNode;
use crate::services::error::SpaceServiceError;
use libsql::{params, Connection};
use std::sync::Arc;

/// Nested-set tree store scoped by space
#[derive(Clone)]
pub struct TreeStore {
    db: Arc<DatabaseService>,
}

impl TreeStore {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    /// Create a new root node after every existing tree of the space
    ///
    /// # Errors
    ///
    /// - `InvalidScope` if the space does not exist
    /// - `StorageFailure` if any statement fails (nothing is written)
    pub async fn insert_root(&self, space_id: i64) -> Result<PageNode, SpaceServiceError> {
        let conn = self.db.begin_immediate().await?;
        let result = Self::insert_root_in(&conn, space_id).await;
        let node = DatabaseService::finish(&conn, result).await?;

        tracing::info!("Inserted root node {} in space {}", node.id, space_id);
        Ok(node)
    }

    /// Append a new last child under `parent_id`
    ///
    /// # Errors
    ///
    /// - `NotFound` if the parent does not exist
    /// - `ScopeMismatch` if the parent belongs to another space
    /// - `StorageFailure` if any statement fails (no interval is shifted)
    pub async fn insert_child(
        &self,
        space_id: i64,
        parent_id: i64,
    ) -> Result<PageNode, SpaceServiceError> {
        let conn = self.db.begin_immediate().await?;
        let result = Self::insert_child_in(&conn, space_id, parent_id).await;
        let node = DatabaseService::finish(&conn, result).await?;

        tracing::info!(
            "Inserted node {} under {} in space {} at [{}, {}]",
            node.id,
            parent_id,
            space_id,
            node.lft,
            node.rgt
        );
        Ok(node)
    }

    pub(crate) async fn insert_root_in(
        conn: &Connection,
        space_id: i64,
    ) -> Result<PageNode, SpaceServiceError> {
        let found = conn
            .query("SELECT COUNT(*) FROM spaces WHERE id = ?", params![space_id])
            .await
            .map_err(|e| DatabaseError::statement("Failed to check space", e))?;
        if rows::scalar(found).await? == 0 {
            return Err(SpaceServiceError::InvalidScope { space_id });
        }

        let bound = conn
            .query(
                "SELECT MAX(rgt) FROM page_nodes WHERE space_id = ?",
                params![space_id],
            )
            .await
            .map_err(|e| DatabaseError::statement("Failed to read interval bound", e))?;
        let max_rgt = rows::scalar(bound).await?;

        let mut node = PageNode {
            id: 0,
            parent_id: None,
            space_id,
            lft: max_rgt + 1,
            rgt: max_rgt + 2,
            depth: 0,
            children_count: 0,
        };
        node.id = Self::insert_row(conn, &node).await?;
        Ok(node)
    }

    pub(crate) async fn insert_child_in(
        conn: &Connection,
        space_id: i64,
        parent_id: i64,
    ) -> Result<PageNode, SpaceServiceError> {
        let parent = Self::get_node_in(conn, parent_id).await?;
        if parent.space_id != space_id {
            return Err(SpaceServiceError::scope_mismatch(
                parent.id,
                space_id,
                parent.space_id,
            ));
        }

        let point = parent.rgt;

        conn.execute(
            "UPDATE page_nodes SET rgt = rgt + 2 WHERE space_id = ? AND rgt >= ?",
            params![space_id, point],
        )
        .await
        .map_err(|e| DatabaseError::statement("Failed to shift right bounds", e))?;

        conn.execute(
            "UPDATE page_nodes SET lft = lft + 2 WHERE space_id = ? AND lft >= ?",
            params![space_id, point],
        )
        .await
        .map_err(|e| DatabaseError::statement("Failed to shift left bounds", e))?;

        let mut node = PageNode {
            id: 0,
            parent_id: Some(parent.id),
            space_id,
            lft: point,
            rgt: point + 1,
            depth: parent.depth + 1,
            children_count: 0,
        };
        node.id = Self::insert_row(conn, &node).await?;

        conn.execute(
            "UPDATE page_nodes SET children_count = children_count + 1 WHERE id = ?",
            params![parent.id],
        )
        .await
        .map_err(|e| DatabaseError::statement("Failed to update children count", e))?;

        Ok(node)
    }

    async fn insert_row(conn: &Connection, node: &PageNode) -> Result<i64, DatabaseError> {
        conn.execute(
            "INSERT INTO page_nodes (parent_id, space_id, lft, rgt, depth, children_count)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                node.parent_id,
                node.space_id,
                node.lft,
                node.rgt,
                node.depth,
                node.children_count
            ],
        )
        .await
        .map_err(|e| DatabaseError::statement("Failed to insert page node", e))?;

        Ok(conn.last_insert_rowid())
    }

    /// Load a node by id
    pub async fn get_node(&self, id: i64) -> Result<PageNode, SpaceServiceError> {
        let conn = self.db.connect_with_timeout().await?;
        Self::get_node_in(&conn, id).await
    }

    pub(crate) async fn get_node_in(
        conn: &Connection,
        id: i64,
    ) -> Result<PageNode, SpaceServiceError> {
        let sql = format!(
            "SELECT {} FROM page_nodes n WHERE n.id = ?",
            rows::select_list("n", &NODE_COLUMNS)
        );
        let result = conn
            .query(&sql, params![id])
            .await
            .map_err(|e| DatabaseError::statement("Failed to load page node", e))?;

        rows::first(result, |row| rows::node_at(row, 0))
            .await?
            .ok_or_else(|| SpaceServiceError::not_found("page", id))
    }

    /// Strict ancestors of `node`, root first, immediate parent last
    ///
    /// Empty for a root.
    pub async fn ancestors(&self, node: &PageNode) -> Result<Vec<PageNode>, SpaceServiceError> {
        tracing::debug!("Loading ancestors of node {}", node.id);
        self.query_nodes(
            "n.space_id = ? AND n.lft < ? AND n.rgt > ?",
            vec![node.space_id.into(), node.lft.into(), node.rgt.into()],
        )
        .await
    }

    /// Strict descendants of `node` in document order
    pub async fn descendants(&self, node: &PageNode) -> Result<Vec<PageNode>, SpaceServiceError> {
        tracing::debug!("Loading descendants of node {}", node.id);
        self.query_nodes(
            "n.space_id = ? AND n.lft > ? AND n.rgt < ?",
            vec![node.space_id.into(), node.lft.into(), node.rgt.into()],
        )
        .await
    }

    /// Every node of a space in document order, optionally limited to `depth <= max_depth`
    pub async fn list_nodes(
        &self,
        space_id: i64,
        max_depth: Option<i64>,
    ) -> Result<Vec<PageNode>, SpaceServiceError> {
        tracing::debug!("Listing nodes of space {} (max_depth: {:?})", space_id, max_depth);
        match max_depth {
            Some(depth) => {
                self.query_nodes(
                    "n.space_id = ? AND n.depth <= ?",
                    vec![space_id.into(), depth.into()],
                )
                .await
            }
            None => self.query_nodes("n.space_id = ?", vec![space_id.into()]).await,
        }
    }

    async fn query_nodes(
        &self,
        filter: &str,
        values: Vec<libsql::Value>,
    ) -> Result<Vec<PageNode>, SpaceServiceError> {
        let conn = self.db.connect_with_timeout().await?;
        let sql = format!(
            "SELECT {} FROM page_nodes n WHERE {} ORDER BY n.lft",
            rows::select_list("n", &NODE_COLUMNS),
            filter
        );
        let result = conn
            .query(&sql, values)
            .await
            .map_err(|e| DatabaseError::statement("Failed to query page nodes", e))?;

        Ok(rows::collect(result, |row| rows::node_at(row, 0)).await?)
    }
}
