//! Content Resolver
//!
//! Owns the per-`(page, lang, version)` content rows and the fallback rule:
//! when a node has no row in the requested language, the row in the space's
//! fallback language is used instead. The version is never substituted.
//!
//! Soft-deleted rows are invisible to every lookup here.

use crate::db::rows::{self, CONTENT_COLUMNS};
use crate::db::{DatabaseError, DatabaseService};
use crate::models::{ContentDraft, ContentPatch, ContentQuery, PageContent, PageNode, Space};
use crate::services::error::SpaceServiceError;
use crate::services::search::fold_case;
use crate::utils::ContentRenderer;
use libsql::{params, Connection};
use std::collections::HashMap;
use std::sync::Arc;

/// Node ids per bulk lookup statement
const RESOLVE_BATCH_SIZE: usize = 500;

#[derive(Clone)]
pub struct ContentResolver {
    db: Arc<DatabaseService>,
    renderer: Arc<dyn ContentRenderer>,
}

impl ContentResolver {
    pub fn new(db: Arc<DatabaseService>, renderer: Arc<dyn ContentRenderer>) -> Self {
        Self { db, renderer }
    }

    /// Create a content row for `node`
    ///
    /// `short_title` defaults to `title`, `lang` to the space default language.
    /// The body is rendered before anything is written.
    ///
    /// # Errors
    ///
    /// - `ScopeMismatch` if the node is not part of `space`
    /// - `RenderFailed` if the renderer rejects the body
    /// - `Conflict` if the node already has a row for `(lang, version)`
    pub async fn attach(
        &self,
        space: &Space,
        node: &PageNode,
        draft: ContentDraft,
    ) -> Result<PageContent, SpaceServiceError> {
        let conn = self.db.connect_with_timeout().await?;
        let content = self.attach_in(&conn, space, node, draft).await?;

        tracing::info!(
            "Attached content {} to node {} ({}/{:?})",
            content.id,
            node.id,
            content.lang,
            content.version
        );
        Ok(content)
    }

    pub(crate) async fn attach_in(
        &self,
        conn: &Connection,
        space: &Space,
        node: &PageNode,
        draft: ContentDraft,
    ) -> Result<PageContent, SpaceServiceError> {
        if node.space_id != space.id {
            return Err(SpaceServiceError::scope_mismatch(
                node.id,
                space.id,
                node.space_id,
            ));
        }

        let draft = draft.apply_defaults(&space.default_lang);
        let html = self.renderer.render(&draft.body)?;
        let now = rows::now_timestamp();

        conn.execute(
            "INSERT INTO page_contents
                (page_id, space_id, creator_id, lang, version, status, title, short_title,
                 body, html, search_title, search_body, created_at, updated_at, deleted_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)",
            params![
                node.id,
                space.id,
                draft.creator_id,
                draft.lang.as_str(),
                draft.version.as_str(),
                draft.status.as_str(),
                draft.title.as_str(),
                draft.short_title.as_str(),
                draft.body.as_str(),
                html,
                fold_case(&draft.title),
                fold_case(&draft.body),
                now,
                now
            ],
        )
        .await
        .map_err(|e| {
            DatabaseError::statement(
                &format!(
                    "content for page {} ({}/{:?})",
                    node.id, draft.lang, draft.version
                ),
                e,
            )
        })?;

        Self::get_content_in(conn, conn.last_insert_rowid()).await
    }

    /// Content of `node` for `query`, falling back to the fallback language
    ///
    /// # Errors
    ///
    /// `NotFound` when neither the requested nor the fallback language has a
    /// live row for the requested version.
    pub async fn resolve(
        &self,
        node: &PageNode,
        query: &ContentQuery,
    ) -> Result<PageContent, SpaceServiceError> {
        let conn = self.db.connect_with_timeout().await?;

        if let Some(content) = Self::find_in(&conn, node.id, &query.lang, &query.version).await? {
            return Ok(content);
        }

        if let Some(fallback) = query.fallback() {
            tracing::debug!(
                "No '{}' content for node {}, trying '{}'",
                query.lang,
                node.id,
                fallback
            );
            if let Some(content) = Self::find_in(&conn, node.id, fallback, &query.version).await? {
                return Ok(content);
            }
        }

        Err(SpaceServiceError::not_found(
            "content",
            format!("page {} ({}/{:?})", node.id, query.lang, query.version),
        ))
    }

    /// Bulk [`resolve`](Self::resolve): node id → content
    ///
    /// Nodes with neither a requested-language nor a fallback-language row are
    /// absent from the map.
    pub async fn resolve_many(
        &self,
        nodes: &[PageNode],
        query: &ContentQuery,
    ) -> Result<HashMap<i64, PageContent>, SpaceServiceError> {
        let mut resolved = HashMap::with_capacity(nodes.len());
        if nodes.is_empty() {
            return Ok(resolved);
        }

        let conn = self.db.connect_with_timeout().await?;
        let mut langs = vec![query.lang.as_str()];
        if let Some(fallback) = query.fallback() {
            langs.push(fallback);
        }

        for batch in nodes.chunks(RESOLVE_BATCH_SIZE) {
            let sql = format!(
                "SELECT {} FROM page_contents c
                 WHERE c.page_id IN ({}) AND c.version = ? AND c.lang IN ({}) AND c.deleted_at = 0",
                rows::select_list("c", &CONTENT_COLUMNS),
                placeholders(batch.len()),
                placeholders(langs.len())
            );

            let mut values: Vec<libsql::Value> = batch.iter().map(|n| n.id.into()).collect();
            values.push(query.version.clone().into());
            values.extend(langs.iter().map(|lang| lang.to_string().into()));

            let result = conn
                .query(&sql, values)
                .await
                .map_err(|e| DatabaseError::statement("Failed to resolve contents", e))?;

            for content in rows::collect(result, |row| rows::content_at(row, 0)).await? {
                if content.lang == query.lang {
                    resolved.insert(content.page_id, content);
                } else {
                    resolved.entry(content.page_id).or_insert(content);
                }
            }
        }

        tracing::debug!(
            "Resolved {} of {} nodes for '{}'",
            resolved.len(),
            nodes.len(),
            query.lang
        );
        Ok(resolved)
    }

    /// Live row for exactly `(page_id, lang, version)`, no fallback
    pub async fn find_exact(
        &self,
        page_id: i64,
        lang: &str,
        version: &str,
    ) -> Result<Option<PageContent>, SpaceServiceError> {
        let conn = self.db.connect_with_timeout().await?;
        Self::find_in(&conn, page_id, lang, version).await
    }

    /// Apply the provided fields of `patch` to `content` in place
    ///
    /// A patched body is re-rendered; an empty patch returns the row unchanged.
    ///
    /// # Errors
    ///
    /// `NotFound` if the row was soft-deleted in the meantime.
    pub async fn update(
        &self,
        content: &PageContent,
        patch: ContentPatch,
    ) -> Result<PageContent, SpaceServiceError> {
        if patch.is_empty() {
            return Ok(content.clone());
        }

        let html = match &patch.body {
            Some(body) => self.renderer.render(body)?,
            None => content.html.clone(),
        };
        let status = patch.status.unwrap_or(content.status);
        let title = patch.title.unwrap_or_else(|| content.title.clone());
        let short_title = patch
            .short_title
            .unwrap_or_else(|| content.short_title.clone());
        let body = patch.body.unwrap_or_else(|| content.body.clone());

        let search_title = fold_case(&title);
        let search_body = fold_case(&body);

        let conn = self.db.connect_with_timeout().await?;
        let affected = conn
            .execute(
                "UPDATE page_contents
                 SET status = ?, title = ?, short_title = ?, body = ?, html = ?,
                     search_title = ?, search_body = ?, updated_at = ?
                 WHERE id = ? AND deleted_at = 0",
                params![
                    status.as_str(),
                    title,
                    short_title,
                    body,
                    html,
                    search_title,
                    search_body,
                    rows::now_timestamp(),
                    content.id
                ],
            )
            .await
            .map_err(|e| DatabaseError::statement("Failed to update content", e))?;
        if affected == 0 {
            return Err(SpaceServiceError::not_found("content", content.id));
        }

        let updated = Self::get_content_in(&conn, content.id).await?;
        tracing::info!("Updated content {} of node {}", updated.id, updated.page_id);
        Ok(updated)
    }

    /// Set the soft-delete marker on `content`
    pub async fn soft_delete(&self, content: &PageContent) -> Result<(), SpaceServiceError> {
        let conn = self.db.connect_with_timeout().await?;
        conn.execute(
            "UPDATE page_contents SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at = 0",
            params![rows::now_timestamp(), rows::now_timestamp(), content.id],
        )
        .await
        .map_err(|e| DatabaseError::statement("Failed to delete content", e))?;

        tracing::info!("Soft-deleted content {} of node {}", content.id, content.page_id);
        Ok(())
    }

    async fn find_in(
        conn: &Connection,
        page_id: i64,
        lang: &str,
        version: &str,
    ) -> Result<Option<PageContent>, SpaceServiceError> {
        let sql = format!(
            "SELECT {} FROM page_contents c
             WHERE c.page_id = ? AND c.lang = ? AND c.version = ? AND c.deleted_at = 0",
            rows::select_list("c", &CONTENT_COLUMNS)
        );
        let result = conn
            .query(&sql, params![page_id, lang, version])
            .await
            .map_err(|e| DatabaseError::statement("Failed to load content", e))?;

        Ok(rows::first(result, |row| rows::content_at(row, 0)).await?)
    }

    async fn get_content_in(conn: &Connection, id: i64) -> Result<PageContent, SpaceServiceError> {
        let sql = format!(
            "SELECT {} FROM page_contents c WHERE c.id = ?",
            rows::select_list("c", &CONTENT_COLUMNS)
        );
        let result = conn
            .query(&sql, params![id])
            .await
            .map_err(|e| DatabaseError::statement("Failed to load content", e))?;

        rows::first(result, |row| rows::content_at(row, 0))
            .await?
            .ok_or_else(|| SpaceServiceError::not_found("content", id))
    }
}

/// `?, ?, …` with `count` placeholders
fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }
}
