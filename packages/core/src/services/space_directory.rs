//! Space Directory
//!
//! Creates, describes and updates spaces. Space creation is the one operation
//! spanning all three content tables: the space row, its root homepage node
//! and the homepage content are written in one `BEGIN IMMEDIATE` transaction,
//! so a failed creation never leaves an orphan node behind.

use crate::config::StoreConfig;
use crate::db::rows::{self, SPACE_COLUMNS};
use crate::db::{DatabaseError, DatabaseService};
use crate::models::{
    ContentDraft, CreateSpaceParams, DescribeSpacesParams, Page, PageStatus, Pagination, Space,
    UpdateSpaceParams,
};
use crate::services::content_resolver::ContentResolver;
use crate::services::error::SpaceServiceError;
use crate::services::search::contains_pattern;
use crate::services::tree_store::TreeStore;
use libsql::{params, Connection};
use std::sync::Arc;

#[derive(Clone)]
pub struct SpaceDirectory {
    db: Arc<DatabaseService>,
    tree: TreeStore,
    resolver: ContentResolver,
    default_page_size: u32,
    max_page_size: u32,
}

impl SpaceDirectory {
    pub fn new(
        db: Arc<DatabaseService>,
        tree: TreeStore,
        resolver: ContentResolver,
        config: &StoreConfig,
    ) -> Self {
        Self {
            db,
            tree,
            resolver,
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
        }
    }

    /// Create a space together with its published homepage
    ///
    /// The homepage is a new root node whose content carries the space name as
    /// title and short title and the description as markdown body, in the
    /// space default language. The returned space has `homepage` populated.
    ///
    /// # Errors
    ///
    /// - `Validation` for a missing name, malformed key or missing default language
    /// - `Conflict` if the key or name is taken (nothing is written)
    /// - `RenderFailed` if the description cannot be rendered (nothing is written)
    pub async fn create_space(
        &self,
        params: CreateSpaceParams,
    ) -> Result<Space, SpaceServiceError> {
        params.validate()?;

        let conn = self.db.begin_immediate().await?;
        let result = self.create_space_in(&conn, &params).await;
        let space = DatabaseService::finish(&conn, result).await?;

        tracing::info!(
            "Created space '{}' ({}) with homepage {}",
            space.key,
            space.id,
            space.homepage_id
        );
        Ok(space)
    }

    async fn create_space_in(
        &self,
        conn: &Connection,
        params: &CreateSpaceParams,
    ) -> Result<Space, SpaceServiceError> {
        let now = rows::now_timestamp();
        conn.execute(
            "INSERT INTO spaces
                (name, space_key, default_lang, fallback_lang, homepage_id, description,
                 avatar, status, creator_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, 0, ?, ?, ?, ?, ?, ?)",
            params![
                params.name.trim(),
                params.key.as_str(),
                params.default_lang.trim(),
                params.fallback_lang.trim(),
                params.description.as_str(),
                params.avatar.as_str(),
                params.status.as_str(),
                params.creator_id,
                now,
                now
            ],
        )
        .await
        .map_err(|e| DatabaseError::statement(&format!("space '{}'", params.key), e))?;

        let space_id = conn.last_insert_rowid();
        let mut space = Self::load_space_in(conn, "s.id = ?", space_id.into())
            .await?
            .ok_or_else(|| SpaceServiceError::not_found("space", space_id))?;

        let root = TreeStore::insert_root_in(conn, space.id).await?;
        let draft = ContentDraft::new(
            PageStatus::Published,
            space.name.clone(),
            params.description.clone(),
        )
        .with_short_title(space.name.clone())
        .with_lang(space.default_lang.clone())
        .with_creator(params.creator_id);
        let content = self.resolver.attach_in(conn, &space, &root, draft).await?;

        conn.execute(
            "UPDATE spaces SET homepage_id = ? WHERE id = ?",
            params![root.id, space.id],
        )
        .await
        .map_err(|e| DatabaseError::statement("Failed to set homepage", e))?;

        space.homepage_id = root.id;
        space.homepage = Some(Box::new(Page::new(root, Some(content))));
        Ok(space)
    }

    /// Space by key with its homepage resolved
    ///
    /// `lang` defaults to the space default language and falls back to the
    /// space fallback language; `version` defaults to the default version.
    ///
    /// # Errors
    ///
    /// `NotFound` if the space does not exist or its homepage has no content
    /// in either language.
    pub async fn describe_space(
        &self,
        key: &str,
        lang: Option<&str>,
        version: Option<&str>,
    ) -> Result<Space, SpaceServiceError> {
        let mut space = self.get_space_by_key(key).await?;

        let homepage = self.tree.get_node(space.homepage_id).await?;
        if homepage.space_id != space.id {
            return Err(SpaceServiceError::not_found("page", space.homepage_id));
        }
        let query = space.content_query(lang, version);
        let content = self.resolver.resolve(&homepage, &query).await?;

        space.homepage = Some(Box::new(Page::new(homepage, Some(content))));
        Ok(space)
    }

    /// Paged space listing filtered by a substring of name or key
    ///
    /// Homepages are resolved per space in `lang` (or the space default) with
    /// fallback; a space whose homepage has no content is listed without it.
    pub async fn describe_spaces(
        &self,
        params: DescribeSpacesParams,
    ) -> Result<Pagination<Space>, SpaceServiceError> {
        let request = params
            .pagination
            .clamp(self.default_page_size, self.max_page_size);
        let q = params.q.trim();

        let (filter, values): (&str, Vec<libsql::Value>) = if q.is_empty() {
            ("1 = 1", Vec::new())
        } else {
            let pattern = contains_pattern(q);
            (
                "(s.name LIKE ? ESCAPE '\\' OR s.space_key LIKE ? ESCAPE '\\')",
                vec![pattern.clone().into(), pattern.into()],
            )
        };

        let conn = self.db.connect_with_timeout().await?;

        let count = conn
            .query(
                &format!("SELECT COUNT(*) FROM spaces s WHERE {}", filter),
                values.clone(),
            )
            .await
            .map_err(|e| DatabaseError::statement("Failed to count spaces", e))?;
        let total = rows::scalar(count).await?;

        let mut page_values = values;
        page_values.push(request.limit().into());
        page_values.push(request.offset().into());
        let result = conn
            .query(
                &format!(
                    "SELECT {} FROM spaces s WHERE {} ORDER BY s.id LIMIT ? OFFSET ?",
                    rows::select_list("s", &SPACE_COLUMNS),
                    filter
                ),
                page_values,
            )
            .await
            .map_err(|e| DatabaseError::statement("Failed to list spaces", e))?;
        let mut spaces = rows::collect(result, |row| rows::space_at(row, 0)).await?;

        for space in &mut spaces {
            space.homepage = self.resolve_homepage(space, params.lang.as_deref()).await?;
        }

        tracing::debug!(
            "Listed {} of {} spaces (q: {:?})",
            spaces.len(),
            total,
            q
        );
        Ok(Pagination::new(request, total, spaces))
    }

    async fn resolve_homepage(
        &self,
        space: &Space,
        lang: Option<&str>,
    ) -> Result<Option<Box<Page>>, SpaceServiceError> {
        let homepage = match self.tree.get_node(space.homepage_id).await {
            Ok(node) if node.space_id == space.id => node,
            Ok(_) => return Ok(None),
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        match self
            .resolver
            .resolve(&homepage, &space.content_query(lang, None))
            .await
        {
            Ok(content) => Ok(Some(Box::new(Page::new(homepage, Some(content))))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Apply the provided fields of `patch` to the space identified by `key`
    ///
    /// # Errors
    ///
    /// - `NotFound` if the space (or the new homepage node) does not exist
    /// - `ScopeMismatch` if the new homepage belongs to another space
    /// - `Conflict` if the new name is taken
    pub async fn update_space(
        &self,
        key: &str,
        patch: UpdateSpaceParams,
    ) -> Result<Space, SpaceServiceError> {
        patch.validate()?;
        let mut space = self.get_space_by_key(key).await?;
        if patch.is_empty() {
            return Ok(space);
        }

        if let Some(homepage_id) = patch.homepage_id {
            let node = self.tree.get_node(homepage_id).await?;
            if node.space_id != space.id {
                return Err(SpaceServiceError::scope_mismatch(
                    node.id,
                    space.id,
                    node.space_id,
                ));
            }
            space.homepage_id = homepage_id;
        }
        if let Some(name) = patch.name {
            space.name = name.trim().to_string();
        }
        if let Some(default_lang) = patch.default_lang {
            space.default_lang = default_lang.trim().to_string();
        }
        if let Some(fallback_lang) = patch.fallback_lang {
            space.fallback_lang = fallback_lang.trim().to_string();
        }
        if let Some(description) = patch.description {
            space.description = description;
        }
        if let Some(avatar) = patch.avatar {
            space.avatar = avatar;
        }
        if let Some(status) = patch.status {
            space.status = status;
        }
        if let Some(multilingual) = patch.multilingual {
            space.multilingual = multilingual;
        }

        let conn = self.db.connect_with_timeout().await?;
        conn.execute(
            "UPDATE spaces
             SET name = ?, default_lang = ?, fallback_lang = ?, homepage_id = ?,
                 description = ?, avatar = ?, status = ?, multilingual = ?, updated_at = ?
             WHERE id = ?",
            params![
                space.name.as_str(),
                space.default_lang.as_str(),
                space.fallback_lang.as_str(),
                space.homepage_id,
                space.description.as_str(),
                space.avatar.as_str(),
                space.status.as_str(),
                space.multilingual as i64,
                rows::now_timestamp(),
                space.id
            ],
        )
        .await
        .map_err(|e| DatabaseError::statement(&format!("space '{}'", space.key), e))?;

        let updated = Self::load_space_in(&conn, "s.id = ?", space.id.into())
            .await?
            .ok_or_else(|| SpaceServiceError::not_found("space", key))?;

        tracing::info!("Updated space '{}' ({})", updated.key, updated.id);
        Ok(updated)
    }

    pub async fn get_space(&self, id: i64) -> Result<Space, SpaceServiceError> {
        let conn = self.db.connect_with_timeout().await?;
        Self::load_space_in(&conn, "s.id = ?", id.into())
            .await?
            .ok_or_else(|| SpaceServiceError::not_found("space", id))
    }

    pub async fn get_space_by_key(&self, key: &str) -> Result<Space, SpaceServiceError> {
        let conn = self.db.connect_with_timeout().await?;
        Self::load_space_in(&conn, "s.space_key = ?", key.into())
            .await?
            .ok_or_else(|| SpaceServiceError::not_found("space", key))
    }

    /// Load one space matching a single-parameter `filter` over alias `s`
    pub(crate) async fn load_space_in(
        conn: &Connection,
        filter: &str,
        value: libsql::Value,
    ) -> Result<Option<Space>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM spaces s WHERE {}",
            rows::select_list("s", &SPACE_COLUMNS),
            filter
        );
        let result = conn
            .query(&sql, vec![value])
            .await
            .map_err(|e| DatabaseError::statement("Failed to load space", e))?;

        rows::first(result, |row| rows::space_at(row, 0)).await
    }
}
