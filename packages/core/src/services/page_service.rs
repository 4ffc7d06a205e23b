//! Page Service
//!
//! Page-level operations composed from the tree store, the content resolver
//! and the tree assembler: creating a page (node + first content row),
//! listing a space's page forest, describing a single page with its ancestor
//! chain, and editing or soft-deleting content rows.

use crate::db::DatabaseService;
use crate::models::{
    normalize_version, CreatePageParams, DescribePagesParams, Page, PageContent, PageNode, Space,
    UpdatePageParams,
};
use crate::services::content_resolver::ContentResolver;
use crate::services::error::SpaceServiceError;
use crate::services::space_directory::SpaceDirectory;
use crate::services::tree_assembler::{build_forest, TreeAssembler};
use crate::services::tree_store::TreeStore;
use libsql::Connection;
use std::sync::Arc;

#[derive(Clone)]
pub struct PageService {
    db: Arc<DatabaseService>,
    tree: TreeStore,
    resolver: ContentResolver,
    assembler: TreeAssembler,
}

impl PageService {
    pub fn new(
        db: Arc<DatabaseService>,
        tree: TreeStore,
        resolver: ContentResolver,
        assembler: TreeAssembler,
    ) -> Self {
        Self {
            db,
            tree,
            resolver,
            assembler,
        }
    }

    /// Insert a node and attach its first content row in one transaction
    ///
    /// Without `parent_id` the page becomes an additional root of the space.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the space or the parent does not exist
    /// - `ScopeMismatch` if the parent belongs to another space
    /// - `RenderFailed` if the body cannot be rendered (no node is kept)
    pub async fn create_page(&self, params: CreatePageParams) -> Result<Page, SpaceServiceError> {
        let conn = self.db.begin_immediate().await?;
        let result = self.create_page_in(&conn, params).await;
        let page = DatabaseService::finish(&conn, result).await?;

        tracing::info!(
            "Created page {} in space {} (parent: {:?})",
            page.id(),
            page.node.space_id,
            page.node.parent_id
        );
        Ok(page)
    }

    async fn create_page_in(
        &self,
        conn: &Connection,
        params: CreatePageParams,
    ) -> Result<Page, SpaceServiceError> {
        let space = SpaceDirectory::load_space_in(conn, "s.id = ?", params.space_id.into())
            .await?
            .ok_or_else(|| SpaceServiceError::not_found("space", params.space_id))?;

        let node = match params.parent_id {
            Some(parent_id) if parent_id != 0 => {
                TreeStore::insert_child_in(conn, space.id, parent_id).await?
            }
            _ => TreeStore::insert_root_in(conn, space.id).await?,
        };
        let content = self
            .resolver
            .attach_in(conn, &space, &node, params.draft)
            .await?;

        Ok(Page::new(node, Some(content)))
    }

    /// The page forest of a space in document order
    ///
    /// Nodes without content in the requested or fallback language are left
    /// out, together with everything below them. With `parent_id`, the forest
    /// is the subtree under that node and its children are the roots.
    pub async fn describe_pages(
        &self,
        params: DescribePagesParams,
    ) -> Result<Vec<Page>, SpaceServiceError> {
        let space = self.load_space(params.space_id).await?;
        let query = space.content_query(params.lang.as_deref(), params.version.as_deref());

        let (anchor, nodes) = match params.parent_id {
            Some(parent_id) => {
                let parent = self.node_in_space(&space, parent_id).await?;
                let mut nodes = self.tree.descendants(&parent).await?;
                if let Some(max_depth) = params.max_depth {
                    nodes.retain(|n| n.depth <= max_depth);
                }
                (Some(parent), nodes)
            }
            None => (None, self.tree.list_nodes(space.id, params.max_depth).await?),
        };

        let mut contents = self.resolver.resolve_many(&nodes, &query).await?;
        let resolved = nodes.into_iter().filter_map(|node| {
            let content = contents.remove(&node.id)?;
            Some(Page::new(node, Some(content)))
        });

        let forest = match anchor {
            Some(mut parent) => {
                // Detached so the anchor roots the forest even below the top level
                parent.parent_id = None;
                let pages = std::iter::once(Page::new(parent, None))
                    .chain(resolved)
                    .collect();
                build_forest(pages)
                    .into_iter()
                    .next()
                    .map(|parent| parent.children)
                    .unwrap_or_default()
            }
            None => build_forest(resolved.collect()),
        };

        tracing::debug!(
            "Described {} root pages of space {} in '{}'",
            forest.len(),
            space.id,
            query.lang
        );
        Ok(forest)
    }

    /// One page with its content and ancestor chain
    ///
    /// # Errors
    ///
    /// `NotFound` if the page is not part of the space or has no content in
    /// the requested or fallback language.
    pub async fn describe_page(
        &self,
        space_id: i64,
        page_id: i64,
        lang: Option<&str>,
        version: Option<&str>,
    ) -> Result<Page, SpaceServiceError> {
        let space = self.load_space(space_id).await?;
        let node = self.node_in_space(&space, page_id).await?;
        let query = space.content_query(lang, version);

        let content = self.resolver.resolve(&node, &query).await?;
        let parents = self.assembler.ancestor_chain(&node, &query).await?;

        let mut page = Page::new(node, Some(content));
        page.parents = parents;
        Ok(page)
    }

    /// Patch the content row of exactly `(lang, version)`
    ///
    /// `lang` defaults to the space default language; there is no fallback.
    pub async fn update_page(
        &self,
        page_id: i64,
        params: UpdatePageParams,
    ) -> Result<Page, SpaceServiceError> {
        let (node, content) = self
            .exact_content(page_id, params.lang.as_deref(), params.version.as_deref())
            .await?;
        let updated = self.resolver.update(&content, params.patch).await?;

        Ok(Page::new(node, Some(updated)))
    }

    /// Soft-delete the content row of exactly `(lang, version)`
    ///
    /// The node and its other content rows are untouched.
    pub async fn delete_page_content(
        &self,
        page_id: i64,
        lang: Option<&str>,
        version: Option<&str>,
    ) -> Result<(), SpaceServiceError> {
        let (_, content) = self.exact_content(page_id, lang, version).await?;
        self.resolver.soft_delete(&content).await
    }

    async fn exact_content(
        &self,
        page_id: i64,
        lang: Option<&str>,
        version: Option<&str>,
    ) -> Result<(PageNode, PageContent), SpaceServiceError> {
        let node = self.tree.get_node(page_id).await?;
        let space = self.load_space(node.space_id).await?;

        let lang = lang
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(&space.default_lang);
        let version = normalize_version(version.unwrap_or_default());

        let content = self
            .resolver
            .find_exact(node.id, lang, &version)
            .await?
            .ok_or_else(|| {
                SpaceServiceError::not_found(
                    "content",
                    format!("page {} ({}/{:?})", node.id, lang, version),
                )
            })?;

        Ok((node, content))
    }

    async fn node_in_space(
        &self,
        space: &Space,
        page_id: i64,
    ) -> Result<PageNode, SpaceServiceError> {
        let node = self.tree.get_node(page_id).await?;
        if node.space_id != space.id {
            return Err(SpaceServiceError::not_found(
                "page",
                format!("{} in space {}", page_id, space.id),
            ));
        }
        Ok(node)
    }

    async fn load_space(&self, space_id: i64) -> Result<Space, SpaceServiceError> {
        let conn = self.db.connect_with_timeout().await?;
        SpaceDirectory::load_space_in(&conn, "s.id = ?", space_id.into())
            .await?
            .ok_or_else(|| SpaceServiceError::not_found("space", space_id))
    }
}
