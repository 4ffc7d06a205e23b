//! Shared fixtures for the integration tests

#![allow(dead_code)]

use anyhow::Result;
use docspace_core::db::DatabaseService;
use docspace_core::utils::{ContentRenderer, MarkdownRenderer, RenderError};
use docspace_core::{
    CreateSpaceParams, DocSpace, PageNode, Space, SpaceStatus, StoreConfig,
};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

pub struct TestStore {
    pub docspace: DocSpace,
    pub db: Arc<DatabaseService>,
    pub config: StoreConfig,
    _temp_dir: TempDir,
}

/// Fresh store with the markdown renderer
pub async fn open_store() -> Result<TestStore> {
    open_store_with(Arc::new(MarkdownRenderer::new())).await
}

/// Fresh store with a custom renderer
pub async fn open_store_with(renderer: Arc<dyn ContentRenderer>) -> Result<TestStore> {
    let temp_dir = TempDir::new()?;
    let config = StoreConfig::with_path(temp_dir.path().join("docspace.db"));
    let db = Arc::new(DatabaseService::open(&config).await?);
    let docspace = DocSpace::with_renderer(db.clone(), renderer, &config);

    Ok(TestStore {
        docspace,
        db,
        config,
        _temp_dir: temp_dir,
    })
}

/// Renderer that passes markdown through and fails on bodies containing "boom"
pub fn failing_renderer() -> Arc<dyn ContentRenderer> {
    Arc::new(|markdown: &str| -> Result<String, RenderError> {
        if markdown.contains("boom") {
            Err(RenderError::Failed("renderer exploded".to_string()))
        } else {
            Ok(markdown.to_string())
        }
    })
}

pub fn space_params(key: &str, default_lang: &str, fallback_lang: &str) -> CreateSpaceParams {
    CreateSpaceParams {
        name: format!("Space {}", key),
        key: key.to_string(),
        default_lang: default_lang.to_string(),
        fallback_lang: fallback_lang.to_string(),
        description: format!("# {}\n\nWelcome.", key),
        avatar: String::new(),
        status: SpaceStatus::Online,
        creator_id: 1,
    }
}

pub async fn create_space(store: &TestStore, key: &str) -> Result<Space> {
    Ok(store
        .docspace
        .spaces
        .create_space(space_params(key, "en", "fr"))
        .await?)
}

/// Single integer result of `sql`
pub async fn count(db: &DatabaseService, sql: &str) -> Result<i64> {
    let conn = db.connect_with_timeout().await?;
    let mut rows = conn.query(sql, ()).await?;
    let row = rows.next().await?.expect("count row");
    Ok(row.get::<i64>(0)?)
}

/// Assert every nested-set invariant over the nodes of one space
pub fn assert_tree_invariants(nodes: &[PageNode]) {
    let by_id: HashMap<i64, &PageNode> = nodes.iter().map(|n| (n.id, n)).collect();

    // Bounds are exactly 1..=2n with no duplicates
    let mut bounds: Vec<i64> = nodes.iter().flat_map(|n| [n.lft, n.rgt]).collect();
    bounds.sort_unstable();
    let expected: Vec<i64> = (1..=2 * nodes.len() as i64).collect();
    assert_eq!(bounds, expected, "interval bounds are not contiguous");

    for node in nodes {
        assert!(node.lft < node.rgt);
        assert_eq!((node.rgt - node.lft) % 2, 1, "node {} has even width", node.id);

        let children = nodes
            .iter()
            .filter(|n| n.parent_id == Some(node.id))
            .count() as i64;
        assert_eq!(node.children_count, children, "children_count of {}", node.id);

        match node.parent_id {
            None => assert_eq!(node.depth, 0),
            Some(parent_id) => {
                let parent = by_id[&parent_id];
                assert_eq!(node.depth, parent.depth + 1);
            }
        }
    }

    // Interval containment matches the parent chain
    for a in nodes {
        for b in nodes {
            let mut is_ancestor = false;
            let mut cursor = b.parent_id;
            while let Some(id) = cursor {
                if id == a.id {
                    is_ancestor = true;
                    break;
                }
                cursor = by_id[&id].parent_id;
            }
            assert_eq!(
                a.is_ancestor_of(b),
                is_ancestor,
                "containment of {} in {} disagrees with parent links",
                b.id,
                a.id
            );
        }
    }
}
