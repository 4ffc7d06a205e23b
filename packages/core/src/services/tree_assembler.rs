//! Tree Assembler
//!
//! Turns flat, content-resolved node lists into nested [`Page`] forests and
//! computes ancestor chains for detail views. The assembler holds no state of
//! its own; [`build_forest`] is a pure function.

use crate::models::{ContentQuery, Page, PageNode};
use crate::services::content_resolver::ContentResolver;
use crate::services::error::SpaceServiceError;
use crate::services::tree_store::TreeStore;
use std::collections::{HashMap, HashSet};

/// Link `pages` into a forest
///
/// Pages without a parent (or with parent `0`) become roots. Every other page
/// is appended to its parent's children when the parent is part of the input,
/// and dropped otherwise. Roots and siblings keep their input order, so input
/// sorted by `lft` yields document order. Existing `children` links on the
/// input are discarded, which makes the transformation idempotent over
/// [`flatten`].
///
/// ```rust
/// # use docspace_core::models::{Page, PageNode};
/// # use docspace_core::services::build_forest;
/// let node = |id, parent_id| PageNode {
///     id,
///     parent_id,
///     space_id: 1,
///     lft: 0,
///     rgt: 0,
///     depth: 0,
///     children_count: 0,
/// };
/// let forest = build_forest(vec![
///     Page::new(node(1, None), None),
///     Page::new(node(2, Some(1)), None),
///     Page::new(node(3, Some(1)), None),
/// ]);
/// assert_eq!(forest.len(), 1);
/// assert_eq!(forest[0].children.len(), 2);
/// ```
pub fn build_forest(pages: Vec<Page>) -> Vec<Page> {
    let present: HashSet<i64> = pages.iter().map(Page::id).collect();

    let mut children: HashMap<i64, Vec<Page>> = HashMap::new();
    let mut roots = Vec::new();

    // Bucket every page under its parent id in input order
    for mut page in pages {
        page.children.clear();
        match page.node.parent_id {
            None | Some(0) => roots.push(page),
            Some(parent_id) if present.contains(&parent_id) => {
                children.entry(parent_id).or_default().push(page)
            }
            Some(parent_id) => {
                tracing::debug!(
                    "Dropping page {} from forest: parent {} not in input",
                    page.id(),
                    parent_id
                );
            }
        }
    }

    roots
        .into_iter()
        .map(|root| attach_children(root, &mut children))
        .collect()
}

fn attach_children(mut page: Page, children: &mut HashMap<i64, Vec<Page>>) -> Page {
    if let Some(direct) = children.remove(&page.id()) {
        page.children = direct
            .into_iter()
            .map(|child| attach_children(child, children))
            .collect();
    }
    page
}

/// Pre-order flattening of a forest; children links are kept on the returned pages
pub fn flatten(forest: &[Page]) -> Vec<Page> {
    let mut pages = Vec::new();
    for page in forest {
        pages.push(page.clone());
        pages.extend(flatten(&page.children));
    }
    pages
}

/// Ancestor chain lookups joining the tree store with the content resolver
#[derive(Clone)]
pub struct TreeAssembler {
    tree: TreeStore,
    resolver: ContentResolver,
}

impl TreeAssembler {
    pub fn new(tree: TreeStore, resolver: ContentResolver) -> Self {
        Self { tree, resolver }
    }

    /// Ancestors of `node` (root first) with content resolved for `query`
    ///
    /// Ancestors without content in either language are kept with `content: None`.
    pub async fn ancestor_chain(
        &self,
        node: &PageNode,
        query: &ContentQuery,
    ) -> Result<Vec<Page>, SpaceServiceError> {
        let ancestors = self.tree.ancestors(node).await?;
        let mut contents = self.resolver.resolve_many(&ancestors, query).await?;

        Ok(ancestors
            .into_iter()
            .map(|ancestor| {
                let content = contents.remove(&ancestor.id);
                Page::new(ancestor, content)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(id: i64, parent_id: Option<i64>) -> Page {
        Page::new(
            PageNode {
                id,
                parent_id,
                space_id: 1,
                lft: 0,
                rgt: 0,
                depth: 0,
                children_count: 0,
            },
            None,
        )
    }

    fn shape(forest: &[Page]) -> Vec<(i64, Vec<i64>)> {
        flatten(forest)
            .iter()
            .map(|p| (p.id(), p.children.iter().map(Page::id).collect()))
            .collect()
    }

    #[test]
    fn test_children_keep_input_order() {
        let forest = build_forest(vec![page(1, None), page(2, Some(1)), page(3, Some(1))]);

        assert_eq!(forest.len(), 1);
        let ids: Vec<i64> = forest[0].children.iter().map(Page::id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_zero_parent_is_root() {
        let forest = build_forest(vec![page(1, Some(0)), page(2, None)]);
        let ids: Vec<i64> = forest.iter().map(Page::id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_orphans_are_dropped() {
        let forest = build_forest(vec![page(1, None), page(5, Some(4)), page(6, Some(5))]);
        assert_eq!(shape(&forest), vec![(1, vec![])]);
    }

    #[test]
    fn test_nested_levels() {
        let forest = build_forest(vec![
            page(1, None),
            page(2, Some(1)),
            page(3, Some(2)),
            page(4, Some(1)),
            page(5, None),
        ]);
        assert_eq!(
            shape(&forest),
            vec![
                (1, vec![2, 4]),
                (2, vec![3]),
                (3, vec![]),
                (4, vec![]),
                (5, vec![])
            ]
        );
    }

    #[test]
    fn test_build_forest_is_idempotent() {
        let input = vec![
            page(1, None),
            page(2, Some(1)),
            page(3, Some(2)),
            page(4, Some(1)),
        ];
        let once = build_forest(input.clone());
        let twice = build_forest(flatten(&once));
        assert_eq!(once, twice);
        assert_eq!(build_forest(input), once);
    }

    #[test]
    fn test_empty_input() {
        assert!(build_forest(Vec::new()).is_empty());
    }
}
