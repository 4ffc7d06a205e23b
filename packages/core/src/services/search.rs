//! Search Index Scanner
//!
//! Substring search over live content rows of one language. Every content
//! write stores a lowercased copy of title and body; the query is lowercased
//! the same way and matched with `LIKE` and escaped wildcards, so case is
//! ignored for any script with case mappings.

use crate::config::StoreConfig;
use crate::db::rows::{self, CONTENT_COLUMNS, NODE_COLUMNS};
use crate::db::{DatabaseError, DatabaseService};
use crate::models::{Page, PageRequest, Pagination, Space};
use crate::services::error::SpaceServiceError;
use crate::services::space_directory::SpaceDirectory;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

const MATCH_FILTER: &str = "c.lang = ? AND c.deleted_at = 0
    AND (c.search_title LIKE ? ESCAPE '\\' OR c.search_body LIKE ? ESCAPE '\\')";

/// A matched content row joined back to its node and owning space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// The node with `content` set to the matched row
    pub page: Page,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<Space>,
}

#[derive(Clone)]
pub struct SearchScanner {
    db: Arc<DatabaseService>,
    default_page_size: u32,
    max_page_size: u32,
}

impl SearchScanner {
    pub fn new(db: Arc<DatabaseService>, config: &StoreConfig) -> Self {
        Self {
            db,
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
        }
    }

    /// Content rows in `lang` whose title or body contains `query`
    ///
    /// A blank query returns an empty page with `total = 0`. `total` counts
    /// every match, independent of the requested page.
    pub async fn search(
        &self,
        lang: &str,
        query: &str,
        request: PageRequest,
    ) -> Result<Pagination<SearchHit>, SpaceServiceError> {
        let request = request.clamp(self.default_page_size, self.max_page_size);
        let query = query.trim();
        if query.is_empty() {
            return Ok(Pagination::empty(request));
        }

        let pattern = contains_pattern(&fold_case(query));
        let conn = self.db.connect_with_timeout().await?;

        let count = conn
            .query(
                &format!(
                    "SELECT COUNT(*) FROM page_contents c
                     JOIN page_nodes n ON n.id = c.page_id
                     WHERE {}",
                    MATCH_FILTER
                ),
                libsql::params![lang, pattern.as_str(), pattern.as_str()],
            )
            .await
            .map_err(|e| DatabaseError::statement("Failed to count search results", e))?;
        let total = rows::scalar(count).await?;
        if total == 0 {
            return Ok(Pagination::new(request, 0, Vec::new()));
        }

        let result = conn
            .query(
                &format!(
                    "SELECT {}, {} FROM page_contents c
                     JOIN page_nodes n ON n.id = c.page_id
                     WHERE {}
                     ORDER BY c.id
                     LIMIT ? OFFSET ?",
                    rows::select_list("c", &CONTENT_COLUMNS),
                    rows::select_list("n", &NODE_COLUMNS),
                    MATCH_FILTER
                ),
                libsql::params![
                    lang,
                    pattern.as_str(),
                    pattern.as_str(),
                    request.limit(),
                    request.offset()
                ],
            )
            .await
            .map_err(|e| DatabaseError::statement("Failed to search contents", e))?;

        let node_offset = CONTENT_COLUMNS.len() as i32;
        let matches = rows::collect(result, |row| {
            Ok((rows::content_at(row, 0)?, rows::node_at(row, node_offset)?))
        })
        .await?;

        let mut spaces: HashMap<i64, Option<Space>> = HashMap::new();
        let mut hits = Vec::with_capacity(matches.len());
        for (content, node) in matches {
            if !spaces.contains_key(&node.space_id) {
                let space =
                    SpaceDirectory::load_space_in(&conn, "s.id = ?", node.space_id.into()).await?;
                spaces.insert(node.space_id, space);
            }
            hits.push(SearchHit {
                space: spaces.get(&node.space_id).cloned().flatten(),
                page: Page::new(node, Some(content)),
            });
        }

        tracing::debug!(
            "Search '{}' in '{}': {} of {} matches",
            query,
            lang,
            hits.len(),
            total
        );
        Ok(Pagination::new(request, total, hits))
    }
}

/// Case-folded form stored in `search_title`/`search_body` and applied to queries
pub(crate) fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

/// `LIKE` pattern matching `needle` anywhere, with `\` as escape character
pub(crate) fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
