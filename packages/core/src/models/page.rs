//! Page Data Structures
//!
//! Pages are split in two independent layers:
//!
//! - [`PageNode`]: language-independent structure. Each node carries a
//!   nested-set interval `[lft, rgt]` scoped to its space, so `A` is an
//!   ancestor of `B` iff `A.lft < B.lft && A.rgt > B.rgt`.
//! - [`PageContent`]: one row per `(page_id, lang, version)`. A node may have
//!   any number of content rows, including none.
//!
//! [`Page`] joins the two for read paths and carries the assembled tree links.

use super::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a content row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Draft,
    Published,
    Offline,
    Deprecated,
}

impl PageStatus {
    pub const ALL: [PageStatus; 4] = [
        PageStatus::Draft,
        PageStatus::Published,
        PageStatus::Offline,
        PageStatus::Deprecated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PageStatus::Draft => "draft",
            PageStatus::Published => "published",
            PageStatus::Offline => "offline",
            PageStatus::Deprecated => "deprecated",
        }
    }

    /// Whether `value` names a page status
    pub fn is_valid(value: &str) -> bool {
        value.parse::<Self>().is_ok()
    }
}

impl FromStr for PageStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PageStatus::Draft),
            "published" => Ok(PageStatus::Published),
            "offline" => Ok(PageStatus::Offline),
            "deprecated" => Ok(PageStatus::Deprecated),
            other => Err(ValidationError::invalid_status("page", other)),
        }
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural tree element.
///
/// Invariants maintained by the tree store for every space:
/// intervals of siblings never overlap, descendants nest inside ancestors,
/// `rgt - lft` is odd, `children_count` equals the number of direct children
/// and `depth` equals the parent's depth plus one (roots are at depth 0).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageNode {
    pub id: i64,

    /// `None` for roots
    pub parent_id: Option<i64>,

    pub space_id: i64,

    #[serde(skip)]
    pub lft: i64,

    #[serde(skip)]
    pub rgt: i64,

    #[serde(skip)]
    pub depth: i64,

    pub children_count: i64,
}

impl PageNode {
    pub fn is_root(&self) -> bool {
        matches!(self.parent_id, None | Some(0))
    }

    /// Interval containment within the same space
    pub fn is_ancestor_of(&self, other: &PageNode) -> bool {
        self.space_id == other.space_id && self.lft < other.lft && self.rgt > other.rgt
    }

    /// Number of nodes in the subtree rooted here (including this node)
    pub fn subtree_size(&self) -> i64 {
        (self.rgt - self.lft + 1) / 2
    }
}

/// Localized, versioned content of a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageContent {
    pub id: i64,

    pub page_id: i64,

    #[serde(skip)]
    pub space_id: i64,

    #[serde(skip)]
    pub creator_id: i64,

    pub lang: String,

    /// Empty string is the default version
    pub version: String,

    pub status: PageStatus,

    pub title: String,

    pub short_title: String,

    /// Source markdown
    pub body: String,

    /// Rendered, sanitized HTML
    pub html: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Soft-delete marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A node joined with its resolved content and assembled tree links
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(flatten)]
    pub node: PageNode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<PageContent>,

    /// Direct children in document order (populated by tree assembly)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Page>,

    /// Ancestors from root to immediate parent (populated on detail reads)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<Page>,
}

impl Page {
    pub fn new(node: PageNode, content: Option<PageContent>) -> Self {
        Self {
            node,
            content,
            children: Vec::new(),
            parents: Vec::new(),
        }
    }

    pub fn id(&self) -> i64 {
        self.node.id
    }

    /// Title of the resolved content, if any
    pub fn title(&self) -> Option<&str> {
        self.content.as_ref().map(|c| c.title.as_str())
    }
}

/// Map the `"default"` alias and surrounding whitespace onto the stored default version (`""`)
///
/// # Examples
///
/// ```rust
/// # use docspace_core::models::normalize_version;
/// assert_eq!(normalize_version("default"), "");
/// assert_eq!(normalize_version(" v2 "), "v2");
/// ```
pub fn normalize_version(version: &str) -> String {
    let version = version.trim();
    if version.eq_ignore_ascii_case("default") {
        String::new()
    } else {
        version.to_string()
    }
}

/// Content lookup parameters.
///
/// Built once per request and handed to the content resolver instead of
/// assembling language/version filters ad hoc. Only the language falls back;
/// the version is always held constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentQuery {
    pub lang: String,
    pub version: String,
    pub fallback_lang: Option<String>,
}

impl ContentQuery {
    pub fn new(lang: impl Into<String>, version: &str) -> Self {
        Self {
            lang: lang.into(),
            version: normalize_version(version),
            fallback_lang: None,
        }
    }

    /// Set the fallback language; ignored when empty or equal to the requested language
    pub fn with_fallback(mut self, fallback_lang: &str) -> Self {
        let fallback_lang = fallback_lang.trim();
        self.fallback_lang = if fallback_lang.is_empty() || fallback_lang == self.lang {
            None
        } else {
            Some(fallback_lang.to_string())
        };
        self
    }

    pub fn fallback(&self) -> Option<&str> {
        self.fallback_lang.as_deref()
    }
}

/// Content to attach to a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDraft {
    /// Defaults to the space default language when empty
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub version: String,
    pub status: PageStatus,
    pub title: String,
    /// Defaults to `title` when empty
    #[serde(default)]
    pub short_title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub creator_id: i64,
}

impl ContentDraft {
    pub fn new(status: PageStatus, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            lang: String::new(),
            version: String::new(),
            status,
            title: title.into(),
            short_title: String::new(),
            body: body.into(),
            creator_id: 0,
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_short_title(mut self, short_title: impl Into<String>) -> Self {
        self.short_title = short_title.into();
        self
    }

    pub fn with_creator(mut self, creator_id: i64) -> Self {
        self.creator_id = creator_id;
        self
    }

    /// Fill `short_title` and `lang` defaults and normalize the version
    pub fn apply_defaults(mut self, default_lang: &str) -> Self {
        if self.short_title.is_empty() {
            self.short_title = self.title.clone();
        }
        if self.lang.trim().is_empty() {
            self.lang = default_lang.to_string();
        }
        self.version = normalize_version(&self.version);
        self
    }
}

/// Partial content update; only provided fields are applied
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PageStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_title: Option<String>,
    /// Re-rendered when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl ContentPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: PageStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.title.is_none()
            && self.short_title.is_none()
            && self.body.is_none()
    }
}

/// Parameters for creating a page (node plus its first content row)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePageParams {
    pub space_id: i64,
    /// `None` creates an additional root in the space
    #[serde(default)]
    pub parent_id: Option<i64>,
    pub draft: ContentDraft,
}

/// Parameters for listing the page forest of a space
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescribePagesParams {
    pub space_id: i64,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// Only nodes with `depth <= max_depth`
    #[serde(default)]
    pub max_depth: Option<i64>,
    /// Only the subtree below this node (its children become the roots)
    #[serde(default)]
    pub parent_id: Option<i64>,
}

/// Parameters for updating the content row of a page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdatePageParams {
    /// Defaults to the space default language
    #[serde(default)]
    pub lang: Option<String>,
    /// Defaults to the default version
    #[serde(default)]
    pub version: Option<String>,
    #[serde(flatten)]
    pub patch: ContentPatch,
}
