//! Space Data Structures
//!
//! A space is the tenant-level container of one page forest. It owns the
//! language configuration every content lookup inside it falls back on, and
//! the pointer to its homepage node.

use super::{ContentQuery, Page, PageRequest, ValidationError};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Longest accepted space key or name
const MAX_KEY_LENGTH: usize = 128;

static SPACE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").unwrap());

/// Publication status of a space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpaceStatus {
    Offline,
    Online,
}

impl SpaceStatus {
    pub const ALL: [SpaceStatus; 2] = [SpaceStatus::Offline, SpaceStatus::Online];

    pub fn as_str(&self) -> &'static str {
        match self {
            SpaceStatus::Offline => "offline",
            SpaceStatus::Online => "online",
        }
    }

    /// Whether `value` names a space status
    pub fn is_valid(value: &str) -> bool {
        value.parse::<Self>().is_ok()
    }
}

impl FromStr for SpaceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offline" => Ok(SpaceStatus::Offline),
            "online" => Ok(SpaceStatus::Online),
            other => Err(ValidationError::invalid_status("space", other)),
        }
    }
}

impl fmt::Display for SpaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Space record.
///
/// `homepage_id` is set in the same transaction that creates the space, so a
/// persisted space always points at a root node of its own forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub id: i64,

    pub name: String,

    /// Unique URL-safe slug
    pub key: String,

    pub default_lang: String,

    /// Language substituted when content is absent in the requested one (may be empty)
    pub fallback_lang: String,

    pub homepage_id: i64,

    pub description: String,

    pub avatar: String,

    pub status: SpaceStatus,

    /// Whether pages of this space are offered in more than one language
    #[serde(default)]
    pub multilingual: bool,

    /// Opaque identity supplied by the identity directory
    pub creator_id: i64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Homepage node with resolved content, populated by describe operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<Box<Page>>,
}

impl Space {
    /// Content lookup for this space: `lang` defaults to the space default
    /// language and falls back to the space fallback language.
    pub fn content_query(&self, lang: Option<&str>, version: Option<&str>) -> ContentQuery {
        let lang = lang
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(&self.default_lang);

        ContentQuery::new(lang, version.unwrap_or_default()).with_fallback(&self.fallback_lang)
    }
}

/// Parameters for creating a space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSpaceParams {
    pub name: String,
    pub key: String,
    pub default_lang: String,
    #[serde(default)]
    pub fallback_lang: String,
    /// Markdown body of the initial homepage
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub avatar: String,
    pub status: SpaceStatus,
    #[serde(default)]
    pub creator_id: i64,
}

impl CreateSpaceParams {
    /// Validate required fields and the key format
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use docspace_core::models::{CreateSpaceParams, SpaceStatus};
    /// let params = CreateSpaceParams {
    ///     name: "Website".to_string(),
    ///     key: "website".to_string(),
    ///     default_lang: "en-US".to_string(),
    ///     fallback_lang: String::new(),
    ///     description: String::new(),
    ///     avatar: String::new(),
    ///     status: SpaceStatus::Online,
    ///     creator_id: 1,
    /// };
    /// assert!(params.validate().is_ok());
    /// ```
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::missing_field("name"));
        }
        if self.name.len() > MAX_KEY_LENGTH {
            return Err(ValidationError::too_long("name", MAX_KEY_LENGTH));
        }

        validate_key(&self.key)?;

        if self.default_lang.trim().is_empty() {
            return Err(ValidationError::missing_field("default_lang"));
        }

        Ok(())
    }
}

fn validate_key(key: &str) -> Result<(), ValidationError> {
    if key.is_empty() {
        return Err(ValidationError::missing_field("key"));
    }
    if key.len() > MAX_KEY_LENGTH || !SPACE_KEY_RE.is_match(key) {
        return Err(ValidationError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Partial space update; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateSpaceParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_lang: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_lang: Option<String>,
    /// Must reference a node of the same space
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SpaceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multilingual: Option<bool>,
}

impl UpdateSpaceParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_status(mut self, status: SpaceStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_fallback_lang(mut self, lang: impl Into<String>) -> Self {
        self.fallback_lang = Some(lang.into());
        self
    }

    pub fn with_multilingual(mut self, multilingual: bool) -> Self {
        self.multilingual = Some(multilingual);
        self
    }

    /// Check if update contains any changes
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.default_lang.is_none()
            && self.fallback_lang.is_none()
            && self.homepage_id.is_none()
            && self.description.is_none()
            && self.avatar.is_none()
            && self.status.is_none()
            && self.multilingual.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(ValidationError::missing_field("name"));
            }
            if name.len() > MAX_KEY_LENGTH {
                return Err(ValidationError::too_long("name", MAX_KEY_LENGTH));
            }
        }
        if matches!(&self.default_lang, Some(lang) if lang.trim().is_empty()) {
            return Err(ValidationError::missing_field("default_lang"));
        }
        Ok(())
    }
}

/// Listing parameters for spaces
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescribeSpacesParams {
    /// Substring filter on name or key
    #[serde(default)]
    pub q: String,
    /// Language used to resolve each homepage title (defaults per space)
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub pagination: PageRequest,
}
