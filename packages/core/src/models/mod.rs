//! Data Models
//!
//! This module contains the core data structures used throughout DocSpace:
//!
//! - `Space` - Tenant container with default/fallback language and homepage pointer
//! - `PageNode` - Language-independent structural tree element (nested-set encoded)
//! - `PageContent` - Localized, versioned content attached to a node
//! - Drafts, patches and query value objects consumed by the services
//!
//! Validation is explicit: space parameters expose a `validate()` returning a
//! structured [`ValidationError`], and status enums parse through `FromStr`.

mod page;
mod pagination;
mod space;

pub use page::{
    normalize_version, ContentDraft, ContentPatch, ContentQuery, CreatePageParams,
    DescribePagesParams, Page, PageContent, PageNode, PageStatus, UpdatePageParams,
};
pub use pagination::{PageRequest, Pagination};
pub use space::{
    CreateSpaceParams, DescribeSpacesParams, Space, SpaceStatus, UpdateSpaceParams,
};

use thiserror::Error;

/// Validation errors for drafts, patches and enumerated values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid {kind} status: '{value}'")]
    InvalidStatus { kind: &'static str, value: String },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid space key '{0}': expected a lowercase URL-safe slug")]
    InvalidKey(String),

    #[error("Field '{field}' exceeds {max} bytes")]
    TooLong { field: &'static str, max: usize },
}

impl ValidationError {
    /// Create an invalid status error
    pub fn invalid_status(kind: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidStatus {
            kind,
            value: value.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }

    pub fn too_long(field: &'static str, max: usize) -> Self {
        Self::TooLong { field, max }
    }
}
