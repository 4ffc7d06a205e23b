//! Business Services
//!
//! This module contains the core business logic services:
//!
//! - `TreeStore` - Nested-set page tree, insertion and interval queries
//! - `ContentResolver` - Localized content rows with fallback-language resolution
//! - `TreeAssembler` - Flat node lists to page forests, ancestor chains
//! - `SpaceDirectory` - Space records and transactional homepage creation
//! - `PageService` - Page creation, listing, detail and content edits
//! - `SearchScanner` - Paged substring search over content
//!
//! Services coordinate between the database layer and application logic,
//! implementing business rules and orchestrating multi-table writes.

pub mod content_resolver;
pub mod error;
pub mod page_service;
pub mod search;
pub mod space_directory;
pub mod tree_assembler;
pub mod tree_store;

pub use content_resolver::ContentResolver;
pub use error::SpaceServiceError;
pub use page_service::PageService;
pub use search::{SearchHit, SearchScanner};
pub use space_directory::SpaceDirectory;
pub use tree_assembler::{build_forest, flatten, TreeAssembler};
pub use tree_store::TreeStore;
