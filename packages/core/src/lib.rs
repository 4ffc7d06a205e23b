//! DocSpace Core - Hierarchical Content Store
//!
//! This crate provides the page tree and localized content layer of the
//! DocSpace documentation platform.
//!
//! # Architecture
//!
//! - **Spaces**: tenant containers with a default and a fallback language
//! - **Nested-set tree**: every page node stores a `[lft, rgt]` interval scoped to its space
//! - **Localized content**: one content row per `(page, lang, version)`, independent of structure
//! - **libsql**: embedded SQLite-compatible store; multi-row writes run in `BEGIN IMMEDIATE` transactions
//!
//! # Modules
//!
//! - [`models`] - Data structures (Space, PageNode, PageContent, drafts and patches)
//! - [`db`] - Database layer with libsql integration
//! - [`services`] - Tree store, content resolver, tree assembler, space directory, search
//! - [`utils`] - Markdown rendering and sanitization
//! - [`config`] - Store configuration
//!
//! # Examples
//!
//! ```no_run
//! use docspace_core::{CreateSpaceParams, DocSpace, SpaceStatus, StoreConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let docspace = DocSpace::open(StoreConfig::with_path("./data/docspace.db")).await?;
//!
//! let space = docspace
//!     .spaces
//!     .create_space(CreateSpaceParams {
//!         name: "Documentation".to_string(),
//!         key: "docs".to_string(),
//!         default_lang: "en".to_string(),
//!         fallback_lang: "fr".to_string(),
//!         description: "# Welcome".to_string(),
//!         avatar: String::new(),
//!         status: SpaceStatus::Online,
//!         creator_id: 1,
//!     })
//!     .await?;
//! assert_ne!(space.homepage_id, 0);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod utils;

pub use config::StoreConfig;
pub use models::*;
pub use services::*;

use db::{DatabaseError, DatabaseService};
use std::sync::Arc;
use utils::{ContentRenderer, MarkdownRenderer};

/// Entry point bundling every service over one database handle and one renderer.
#[derive(Clone)]
pub struct DocSpace {
    pub spaces: SpaceDirectory,
    pub pages: PageService,
    pub search: SearchScanner,
}

impl DocSpace {
    /// Open (or create) the store described by `config` with the default markdown renderer.
    pub async fn open(config: StoreConfig) -> Result<Self, SpaceServiceError> {
        config.validate().map_err(DatabaseError::initialization_failed)?;
        let renderer: Arc<dyn ContentRenderer> =
            Arc::new(MarkdownRenderer::with_limit(config.max_body_bytes));
        let db = Arc::new(DatabaseService::open(&config).await?);
        Ok(Self::with_renderer(db, renderer, &config))
    }

    /// Assemble the services over an existing database handle.
    pub fn with_renderer(
        db: Arc<DatabaseService>,
        renderer: Arc<dyn ContentRenderer>,
        config: &StoreConfig,
    ) -> Self {
        let tree = TreeStore::new(db.clone());
        let resolver = ContentResolver::new(db.clone(), renderer);
        let assembler = TreeAssembler::new(tree.clone(), resolver.clone());

        Self {
            spaces: SpaceDirectory::new(db.clone(), tree.clone(), resolver.clone(), config),
            pages: PageService::new(db.clone(), tree, resolver, assembler),
            search: SearchScanner::new(db, config),
        }
    }
}
