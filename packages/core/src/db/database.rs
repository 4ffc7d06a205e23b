//! Database Connection Management
//!
//! This module provides the database connection and initialization
//! functionality using libsql for DocSpace's page store.
//!
//! # Architecture
//!
//! - **Path-agnostic**: Accepts any valid PathBuf
//! - **WAL mode**: Write-Ahead Logging so readers never block the single writer
//! - **Foreign keys**: Enabled on every connection
//! - **Serialized writers**: multi-row writes start with `BEGIN IMMEDIATE`, which takes
//!   the write lock before the first read. Two concurrent tree inserts in the same space
//!   therefore never compute intervals from the same snapshot.
//!
//! # Database Connection Patterns
//!
//! **ALWAYS use `connect_with_timeout()` in async functions.** The busy timeout
//! lets a second writer wait for the first one instead of failing with `SQLITE_BUSY`.
//!
//! ```no_run
//! # use docspace_core::db::DatabaseService;
//! # use std::path::PathBuf;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let db_service = DatabaseService::new(PathBuf::from("./data/docspace.db")).await?;
//! let conn = db_service.connect_with_timeout().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::StoreConfig;
use crate::db::error::DatabaseError;
use libsql::{Builder, Connection, Database};
use std::path::PathBuf;
use std::sync::Arc;

/// Database service for managing the libsql connection and schema
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,

    busy_timeout_ms: u64,
}

impl DatabaseService {
    /// Open the database at `db_path` with default settings
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        Self::open(&StoreConfig::with_path(db_path)).await
    }

    /// Open (or create) the database described by `config`
    ///
    /// This will:
    /// 1. Ensure the parent directory exists (create if needed)
    /// 2. Open/create the database file
    /// 3. Initialize the schema (CREATE TABLE IF NOT EXISTS)
    /// 4. Enable WAL mode and foreign keys
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if:
    /// - Parent directory cannot be created
    /// - Database connection fails
    /// - Schema initialization fails
    pub async fn open(config: &StoreConfig) -> Result<Self, DatabaseError> {
        let db_path = config.database_path.clone();
        let is_new_database = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
            busy_timeout_ms: config.busy_timeout_ms,
        };

        service.initialize_schema(is_new_database).await?;

        tracing::debug!(
            "Opened database at {} (new: {})",
            service.db_path.display(),
            is_new_database
        );

        Ok(service)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so we must use query() instead of execute().
    async fn execute_pragma(&self, conn: &Connection, pragma: &str) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let mut rows = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        while rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e)))?
            .is_some()
        {}
        Ok(())
    }

    /// Initialize database schema and configuration
    ///
    /// Creates tables and indexes using CREATE TABLE IF NOT EXISTS,
    /// so initialization is safe to repeat.
    ///
    /// # Schema
    ///
    /// - `spaces`: tenant records, unique `name` and `space_key`
    /// - `page_nodes`: nested-set tree, one row per node, scoped by `space_id`
    /// - `page_contents`: one row per `(page_id, lang, version)`, soft-deletable
    /// - `revisions`: placeholder, not written by any operation
    async fn initialize_schema(&self, is_new_database: bool) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL").await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS spaces (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                space_key TEXT NOT NULL UNIQUE,
                default_lang TEXT NOT NULL,
                fallback_lang TEXT NOT NULL DEFAULT '',
                homepage_id INTEGER NOT NULL DEFAULT 0,
                description TEXT NOT NULL DEFAULT '',
                avatar TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL,
                multilingual INTEGER NOT NULL DEFAULT 0,
                creator_id INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create spaces table: {}", e))
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS page_nodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                parent_id INTEGER,
                space_id INTEGER NOT NULL,
                lft INTEGER NOT NULL,
                rgt INTEGER NOT NULL,
                depth INTEGER NOT NULL DEFAULT 0,
                children_count INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (space_id) REFERENCES spaces(id),
                FOREIGN KEY (parent_id) REFERENCES page_nodes(id)
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create page_nodes table: {}", e))
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS page_contents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                page_id INTEGER NOT NULL,
                space_id INTEGER NOT NULL,
                creator_id INTEGER NOT NULL DEFAULT 0,
                lang TEXT NOT NULL,
                version TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL,
                title TEXT NOT NULL DEFAULT '',
                short_title TEXT NOT NULL DEFAULT '',
                body TEXT NOT NULL DEFAULT '',
                html TEXT NOT NULL DEFAULT '',
                -- lowercased title and body, matched by search
                search_title TEXT NOT NULL DEFAULT '',
                search_body TEXT NOT NULL DEFAULT '',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                -- 0 means live; otherwise the unix time of the soft delete
                deleted_at INTEGER NOT NULL DEFAULT 0,
                UNIQUE (page_id, lang, version),
                FOREIGN KEY (page_id) REFERENCES page_nodes(id)
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create page_contents table: {}", e))
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS revisions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id INTEGER NOT NULL,
                owner_type TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create revisions table: {}", e))
        })?;

        self.create_core_indexes(&conn).await?;

        // Flush the freshly created schema so other connections see it immediately
        if is_new_database {
            self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
                .await?;
        }

        Ok(())
    }

    /// Create core indexes
    async fn create_core_indexes(&self, conn: &Connection) -> Result<(), DatabaseError> {
        const INDEXES: [(&str, &str); 6] = [
            (
                "idx_page_nodes_space_lft",
                "CREATE INDEX IF NOT EXISTS idx_page_nodes_space_lft ON page_nodes(space_id, lft)",
            ),
            (
                "idx_page_nodes_space_rgt",
                "CREATE INDEX IF NOT EXISTS idx_page_nodes_space_rgt ON page_nodes(space_id, rgt)",
            ),
            (
                "idx_page_nodes_parent",
                "CREATE INDEX IF NOT EXISTS idx_page_nodes_parent ON page_nodes(parent_id)",
            ),
            (
                "idx_page_contents_lang",
                "CREATE INDEX IF NOT EXISTS idx_page_contents_lang ON page_contents(lang, space_id)",
            ),
            (
                "idx_page_contents_title",
                "CREATE INDEX IF NOT EXISTS idx_page_contents_title ON page_contents(title)",
            ),
            (
                "idx_spaces_status",
                "CREATE INDEX IF NOT EXISTS idx_spaces_status ON spaces(status)",
            ),
        ];

        for (name, sql) in INDEXES {
            conn.execute(sql, ()).await.map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to create index '{}': {}", name, e))
            })?;
        }

        Ok(())
    }

    /// Get a synchronous connection handle without per-connection configuration
    ///
    /// Only for single-threaded, synchronous contexts. Prefer `connect_with_timeout()`.
    pub fn connect(&self) -> Result<Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get a connection with busy timeout and foreign keys configured
    ///
    /// **✅ RECOMMENDED** for every async code path.
    pub async fn connect_with_timeout(&self) -> Result<Connection, DatabaseError> {
        let conn = self.connect()?;

        self.execute_pragma(&conn, &format!("PRAGMA busy_timeout = {}", self.busy_timeout_ms))
            .await?;
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
            .await?;

        Ok(conn)
    }

    /// Open a connection and start a write transaction on it
    ///
    /// The returned connection must be handed to [`DatabaseService::finish`].
    pub async fn begin_immediate(&self) -> Result<Connection, DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        conn.execute("BEGIN IMMEDIATE", ()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to begin transaction: {}", e))
        })?;
        Ok(conn)
    }

    /// Commit on `Ok`, roll back on `Err`
    ///
    /// The original error is returned unchanged when the rollback succeeds;
    /// a failing rollback is only logged since the connection is dropped anyway.
    pub async fn finish<T, E>(conn: &Connection, result: Result<T, E>) -> Result<T, E>
    where
        E: From<DatabaseError>,
    {
        match result {
            Ok(value) => {
                if let Err(e) = conn.execute("COMMIT", ()).await {
                    Self::rollback(conn).await;
                    return Err(DatabaseError::sql_execution(format!(
                        "Failed to commit transaction: {}",
                        e
                    ))
                    .into());
                }
                Ok(value)
            }
            Err(e) => {
                Self::rollback(conn).await;
                Err(e)
            }
        }
    }

    async fn rollback(conn: &Connection) {
        if let Err(e) = conn.execute("ROLLBACK", ()).await {
            tracing::warn!("Failed to roll back transaction: {}", e);
        }
    }
}
