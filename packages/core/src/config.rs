/// Configuration for the content store
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Upper bound for a single page listing, regardless of configuration
const MAX_SUPPORTED_PAGE_SIZE: u32 = 1000;

/// Store configuration.
///
/// Hosts usually deserialize this from their own configuration file; the
/// development binaries build it with [`StoreConfig::from_env`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the database file
    pub database_path: PathBuf,

    /// How long a connection waits on a locked database before failing
    pub busy_timeout_ms: u64,

    /// Page size used when a caller does not ask for one
    pub default_page_size: u32,

    /// Largest page size a caller may request
    pub max_page_size: u32,

    /// Largest markdown body the renderer accepts
    pub max_body_bytes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("./data/docspace.db"),
            busy_timeout_ms: 5000,
            default_page_size: 20,
            max_page_size: 100,
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl StoreConfig {
    /// Default configuration pointing at `path`
    pub fn with_path(path: impl AsRef<Path>) -> Self {
        Self {
            database_path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Defaults overlaid with `DOCSPACE_DATABASE_PATH`, `DOCSPACE_BUSY_TIMEOUT_MS`
    /// and `DOCSPACE_PAGE_SIZE` when set.
    pub fn from_env() -> Result<Self, String> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("DOCSPACE_DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Ok(timeout) = std::env::var("DOCSPACE_BUSY_TIMEOUT_MS") {
            config.busy_timeout_ms = timeout
                .parse()
                .map_err(|e| format!("invalid DOCSPACE_BUSY_TIMEOUT_MS '{}': {}", timeout, e))?;
        }
        if let Ok(size) = std::env::var("DOCSPACE_PAGE_SIZE") {
            config.default_page_size = size
                .parse()
                .map_err(|e| format!("invalid DOCSPACE_PAGE_SIZE '{}': {}", size, e))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.database_path.as_os_str().is_empty() {
            return Err("database_path cannot be empty".to_string());
        }

        if self.busy_timeout_ms == 0 {
            return Err("busy_timeout_ms must be greater than 0".to_string());
        }

        if self.default_page_size == 0 || self.max_page_size == 0 {
            return Err("page sizes must be greater than 0".to_string());
        }

        if self.max_page_size > MAX_SUPPORTED_PAGE_SIZE {
            return Err(format!(
                "max_page_size cannot exceed {}",
                MAX_SUPPORTED_PAGE_SIZE
            ));
        }

        if self.default_page_size > self.max_page_size {
            return Err("default_page_size cannot exceed max_page_size".to_string());
        }

        if self.max_body_bytes == 0 {
            return Err("max_body_bytes must be greater than 0".to_string());
        }

        Ok(())
    }
}
