//! Database Layer
//!
//! This module handles all database interactions using libsql:
//!
//! - Database initialization and connection management
//! - Idempotent schema creation (`spaces`, `page_nodes`, `page_contents`, `revisions`)
//! - `BEGIN IMMEDIATE` transaction helpers for multi-row writes
//! - Row decoding into models
//!
//! Business rules live in [`crate::services`]; this layer only knows SQL.

mod database;
mod error;
pub mod rows;

pub use database::DatabaseService;
pub use error::DatabaseError;
