//! Utility functions for DocSpace Core
//!
//! This module provides the content renderer consumed by the content resolver.

mod markdown;

pub use markdown::{ContentRenderer, MarkdownRenderer, RenderError};
