//! Markdown rendering and sanitization
//!
//! Content bodies are stored as markdown and rendered to HTML once, on write.
//! Read paths never invoke the renderer.
//!
//! Sanitization works on the event stream rather than on the produced HTML:
//! raw HTML (block or inline) is re-emitted as text so it comes out escaped,
//! and link/image destinations using script-capable schemes are replaced.

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};
use thiserror::Error;

/// URL schemes that can execute script or smuggle markup when followed
const BLOCKED_SCHEMES: [&str; 3] = ["javascript:", "vbscript:", "data:"];

/// Default input limit (1 MiB)
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Renderer failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Markdown body is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("Rendering failed: {0}")]
    Failed(String),
}

/// Markdown → sanitized HTML
///
/// Implemented for plain functions and closures, so a caller can inject
/// `|md: &str| Ok(md.to_string())` where a real renderer is not wanted.
pub trait ContentRenderer: Send + Sync {
    fn render(&self, markdown: &str) -> Result<String, RenderError>;
}

impl<F> ContentRenderer for F
where
    F: Fn(&str) -> Result<String, RenderError> + Send + Sync,
{
    fn render(&self, markdown: &str) -> Result<String, RenderError> {
        self(markdown)
    }
}

/// CommonMark + GFM tables, strikethrough, task lists and footnotes
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    options: Options,
    max_body_bytes: usize,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::with_limit(DEFAULT_MAX_BODY_BYTES)
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(max_body_bytes: usize) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_FOOTNOTES);

        Self {
            options,
            max_body_bytes,
        }
    }
}

impl ContentRenderer for MarkdownRenderer {
    fn render(&self, markdown: &str) -> Result<String, RenderError> {
        if markdown.len() > self.max_body_bytes {
            return Err(RenderError::TooLarge {
                size: markdown.len(),
                limit: self.max_body_bytes,
            });
        }

        let parser = Parser::new_ext(markdown, self.options).map(sanitize_event);

        let mut output = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut output, parser);
        Ok(output)
    }
}

fn sanitize_event(event: Event<'_>) -> Event<'_> {
    match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: sanitize_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: sanitize_url(dest_url),
            title,
            id,
        }),
        other => other,
    }
}

fn sanitize_url(url: CowStr<'_>) -> CowStr<'_> {
    // Browsers ignore embedded whitespace and control characters in schemes
    let normalized: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .flat_map(char::to_lowercase)
        .collect();

    if BLOCKED_SCHEMES
        .iter()
        .any(|scheme| normalized.starts_with(scheme))
    {
        CowStr::Borrowed("#")
    } else {
        url
    }
}
