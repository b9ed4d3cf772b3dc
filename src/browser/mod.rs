// src/browser/mod.rs
// =============================================================================
// The page capability the link checker runs against.
//
// A real browser is out of our hands: we only need a handful of things from
// it (where am I, find elements, is this one visible, read an attribute, read
// its text). The `Page` trait names exactly those operations so the checker
// never depends on how the DOM is produced.
//
// Element handles are opaque and tied to the page generation they came from.
// Navigating (and, for `HtmlPage`, every new `locate`) bumps the generation,
// so an older handle fails with `PageError::StaleElement` instead of silently
// reading the wrong element.
// =============================================================================

mod html;

pub use html::HtmlPage;
pub(crate) use html::collapse_whitespace;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Opaque reference to one element located on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    pub(crate) generation: u64,
    pub(crate) index: usize,
}

impl ElementHandle {
    pub(crate) fn new(generation: u64, index: usize) -> Self {
        Self { generation, index }
    }
}

#[derive(Debug, Error)]
pub enum PageError {
    #[error("invalid selector '{0}'")]
    InvalidSelector(String),

    #[error("element handle is stale (the page navigated or was scanned again)")]
    StaleElement,

    #[error("failed to load {url}: {reason}")]
    Navigation { url: String, reason: String },

    #[error("{0}")]
    Unreadable(String),
}

// Everything the checker needs from the browser runtime.
//
// Methods are async because a real browser answers over a protocol
// connection; callers wrap each call in their own time budget.
#[async_trait]
pub trait Page: Send + Sync {
    /// URL of the document currently loaded (after redirects).
    fn current_url(&self) -> Url;

    /// Load a new document. Invalidates every handle located so far.
    async fn navigate(&self, url: &Url) -> Result<(), PageError>;

    /// Find elements matching `selector`, optionally only inside elements
    /// matching `within`. Results are in document order without duplicates.
    async fn locate(&self, selector: &str, within: Option<&str>)
        -> Result<Vec<ElementHandle>, PageError>;

    async fn is_visible(&self, element: ElementHandle) -> Result<bool, PageError>;

    async fn attribute(&self, element: ElementHandle, name: &str)
        -> Result<Option<String>, PageError>;

    /// Raw text of the element and all its descendants.
    async fn text_content(&self, element: ElementHandle) -> Result<Option<String>, PageError>;

    /// Text a user would see: hidden descendants, scripts and styles left out.
    async fn inner_text(&self, element: ElementHandle) -> Result<Option<String>, PageError>;
}
