// src/checker/enumerate.rs
// =============================================================================
// Finding the anchors worth checking.
//
// "Worth checking" means what a user could plausibly click: every `a[href]`
// in scope that can be confirmed visible within a short budget. An element
// that errors or stalls during that probe is skipped, never fatal.
//
// The full list is collected before any link is classified, so nothing that
// happens later (slow probes, another navigation) changes what was found.
// =============================================================================

use crate::browser::{ElementHandle, Page, PageError};
use crate::config::AuditConfig;
use std::fmt;
use tokio::time::timeout;

pub const ANCHOR_SELECTOR: &str = "a[href]";

/// Which part of the page an audit looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Page,
    /// Only anchors inside elements matching this CSS selector
    Section(String),
}

impl Scope {
    pub fn section(selector: impl Into<String>) -> Self {
        Scope::Section(selector.into())
    }

    fn within(&self) -> Option<&str> {
        match self {
            Scope::Page => None,
            Scope::Section(selector) => Some(selector),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Page => f.write_str("whole page"),
            Scope::Section(selector) => write!(f, "section '{}'", selector),
        }
    }
}

/// A visible anchor found by one scan. Stale once the page navigates or is scanned again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorRef {
    handle: ElementHandle,
}

impl AnchorRef {
    pub(crate) fn new(handle: ElementHandle) -> Self {
        Self { handle }
    }

    pub(crate) fn handle(&self) -> ElementHandle {
        self.handle
    }
}

// Lists the visible anchors in `scope`, in document order.
//
// Only a scope selector that cannot be parsed fails the whole call.
pub async fn enumerate<P: Page + ?Sized>(
    page: &P,
    scope: &Scope,
    config: &AuditConfig,
) -> Result<Vec<AnchorRef>, PageError> {
    let candidates = page.locate(ANCHOR_SELECTOR, scope.within()).await?;
    let budget = config.visibility_budget();

    let mut anchors = Vec::with_capacity(candidates.len());
    for handle in candidates {
        match timeout(budget, page.is_visible(handle)).await {
            Ok(Ok(true)) => anchors.push(AnchorRef::new(handle)),
            Ok(Ok(false)) => {}
            Ok(Err(e)) => tracing::debug!(?handle, error = %e, "skipping unreadable anchor"),
            Err(_) => tracing::debug!(?handle, "skipping anchor, visibility check timed out"),
        }
    }

    tracing::debug!(%scope, found = anchors.len(), "anchors enumerated");
    Ok(anchors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::HtmlPage;
    use crate::checker::testing::{FakeAnchor, Query, ScriptedPage};
    use url::Url;

    fn fast_config() -> AuditConfig {
        AuditConfig {
            visibility_budget_ms: 50,
            ..AuditConfig::default()
        }
    }

    #[tokio::test]
    async fn test_unstable_anchors_are_skipped() {
        let mut stalls = FakeAnchor::link("/stalls", "Stalls");
        stalls.visibility_query = Query::Hangs;
        let mut detached = FakeAnchor::link("/detached", "Detached");
        detached.visibility_query = Query::Fails;

        let page = ScriptedPage::new(
            "https://shop.example/",
            vec![
                FakeAnchor::link("/first", "First"),
                stalls,
                FakeAnchor::link("/hidden", "Hidden").hidden(),
                detached,
                FakeAnchor::link("/last", "Last"),
            ],
        );

        let anchors = enumerate(&page, &Scope::Page, &fast_config()).await.unwrap();
        let indexes: Vec<usize> = anchors.iter().map(|anchor| anchor.handle().index).collect();
        assert_eq!(indexes, vec![0, 4]);
    }

    #[tokio::test]
    async fn test_bad_scope_selector_fails() {
        let page = ScriptedPage::new("https://shop.example/", vec![]);
        let result = enumerate(&page, &Scope::section("[["), &fast_config()).await;
        assert!(matches!(result, Err(PageError::InvalidSelector(ref s)) if s == "[["));

        let page = HtmlPage::from_html(
            Url::parse("https://shop.example/").unwrap(),
            r#"<footer><a href="/contact">Contact</a></footer>"#,
        );
        let result = enumerate(&page, &Scope::section("footer[["), &fast_config()).await;
        assert!(matches!(result, Err(PageError::InvalidSelector(_))));
    }

    #[tokio::test]
    async fn test_icon_only_links_are_visible() {
        let page = HtmlPage::from_html(
            Url::parse("https://shop.example/").unwrap(),
            r#"<footer>
                 <a href="https://www.facebook.com/shop" aria-label="Facebook"><i class="fab fa-facebook"></i></a>
                 <a href="https://twitter.com/shop" title="Twitter"><span class="icon-twitter"></span></a>
                 <a href="https://www.instagram.com/shop"><i class="icon-instagram"></i></a>
                 <a href="/contact">Contact</a>
                 <a href="/empty"></a>
                 <a href="/ghost"><i class="icon" hidden></i></a>
               </footer>"#,
        );

        let anchors = enumerate(&page, &Scope::section("footer"), &fast_config()).await.unwrap();
        let mut hrefs = Vec::new();
        for anchor in &anchors {
            hrefs.push(page.attribute(anchor.handle(), "href").await.unwrap().unwrap());
        }
        assert_eq!(
            hrefs,
            vec![
                "https://www.facebook.com/shop",
                "https://twitter.com/shop",
                "https://www.instagram.com/shop",
                "/contact",
            ]
        );
    }

    #[tokio::test]
    async fn test_section_scope_on_html() {
        let page = HtmlPage::from_html(
            Url::parse("https://shop.example/").unwrap(),
            r#"<header><a href="/home">Home</a><a href="/promo" hidden>Promo</a></header>
               <main><a href="/wine">Wine</a></main>
               <footer><a href="/contact">Contact</a></footer>"#,
        );

        let header = enumerate(&page, &Scope::section("header"), &fast_config()).await.unwrap();
        assert_eq!(header.len(), 1);

        let everything = enumerate(&page, &Scope::Page, &fast_config()).await.unwrap();
        assert_eq!(everything.len(), 3);

        let missing = enumerate(&page, &Scope::section("aside"), &fast_config()).await.unwrap();
        assert!(missing.is_empty());
    }
}
