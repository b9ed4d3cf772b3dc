// src/checker/extract.rs
// =============================================================================
// Reading an anchor's href and a human label for it.
//
// The label comes from an ordered fallback pipeline; the first step that
// yields non-blank text wins:
//   1. rendered text (what a user sees)
//   2. raw text content
//   3. aria-label attribute
//   4. title attribute
//   5. something derived from the href path ("/red-wine" -> "red wine")
//   6. the literal "Link"
//
// Each DOM step gets its own time budget. A slow or broken element only makes
// the label worse; it never stops the link from being checked.
// =============================================================================

use crate::browser::{ElementHandle, Page, PageError};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use url::Url;

const FALLBACK_LABEL: &str = "Link";

#[derive(Debug, Clone, Copy)]
enum TextSource {
    InnerText,
    TextContent,
    Attribute(&'static str),
}

const TEXT_PIPELINE: &[TextSource] = &[
    TextSource::InnerText,
    TextSource::TextContent,
    TextSource::Attribute("aria-label"),
    TextSource::Attribute("title"),
];

/// Why the href could not be read (as opposed to being absent).
#[derive(Debug, Error)]
pub enum HrefError {
    #[error("could not read href: timed out")]
    TimedOut,
    #[error("could not read href: {0}")]
    Page(#[from] PageError),
}

// Reads the href attribute. Blank values count as missing.
pub async fn read_href<P: Page + ?Sized>(
    page: &P,
    element: ElementHandle,
    budget: Duration,
) -> Result<Option<String>, HrefError> {
    match timeout(budget, page.attribute(element, "href")).await {
        Ok(Ok(href)) => Ok(href
            .map(|href| href.trim().to_string())
            .filter(|href| !href.is_empty())),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(HrefError::TimedOut),
    }
}

pub async fn link_text<P: Page + ?Sized>(
    page: &P,
    element: ElementHandle,
    href: Option<&str>,
    budget: Duration,
) -> String {
    for source in TEXT_PIPELINE {
        match timeout(budget, read_source(page, element, *source)).await {
            Ok(Ok(Some(text))) => {
                let text = crate::browser::collapse_whitespace(&text);
                if !text.is_empty() {
                    return text;
                }
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => tracing::debug!(?source, error = %e, "link text step failed"),
            Err(_) => tracing::debug!(?source, "link text step timed out"),
        }
    }

    href.and_then(text_from_href)
        .unwrap_or_else(|| FALLBACK_LABEL.to_string())
}

async fn read_source<P: Page + ?Sized>(
    page: &P,
    element: ElementHandle,
    source: TextSource,
) -> Result<Option<String>, PageError> {
    match source {
        TextSource::InnerText => page.inner_text(element).await,
        TextSource::TextContent => page.text_content(element).await,
        TextSource::Attribute(name) => page.attribute(element, name).await,
    }
}

// Last non-empty path segment with separators turned into spaces and a
// short file extension dropped. Falls back to the host for bare origins.
fn text_from_href(href: &str) -> Option<String> {
    let trimmed = href.split(['?', '#']).next().unwrap_or_default();

    let (path, host) = match Url::parse(trimmed) {
        Ok(url) => (url.path().to_string(), url.host_str().map(str::to_string)),
        Err(_) => (trimmed.to_string(), None),
    };

    let segment = match path.rsplit('/').find(|segment| !segment.is_empty()) {
        Some(segment) => segment,
        None => return host,
    };

    let stem = match segment.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty() && ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphabetic()) =>
        {
            stem
        }
        _ => segment,
    };

    let label = crate::browser::collapse_whitespace(&stem.replace(['-', '_'], " "));
    if label.is_empty() {
        host
    } else {
        Some(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::testing::{FakeAnchor, Query, ScriptedPage};

    const BUDGET: Duration = Duration::from_millis(50);

    fn handle(index: usize) -> ElementHandle {
        ElementHandle::new(0, index)
    }

    #[test]
    fn test_text_from_href() {
        assert_eq!(text_from_href("/red-wine").as_deref(), Some("red wine"));
        assert_eq!(text_from_href("https://shop.example/about_us.html?x=1").as_deref(), Some("about us"));
        assert_eq!(text_from_href("https://shop.example/").as_deref(), Some("shop.example"));
        assert_eq!(text_from_href("/").as_deref(), None);
        assert_eq!(text_from_href("../v1.20/").as_deref(), Some("v1.20"));
    }

    #[tokio::test]
    async fn test_pipeline_order() {
        let page = ScriptedPage::new(
            "https://shop.example/",
            vec![
                FakeAnchor::link("/a", "Rendered"),
                FakeAnchor::link("/b", "").text(Some("  "), Some(" Raw\n text ")),
                FakeAnchor::link("/c", "").text(None, None).attr("aria-label", "Cart"),
                FakeAnchor::link("/d", "").text(None, None).attr("title", "Titled"),
                FakeAnchor::link("/gift-cards", "").text(None, None),
                FakeAnchor::without_href("").text(None, None),
            ],
        );

        let mut labels = Vec::new();
        for index in 0..6 {
            let href = read_href(&page, handle(index), BUDGET).await.unwrap();
            labels.push(link_text(&page, handle(index), href.as_deref(), BUDGET).await);
        }
        assert_eq!(labels, vec!["Rendered", "Raw text", "Cart", "Titled", "gift cards", "Link"]);
    }

    #[tokio::test]
    async fn test_hanging_step_degrades_to_next() {
        let mut anchor = FakeAnchor::link("/sale", "").text(None, Some("Sale"));
        anchor.inner_text_query = Query::Hangs;
        let page = ScriptedPage::new("https://shop.example/", vec![anchor]);

        let text = link_text(&page, handle(0), Some("/sale"), BUDGET).await;
        assert_eq!(text, "Sale");
    }

    #[tokio::test]
    async fn test_href_read_failures() {
        let mut hangs = FakeAnchor::link("/a", "A");
        hangs.href_query = Query::Hangs;
        let mut fails = FakeAnchor::link("/b", "B");
        fails.href_query = Query::Fails;
        let page = ScriptedPage::new(
            "https://shop.example/",
            vec![hangs, fails, FakeAnchor::link("   ", "C")],
        );

        assert!(matches!(read_href(&page, handle(0), BUDGET).await, Err(HrefError::TimedOut)));
        let error = read_href(&page, handle(1), BUDGET).await.unwrap_err();
        assert_eq!(error.to_string(), "could not read href: element 1 detached");
        assert!(std::error::Error::source(&error).is_some());
        assert_eq!(read_href(&page, handle(2), BUDGET).await.unwrap(), None);
        assert_eq!(HrefError::TimedOut.to_string(), "could not read href: timed out");
    }
}
