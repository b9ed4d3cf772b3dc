// src/browser/html.rs
// =============================================================================
// A `Page` backed by a fetched HTML document instead of a live browser.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (built on html5ever, Mozilla's HTML parser)
// - Supports CSS selectors for finding elements
//
// `scraper::Html` is not `Send`, so it never lives inside the page. Each call
// to `locate` parses the stored source, takes a snapshot of every matched
// element (attributes, text, visibility) and appends it to the element table.
// Handles are indexes into that table; navigating replaces the table and bumps
// the generation so old handles go stale.
//
// Visibility is decided statically, the way a browser would for markup alone:
// - hidden if the element or an ancestor has the `hidden` attribute
// - hidden if an inline style sets `display: none` or `visibility: hidden`
// - hidden inside <head>, <template>, <noscript>, <script>, <style>
// - an element with no rendered text, no label and no rendered child element
//   has no box to click (icon-font links have a label or an <i>/<span> child)
// =============================================================================

use super::{ElementHandle, Page, PageError};
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use url::Url;

// Elements that never render their content
const NON_RENDERED_TAGS: &[&str] = &["head", "template", "noscript", "script", "style", "title"];

// Attributes that give an otherwise empty element an accessible name
const LABEL_ATTRIBUTES: &[&str] = &["aria-label", "title"];

#[derive(Debug, Clone)]
struct ElementSnapshot {
    attributes: HashMap<String, String>,
    text_content: String,
    inner_text: String,
    visible: bool,
}

#[derive(Debug)]
struct Document {
    url: Url,
    source: String,
    status: Option<u16>,
    generation: u64,
    elements: Vec<ElementSnapshot>,
}

/// A page loaded over plain HTTP and queried through a parsed DOM.
pub struct HtmlPage {
    client: Client,
    document: RwLock<Document>,
}

impl HtmlPage {
    // Creates an empty page (about:blank); call `navigate` to load something
    pub fn new(client: Client) -> Self {
        Self::with_document(client, blank_url(), String::new(), None)
    }

    /// Wraps HTML that is already in memory, as if it had been served from `url`.
    pub fn from_html(url: Url, html: impl Into<String>) -> Self {
        Self::with_document(Client::new(), url, html.into(), None)
    }

    fn with_document(client: Client, url: Url, source: String, status: Option<u16>) -> Self {
        Self {
            client,
            document: RwLock::new(Document {
                url,
                source,
                status,
                generation: 0,
                elements: Vec::new(),
            }),
        }
    }

    /// HTTP status of the last navigation, if the page was loaded over the network.
    pub fn status(&self) -> Option<u16> {
        self.document.read().status
    }

    // Looks up the snapshot behind a handle and applies `read` to it.
    // Fails if the handle belongs to an earlier navigation.
    fn read_element<T>(
        &self,
        element: ElementHandle,
        read: impl FnOnce(&ElementSnapshot) -> T,
    ) -> Result<T, PageError> {
        let document = self.document.read();
        if element.generation != document.generation {
            return Err(PageError::StaleElement);
        }
        document
            .elements
            .get(element.index)
            .map(read)
            .ok_or(PageError::StaleElement)
    }

    // Synchronous half of `locate`. Keeps the non-Send `Html` off the await path.
    fn locate_now(
        &self,
        selector: &str,
        within: Option<&str>,
    ) -> Result<Vec<ElementHandle>, PageError> {
        let target = parse_selector(selector)?;
        let scope = within.map(parse_selector).transpose()?;

        let mut document = self.document.write();
        let html = Html::parse_document(&document.source);

        // Document order; an anchor inside nested sections (a <nav> inside a
        // <header>) is still visited once
        let matches: Vec<ElementRef> = html
            .select(&target)
            .filter(|element| match &scope {
                None => true,
                Some(scope) => {
                    scope.matches(element)
                        || element
                            .ancestors()
                            .filter_map(ElementRef::wrap)
                            .any(|ancestor| scope.matches(&ancestor))
                }
            })
            .collect();

        // Each scan starts a fresh element table; handles from an earlier
        // `locate` go stale along with it
        document.generation += 1;
        document.elements.clear();

        let generation = document.generation;
        let mut handles = Vec::with_capacity(matches.len());
        for element in matches {
            let index = document.elements.len();
            document.elements.push(snapshot(element));
            handles.push(ElementHandle::new(generation, index));
        }

        Ok(handles)
    }
}

#[async_trait]
impl Page for HtmlPage {
    fn current_url(&self) -> Url {
        self.document.read().url.clone()
    }

    async fn navigate(&self, url: &Url) -> Result<(), PageError> {
        let failed = |reason: String| PageError::Navigation {
            url: url.to_string(),
            reason,
        };

        // Like a browser, any HTTP status still loads a document;
        // only transport failures are errors here
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let source = response.text().await.map_err(|e| failed(e.to_string()))?;

        tracing::debug!(url = %final_url, status, "page loaded");

        let mut document = self.document.write();
        document.generation += 1;
        document.url = final_url;
        document.source = source;
        document.status = Some(status);
        document.elements.clear();
        Ok(())
    }

    async fn locate(
        &self,
        selector: &str,
        within: Option<&str>,
    ) -> Result<Vec<ElementHandle>, PageError> {
        self.locate_now(selector, within)
    }

    async fn is_visible(&self, element: ElementHandle) -> Result<bool, PageError> {
        self.read_element(element, |snapshot| snapshot.visible)
    }

    async fn attribute(
        &self,
        element: ElementHandle,
        name: &str,
    ) -> Result<Option<String>, PageError> {
        // html5ever lowercases attribute names while parsing
        let name = name.to_ascii_lowercase();
        self.read_element(element, |snapshot| snapshot.attributes.get(&name).cloned())
    }

    async fn text_content(&self, element: ElementHandle) -> Result<Option<String>, PageError> {
        self.read_element(element, |snapshot| Some(snapshot.text_content.clone()))
    }

    async fn inner_text(&self, element: ElementHandle) -> Result<Option<String>, PageError> {
        self.read_element(element, |snapshot| Some(snapshot.inner_text.clone()))
    }
}

fn blank_url() -> Url {
    // Constant input, so this cannot fail
    Url::parse("about:blank").expect("about:blank is a valid URL")
}

fn parse_selector(selector: &str) -> Result<Selector, PageError> {
    Selector::parse(selector).map_err(|_| PageError::InvalidSelector(selector.to_string()))
}

fn snapshot(element: ElementRef) -> ElementSnapshot {
    let attributes = element
        .value()
        .attrs()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    let text_content: String = element.text().collect();

    let mut inner_text = String::new();
    collect_rendered_text(element, &mut inner_text);
    let inner_text = collapse_whitespace(&inner_text);

    let has_box = !inner_text.is_empty() || has_label(element) || has_rendered_child(element);
    let visible = has_box && !hides_subtree(element) && !element.ancestors().any(|node| {
        ElementRef::wrap(node).map_or(false, hides_subtree)
    });

    ElementSnapshot {
        attributes,
        text_content,
        inner_text,
        visible,
    }
}

// True if this element (and so everything inside it) is not rendered
fn hides_subtree(element: ElementRef) -> bool {
    let value = element.value();
    if NON_RENDERED_TAGS.contains(&value.name()) || value.attr("hidden").is_some() {
        return true;
    }

    match value.attr("style") {
        Some(style) => {
            let style: String = style
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_ascii_lowercase();
            style.contains("display:none") || style.contains("visibility:hidden")
        }
        None => false,
    }
}

fn collect_rendered_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            if hides_subtree(child_element) {
                continue;
            }
            if child_element.value().name() == "br" {
                out.push(' ');
            }
            collect_rendered_text(child_element, out);
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }
}

fn has_label(element: ElementRef) -> bool {
    LABEL_ATTRIBUTES.iter().any(|name| {
        element
            .value()
            .attr(name)
            .map_or(false, |value| !value.trim().is_empty())
    })
}

// An <img>, <svg> or icon-font <i> inside the element gives it a box
fn has_rendered_child(element: ElementRef) -> bool {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .any(|child| child.value().name() != "br" && !hides_subtree(child))
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
