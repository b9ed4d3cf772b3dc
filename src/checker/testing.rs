// Test doubles for the page and prober seams.
//
// ScriptedProber answers from per-URL queues and records every call.
// ScriptedPage serves a fixed list of anchors whose DOM queries can be told
// to hang or fail, which a static HTML page can never do.

use crate::browser::{ElementHandle, Page, PageError};
use crate::checker::http::{ProbeError, ProbeResponse, Prober};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use url::Url;

type Outcome = Result<ProbeResponse, ProbeError>;

// The last queued outcome for a URL repeats forever
#[derive(Default)]
pub(crate) struct ScriptedProber {
    outcomes: Mutex<HashMap<String, VecDeque<Outcome>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProber {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, url: &str, outcome: Outcome) {
        self.outcomes
            .lock()
            .entry(url.to_string())
            .or_default()
            .push_back(outcome);
    }

    pub(crate) fn push_status(&self, url: &str, status: u16) {
        self.push(url, Ok(ProbeResponse::new(status, Url::parse(url).unwrap())));
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn get(&self, url: &Url) -> Result<ProbeResponse, ProbeError> {
        self.calls.lock().push(url.to_string());
        let mut outcomes = self.outcomes.lock();
        match outcomes.get_mut(url.as_str()) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Err(ProbeError::Transport(format!("no scripted response for {}", url))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Query {
    #[default]
    Answers,
    Hangs,
    Fails,
    Panics,
}

#[derive(Debug, Clone)]
pub(crate) struct FakeAnchor {
    pub(crate) attributes: HashMap<String, String>,
    pub(crate) inner_text: Option<String>,
    pub(crate) text_content: Option<String>,
    pub(crate) visible: bool,
    pub(crate) visibility_query: Query,
    pub(crate) inner_text_query: Query,
    pub(crate) href_query: Query,
}

impl FakeAnchor {
    pub(crate) fn link(href: &str, text: &str) -> Self {
        let mut attributes = HashMap::new();
        attributes.insert("href".to_string(), href.to_string());
        Self {
            attributes,
            inner_text: Some(text.to_string()),
            text_content: Some(text.to_string()),
            visible: true,
            visibility_query: Query::Answers,
            inner_text_query: Query::Answers,
            href_query: Query::Answers,
        }
    }

    pub(crate) fn without_href(text: &str) -> Self {
        let mut anchor = Self::link("", text);
        anchor.attributes.clear();
        anchor
    }

    pub(crate) fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub(crate) fn text(mut self, inner: Option<&str>, content: Option<&str>) -> Self {
        self.inner_text = inner.map(str::to_string);
        self.text_content = content.map(str::to_string);
        self
    }

    pub(crate) fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

pub(crate) struct ScriptedPage {
    url: Url,
    anchors: Vec<FakeAnchor>,
}

impl ScriptedPage {
    pub(crate) fn new(url: &str, anchors: Vec<FakeAnchor>) -> Self {
        Self {
            url: Url::parse(url).unwrap(),
            anchors,
        }
    }

    async fn query<T>(&self, element: ElementHandle, query: Query, value: T) -> Result<T, PageError> {
        match query {
            Query::Answers => Ok(value),
            Query::Hangs => std::future::pending().await,
            Query::Fails => Err(PageError::Unreadable(format!("element {} detached", element.index))),
            Query::Panics => panic!("element {} blew up", element.index),
        }
    }

    fn anchor(&self, element: ElementHandle) -> Result<&FakeAnchor, PageError> {
        self.anchors.get(element.index).ok_or(PageError::StaleElement)
    }
}

#[async_trait]
impl Page for ScriptedPage {
    fn current_url(&self) -> Url {
        self.url.clone()
    }

    async fn navigate(&self, url: &Url) -> Result<(), PageError> {
        Err(PageError::Navigation {
            url: url.to_string(),
            reason: "scripted pages do not navigate".to_string(),
        })
    }

    async fn locate(
        &self,
        selector: &str,
        within: Option<&str>,
    ) -> Result<Vec<ElementHandle>, PageError> {
        // "[[" stands in for any selector a real page would refuse to parse
        if let Some(bad) = std::iter::once(selector).chain(within).find(|s| s.contains("[[")) {
            return Err(PageError::InvalidSelector(bad.to_string()));
        }
        Ok((0..self.anchors.len()).map(|index| ElementHandle::new(0, index)).collect())
    }

    async fn is_visible(&self, element: ElementHandle) -> Result<bool, PageError> {
        let anchor = self.anchor(element)?;
        self.query(element, anchor.visibility_query, anchor.visible).await
    }

    async fn attribute(
        &self,
        element: ElementHandle,
        name: &str,
    ) -> Result<Option<String>, PageError> {
        let anchor = self.anchor(element)?;
        let query = if name == "href" { anchor.href_query } else { Query::Answers };
        self.query(element, query, anchor.attributes.get(name).cloned()).await
    }

    async fn text_content(&self, element: ElementHandle) -> Result<Option<String>, PageError> {
        let anchor = self.anchor(element)?;
        Ok(anchor.text_content.clone())
    }

    async fn inner_text(&self, element: ElementHandle) -> Result<Option<String>, PageError> {
        let anchor = self.anchor(element)?;
        self.query(element, anchor.inner_text_query, anchor.inner_text.clone()).await
    }
}
