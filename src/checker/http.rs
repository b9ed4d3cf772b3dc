// src/checker/http.rs
// =============================================================================
// This module probes URLs over HTTP.
//
// Key functionality:
// - A `Prober` trait so the classifier can be tested without a network
// - `ReqwestProber`: one GET per probe, bounded timeout, limited redirects
// - `probe_with_retry`: a failed probe is retried once after a short pause,
//   which absorbs a single network blip but still reports a host that is
//   really down
//
// A probe returns status, final URL and headers, plus the start of the body
// for failing responses, because the classifier needs all of them to spot
// challenge pages and login walls. Deciding what the response *means* happens elsewhere.
// =============================================================================

use crate::config::AuditConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, LOCATION};
use reqwest::Client;
use std::error::Error as _;
use std::time::Duration;
use thiserror::Error;
use url::Url;

// How much of a failing response body the heuristics get to look at
const BODY_LIMIT: usize = 64 * 1024;

/// What a probe saw.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: u16,
    /// URL of the final response, after any redirects were followed
    pub url: Url,
    pub headers: HeaderMap,
    pub body: String,
}

impl ProbeResponse {
    pub fn new(status: u16, url: Url) -> Self {
        Self {
            status,
            url,
            headers: HeaderMap::new(),
            body: String::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    // Header names and values that fail to parse are dropped
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Target of a redirect response, resolved against the response URL.
    pub fn location(&self) -> Option<Url> {
        let location = self.headers.get(LOCATION)?.to_str().ok()?;
        self.url.join(location).ok()
    }
}

#[derive(Debug, Clone, Error)]
pub enum ProbeError {
    /// The probe ran past its own time budget
    #[error("{0}")]
    Timeout(String),
    /// Anything else that kept us from getting a response
    #[error("{0}")]
    Transport(String),
}

impl ProbeError {
    pub fn message(&self) -> &str {
        match self {
            ProbeError::Timeout(message) | ProbeError::Transport(message) => message,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ProbeError::Timeout(_))
    }
}

impl From<reqwest::Error> for ProbeError {
    fn from(error: reqwest::Error) -> Self {
        // The URL stays out of the message: the error rules look for words
        // like "challenge" in it, and a path must never be mistaken for one
        let error = error.without_url();
        if error.is_timeout() {
            ProbeError::Timeout(format!("Request timed out: {}", error_chain(&error)))
        } else if error.is_redirect() {
            ProbeError::Transport(format!("Too many redirects: {}", error_chain(&error)))
        } else {
            ProbeError::Transport(error_chain(&error))
        }
    }
}

// reqwest's top-level message is often just "error sending request";
// the interesting part (DNS, TLS, connection reset) lives in the sources.
// reqwest and hyper already fold some causes into their own message, so
// those are not repeated.
fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_message = cause.to_string();
        if !message.contains(&cause_message) {
            message.push_str(": ");
            message.push_str(&cause_message);
        }
        source = cause.source();
    }
    message
}

#[async_trait]
pub trait Prober: Send + Sync {
    async fn get(&self, url: &Url) -> Result<ProbeResponse, ProbeError>;
}

/// Probes with a shared reqwest client (connection pooling across links).
#[derive(Debug, Clone)]
pub struct ReqwestProber {
    client: Client,
}

impl ReqwestProber {
    pub fn new(config: &AuditConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.probe_timeout())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Prober for ReqwestProber {
    async fn get(&self, url: &Url) -> Result<ProbeResponse, ProbeError> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let headers = response.headers().clone();

        // Only failing responses are inspected for challenge or login pages,
        // so a healthy link to a large download is never pulled in
        let body = if (200..400).contains(&status) {
            String::new()
        } else {
            match read_body_prefix(response).await {
                Ok(body) => body,
                // A body we cannot read still leaves a perfectly good status code
                Err(e) => {
                    tracing::debug!(url = %final_url, error = %e, "could not read response body");
                    String::new()
                }
            }
        };

        Ok(ProbeResponse {
            status,
            url: final_url,
            headers,
            body,
        })
    }
}

// Reads at most BODY_LIMIT bytes of the body
async fn read_body_prefix(mut response: reqwest::Response) -> Result<String, reqwest::Error> {
    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        bytes.extend_from_slice(&chunk);
        if bytes.len() >= BODY_LIMIT {
            bytes.truncate(BODY_LIMIT);
            break;
        }
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// Probes `url`, retrying exactly once after `retry_delay` if the first
// attempt fails. The error returned is the one from the second attempt.
pub async fn probe_with_retry<P: Prober + ?Sized>(
    prober: &P,
    url: &Url,
    retry_delay: Duration,
) -> Result<ProbeResponse, ProbeError> {
    match prober.get(url).await {
        Ok(response) => Ok(response),
        Err(first) => {
            tracing::debug!(%url, error = %first, "probe failed, retrying once");
            tokio::time::sleep(retry_delay).await;
            prober.get(url).await
        }
    }
}
