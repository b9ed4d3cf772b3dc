// src/checker/result.rs
// =============================================================================
// The data that comes out of a link audit.
//
// - LinkStatus: the verdict for one link
// - LinkCheckResult: one link, its label, verdict and diagnostics
// - AuditReport: every result from one scope, in page order
//
// Results are built once and never changed afterwards, so the constructors
// below are the only places a verdict is decided.
// =============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// Health verdict for a single link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    /// Nothing for a human to do (this includes suppressed, known-benign failures)
    Ok,
    /// The server answered with a failing status code
    Broken,
    /// The probe ran out of time on its final attempt
    Timeout,
    /// The link could not be checked at all
    Error,
}

impl LinkStatus {
    pub fn is_failure(self) -> bool {
        !matches!(self, LinkStatus::Ok)
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkStatus::Ok => "ok",
            LinkStatus::Broken => "broken",
            LinkStatus::Timeout => "timeout",
            LinkStatus::Error => "error",
        };
        f.write_str(name)
    }
}

/// Outcome of checking one anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCheckResult {
    /// Resolved URL that was probed (or the href as written if it was never probed)
    pub url: String,
    /// Best-effort human label for the link
    pub text: String,
    pub status: LinkStatus,
    /// HTTP status of the last response we saw
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Why the link failed, or why a failure was waved through
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LinkCheckResult {
    pub fn ok(url: impl Into<String>, text: impl Into<String>, status_code: Option<u16>) -> Self {
        Self {
            url: url.into(),
            text: text.into(),
            status: LinkStatus::Ok,
            status_code,
            error: None,
        }
    }

    // An ok verdict that still carries a note about what was suppressed
    pub fn suppressed(
        url: impl Into<String>,
        text: impl Into<String>,
        status_code: Option<u16>,
        note: impl Into<String>,
    ) -> Self {
        Self {
            error: Some(note.into()),
            ..Self::ok(url, text, status_code)
        }
    }

    pub fn broken(url: impl Into<String>, text: impl Into<String>, status_code: u16) -> Self {
        Self {
            url: url.into(),
            text: text.into(),
            status: LinkStatus::Broken,
            status_code: Some(status_code),
            error: None,
        }
    }

    pub fn failed(
        url: impl Into<String>,
        text: impl Into<String>,
        status: LinkStatus,
        error: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            text: text.into(),
            status,
            status_code: None,
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        !self.status.is_failure()
    }
}

// One diagnostic line per failing link:
//   "<text>" (<url>) - <status>[: <error>][ (HTTP <statusCode>)]
impl fmt::Display for LinkCheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" ({}) - {}", self.text, self.url, self.status)?;
        if let Some(error) = &self.error {
            write!(f, ": {}", error)?;
        }
        if let Some(code) = self.status_code {
            write!(f, " (HTTP {})", code)?;
        }
        Ok(())
    }
}

/// Every result from one audited scope, in enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub results: Vec<LinkCheckResult>,
}

impl AuditReport {
    pub fn new(results: Vec<LinkCheckResult>) -> Self {
        Self { results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn broken_count(&self) -> usize {
        self.failures().count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &LinkCheckResult> {
        self.results.iter().filter(|result| !result.is_ok())
    }

    pub fn is_healthy(&self) -> bool {
        self.broken_count() == 0
    }
}
