// src/checker/audit.rs
// =============================================================================
// Checking every link in a scope and reporting them together.
//
// How it works:
// 1. Enumerate the visible anchors in scope
// 2. Apply the cap (before any probing starts)
// 3. Classify each anchor; one bad anchor never stops the others
// 4. Collect results in page order into an AuditReport
//
// `assert_healthy` turns a report with failures into one error that lists
// every failing link, so a single run shows all of them at once.
// =============================================================================

use crate::browser::{Page, PageError};
use crate::checker::classify::LinkClassifier;
use crate::checker::enumerate::{enumerate, AnchorRef, Scope};
use crate::checker::extract::read_href;
use crate::checker::http::Prober;
use crate::checker::result::{AuditReport, LinkCheckResult, LinkStatus};
use crate::config::AuditConfig;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("could not enumerate links in {scope}: {source}")]
    Enumerate {
        scope: Scope,
        #[source]
        source: PageError,
    },

    #[error("Found {} broken links in {}:\n{}", .report.broken_count(), .scope, failure_lines(.report))]
    BrokenLinks { scope: Scope, report: AuditReport },
}

impl AuditError {
    /// The report behind a `BrokenLinks` failure.
    pub fn report(&self) -> Option<&AuditReport> {
        match self {
            AuditError::BrokenLinks { report, .. } => Some(report),
            AuditError::Enumerate { .. } => None,
        }
    }
}

fn failure_lines(report: &AuditReport) -> String {
    report
        .failures()
        .map(|result| result.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct Auditor<'a, P: ?Sized, H: ?Sized> {
    page: &'a P,
    prober: &'a H,
    config: &'a AuditConfig,
}

impl<'a, P, H> Auditor<'a, P, H>
where
    P: Page + ?Sized,
    H: Prober + ?Sized,
{
    pub fn new(page: &'a P, prober: &'a H, config: &'a AuditConfig) -> Self {
        Self { page, prober, config }
    }

    // Checks the links in `scope`.
    //
    // `max_links` defaults to `page_link_cap` for whole-page scans and to
    // no cap for sections.
    pub async fn audit(&self, scope: &Scope, max_links: Option<usize>) -> Result<AuditReport, AuditError> {
        let mut anchors = enumerate(self.page, scope, self.config)
            .await
            .map_err(|source| AuditError::Enumerate {
                scope: scope.clone(),
                source,
            })?;

        let cap = max_links.or(match scope {
            Scope::Page => Some(self.config.page_link_cap),
            Scope::Section(_) => None,
        });
        if let Some(cap) = cap {
            if anchors.len() > cap {
                tracing::info!(%scope, found = anchors.len(), cap, "capping links to check");
                anchors.truncate(cap);
            }
        }

        tracing::info!(%scope, links = anchors.len(), "checking links");

        // `buffered` (not `buffer_unordered`) so results come back in
        // enumeration order whatever order the probes finish in
        let classifier = &LinkClassifier::new(self.page, self.prober, self.config);
        let page = self.page;
        let budget = self.config.text_step_budget();
        let results: Vec<LinkCheckResult> = stream::iter(anchors.iter().enumerate())
            .map(move |(position, anchor)| classify_guarded(classifier, page, budget, position, anchor))
            .buffered(self.config.effective_concurrency())
            .collect()
            .await;

        let report = AuditReport::new(results);
        tracing::info!(%scope, checked = report.len(), broken = report.broken_count(), "audit finished");
        Ok(report)
    }

    // Same as `audit`, but any failing link turns into an error
    pub async fn assert_healthy(&self, scope: &Scope, max_links: Option<usize>) -> Result<AuditReport, AuditError> {
        let report = self.audit(scope, max_links).await?;
        if report.is_healthy() {
            Ok(report)
        } else {
            Err(AuditError::BrokenLinks {
                scope: scope.clone(),
                report,
            })
        }
    }
}

// A panic inside one classification (a misbehaving page implementation,
// say) is recorded against that anchor and the scan carries on. The result
// names the anchor by its href when that can still be read, and by its
// position on the page otherwise.
async fn classify_guarded<P, H>(
    classifier: &LinkClassifier<'_, P, H>,
    page: &P,
    budget: Duration,
    position: usize,
    anchor: &AnchorRef,
) -> LinkCheckResult
where
    P: Page + ?Sized,
    H: Prober + ?Sized,
{
    let panic = match AssertUnwindSafe(classifier.classify(anchor)).catch_unwind().await {
        Ok(result) => return result,
        Err(panic) => panic,
    };

    let reason = panic_message(panic.as_ref());
    tracing::warn!(?anchor, position, %reason, "link check panicked");

    let href = match AssertUnwindSafe(read_href(page, anchor.handle(), budget))
        .catch_unwind()
        .await
    {
        Ok(Ok(Some(href))) => href,
        _ => String::new(),
    };

    LinkCheckResult::failed(
        href,
        format!("Link #{}", position + 1),
        LinkStatus::Error,
        format!("link check aborted: {}", reason),
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
