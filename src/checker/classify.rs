// src/checker/classify.rs
// =============================================================================
// Turning one anchor into one LinkCheckResult.
//
// Steps, in order:
// 1. Read href and a label (see extract.rs). No href -> error "missing href"
// 2. mailto:, tel:, javascript: and #fragment links pass without a probe
// 3. Resolve the href against the page URL
// 4. Probe it (one retry on transport failure)
// 5. Run the response through the rule table in heuristics.rs
// 6. Or, if no response came back, run the error through the error table
//
// `classify` never fails. Anything that goes wrong becomes part of the result.
// =============================================================================

use crate::browser::Page;
use crate::checker::enumerate::AnchorRef;
use crate::checker::extract::{link_text, read_href};
use crate::checker::heuristics::{self, Verdict};
use crate::checker::http::{probe_with_retry, ProbeError, ProbeResponse, Prober};
use crate::checker::result::{LinkCheckResult, LinkStatus};
use crate::config::AuditConfig;
use url::Url;

// Targets that are not reachability targets at all
const TRIVIAL_PREFIXES: &[&str] = &["mailto:", "tel:", "javascript:", "#"];

pub fn is_trivial_href(href: &str) -> bool {
    let href = href.to_ascii_lowercase();
    TRIVIAL_PREFIXES.iter().any(|prefix| href.starts_with(prefix))
}

pub struct LinkClassifier<'a, P: ?Sized, H: ?Sized> {
    page: &'a P,
    prober: &'a H,
    config: &'a AuditConfig,
}

impl<'a, P, H> LinkClassifier<'a, P, H>
where
    P: Page + ?Sized,
    H: Prober + ?Sized,
{
    pub fn new(page: &'a P, prober: &'a H, config: &'a AuditConfig) -> Self {
        Self { page, prober, config }
    }

    pub async fn classify(&self, anchor: &AnchorRef) -> LinkCheckResult {
        let element = anchor.handle();
        let budget = self.config.text_step_budget();

        let href = read_href(self.page, element, budget).await;
        let known_href = href.as_ref().ok().and_then(|href| href.as_deref());
        let text = link_text(self.page, element, known_href, budget).await;

        let href = match href {
            Ok(Some(href)) => href,
            Ok(None) => return LinkCheckResult::failed("", text, LinkStatus::Error, "missing href"),
            Err(e) => return LinkCheckResult::failed("", text, LinkStatus::Error, e.to_string()),
        };

        if is_trivial_href(&href) {
            return LinkCheckResult::ok(href, text, None);
        }

        let url = match self.page.current_url().join(&href) {
            Ok(url) => url,
            Err(e) => {
                return LinkCheckResult::failed(
                    href,
                    text,
                    LinkStatus::Error,
                    format!("invalid URL: {}", e),
                )
            }
        };

        self.probe(url, text).await
    }

    // Steps 4 to 6 for an already resolved URL
    pub async fn probe(&self, url: Url, text: String) -> LinkCheckResult {
        match probe_with_retry(self.prober, &url, self.config.retry_delay()).await {
            Ok(response) => self.judge_response(url, text, response).await,
            Err(error) => self.judge_error(url, text, error),
        }
    }

    async fn judge_response(&self, url: Url, text: String, response: ProbeResponse) -> LinkCheckResult {
        let status = response.status;
        let rule = match heuristics::judge_response(&response, self.config) {
            Some(rule) => rule,
            None => {
                tracing::debug!(%url, status, "broken link");
                return LinkCheckResult::broken(url, text, status);
            }
        };

        match rule.verdict {
            Verdict::Suppress(note) => {
                tracing::info!(%url, status, rule = rule.name, "failure suppressed");
                LinkCheckResult::suppressed(url, text, Some(status), note)
            }
            Verdict::FollowRedirect => {
                let code = self.redirect_target_status(&response).await.unwrap_or(status);
                LinkCheckResult::ok(url, text, Some(code))
            }
            Verdict::Pass => LinkCheckResult::ok(url, text, Some(status)),
        }
    }

    fn judge_error(&self, url: Url, text: String, error: ProbeError) -> LinkCheckResult {
        if let Some(rule) = heuristics::judge_error(&error, &url, self.config) {
            tracing::info!(%url, error = %error, rule = rule.name, "failure suppressed");
            let note = format!("{} ({})", rule.note, error.message());
            return LinkCheckResult::suppressed(url, text, None, note);
        }

        let status = if error.is_timeout() {
            LinkStatus::Timeout
        } else {
            LinkStatus::Error
        };
        tracing::debug!(%url, %status, error = %error, "probe failed");
        LinkCheckResult::failed(url, text, status, error.message())
    }

    // A redirect is fine whatever happens here; the target is probed once,
    // only to report where the link ends up
    async fn redirect_target_status(&self, response: &ProbeResponse) -> Option<u16> {
        let target = response.location()?;
        match self.prober.get(&target).await {
            Ok(landing) => Some(landing.status),
            Err(e) => {
                tracing::debug!(%target, error = %e, "redirect target probe failed");
                None
            }
        }
    }
}
