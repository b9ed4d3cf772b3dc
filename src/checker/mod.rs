// src/checker/mod.rs
// =============================================================================
// This module contains all link checking logic.
//
// Submodules, leaves first:
// - enumerate: finds the visible anchors in a scope
// - extract: reads an anchor's href and a human label for it
// - http: probes a URL (with one retry)
// - heuristics: ordered rules that wave through known-benign failures
// - classify: one anchor in, one LinkCheckResult out
// - audit: runs classify over a whole scope and aggregates
// - navigate: follows the first few navigation links
// - result: the types all of the above produce
// =============================================================================

mod audit;
mod classify;
mod enumerate;
mod extract;
mod heuristics;
mod http;
mod navigate;
mod result;

#[cfg(test)]
pub(crate) mod testing;

pub use audit::{AuditError, Auditor};
pub use classify::{is_trivial_href, LinkClassifier};
pub use enumerate::{enumerate, AnchorRef, Scope, ANCHOR_SELECTOR};
pub use heuristics::{
    judge_error, judge_response, ErrorRule, ResponseRule, Verdict, AUTH_NOTE, CHALLENGE_NOTE,
    ERROR_RULES, RESPONSE_RULES, SOCIAL_NOTE,
};
pub use http::{probe_with_retry, ProbeError, ProbeResponse, Prober, ReqwestProber};
pub use navigate::{verify_navigation, NavigationCheck, NAVIGATION_SELECTOR};
pub use result::{AuditReport, LinkCheckResult, LinkStatus};
