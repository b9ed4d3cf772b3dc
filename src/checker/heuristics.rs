// src/checker/heuristics.rs
// =============================================================================
// Rules that decide whether a failing probe actually needs a human.
//
// A plain "is it 2xx" check fails constantly against real sites: CDNs answer
// scripted clients with challenge pages, account links bounce off login
// walls, and social networks reject anything that is not a browser. None of
// those links are broken.
//
// The rules live in two ordered tables, one for responses and one for
// transport errors (the same benign condition can surface either way
// depending on the HTTP stack). Tables are evaluated top to bottom and the
// first rule that applies decides. Adding a heuristic means adding a row.
// =============================================================================

use crate::checker::http::{ProbeError, ProbeResponse};
use crate::config::AuditConfig;
use url::Url;

pub const CHALLENGE_NOTE: &str =
    "Cloudflare/bot challenge blocked the probe (link is reachable in a browser)";
pub const AUTH_NOTE: &str = "Authentication required (link leads to a sign-in gated page)";
pub const SOCIAL_NOTE: &str =
    "Social media platform rejects automated requests (link not verifiable by probe)";

// Fingerprints of bot-verification interstitials, matched case-insensitively
const CHALLENGE_BODY_MARKERS: &[&str] = &[
    "cf-browser-verification",
    "challenge-platform",
    "cf_chl_opt",
    "cf-challenge",
    "just a moment...",
    "checking your browser",
    "attention required! | cloudflare",
    "captcha-delivery",
    "px-captcha",
    "_incapsula_resource",
];

const CHALLENGE_HEADERS: &[&str] = &["cf-mitigated", "cf-chl-bypass"];

const CHALLENGE_ERROR_WORDS: &[&str] = &["cloudflare", "challenge", "captcha"];

const LOGIN_URL_MARKERS: &[&str] = &["login", "signin", "sign-in", "sign_in", "logon", "/auth"];

const LOGIN_BODY_MARKERS: &[&str] = &["type=\"password\"", "sign in", "log in"];

const ACCOUNT_PATHS: &[&str] = &["/account", "/my-account", "/login", "/signin", "/sign-in", "/auth"];

/// What a matching rule says about the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Reachable; the failure is an artifact of probing without a browser
    Suppress(&'static str),
    /// Valid by definition; the target is probed only for a better status code
    FollowRedirect,
    Pass,
}

pub struct ResponseRule {
    pub name: &'static str,
    pub applies: fn(&ProbeResponse, &AuditConfig) -> bool,
    pub verdict: Verdict,
}

pub struct ErrorRule {
    pub name: &'static str,
    /// Gets the error message already lowercased
    pub applies: fn(&str, &Url, &AuditConfig) -> bool,
    pub note: &'static str,
}

pub const RESPONSE_RULES: &[ResponseRule] = &[
    ResponseRule {
        name: "bot-challenge",
        applies: is_challenge_response,
        verdict: Verdict::Suppress(CHALLENGE_NOTE),
    },
    ResponseRule {
        name: "auth-gate",
        applies: is_auth_gate_response,
        verdict: Verdict::Suppress(AUTH_NOTE),
    },
    ResponseRule {
        name: "redirect",
        applies: |response, _| (300..400).contains(&response.status),
        verdict: Verdict::FollowRedirect,
    },
    ResponseRule {
        name: "social-bot-block",
        applies: |response, config| response.status == 400 && is_social_url(&response.url, config),
        verdict: Verdict::Suppress(SOCIAL_NOTE),
    },
    ResponseRule {
        name: "success",
        applies: |response, _| (200..400).contains(&response.status),
        verdict: Verdict::Pass,
    },
];

pub const ERROR_RULES: &[ErrorRule] = &[
    ErrorRule {
        name: "bot-challenge",
        applies: |message, _, _| contains_any(message, CHALLENGE_ERROR_WORDS),
        note: CHALLENGE_NOTE,
    },
    ErrorRule {
        name: "auth-gate",
        applies: |message, url, _| {
            contains_any(message, &["401", "403", "unauthorized", "forbidden"]) && is_account_path(url)
        },
        note: AUTH_NOTE,
    },
    ErrorRule {
        name: "social-bot-block",
        applies: |message, url, config| {
            contains_any(message, &["400", "bad request"]) && is_social_url(url, config)
        },
        note: SOCIAL_NOTE,
    },
];

// First response rule that applies, or None when the link is broken
pub fn judge_response(response: &ProbeResponse, config: &AuditConfig) -> Option<&'static ResponseRule> {
    RESPONSE_RULES
        .iter()
        .find(|rule| (rule.applies)(response, config))
}

// First error rule that applies, or None when the error stands
pub fn judge_error(error: &ProbeError, url: &Url, config: &AuditConfig) -> Option<&'static ErrorRule> {
    let message = error.message().to_lowercase();
    ERROR_RULES
        .iter()
        .find(|rule| (rule.applies)(&message, url, config))
}

fn is_challenge_response(response: &ProbeResponse, _: &AuditConfig) -> bool {
    if matches!(response.status, 403 | 503) {
        return true;
    }
    if CHALLENGE_HEADERS.iter().any(|name| response.header(name).is_some()) {
        return true;
    }
    // Healthy pages behind a CDN embed the same scripts, so body markers
    // only count on a failing status
    !(200..400).contains(&response.status)
        && contains_any(&response.body.to_lowercase(), CHALLENGE_BODY_MARKERS)
}

fn is_auth_gate_response(response: &ProbeResponse, _: &AuditConfig) -> bool {
    match response.status {
        401 => true,
        403 => {
            let location = format!(
                "{}?{}",
                response.url.path(),
                response.url.query().unwrap_or_default()
            )
            .to_lowercase();
            contains_any(&location, LOGIN_URL_MARKERS)
                || contains_any(&response.body.to_lowercase(), LOGIN_BODY_MARKERS)
        }
        _ => false,
    }
}

fn is_account_path(url: &Url) -> bool {
    contains_any(&url.path().to_lowercase(), ACCOUNT_PATHS)
}

fn is_social_url(url: &Url, config: &AuditConfig) -> bool {
    url.host_str().map_or(false, |host| config.is_social_host(host))
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
