// src/config.rs
// =============================================================================
// Tunables for a link audit.
//
// Every field has a default, so an empty (or missing) config file is valid.
// The CLI loads the file first and then applies its own flags on top:
//   CLI flags > config file > defaults
// =============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Budget for one HTTP probe, redirects included
    pub probe_timeout_ms: u64,
    /// Redirect hops followed before the probe gives up
    pub max_redirects: usize,
    /// Pause before the single retry of a failed probe
    pub retry_delay_ms: u64,
    /// Budget for deciding whether one anchor is visible
    pub visibility_budget_ms: u64,
    /// Budget for each step of the link text fallback chain
    pub text_step_budget_ms: u64,
    /// Default cap on anchors checked in a whole-page audit
    pub page_link_cap: usize,
    /// Links classified at once; results keep page order either way
    pub concurrency: usize,
    pub user_agent: String,
    /// Hosts that reject automated clients with HTTP 400
    pub social_domains: Vec<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 10_000,
            max_redirects: 5,
            retry_delay_ms: 500,
            visibility_budget_ms: 1_000,
            text_step_budget_ms: 500,
            page_link_cap: 100,
            concurrency: 1,
            user_agent: concat!("link-audit/", env!("CARGO_PKG_VERSION")).to_string(),
            social_domains: [
                "facebook.com",
                "twitter.com",
                "x.com",
                "instagram.com",
                "youtube.com",
                "linkedin.com",
                "pinterest.com",
            ]
            .iter()
            .map(|domain| domain.to_string())
            .collect(),
        }
    }
}

impl AuditConfig {
    /// Reads a TOML config file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn visibility_budget(&self) -> Duration {
        Duration::from_millis(self.visibility_budget_ms)
    }

    pub fn text_step_budget(&self) -> Duration {
        Duration::from_millis(self.text_step_budget_ms)
    }

    // Never let a zero from the config stall the auditor's stream
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }

    // True if `host` is one of the social domains or a subdomain of one
    pub fn is_social_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.social_domains.iter().any(|domain| {
            host == *domain || host.ends_with(&format!(".{}", domain))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AuditConfig = toml::from_str("probe_timeout_ms = 2500\nconcurrency = 4").unwrap();
        assert_eq!(config.probe_timeout(), Duration::from_millis(2500));
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.max_redirects, 5);
        assert_eq!(config.page_link_cap, 100);
    }

    #[test]
    fn test_social_host_matching() {
        let config = AuditConfig::default();
        assert!(config.is_social_host("facebook.com"));
        assert!(config.is_social_host("www.Facebook.com"));
        assert!(config.is_social_host("m.youtube.com"));
        assert!(!config.is_social_host("notfacebook.com"));
        assert!(!config.is_social_host("shop.example"));
    }

    #[test]
    fn test_zero_concurrency_is_sequential() {
        let config = AuditConfig {
            concurrency: 0,
            ..AuditConfig::default()
        };
        assert_eq!(config.effective_concurrency(), 1);
    }
}
