//! Link integrity checks for a single web page.
//!
//! The pieces, in the order data flows through them:
//! - [`checker::enumerate`] lists the visible anchors in a [`Scope`]
//! - [`LinkClassifier`] probes one anchor and decides whether a human needs
//!   to act on it, waving through CDN challenges, login walls, redirects and
//!   social networks that block scripted clients
//! - [`Auditor`] checks a whole scope and raises one error listing every
//!   failing link
//!
//! The browser is abstracted behind [`Page`]; [`HtmlPage`] implements it over
//! a fetched HTML document.

pub mod browser;
pub mod checker;
pub mod config;

pub use browser::{HtmlPage, Page, PageError};
pub use checker::{
    AuditError, AuditReport, Auditor, LinkCheckResult, LinkClassifier, LinkStatus, Prober,
    ReqwestProber, Scope,
};
pub use config::AuditConfig;
