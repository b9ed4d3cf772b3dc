// src/checker/navigate.rs
// =============================================================================
// A smoke check that actually follows the first few navigation links.
//
// Probing a link tells us the server answers; following it tells us where a
// user lands. A landing URL that mentions "404" or "error" means the site
// routed the click to an error page even if it answered 200.
//
// Navigating invalidates every element handle, so all hrefs are read and
// resolved up front, before the first navigation.
// =============================================================================

use crate::browser::{Page, PageError};
use crate::checker::classify::is_trivial_href;
use serde::Serialize;

pub const NAVIGATION_SELECTOR: &str = "nav a[href], header a[href]";

const ERROR_URL_MARKERS: &[&str] = &["404", "error"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationCheck {
    pub href: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landed_url: Option<String>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// Follows up to `limit` of the anchors matching `selector` and returns to
// the starting page afterwards. Only a failure to locate anchors is an error.
pub async fn verify_navigation<P: Page + ?Sized>(
    page: &P,
    selector: &str,
    limit: usize,
) -> Result<Vec<NavigationCheck>, PageError> {
    let start = page.current_url();

    let mut hrefs = Vec::new();
    for handle in page.locate(selector, None).await?.into_iter().take(limit) {
        match page.attribute(handle, "href").await {
            Ok(Some(href)) if !is_trivial_href(href.trim()) => hrefs.push(href.trim().to_string()),
            Ok(_) => {}
            Err(e) => tracing::debug!(?handle, error = %e, "skipping unreadable navigation link"),
        }
    }

    let mut checks = Vec::with_capacity(hrefs.len());
    for href in hrefs {
        let target = match start.join(&href) {
            Ok(target) => target,
            Err(e) => {
                checks.push(NavigationCheck {
                    href,
                    landed_url: None,
                    ok: false,
                    error: Some(format!("invalid URL: {}", e)),
                });
                continue;
            }
        };

        let check = match page.navigate(&target).await {
            Ok(()) => {
                let landed = page.current_url();
                // Host and port are left out; a port like 40412 is not an error page
                let route = format!("{}?{}", landed.path(), landed.query().unwrap_or_default())
                    .to_lowercase();
                let on_error_page = ERROR_URL_MARKERS.iter().any(|marker| route.contains(marker));
                NavigationCheck {
                    href,
                    landed_url: Some(landed.to_string()),
                    ok: !on_error_page,
                    error: on_error_page.then(|| "landed on an error page".to_string()),
                }
            }
            Err(e) => NavigationCheck {
                href,
                landed_url: None,
                ok: false,
                error: Some(e.to_string()),
            },
        };
        tracing::debug!(href = %check.href, ok = check.ok, "navigation checked");
        checks.push(check);
    }

    if page.current_url() != start {
        if let Err(e) = page.navigate(&start).await {
            tracing::warn!(%start, error = %e, "could not return to the starting page");
        }
    }

    Ok(checks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::HtmlPage;
    use reqwest::Client;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn serve(server: &MockServer, route: &str, template: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(template)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_follows_first_links_and_flags_error_pages() {
        let server = MockServer::start().await;
        let home = r##"
            <header>
              <a href="#content">Skip</a>
              <a href="/wine">Wine</a>
              <a href="/old-sale">Sale</a>
              <a href="/spirits">Spirits</a>
            </header>"##;
        serve(&server, "/", ResponseTemplate::new(200).set_body_string(home)).await;
        serve(&server, "/wine", ResponseTemplate::new(200)).await;
        serve(
            &server,
            "/old-sale",
            ResponseTemplate::new(302).insert_header("location", "/error?code=gone"),
        )
        .await;
        serve(&server, "/error", ResponseTemplate::new(200)).await;

        let page = HtmlPage::new(Client::new());
        let start = Url::parse(&format!("{}/", server.uri())).unwrap();
        page.navigate(&start).await.unwrap();

        let checks = verify_navigation(&page, NAVIGATION_SELECTOR, 3).await.unwrap();

        // "#content" uses up one of the three slots, "/spirits" is past the limit
        assert_eq!(checks.len(), 2);
        assert_eq!(checks[0].href, "/wine");
        assert!(checks[0].ok);
        assert_eq!(checks[1].href, "/old-sale");
        assert!(!checks[1].ok);
        assert!(checks[1].landed_url.as_deref().unwrap().contains("/error"));

        assert_eq!(page.current_url(), start);
    }

    #[tokio::test]
    async fn test_unreachable_target_is_recorded() {
        let page = HtmlPage::from_html(
            Url::parse("http://127.0.0.1:9/").unwrap(),
            r#"<nav><a href="/nowhere">Nowhere</a></nav>"#,
        );
        let checks = verify_navigation(&page, NAVIGATION_SELECTOR, 3).await.unwrap();
        assert_eq!(checks.len(), 1);
        assert!(!checks[0].ok);
        assert!(checks[0].error.is_some());
    }
}
