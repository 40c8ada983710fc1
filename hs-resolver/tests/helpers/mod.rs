//! Shared test fixtures: scripted fetcher and canned pages

#![allow(dead_code)]

use async_trait::async_trait;
use hs_common::config::LookupConfig;
use hs_resolver::extractor::HtmlExtractor;
use hs_resolver::fetcher::{FetchError, FetchResponse, Fetcher};
use hs_resolver::ProfileResolver;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted route: first route whose prefix matches the URL answers
#[derive(Clone)]
struct Route {
    prefix: String,
    delay: Duration,
    result: Result<FetchResponse, FetchError>,
}

/// Fetcher answering from a script, with virtual-time delays
///
/// Unscripted URLs fail immediately with a transport error. A delay longer
/// than the per-call timeout behaves like a real timeout.
#[derive(Default)]
pub struct MockFetcher {
    routes: Vec<Route>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, prefix: &str, delay_ms: u64, status: u16, body: &str) -> Self {
        self.route(prefix, delay_ms, Ok(FetchResponse::new(status, body)))
    }

    pub fn fail(self, prefix: &str, delay_ms: u64, error: FetchError) -> Self {
        self.route(prefix, delay_ms, Err(error))
    }

    fn route(mut self, prefix: &str, delay_ms: u64, result: Result<FetchResponse, FetchError>) -> Self {
        self.routes.push(Route {
            prefix: prefix.to_string(),
            delay: Duration::from_millis(delay_ms),
            result,
        });
        self
    }

    /// URLs requested so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn was_called(&self, prefix: &str) -> bool {
        self.calls().iter().any(|url| url.starts_with(prefix))
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchResponse, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        let Some(route) = self.routes.iter().find(|r| url.starts_with(&r.prefix)).cloned() else {
            return Err(FetchError::Transport(format!("unscripted url {}", url)));
        };
        if route.delay > timeout {
            tokio::time::sleep(timeout).await;
            return Err(FetchError::Timeout);
        }
        tokio::time::sleep(route.delay).await;
        route.result
    }
}

/// Resolver with the standard probe set over a scripted fetcher
pub fn resolver_with(fetcher: Arc<MockFetcher>) -> ProfileResolver {
    ProfileResolver::from_config(fetcher, Arc::new(HtmlExtractor::new()), &LookupConfig::default())
}

pub const GITHUB: &str = "https://github.com/";
pub const SYNDICATION: &str = "https://cdn.syndication.twimg.com/";
pub const NITTER: &str = "https://nitter.net/";
pub const XCANCEL: &str = "https://xcancel.com/";
pub const PICUKI: &str = "https://www.picuki.com/profile/";
pub const IMGINN: &str = "https://imginn.com/";
pub const PIXWOX: &str = "https://www.pixwox.com/profile/";

/// GitHub-style profile page
pub fn github_page(full_name: &str, bio: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}" rel="nofollow me">{}</a>"#, href, href))
        .collect();
    format!(
        r#"<html><body>
<div class="h-card">
  <img class="avatar avatar-user" src="https://avatars.githubusercontent.com/u/42?v=4">
  <h1 class="vcard-names"><span class="p-name vcard-fullname">{}</span></h1>
  <div class="p-note user-profile-bio"><div>{}</div></div>
  <ul>
    <li itemprop="homeLocation"><span class="p-label">Lisbon</span></li>
    {}
  </ul>
</div>
</body></html>"#,
        full_name, bio, anchors
    )
}

/// Syndication endpoint JSON for one user
pub fn syndication_json(screen_name: &str, name: &str) -> String {
    format!(
        r#"[{{"id":"1","screen_name":"{}","name":"{}","description":"posting","profile_image_url_https":"https://pbs.twimg.com/profile_images/1/a.jpg"}}]"#,
        screen_name, name
    )
}

/// Personal site linking out to other platforms
pub fn website_page(links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();
    format!("<html><body><nav>{}</nav></body></html>", anchors)
}
