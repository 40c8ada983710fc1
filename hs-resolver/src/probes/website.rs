//! Website Probe
//!
//! Deep-scrapes a personal site discovered by an earlier probe for links to
//! known platforms. Never emits scalar identity fields: a personal site is
//! not trusted as primary identity.

use crate::classifier::{classify_platform, extract_handle, resolve_link};
use crate::extractor::{Extractor, LinkDescriptor};
use crate::fetcher::Fetcher;
use crate::types::{CandidateFact, FactSink, ProbeContext, ProbeError, SourceProbe};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

const ALL_LINKS: LinkDescriptor = LinkDescriptor::new(&["a"], "href");

const STATIC_ASSET_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".ico", ".css", ".js",
];

/// True when the URL path names an image, stylesheet or script
pub fn is_static_asset(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let path = parsed.path().to_ascii_lowercase();
    STATIC_ASSET_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

pub struct WebsiteProbe {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    timeout: Duration,
}

impl WebsiteProbe {
    pub fn new(fetcher: Arc<dyn Fetcher>, extractor: Arc<dyn Extractor>, timeout: Duration) -> Self {
        Self {
            fetcher,
            extractor,
            timeout,
        }
    }
}

#[async_trait]
impl SourceProbe for WebsiteProbe {
    fn name(&self) -> &'static str {
        "website"
    }

    async fn probe(&self, ctx: &ProbeContext, sink: &FactSink) -> Result<(), ProbeError> {
        let Some(site) = ctx.website.as_deref() else {
            return Ok(());
        };
        let timeout = ctx.call_timeout(self.timeout)?;
        let response = self.fetcher.fetch(site, timeout).await?;
        if !response.is_success() {
            return Err(ProbeError::SourceUnavailable(format!(
                "{} returned {}",
                site, response.status
            )));
        }

        let mut found = 0usize;
        for href in self.extractor.extract_all(&response.body, &ALL_LINKS) {
            let Some(link) = resolve_link(site, &href) else {
                continue;
            };
            if is_static_asset(&link) {
                continue;
            }
            if let Some(platform) = classify_platform(&link) {
                let handle = extract_handle(&link);
                sink.emit(CandidateFact::account(platform, link, handle));
                found += 1;
            }
        }

        debug!(lookup_id = %ctx.lookup_id, site = %site, accounts = found, "Website scan complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_assets() {
        assert!(is_static_asset("https://ann.dev/img/me.PNG"));
        assert!(is_static_asset("https://ann.dev/app.js?v=3"));
        assert!(is_static_asset("https://ann.dev/style.css"));
        assert!(!is_static_asset("https://twitter.com/ann"));
        assert!(!is_static_asset("https://ann.dev/jsconf"));
        assert!(!is_static_asset("not a url"));
    }
}
