//! Primary Host Probe (GitHub, rank 0)
//!
//! Single fetch of `https://github.com/{handle}`. On success emits:
//! - identity scalars at rank 0 (full name, bio, location, company, avatar)
//! - the GitHub account itself
//! - one account per classified link in the profile card
//! - website scalar + `Website` account per unclassified external link
//! - a synthetic Twitter account when the bio names one

use crate::classifier::{
    classify_platform, extract_handle, handle_url, host_matches, host_of, resolve_link,
};
use crate::extractor::{Document, Extractor, FieldDescriptor, LinkDescriptor};
use crate::fetcher::Fetcher;
use crate::probes::microblog;
use crate::types::{
    CandidateFact, FactSink, Platform, ProbeContext, ProbeError, ScalarField, SourceProbe,
    RANK_PRIMARY_HOST,
};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const GITHUB_BASE_URL: &str = "https://github.com";
const GITHUB_HOST: &str = "github.com";
const AVATAR_CDN_HOST: &str = "avatars.githubusercontent.com";

/// Badge and licence hosts that show up in profile cards but are never a
/// personal site
const NOT_A_WEBSITE: &[&str] = &["opensource.org", "shields.io"];

const FULL_NAME: FieldDescriptor = FieldDescriptor::text(&["span.p-name", "h1.vcard-names span"]);
const BIO: FieldDescriptor = FieldDescriptor::text(&["div.p-note", "div.user-profile-bio"]);
const LOCATION: FieldDescriptor =
    FieldDescriptor::text(&["li[itemprop=\"homeLocation\"] span", ".p-label"]);
const COMPANY: FieldDescriptor = FieldDescriptor::text(&["li[itemprop=\"worksFor\"] span", ".p-org"]);
const AVATAR: FieldDescriptor = FieldDescriptor::attr(&["img.avatar"], "src");

const CARD_LINKS: LinkDescriptor = LinkDescriptor::new(&[".h-card a"], "href");
const EDITABLE_AREA_LINKS: LinkDescriptor =
    LinkDescriptor::new(&[".js-profile-editable-area a"], "href");

/// `@name`, `twitter.com/name` or `x.com/name` in free text
static MICROBLOG_MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\b(?:twitter|x)\.com/([A-Za-z0-9_]{1,15})|(?:^|[^A-Za-z0-9_.])@([A-Za-z0-9_]{1,15}))")
        .expect("static regex is valid")
});

/// Microblog handle mentioned in a bio, if longer than 3 characters
pub fn microblog_handle_in_bio(bio: &str) -> Option<String> {
    MICROBLOG_MENTION
        .captures_iter(bio)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
        .find(|name| name.len() > 3)
}

pub struct PrimaryHostProbe {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    timeout: Duration,
}

impl PrimaryHostProbe {
    pub fn new(fetcher: Arc<dyn Fetcher>, extractor: Arc<dyn Extractor>, timeout: Duration) -> Self {
        Self {
            fetcher,
            extractor,
            timeout,
        }
    }

    /// Profile URL with the handle as a single encoded path segment
    pub fn profile_url(handle: &str) -> Option<String> {
        handle_url(GITHUB_BASE_URL, handle, false)
    }

    /// Turn profile-card links into account and website facts
    fn emit_links(&self, ctx: &ProbeContext, profile_url: &str, doc: &dyn Document, sink: &FactSink) {
        let mut links = doc.links(&CARD_LINKS);
        if links.is_empty() {
            links = doc.links(&EDITABLE_AREA_LINKS);
        }
        debug!(lookup_id = %ctx.lookup_id, links = links.len(), "Scanning profile links");

        for href in links {
            if href.trim_start().to_ascii_lowercase().starts_with("mailto:") {
                continue;
            }
            let Some(link) = resolve_link(profile_url, &href) else {
                continue;
            };
            let Some(host) = host_of(&link) else {
                continue;
            };
            if host_matches(&host, AVATAR_CDN_HOST) {
                continue;
            }
            let internal = host_matches(&host, GITHUB_HOST);
            if internal && !link.contains(ctx.handle.as_str()) {
                continue;
            }

            if let Some(platform) = classify_platform(&link) {
                let handle = extract_handle(&link);
                sink.emit(CandidateFact::account(platform, link, handle));
            } else if !internal && !NOT_A_WEBSITE.iter().any(|d| host_matches(&host, d)) {
                sink.emit(CandidateFact::scalar(
                    ScalarField::Website,
                    link.clone(),
                    RANK_PRIMARY_HOST,
                ));
                sink.emit(CandidateFact::account(Platform::Website, link, host));
            }
        }
    }
}

#[async_trait]
impl SourceProbe for PrimaryHostProbe {
    fn name(&self) -> &'static str {
        "primary_host"
    }

    async fn probe(&self, ctx: &ProbeContext, sink: &FactSink) -> Result<(), ProbeError> {
        let profile_url = Self::profile_url(&ctx.handle)
            .ok_or_else(|| ProbeError::UnsupportedHandle(ctx.handle.clone()))?;
        let timeout = ctx.call_timeout(self.timeout)?;
        let response = self.fetcher.fetch(&profile_url, timeout).await?;

        if !response.is_success() {
            return Err(ProbeError::SourceUnavailable(format!(
                "{} returned {}",
                profile_url, response.status
            )));
        }
        self.emit_page(ctx, &profile_url, &response.body, sink);
        Ok(())
    }
}

impl PrimaryHostProbe {
    /// Every fact a fetched profile page yields; the page is parsed once
    fn emit_page(&self, ctx: &ProbeContext, profile_url: &str, body: &str, sink: &FactSink) {
        let doc = self.extractor.parse(body);

        let bio = doc.field(&BIO);
        sink.emit_scalar(ScalarField::FullName, doc.field(&FULL_NAME), RANK_PRIMARY_HOST);
        sink.emit_scalar(ScalarField::Bio, bio.clone(), RANK_PRIMARY_HOST);
        sink.emit_scalar(ScalarField::Location, doc.field(&LOCATION), RANK_PRIMARY_HOST);
        sink.emit_scalar(ScalarField::Company, doc.field(&COMPANY), RANK_PRIMARY_HOST);
        sink.emit_scalar(ScalarField::Avatar, doc.field(&AVATAR), RANK_PRIMARY_HOST);

        sink.emit(CandidateFact::account(
            Platform::GitHub,
            profile_url,
            ctx.handle.clone(),
        ));

        self.emit_links(ctx, profile_url, doc.as_ref(), sink);

        if let Some(name) = bio.as_deref().and_then(microblog_handle_in_bio) {
            debug!(lookup_id = %ctx.lookup_id, handle = %name, "Microblog handle found in bio");
            if let Some(url) = microblog::account_url(&name) {
                sink.emit(CandidateFact::account(Platform::Twitter, url, name));
            }
        }
    }
}
