//! Microblog Probe (Twitter / X, rank 1)
//!
//! Two paths, tried in order:
//! 1. Syndication endpoint: one JSON request with a short timeout. A
//!    parseable user object is enough; no mirror is contacted.
//! 2. Mirror race over Nitter instances. A mirror wins only with a page that
//!    renders a profile card and no error panel (user missing, suspended or
//!    rate limited). Name and avatar come from the winning mirror's HTML.

use crate::classifier::{handle_query_url, handle_url, resolve_link};
use crate::extractor::{Extractor, FieldDescriptor};
use crate::fetcher::{FetchResponse, Fetcher};
use crate::mirror_race::{self, MirrorTarget};
use crate::types::{
    CandidateFact, FactSink, Platform, ProbeContext, ProbeError, ScalarField, SourceProbe,
    RANK_MICROBLOG,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const SYNDICATION_URL: &str = "https://cdn.syndication.twimg.com/widgets/followbutton/info.json";
const ACCOUNT_BASE_URL: &str = "https://x.com";

/// Nitter renders every failure (unknown user, suspension, rate limit)
/// inside this panel
const MIRROR_MARKERS: &[&str] = &[r#"class="error-panel""#];

/// Built-in Nitter-compatible mirrors (name, base URL)
pub const MIRRORS: &[(&str, &str)] = &[
    ("nitter.net", "https://nitter.net"),
    ("nitter.poast.org", "https://nitter.poast.org"),
    ("nitter.privacydev.net", "https://nitter.privacydev.net"),
    ("xcancel.com", "https://xcancel.com"),
];

const MIRROR_FULL_NAME: FieldDescriptor = FieldDescriptor::text(&[".profile-card-fullname"]);
const MIRROR_AVATAR: FieldDescriptor =
    FieldDescriptor::attr(&["a.profile-card-avatar", ".profile-card-avatar"], "href");
const MIRROR_AVATAR_IMG: FieldDescriptor =
    FieldDescriptor::attr(&[".profile-card-avatar img"], "src");
const MIRROR_USERNAME: FieldDescriptor = FieldDescriptor::text(&[".profile-card-username"]);

/// Any of these present means the page renders a profile card
const MIRROR_PROFILE: &[FieldDescriptor] = &[MIRROR_FULL_NAME, MIRROR_USERNAME, MIRROR_AVATAR];

/// User object returned by the syndication endpoint
#[derive(Debug, Deserialize)]
struct SyndicationUser {
    #[serde(default)]
    screen_name: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    profile_image_url_https: Option<String>,
}

/// Canonical account URL for a microblog handle
pub fn account_url(handle: &str) -> Option<String> {
    handle_url(ACCOUNT_BASE_URL, handle, false)
}

pub struct MicroblogProbe {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    syndication_timeout: Duration,
    mirror_timeout: Duration,
    mirrors: Vec<(&'static str, &'static str)>,
}

impl MicroblogProbe {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn Extractor>,
        syndication_timeout: Duration,
        mirror_timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            syndication_timeout,
            mirror_timeout,
            mirrors: MIRRORS.to_vec(),
        }
    }

    /// Restrict the race to the named mirrors
    pub fn with_mirror_allow_list(mut self, allowed: &[String]) -> Self {
        self.mirrors.retain(|(name, _)| allowed.iter().any(|a| a == name));
        self
    }

    /// Fast path; `Ok(true)` when the endpoint produced the account
    async fn try_syndication(&self, ctx: &ProbeContext, sink: &FactSink) -> Result<bool, ProbeError> {
        let url = handle_query_url(SYNDICATION_URL, "screen_names", &ctx.handle)
            .ok_or_else(|| ProbeError::Parse("syndication url".to_string()))?;
        let timeout = ctx.call_timeout(self.syndication_timeout)?;
        let response = self.fetcher.fetch(&url, timeout).await?;
        if !response.is_success() {
            return Err(ProbeError::SourceUnavailable(format!(
                "syndication returned {}",
                response.status
            )));
        }

        let users: Vec<SyndicationUser> = serde_json::from_str(&response.body)
            .map_err(|e| ProbeError::Parse(format!("syndication body: {}", e)))?;
        let Some(user) = users.into_iter().find(|u| !u.screen_name.trim().is_empty()) else {
            return Ok(false);
        };

        sink.emit_scalar(ScalarField::FullName, user.name, RANK_MICROBLOG);
        sink.emit_scalar(ScalarField::Avatar, user.profile_image_url_https, RANK_MICROBLOG);
        sink.emit_scalar(ScalarField::Bio, user.description, RANK_MICROBLOG);

        let screen_name = user.screen_name.trim().to_string();
        let url = account_url(&screen_name)
            .ok_or_else(|| ProbeError::UnsupportedHandle(screen_name.clone()))?;
        sink.emit(CandidateFact::account(Platform::Twitter, url, screen_name));
        Ok(true)
    }

    async fn try_mirrors(&self, ctx: &ProbeContext, sink: &FactSink) -> Result<(), ProbeError> {
        let account = account_url(&ctx.handle)
            .ok_or_else(|| ProbeError::UnsupportedHandle(ctx.handle.clone()))?;
        let targets = self
            .mirrors
            .iter()
            .map(|&(name, base)| {
                handle_url(base, &ctx.handle, false)
                    .map(|url| MirrorTarget::new(name, url, MIRROR_MARKERS))
            })
            .collect::<Option<Vec<MirrorTarget>>>()
            .ok_or_else(|| ProbeError::UnsupportedHandle(ctx.handle.clone()))?;

        let win = mirror_race::race(
            self.fetcher.as_ref(),
            &targets,
            self.mirror_timeout,
            ctx.deadline,
            |target, response| self.is_profile_page(target, response),
        )
        .await
        .ok_or_else(|| ProbeError::SourceUnavailable("no microblog mirror answered".to_string()))?;

        debug!(lookup_id = %ctx.lookup_id, mirror = win.name, "Microblog mirror won");
        let doc = self.extractor.parse(&win.response.body);

        sink.emit_scalar(ScalarField::FullName, doc.field(&MIRROR_FULL_NAME), RANK_MICROBLOG);
        let avatar = doc
            .field(&MIRROR_AVATAR)
            .or_else(|| doc.field(&MIRROR_AVATAR_IMG))
            .and_then(|href| resolve_link(&win.url, &href));
        sink.emit_scalar(ScalarField::Avatar, avatar, RANK_MICROBLOG);

        sink.emit(CandidateFact::account(Platform::Twitter, account, ctx.handle.clone()));
        Ok(())
    }

    /// 2xx, no error panel, and a rendered profile card
    fn is_profile_page(&self, target: &MirrorTarget, response: &FetchResponse) -> bool {
        target.accepts(response) && self.extractor.parse(&response.body).has_any(MIRROR_PROFILE)
    }
}

#[async_trait]
impl SourceProbe for MicroblogProbe {
    fn name(&self) -> &'static str {
        "microblog"
    }

    async fn probe(&self, ctx: &ProbeContext, sink: &FactSink) -> Result<(), ProbeError> {
        match self.try_syndication(ctx, sink).await {
            Ok(true) => return Ok(()),
            Ok(false) => {
                debug!(lookup_id = %ctx.lookup_id, "Syndication returned no user, racing mirrors");
            }
            Err(ProbeError::DeadlineExceeded) => return Err(ProbeError::DeadlineExceeded),
            Err(e) => {
                debug!(lookup_id = %ctx.lookup_id, error = %e, "Syndication failed, racing mirrors");
            }
        }
        self.try_mirrors(ctx, sink).await
    }
}
