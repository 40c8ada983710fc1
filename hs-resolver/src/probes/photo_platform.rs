//! Photo-Platform Probe (Instagram, rank 2)
//!
//! Instagram is only reachable through third-party viewer front-ends. Each
//! viewer has its own URL scheme, its own error-page markup and its own
//! page structure, so the descriptor used after a win is looked up by the
//! winning viewer's name. A viewer wins only with a page showing at least
//! one of its profile fields.

use crate::classifier::{handle_url, resolve_link};
use crate::extractor::{Document, Extractor, FieldDescriptor};
use crate::fetcher::{FetchResponse, Fetcher};
use crate::mirror_race::{self, MirrorTarget};
use crate::types::{
    CandidateFact, FactSink, Platform, ProbeContext, ProbeError, ScalarField, SourceProbe,
    RANK_PHOTO_PLATFORM,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Where a viewer exposes profile fields
#[derive(Debug, Clone, Copy)]
pub struct ViewerProfile {
    pub full_name: FieldDescriptor,
    pub avatar: FieldDescriptor,
    pub bio: FieldDescriptor,
}

/// One viewer front-end
#[derive(Debug, Clone, Copy)]
pub struct Viewer {
    pub name: &'static str,
    /// Profile pages live at `{base_url}/{handle}`
    pub base_url: &'static str,
    pub trailing_slash: bool,
    pub not_found_markers: &'static [&'static str],
    pub profile: ViewerProfile,
}

impl ViewerProfile {
    fn fields(&self) -> [FieldDescriptor; 3] {
        [self.full_name, self.avatar, self.bio]
    }
}

impl Viewer {
    /// `None` when the handle cannot form a single path segment
    pub fn profile_url(&self, handle: &str) -> Option<String> {
        handle_url(self.base_url, handle, self.trailing_slash)
    }
}

/// Built-in viewers
pub const VIEWERS: &[Viewer] = &[
    Viewer {
        name: "picuki",
        base_url: "https://www.picuki.com/profile",
        trailing_slash: false,
        not_found_markers: &[r#"class="page-not-found""#],
        profile: ViewerProfile {
            full_name: FieldDescriptor::text(&[".profile-name-bottom"]),
            avatar: FieldDescriptor::attr(&[".profile-avatar img"], "src"),
            bio: FieldDescriptor::text(&[".profile-description"]),
        },
    },
    Viewer {
        name: "imginn",
        base_url: "https://imginn.com",
        trailing_slash: true,
        not_found_markers: &[r#"class="page-404""#],
        profile: ViewerProfile {
            full_name: FieldDescriptor::text(&[".userinfo .name h1", ".info h1"]),
            avatar: FieldDescriptor::attr(&[".userinfo .img img", ".avatar img"], "src"),
            bio: FieldDescriptor::text(&[".userinfo .bio", ".info .bio"]),
        },
    },
    Viewer {
        name: "pixwox",
        base_url: "https://www.pixwox.com/profile",
        trailing_slash: true,
        not_found_markers: &[r#"class="nodata""#],
        profile: ViewerProfile {
            full_name: FieldDescriptor::text(&[".fullname", ".username h1"]),
            avatar: FieldDescriptor::attr(&[".avatar img", ".ava img"], "src"),
            bio: FieldDescriptor::text(&[".sum", ".bio"]),
        },
    },
];

/// Canonical account URL for a photo-platform handle
pub fn account_url(handle: &str) -> Option<String> {
    handle_url("https://www.instagram.com", handle, false)
}

pub struct PhotoPlatformProbe {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    viewer_timeout: Duration,
    viewers: Vec<Viewer>,
}

impl PhotoPlatformProbe {
    pub fn new(fetcher: Arc<dyn Fetcher>, extractor: Arc<dyn Extractor>, viewer_timeout: Duration) -> Self {
        Self {
            fetcher,
            extractor,
            viewer_timeout,
            viewers: VIEWERS.to_vec(),
        }
    }

    /// Restrict the race to the named viewers
    pub fn with_viewer_allow_list(mut self, allowed: &[String]) -> Self {
        self.viewers.retain(|v| allowed.iter().any(|a| a == v.name));
        self
    }

    fn viewer(&self, name: &str) -> Option<&Viewer> {
        self.viewers.iter().find(|v| v.name == name)
    }

    /// 2xx, no error markup, and the viewer's own profile structure
    fn is_profile_page(&self, target: &MirrorTarget, response: &FetchResponse) -> bool {
        target.accepts(response)
            && self.viewer(target.name).is_some_and(|viewer| {
                self.extractor
                    .parse(&response.body)
                    .has_any(&viewer.profile.fields())
            })
    }

    /// Emit the winning page's fields using the viewer's descriptors
    fn emit_profile(&self, viewer: &Viewer, page_url: &str, doc: &dyn Document, sink: &FactSink) {
        let profile = &viewer.profile;
        sink.emit_scalar(ScalarField::FullName, doc.field(&profile.full_name), RANK_PHOTO_PLATFORM);
        let avatar = doc
            .field(&profile.avatar)
            .and_then(|href| resolve_link(page_url, &href));
        sink.emit_scalar(ScalarField::Avatar, avatar, RANK_PHOTO_PLATFORM);
        sink.emit_scalar(ScalarField::Bio, doc.field(&profile.bio), RANK_PHOTO_PLATFORM);
    }
}

#[async_trait]
impl SourceProbe for PhotoPlatformProbe {
    fn name(&self) -> &'static str {
        "photo_platform"
    }

    async fn probe(&self, ctx: &ProbeContext, sink: &FactSink) -> Result<(), ProbeError> {
        let unsupported = || ProbeError::UnsupportedHandle(ctx.handle.clone());
        let account = account_url(&ctx.handle).ok_or_else(unsupported)?;
        let targets = self
            .viewers
            .iter()
            .map(|v| {
                v.profile_url(&ctx.handle)
                    .map(|url| MirrorTarget::new(v.name, url, v.not_found_markers))
            })
            .collect::<Option<Vec<MirrorTarget>>>()
            .ok_or_else(unsupported)?;

        let win = mirror_race::race(
            self.fetcher.as_ref(),
            &targets,
            self.viewer_timeout,
            ctx.deadline,
            |target, response| self.is_profile_page(target, response),
        )
        .await
        .ok_or_else(|| ProbeError::SourceUnavailable("no photo viewer answered".to_string()))?;

        let viewer = self
            .viewer(win.name)
            .ok_or_else(|| ProbeError::Parse(format!("no descriptor for viewer {}", win.name)))?;
        debug!(lookup_id = %ctx.lookup_id, viewer = viewer.name, "Photo viewer won");

        let doc = self.extractor.parse(&win.response.body);
        self.emit_profile(viewer, &win.url, doc.as_ref(), sink);

        sink.emit(CandidateFact::account(Platform::Instagram, account, ctx.handle.clone()));
        Ok(())
    }
}
