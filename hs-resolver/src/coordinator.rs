//! Aggregation Coordinator
//!
//! Runs one lookup through its states:
//!
//! ```text
//! Dispatched → AwaitingPrimary → MaybeWebsite → Merging → Done
//! ```
//!
//! - **Dispatched:** primary host, microblog and photo probes are spawned as
//!   independent tasks sharing one fact stream and one deadline.
//! - **AwaitingPrimary:** facts are collected until every probe has finished
//!   or the deadline fires. Probes still running are abandoned: their later
//!   facts are dropped, never awaited.
//! - **MaybeWebsite:** if a website was discovered and enough budget remains,
//!   the website probe runs under its own, shorter allowance.
//! - **Merging / Done:** the ordered fact list is folded into a record.
//!
//! Probe errors never escape a probe task; the only error a lookup returns
//! is `ResolveError::InvalidInput`.

use crate::extractor::{Extractor, HtmlExtractor};
use crate::fetcher::{FetchError, Fetcher, HttpFetcher};
use crate::merge::merge_facts;
use crate::probes::{MicroblogProbe, PhotoPlatformProbe, PrimaryHostProbe, WebsiteProbe};
use crate::types::{
    CandidateFact, FactSink, ProbeContext, ProfileQuery, ProfileRecord, ResolveError,
    ScalarField, SourceProbe, SourceRank, MAX_BUDGET,
};
use hs_common::config::LookupConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Lookup state, logged on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupState {
    Dispatched,
    AwaitingPrimary,
    MaybeWebsite,
    Merging,
    Done,
}

/// Website stage tuning
#[derive(Debug, Clone, Copy)]
pub struct WebsiteStage {
    /// Upper bound for the website allowance
    pub timeout: Duration,
    /// Skip the stage when less than this remains of the budget
    pub min_remaining: Duration,
}

impl Default for WebsiteStage {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            min_remaining: Duration::from_secs(1),
        }
    }
}

/// Outcome counters shared by every clone of one resolver
#[derive(Debug, Default)]
pub struct LookupDiagnostics {
    completed: AtomicU64,
    without_accounts: AtomicU64,
    last_error: RwLock<Option<String>>,
}

impl LookupDiagnostics {
    /// Lookups that ran to a record (invalid input excluded)
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Lookups that ended with no connected account
    pub fn without_accounts(&self) -> u64 {
        self.without_accounts.load(Ordering::Relaxed)
    }

    /// Most recent "nothing found" outcome, naming the handle
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    async fn record(&self, record: &ProfileRecord) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        if let Some(error) = &record.error {
            self.without_accounts.fetch_add(1, Ordering::Relaxed);
            *self.last_error.write().await = Some(format!("{} for '{}'", error, record.handle));
        }
    }
}

/// Entry point of the aggregation engine
///
/// Cheap to clone and safe to share. Concurrent lookups share nothing but
/// the diagnostics counters.
#[derive(Clone)]
pub struct ProfileResolver {
    probes: Arc<Vec<Arc<dyn SourceProbe>>>,
    website_probe: Arc<dyn SourceProbe>,
    website_stage: WebsiteStage,
    diagnostics: Arc<LookupDiagnostics>,
}

impl ProfileResolver {
    pub fn new(
        probes: Vec<Arc<dyn SourceProbe>>,
        website_probe: Arc<dyn SourceProbe>,
        website_stage: WebsiteStage,
    ) -> Self {
        Self {
            probes: Arc::new(probes),
            website_probe,
            website_stage,
            diagnostics: Arc::new(LookupDiagnostics::default()),
        }
    }

    pub fn diagnostics(&self) -> &LookupDiagnostics {
        &self.diagnostics
    }

    /// Standard probe set over the given collaborators
    pub fn from_config(
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn Extractor>,
        lookup: &LookupConfig,
    ) -> Self {
        let primary = PrimaryHostProbe::new(
            Arc::clone(&fetcher),
            Arc::clone(&extractor),
            lookup.primary_timeout(),
        );

        let mut microblog = MicroblogProbe::new(
            Arc::clone(&fetcher),
            Arc::clone(&extractor),
            lookup.syndication_timeout(),
            lookup.mirror_timeout(),
        );
        if let Some(allowed) = &lookup.microblog_mirrors {
            microblog = microblog.with_mirror_allow_list(allowed);
        }

        let mut photo = PhotoPlatformProbe::new(
            Arc::clone(&fetcher),
            Arc::clone(&extractor),
            lookup.mirror_timeout(),
        );
        if let Some(allowed) = &lookup.photo_viewers {
            photo = photo.with_viewer_allow_list(allowed);
        }

        let website = WebsiteProbe::new(fetcher, extractor, lookup.website_timeout());

        Self::new(
            vec![Arc::new(primary), Arc::new(microblog), Arc::new(photo)],
            Arc::new(website),
            WebsiteStage {
                timeout: lookup.website_timeout(),
                min_remaining: lookup.website_min_remaining(),
            },
        )
    }

    /// Standard probe set over reqwest and scraper
    pub fn with_http(lookup: &LookupConfig) -> Result<Self, FetchError> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(&lookup.user_agent)?);
        let extractor: Arc<dyn Extractor> = Arc::new(HtmlExtractor::new());
        Ok(Self::from_config(fetcher, extractor, lookup))
    }

    /// Resolve `handle` within `budget`
    ///
    /// # Errors
    /// `ResolveError::InvalidInput` for an empty handle; nothing else.
    pub async fn resolve_profile(
        &self,
        handle: &str,
        budget: Duration,
    ) -> Result<ProfileRecord, ResolveError> {
        let query = ProfileQuery::new(handle, budget)?;
        Ok(self.resolve(&query).await)
    }

    /// Run a validated query to completion
    pub async fn resolve(&self, query: &ProfileQuery) -> ProfileRecord {
        let started = Instant::now();
        // Queries built field-by-field skip the clamp in `ProfileQuery::new`.
        let deadline = started + query.budget.min(MAX_BUDGET);
        let lookup_id = query.lookup_id;
        let transition = |state: LookupState| {
            debug!(lookup_id = %lookup_id, state = ?state, elapsed_ms = started.elapsed().as_millis() as u64, "Lookup state");
        };

        transition(LookupState::Dispatched);
        let ctx = ProbeContext::new(query, deadline);
        let (sink, rx) = FactSink::channel();
        for probe in self.probes.iter() {
            dispatch(Arc::clone(probe), ctx.clone(), sink.clone());
        }
        drop(sink);

        transition(LookupState::AwaitingPrimary);
        let mut facts = collect_until(rx, deadline).await;

        transition(LookupState::MaybeWebsite);
        if let Some(site) = winning_website(&facts) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if !remaining.is_zero() && remaining >= self.website_stage.min_remaining {
                let allowance = self.website_stage.timeout.min(remaining);
                let website_deadline = Instant::now() + allowance;
                debug!(lookup_id = %lookup_id, site = %site, allowance_ms = allowance.as_millis() as u64, "Scanning personal website");

                let mut website_ctx = ProbeContext::new(query, website_deadline);
                website_ctx.website = Some(site);
                let (sink, rx) = FactSink::channel();
                dispatch(Arc::clone(&self.website_probe), website_ctx, sink);
                facts.extend(collect_until(rx, website_deadline).await);
            } else {
                debug!(lookup_id = %lookup_id, remaining_ms = remaining.as_millis() as u64, "Skipping website scan, budget exhausted");
            }
        }

        transition(LookupState::Merging);
        let fact_count = facts.len();
        let record = merge_facts(&query.handle, facts);
        self.diagnostics.record(&record).await;

        transition(LookupState::Done);
        info!(
            lookup_id = %lookup_id,
            handle = %query.handle,
            facts = fact_count,
            accounts = record.accounts.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Lookup complete"
        );
        record
    }
}

/// Spawn a probe behind the error boundary
///
/// The task is detached: if the coordinator stops listening, the probe runs
/// to its own timeout and its facts are dropped.
fn dispatch(probe: Arc<dyn SourceProbe>, ctx: ProbeContext, sink: FactSink) {
    tokio::spawn(async move {
        let name = probe.name();
        match probe.probe(&ctx, &sink).await {
            Ok(()) => debug!(lookup_id = %ctx.lookup_id, probe = name, "Probe finished"),
            Err(e) => warn!(
                lookup_id = %ctx.lookup_id,
                probe = name,
                error = %e,
                "Probe failed (contributes no further facts)"
            ),
        }
    });
}

/// Receive facts until every producer is gone or the deadline fires
async fn collect_until(
    mut rx: mpsc::UnboundedReceiver<CandidateFact>,
    deadline: Instant,
) -> Vec<CandidateFact> {
    let mut facts = Vec::new();
    let expiry = tokio::time::sleep_until(deadline);
    tokio::pin!(expiry);

    loop {
        tokio::select! {
            biased;
            fact = rx.recv() => match fact {
                Some(fact) => facts.push(fact),
                None => break,
            },
            _ = &mut expiry => {
                debug!(collected = facts.len(), "Deadline reached, abandoning running probes");
                break;
            }
        }
    }
    facts
}

/// Website value the merger would keep: lowest rank, first seen on ties
fn winning_website(facts: &[CandidateFact]) -> Option<String> {
    let mut best: Option<(&str, SourceRank)> = None;
    for fact in facts {
        if let CandidateFact::Scalar {
            field: ScalarField::Website,
            value,
            rank,
        } = fact
        {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            if best.map_or(true, |(_, r)| *rank < r) {
                best = Some((value, *rank));
            }
        }
    }
    best.map(|(value, _)| value.to_string())
}
