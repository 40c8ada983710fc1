//! Core Types and Trait Definitions for hs-resolver
//!
//! Defines the data model shared by every stage of a lookup:
//! - **Input:** `ProfileQuery` (handle + overall budget)
//! - **Probes:** `SourceProbe` trait, `ProbeContext`, `FactSink`
//! - **Facts:** `CandidateFact` (scalar observation or account link)
//! - **Output:** `ProfileRecord` (merged, deduplicated record)
//!
//! # Architecture
//! Coordinator → probes (parallel) → fact stream → merger → record.
//! Facts are the only thing that crosses a task boundary.

use crate::fetcher::FetchError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::trace;
use uuid::Uuid;

// ============================================================================
// Ranks
// ============================================================================

/// Source priority for scalar-field precedence (lower wins)
pub type SourceRank = u8;

/// Primary profile host (highest priority)
pub const RANK_PRIMARY_HOST: SourceRank = 0;
/// Microblogging platform
pub const RANK_MICROBLOG: SourceRank = 1;
/// Photo-sharing platform
pub const RANK_PHOTO_PLATFORM: SourceRank = 2;

/// Informational error attached to a record with no accounts
pub const NO_ACCOUNTS_FOUND: &str = "No connected accounts found";

/// Longest budget a lookup honors; larger values are clamped
pub const MAX_BUDGET: Duration = Duration::from_secs(60 * 60 * 24 * 365);

// ============================================================================
// Platforms and Facts
// ============================================================================

/// Platform tag attached to every connected account
///
/// `GitHub` and `Website` are never produced by the classifier: they tag the
/// primary host itself and a discovered personal site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Platform {
    GitHub,
    Twitter,
    LinkedIn,
    Instagram,
    Facebook,
    YouTube,
    Medium,
    DevTo,
    Twitch,
    Discord,
    Bluesky,
    Website,
}

impl Platform {
    /// Display name used in serialized output
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::GitHub => "GitHub",
            Platform::Twitter => "Twitter",
            Platform::LinkedIn => "LinkedIn",
            Platform::Instagram => "Instagram",
            Platform::Facebook => "Facebook",
            Platform::YouTube => "YouTube",
            Platform::Medium => "Medium",
            Platform::DevTo => "Dev.to",
            Platform::Twitch => "Twitch",
            Platform::Discord => "Discord",
            Platform::Bluesky => "Bluesky",
            Platform::Website => "Website",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Platform {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Identity attribute a scalar fact can set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarField {
    FullName,
    Bio,
    Location,
    Company,
    Avatar,
    Website,
}

/// Link to an account on some platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountLink {
    pub platform: Platform,
    pub url: String,
    pub handle: String,
}

/// One atomic, possibly-partial observation emitted by a probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateFact {
    /// Value for an identity attribute, tagged with the producing source's rank
    Scalar {
        field: ScalarField,
        value: String,
        rank: SourceRank,
    },
    /// Account discovered for the subject
    Account(AccountLink),
}

impl CandidateFact {
    pub fn scalar(field: ScalarField, value: impl Into<String>, rank: SourceRank) -> Self {
        CandidateFact::Scalar {
            field,
            value: value.into(),
            rank,
        }
    }

    pub fn account(platform: Platform, url: impl Into<String>, handle: impl Into<String>) -> Self {
        CandidateFact::Account(AccountLink {
            platform,
            url: url.into(),
            handle: handle.into(),
        })
    }
}

// ============================================================================
// Query and Probe Context
// ============================================================================

/// Immutable input for one lookup
#[derive(Debug, Clone)]
pub struct ProfileQuery {
    /// Correlates every log line of one lookup
    pub lookup_id: Uuid,
    /// Handle being resolved (trimmed, non-empty)
    pub handle: String,
    /// Overall time budget
    pub budget: Duration,
}

impl ProfileQuery {
    /// Build a query, rejecting an empty or whitespace-only handle
    ///
    /// The budget is clamped to `MAX_BUDGET` so the deadline is always
    /// representable.
    pub fn new(handle: &str, budget: Duration) -> Result<Self, ResolveError> {
        let handle = handle.trim();
        if handle.is_empty() {
            return Err(ResolveError::InvalidInput("Username required".to_string()));
        }
        Ok(Self {
            lookup_id: Uuid::new_v4(),
            handle: handle.to_string(),
            budget: budget.min(MAX_BUDGET),
        })
    }
}

/// Everything a probe needs to know about the lookup it serves
#[derive(Debug, Clone)]
pub struct ProbeContext {
    pub lookup_id: Uuid,
    pub handle: String,
    /// Deadline shared by every probe of the current stage
    pub deadline: Instant,
    /// Personal website to deep-scrape (website stage only)
    pub website: Option<String>,
}

impl ProbeContext {
    pub fn new(query: &ProfileQuery, deadline: Instant) -> Self {
        Self {
            lookup_id: query.lookup_id,
            handle: query.handle.clone(),
            deadline,
            website: None,
        }
    }

    /// Time left until the shared deadline (zero once elapsed)
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Per-call timeout: the configured value, capped by the shared deadline
    pub fn call_timeout(&self, configured: Duration) -> Result<Duration, ProbeError> {
        let remaining = self.remaining();
        if remaining.is_zero() {
            return Err(ProbeError::DeadlineExceeded);
        }
        Ok(configured.min(remaining))
    }
}

// ============================================================================
// Fact Stream
// ============================================================================

/// Producer side of the fact stream
///
/// Cheap to clone; one clone per probe task. Sends after the consumer has
/// stopped listening are dropped silently.
#[derive(Debug, Clone)]
pub struct FactSink {
    tx: mpsc::UnboundedSender<CandidateFact>,
}

impl FactSink {
    /// Create a sink and the single receiver the coordinator consumes
    pub fn channel() -> (FactSink, mpsc::UnboundedReceiver<CandidateFact>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (FactSink { tx }, rx)
    }

    /// Append a fact; returns false if the consumer is gone
    pub fn emit(&self, fact: CandidateFact) -> bool {
        trace!(fact = ?fact, "Emitting fact");
        self.tx.send(fact).is_ok()
    }

    /// Emit a scalar fact unless the value is blank
    pub fn emit_scalar(&self, field: ScalarField, value: Option<String>, rank: SourceRank) {
        if let Some(value) = value {
            let value = value.trim();
            if !value.is_empty() {
                self.emit(CandidateFact::scalar(field, value, rank));
            }
        }
    }
}

// ============================================================================
// Source Probe Trait
// ============================================================================

/// A source family that can produce zero or more facts about a handle
///
/// Implementations push facts into the sink as soon as they have them, so a
/// probe abandoned at the deadline still contributes what it already found.
/// Returned errors are absorbed by the coordinator at the probe boundary.
#[async_trait::async_trait]
pub trait SourceProbe: Send + Sync {
    /// Probe name for logging
    fn name(&self) -> &'static str;

    /// Produce facts for `ctx.handle`, honoring `ctx.deadline`
    async fn probe(&self, ctx: &ProbeContext, sink: &FactSink) -> Result<(), ProbeError>;
}

/// Probe-local failure (never surfaced past the probe boundary)
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Source answered but not with usable content
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// Shared or per-probe budget elapsed
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// Fetch failed at the transport level
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Response had an unexpected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Handle cannot be addressed on this source
    #[error("Unsupported handle: {0}")]
    UnsupportedHandle(String),
}

/// Error surfaced to the caller of a lookup
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// Missing or empty handle; no probe runs
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

// ============================================================================
// Output Record
// ============================================================================

/// Connected account as a caller sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectedAccount {
    pub platform: Platform,
    pub username: String,
    pub url: String,
    pub exists: bool,
}

/// Final merged, deduplicated output of one lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileRecord {
    #[serde(rename = "username")]
    pub handle: String,
    #[serde(rename = "fullName", serialize_with = "unset_as_empty")]
    pub full_name: Option<String>,
    #[serde(serialize_with = "unset_as_empty")]
    pub bio: Option<String>,
    #[serde(serialize_with = "unset_as_empty")]
    pub location: Option<String>,
    #[serde(serialize_with = "unset_as_empty")]
    pub company: Option<String>,
    #[serde(serialize_with = "unset_as_empty")]
    pub avatar: Option<String>,
    #[serde(serialize_with = "unset_as_empty")]
    pub website: Option<String>,
    #[serde(rename = "connected_accounts")]
    pub accounts: Vec<ConnectedAccount>,
    /// Present only when no account was found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn unset_as_empty<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.as_deref().unwrap_or(""))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_rejects_blank_handle() {
        assert!(matches!(
            ProfileQuery::new("   ", Duration::from_secs(1)),
            Err(ResolveError::InvalidInput(_))
        ));
        let query = ProfileQuery::new(" octocat ", Duration::from_secs(1)).unwrap();
        assert_eq!(query.handle, "octocat");
    }

    #[test]
    fn test_query_clamps_unbounded_budget() {
        let query = ProfileQuery::new("octocat", Duration::MAX).unwrap();
        assert_eq!(query.budget, MAX_BUDGET);
        let short = ProfileQuery::new("octocat", Duration::from_millis(250)).unwrap();
        assert_eq!(short.budget, Duration::from_millis(250));
    }

    #[test]
    fn test_platform_serializes_as_display_name() {
        let json = serde_json::to_string(&Platform::DevTo).unwrap();
        assert_eq!(json, "\"Dev.to\"");
        assert_eq!(Platform::Website.to_string(), "Website");
    }

    #[test]
    fn test_record_serialization_shape() {
        let record = ProfileRecord {
            handle: "octocat".to_string(),
            full_name: Some("The Octocat".to_string()),
            bio: None,
            location: None,
            company: None,
            avatar: None,
            website: None,
            accounts: vec![ConnectedAccount {
                platform: Platform::GitHub,
                username: "octocat".to_string(),
                url: "https://github.com/octocat".to_string(),
                exists: true,
            }],
            error: None,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["username"], "octocat");
        assert_eq!(value["fullName"], "The Octocat");
        assert_eq!(value["bio"], "");
        assert_eq!(value["connected_accounts"][0]["platform"], "GitHub");
        assert_eq!(value["connected_accounts"][0]["exists"], true);
        assert!(value.get("error").is_none());
    }

    #[tokio::test]
    async fn test_sink_drops_after_receiver_closed() {
        let (sink, rx) = FactSink::channel();
        assert!(sink.emit(CandidateFact::account(Platform::GitHub, "u", "h")));
        drop(rx);
        assert!(!sink.emit(CandidateFact::account(Platform::GitHub, "u", "h")));
    }

    #[tokio::test]
    async fn test_emit_scalar_skips_blank() {
        let (sink, mut rx) = FactSink::channel();
        sink.emit_scalar(ScalarField::Bio, Some("  ".to_string()), 0);
        sink.emit_scalar(ScalarField::Bio, None, 0);
        sink.emit_scalar(ScalarField::Bio, Some(" hello ".to_string()), 0);
        drop(sink);

        assert_eq!(
            rx.recv().await,
            Some(CandidateFact::scalar(ScalarField::Bio, "hello", 0))
        );
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_call_timeout_capped_by_deadline() {
        let query = ProfileQuery::new("octocat", Duration::from_secs(1)).unwrap();
        let ctx = ProbeContext::new(&query, Instant::now() + Duration::from_millis(200));
        let timeout = ctx.call_timeout(Duration::from_secs(10)).unwrap();
        assert!(timeout <= Duration::from_millis(200));

        let expired = ProbeContext::new(&query, Instant::now());
        assert!(matches!(
            expired.call_timeout(Duration::from_secs(1)),
            Err(ProbeError::DeadlineExceeded)
        ));
    }
}
