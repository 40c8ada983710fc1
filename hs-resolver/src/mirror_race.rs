//! Mirror Race Executor
//!
//! Some sources have no stable endpoint of their own and are only reachable
//! through interchangeable third-party backends (microblog mirrors, photo
//! viewers). The race fetches every backend at once and keeps the first
//! response that passes the validity predicate, in completion order.
//! Losers are dropped: their results are never inspected once a winner is
//! chosen.
//!
//! Returning `None` is not an error. It means this source contributes
//! nothing to the lookup.

use crate::fetcher::{FetchResponse, Fetcher};
use futures::stream::{FuturesUnordered, StreamExt};
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::debug;

/// One interchangeable backend
#[derive(Debug, Clone)]
pub struct MirrorTarget {
    /// Backend name for logging and descriptor lookup
    pub name: &'static str,
    /// Fully-formed URL for this handle
    pub url: String,
    /// Markup fragments that only appear on the backend's own error page.
    /// Matched case-sensitively; plain words like "not found" also occur in
    /// user-written bios.
    pub not_found_markers: &'static [&'static str],
}

impl MirrorTarget {
    pub fn new(
        name: &'static str,
        url: impl Into<String>,
        not_found_markers: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            url: url.into(),
            not_found_markers,
        }
    }

    /// Default validity predicate: 2xx and no error marker in the body
    pub fn accepts(&self, response: &FetchResponse) -> bool {
        response.is_success()
            && !self
                .not_found_markers
                .iter()
                .any(|marker| response.body.contains(marker))
    }
}

/// Winning backend of a race
#[derive(Debug, Clone)]
pub struct MirrorWin {
    /// Index of the winner in the submitted target list
    pub index: usize,
    pub name: &'static str,
    pub url: String,
    pub response: FetchResponse,
}

/// Race all targets; first valid response in completion order wins
///
/// Each fetch gets `min(per_target_timeout, time left until deadline)`. The
/// race as a whole stops at `deadline`.
pub async fn race<F>(
    fetcher: &dyn Fetcher,
    targets: &[MirrorTarget],
    per_target_timeout: Duration,
    deadline: Instant,
    is_valid: F,
) -> Option<MirrorWin>
where
    F: Fn(&MirrorTarget, &FetchResponse) -> bool,
{
    let remaining = deadline.saturating_duration_since(Instant::now());
    if targets.is_empty() || remaining.is_zero() {
        return None;
    }
    let call_timeout = per_target_timeout.min(remaining);

    let mut in_flight: FuturesUnordered<_> = targets
        .iter()
        .enumerate()
        .map(|(index, target)| async move {
            (index, fetcher.fetch(&target.url, call_timeout).await)
        })
        .collect();

    let contest = async {
        while let Some((index, result)) = in_flight.next().await {
            let target = &targets[index];
            match result {
                Ok(response) if is_valid(target, &response) => {
                    debug!(mirror = target.name, status = response.status, "Mirror won race");
                    return Some(MirrorWin {
                        index,
                        name: target.name,
                        url: target.url.clone(),
                        response,
                    });
                }
                Ok(response) => {
                    debug!(mirror = target.name, status = response.status, "Mirror response rejected");
                }
                Err(e) => {
                    debug!(mirror = target.name, error = %e, "Mirror fetch failed");
                }
            }
        }
        None
    };

    match timeout_at(deadline, contest).await {
        Ok(winner) => winner,
        Err(_) => {
            debug!(targets = targets.len(), "Mirror race hit deadline");
            None
        }
    }
}
