//! handlescope: cross-platform profile aggregation
//!
//! Given one handle, probes a code host, a microblog and a photo platform in
//! parallel under a shared deadline, then merges what they report into a
//! single `ProfileRecord` with a deduplicated list of connected accounts.

pub mod api;
pub mod classifier;
pub mod coordinator;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod merge;
pub mod mirror_race;
pub mod probes;
pub mod types;

pub use crate::coordinator::ProfileResolver;
pub use crate::error::{ApiError, ApiResult};
pub use crate::types::{ProfileRecord, ResolveError};

use axum::Router;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub resolver: ProfileResolver,
    /// Budget used when a request does not name one
    pub default_budget: Duration,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(resolver: ProfileResolver, default_budget: Duration) -> Self {
        Self {
            resolver,
            default_budget,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::profile_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
