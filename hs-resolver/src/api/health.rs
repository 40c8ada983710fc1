//! Health check endpoint
//!
//! Liveness plus the resolver's own lookup diagnostics.

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    /// Lookups answered since startup
    pub lookups_completed: u64,
    /// Of those, lookups that found no connected account
    pub lookups_without_accounts: u64,
    /// Most recent "nothing found" outcome, with the handle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let diagnostics = state.resolver.diagnostics();
    let uptime_seconds = Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds()
        .max(0) as u64;

    Json(HealthResponse {
        status: "ok",
        module: "handlescope",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds,
        lookups_completed: diagnostics.completed(),
        lookups_without_accounts: diagnostics.without_accounts(),
        last_error: diagnostics.last_error().await,
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
