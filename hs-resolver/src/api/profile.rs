//! Profile lookup endpoint
//!
//! `GET /api/scrape?username=<handle>[&budget_ms=<n>]`

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};

use crate::error::{ApiError, ApiResult};
use crate::types::ProfileRecord;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ScrapeParams {
    #[serde(default)]
    pub username: Option<String>,
    /// Overrides the configured budget for this lookup
    #[serde(default)]
    pub budget_ms: Option<u64>,
}

/// GET /api/scrape
pub async fn scrape_profile(
    State(state): State<AppState>,
    Query(params): Query<ScrapeParams>,
) -> ApiResult<Json<ProfileRecord>> {
    let username = params.username.unwrap_or_default();
    let budget = match params.budget_ms {
        Some(0) => return Err(ApiError::BadRequest("budget_ms must be positive".to_string())),
        Some(ms) => Duration::from_millis(ms),
        None => state.default_budget,
    };

    info!(username = %username.trim(), budget_ms = budget.as_millis() as u64, "Profile lookup requested");

    let resolver = state.resolver.clone();
    let record = tokio::spawn(async move { resolver.resolve_profile(&username, budget).await })
        .await
        .map_err(|e| {
            error!(error = %e, "Lookup task failed");
            ApiError::Internal(format!("lookup task failed: {}", e))
        })??;

    Ok(Json(record))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/api/scrape", get(scrape_profile))
}
