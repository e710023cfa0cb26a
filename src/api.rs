use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::config::AppConfig;
use crate::jobs::smart::{smart_search, ResumeData, SmartSearchOptions, SmartSearchOutcome};
use crate::jobs::sources::SourceRegistry;
use crate::jobs::types::{JobListing, JobSearchParams, SourceReport};
use crate::jobs::JobAggregator;
use crate::ratelimit::{RateLimitConfig, RateLimiter};

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<JobAggregator>,
    pub limiter: Arc<RateLimiter>,
    pub config: Arc<AppConfig>,
    pub stats: Arc<Stats>,
}

impl AppState {
    /// Production wiring: registry from config + whitelist file.
    pub fn from_config(config: AppConfig) -> Self {
        let whitelist = crate::config::load_sources_default().unwrap_or_else(|e| {
            tracing::warn!(error = ?e, "sources whitelist unreadable, enabling all");
            Vec::new()
        });
        let registry = SourceRegistry::from_config(&config, &whitelist);
        Self::with_parts(registry, config)
    }

    /// Explicit wiring; also what the HTTP tests use with stub registries.
    pub fn with_parts(registry: SourceRegistry, config: AppConfig) -> Self {
        Self {
            aggregator: Arc::new(JobAggregator::new(Arc::new(registry))),
            limiter: Arc::new(RateLimiter::new()),
            config: Arc::new(config),
            stats: Arc::new(Stats::new()),
        }
    }
}

/// In-process request counters served by `/stats`.
pub struct Stats {
    start_unix: u64,
    requests_total: AtomicU64,
    requests_limited: AtomicU64,
    jobs_found: AtomicU64,
}

impl Stats {
    fn new() -> Self {
        Self {
            start_unix: chrono::Utc::now().timestamp().max(0) as u64,
            requests_total: AtomicU64::new(0),
            requests_limited: AtomicU64::new(0),
            jobs_found: AtomicU64::new(0),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search))
        .route("/search/smart", post(search_smart))
        .route("/sources", get(sources))
        .route("/stats", get(stats))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// First hop of `x-forwarded-for`, or "unknown" when the proxy adds nothing.
fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

type Limited = (StatusCode, Json<serde_json::Value>);

/// `api` context guard: check, then count the request as an attempt.
fn guard_api(state: &AppState, headers: &HeaderMap) -> Result<(), Limited> {
    let ip = client_ip(headers);
    let res = state.limiter.check(&ip, "api", &RateLimitConfig::API);
    if !res.allowed {
        state.stats.requests_limited.fetch_add(1, Ordering::Relaxed);
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "rate limit exceeded",
                "retry_in_secs": res.reset_in_secs,
            })),
        ));
    }
    state.limiter.record(&ip, "api", &RateLimitConfig::API, false);
    Ok(())
}

#[derive(Debug, serde::Deserialize)]
struct SearchQuery {
    #[serde(default)]
    keyword: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    max_age_days: Option<u32>,
    #[serde(default)]
    source: Option<String>,
}

#[derive(serde::Serialize)]
struct SearchResponse {
    jobs: Vec<JobListing>,
    total: usize,
    sources: Vec<SourceReport>,
    timestamp: String,
}

async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, Limited> {
    guard_api(&state, &headers)?;
    state.stats.requests_total.fetch_add(1, Ordering::Relaxed);

    let limit = q
        .limit
        .unwrap_or(state.config.default_limit)
        .min(state.config.max_limit);
    let params = JobSearchParams {
        keyword: q.keyword,
        location: q.location,
        country: q.country,
        category: q.category,
        limit: Some(limit),
        max_age_days: q.max_age_days,
    };

    let outcome = state.aggregator.search(&params, q.source.as_deref()).await;
    state
        .stats
        .jobs_found
        .fetch_add(outcome.jobs.len() as u64, Ordering::Relaxed);

    Ok(Json(SearchResponse {
        total: outcome.jobs.len(),
        jobs: outcome.jobs,
        sources: outcome.sources,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

#[derive(Debug, serde::Deserialize)]
struct SmartSearchBody {
    resume: ResumeData,
    #[serde(flatten)]
    options: SmartSearchOptions,
}

async fn search_smart(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SmartSearchBody>,
) -> Result<Json<SmartSearchOutcome>, Limited> {
    guard_api(&state, &headers)?;
    state.stats.requests_total.fetch_add(1, Ordering::Relaxed);

    let mut options = body.options;
    options.limit = Some(
        options
            .limit
            .unwrap_or(state.config.default_limit)
            .min(state.config.max_limit),
    );

    let outcome = smart_search(&state.aggregator, &body.resume, &options).await;
    state
        .stats
        .jobs_found
        .fetch_add(outcome.jobs.len() as u64, Ordering::Relaxed);
    Ok(Json(outcome))
}

async fn sources(State(state): State<AppState>) -> Json<serde_json::Value> {
    let registry = state.aggregator.registry();
    let enabled = registry.names();
    Json(json!({
        "sources": enabled,
        "total": enabled.len(),
        "disabled": registry.disabled(),
    }))
}

async fn stats(State(state): State<AppState>) -> Json<serde_json::Value> {
    let now = chrono::Utc::now().timestamp().max(0) as u64;
    let uptime = now.saturating_sub(state.stats.start_unix);
    Json(json!({
        "requests_total": state.stats.requests_total.load(Ordering::Relaxed),
        "requests_limited": state.stats.requests_limited.load(Ordering::Relaxed),
        "jobs_found": state.stats.jobs_found.load(Ordering::Relaxed),
        "uptime_seconds": uptime,
        "uptime_human": format!("{}h {}m", uptime / 3600, (uptime % 3600) / 60),
        "rate_limit_entries": state.limiter.entry_count(),
    }))
}
