//! GeoNews HTTP REST API
//!
//! Axum-based HTTP server exposing the news lookups, natural-language query
//! endpoint, trending feed and cache administration.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to an
//! inner function returning `(StatusCode, serde_json::Value)`. The inner
//! functions are directly testable without axum dispatch machinery.
//!
//! Endpoints:
//! - GET    /                      service info
//! - GET    /health                DB + cache status
//! - POST   /api/v1/news/query     natural-language query
//! - GET    /api/v1/news/category  by category
//! - GET    /api/v1/news/source    by source
//! - GET    /api/v1/news/search    title/description text search
//! - GET    /api/v1/news/score     by relevance threshold
//! - GET    /api/v1/news/nearby    within a radius
//! - GET    /api/v1/news/trending  ranked by nearby interactions
//! - GET    /api/v1/cache/stats    cache statistics
//! - DELETE /api/v1/cache/clear    drop cached trending results

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use geonews_core::cache::{ResultCache, TRENDING_KEY_PREFIX};
use geonews_core::config::NewsConfig;
use geonews_core::geo::GeoPoint;
use geonews_core::intent::analyze_query;
use geonews_core::llm::LlmBackend;
use geonews_core::{Article, GeoNewsConfig, GeoNewsError, Location, QueryIntent};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;

use crate::router::{handle_request, NewsRequest};
use crate::subsystems::summarizer::SummarizerConfig;
use crate::subsystems::trending::{trending_news, TrendingDeps, TrendingQuery};

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub pool: SqlitePool,
    pub config: GeoNewsConfig,
    pub llm: Option<Arc<dyn LlmBackend>>,
    pub cache: Option<Arc<dyn ResultCache>>,
}

impl HttpState {
    pub fn new(
        pool: SqlitePool,
        config: GeoNewsConfig,
        llm: Option<Arc<dyn LlmBackend>>,
        cache: Option<Arc<dyn ResultCache>>,
    ) -> Self {
        Self {
            pool,
            config,
            llm,
            cache,
        }
    }

    pub fn llm(&self) -> Option<&dyn LlmBackend> {
        self.llm.as_deref()
    }

    pub fn cache(&self) -> Option<&dyn ResultCache> {
        self.cache.as_deref()
    }

    pub fn trending_deps(&self) -> TrendingDeps<'_> {
        TrendingDeps {
            pool: &self.pool,
            llm: self.llm(),
            cache: self.cache(),
            cache_ttl: Duration::from_secs(self.config.cache.ttl_seconds),
            trending: &self.config.trending,
            summarizer: SummarizerConfig::from(&self.config.news),
        }
    }
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    let permissive_cors = state.config.http.cors_permissive;

    let router = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/api/v1/news/query", post(query_handler))
        .route("/api/v1/news/category", get(category_handler))
        .route("/api/v1/news/source", get(source_handler))
        .route("/api/v1/news/search", get(search_handler))
        .route("/api/v1/news/score", get(score_handler))
        .route("/api/v1/news/nearby", get(nearby_handler))
        .route("/api/v1/news/trending", get(trending_handler))
        .route("/api/v1/cache/stats", get(cache_stats_handler))
        .route("/api/v1/cache/clear", delete(cache_clear_handler))
        .with_state(state);

    if permissive_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: Arc<HttpState>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("GeoNews HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct NewsQueryRequest {
    pub query: Option<String>,
    pub location: Option<Location>,
    pub limit: Option<u32>,
    pub radius_km: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CategoryParams {
    pub category: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
pub struct SourceParams {
    pub source: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
pub struct SearchParams {
    pub query: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ScoreParams {
    pub threshold: Option<f64>,
    pub limit: Option<u32>,
}

/// Query string for `nearby` and `trending`.
#[derive(Debug, Deserialize, Default)]
pub struct GeoParams {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_km: Option<f64>,
    pub limit: Option<u32>,
}

// ============================================================================
// Validation
// ============================================================================

pub fn resolve_limit(limit: Option<u32>, news: &NewsConfig) -> Result<u32, GeoNewsError> {
    let limit = limit.unwrap_or(news.default_limit);
    if limit < 1 || limit > news.max_limit {
        return Err(GeoNewsError::validation(format!(
            "limit must be between 1 and {}",
            news.max_limit
        )));
    }
    Ok(limit)
}

pub fn resolve_radius(radius_km: Option<f64>, news: &NewsConfig) -> Result<f64, GeoNewsError> {
    let radius = radius_km.unwrap_or(news.default_radius_km);
    if !(news.min_radius_km..=news.max_radius_km).contains(&radius) {
        return Err(GeoNewsError::validation(format!(
            "radius_km must be between {} and {}",
            news.min_radius_km, news.max_radius_km
        )));
    }
    Ok(radius)
}

pub fn resolve_threshold(threshold: Option<f64>, news: &NewsConfig) -> Result<f64, GeoNewsError> {
    let threshold = threshold.unwrap_or(news.default_score_threshold);
    if !(0.0..=1.0).contains(&threshold) {
        return Err(GeoNewsError::validation(
            "threshold must be between 0.0 and 1.0",
        ));
    }
    Ok(threshold)
}

pub fn resolve_location(
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<GeoPoint, GeoNewsError> {
    let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
        return Err(GeoNewsError::validation(
            "latitude and longitude are required",
        ));
    };
    let point = GeoPoint::new(latitude, longitude);
    point.validate().map_err(GeoNewsError::Validation)?;
    Ok(point)
}

fn required_text(value: Option<String>, field: &str) -> Result<String, GeoNewsError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(GeoNewsError::validation(format!("{} field is required", field))),
    }
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner root: service banner (pure, no IO).
pub fn root_inner(config: &GeoNewsConfig) -> serde_json::Value {
    json!({
        "message": format!("Welcome to the {}", config.service.name),
        "version": env!("CARGO_PKG_VERSION"),
        "health": "/health",
        "endpoints": [
            "POST /api/v1/news/query",
            "GET /api/v1/news/category",
            "GET /api/v1/news/source",
            "GET /api/v1/news/search",
            "GET /api/v1/news/score",
            "GET /api/v1/news/nearby",
            "GET /api/v1/news/trending",
            "GET /api/v1/cache/stats",
            "DELETE /api/v1/cache/clear",
        ],
    })
}

/// Inner health check: queries DB and cache, returns (status_code, json_body).
pub async fn health_inner(state: &HttpState) -> (StatusCode, serde_json::Value) {
    let database_connected = match geonews_core::db::health_check(&state.pool).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            false
        }
    };

    let cache_connected = match state.cache() {
        Some(cache) => cache.ping().await,
        None => false,
    };

    let status = if database_connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        json!({
            "status": if database_connected { "healthy" } else { "unhealthy" },
            "version": env!("CARGO_PKG_VERSION"),
            "database_connected": database_connected,
            "cache_connected": cache_connected,
        }),
    )
}

/// Inner query: analyze the text, route by intent, shape the response.
pub async fn query_inner(state: &HttpState, req: NewsQueryRequest) -> (StatusCode, serde_json::Value) {
    let news = &state.config.news;
    let validated = (|| {
        let query = required_text(req.query, "query")?;
        let limit = resolve_limit(req.limit, news)?;
        let radius = resolve_radius(req.radius_km, news)?;
        if let Some(location) = req.location {
            location.validate().map_err(GeoNewsError::Validation)?;
        }
        Ok::<_, GeoNewsError>((query, limit, radius))
    })();

    let (query, limit, radius) = match validated {
        Ok(v) => v,
        Err(e) => return error_response(&e),
    };

    let start = Instant::now();
    let analysis = analyze_query(state.llm(), &query, req.location).await;
    let request = NewsRequest::from_analysis(&analysis, limit, radius, news.default_score_threshold);

    match handle_request(state, request).await {
        Ok(articles) => {
            tracing::info!(
                intent = analysis.intent.as_str(),
                count = articles.len(),
                took_ms = start.elapsed().as_millis() as u64,
                "Processed news query"
            );
            let metadata = json!({
                "entities": analysis.entities,
                "concepts": analysis.concepts,
                "location": analysis.location,
            });
            (
                StatusCode::OK,
                news_response(articles, &query, analysis.intent, Some(metadata)),
            )
        }
        Err(e) => error_response(&e),
    }
}

pub async fn category_inner(state: &HttpState, params: CategoryParams) -> (StatusCode, serde_json::Value) {
    let (category, limit) = match required_text(params.category, "category")
        .and_then(|c| Ok((c, resolve_limit(params.limit, &state.config.news)?)))
    {
        Ok(v) => v,
        Err(e) => return error_response(&e),
    };

    let request = NewsRequest::Category {
        category: Some(category.clone()),
        limit,
    };
    respond(
        state,
        request,
        format!("category: {}", category),
        QueryIntent::Category,
        None,
    )
    .await
}

pub async fn source_inner(state: &HttpState, params: SourceParams) -> (StatusCode, serde_json::Value) {
    let (source, limit) = match required_text(params.source, "source")
        .and_then(|s| Ok((s, resolve_limit(params.limit, &state.config.news)?)))
    {
        Ok(v) => v,
        Err(e) => return error_response(&e),
    };

    let request = NewsRequest::Source {
        source: Some(source.clone()),
        limit,
    };
    respond(
        state,
        request,
        format!("source: {}", source),
        QueryIntent::Source,
        None,
    )
    .await
}

pub async fn search_inner(state: &HttpState, params: SearchParams) -> (StatusCode, serde_json::Value) {
    let (text, limit) = match required_text(params.query, "query")
        .and_then(|q| Ok((q, resolve_limit(params.limit, &state.config.news)?)))
    {
        Ok(v) => v,
        Err(e) => return error_response(&e),
    };

    let request = NewsRequest::Search {
        text: Some(text.clone()),
        limit,
    };
    respond(state, request, text, QueryIntent::Search, None).await
}

pub async fn score_inner(state: &HttpState, params: ScoreParams) -> (StatusCode, serde_json::Value) {
    let news = &state.config.news;
    let (threshold, limit) = match resolve_threshold(params.threshold, news)
        .and_then(|t| Ok((t, resolve_limit(params.limit, news)?)))
    {
        Ok(v) => v,
        Err(e) => return error_response(&e),
    };

    let request = NewsRequest::Score { threshold, limit };
    respond(
        state,
        request,
        format!("score >= {}", threshold),
        QueryIntent::Score,
        None,
    )
    .await
}

pub async fn nearby_inner(state: &HttpState, params: GeoParams) -> (StatusCode, serde_json::Value) {
    let (location, radius_km, limit) = match validate_geo(&params, &state.config.news) {
        Ok(v) => v,
        Err(e) => return error_response(&e),
    };

    let request = NewsRequest::Nearby {
        location: Some(location),
        radius_km,
        limit,
    };
    let metadata = json!({
        "location": location,
        "radius_km": radius_km,
    });
    respond(
        state,
        request,
        format!("nearby: {}, {}", location.latitude, location.longitude),
        QueryIntent::Nearby,
        Some(metadata),
    )
    .await
}

pub async fn trending_inner(state: &HttpState, params: GeoParams) -> (StatusCode, serde_json::Value) {
    let (location, radius_km, limit) = match validate_geo(&params, &state.config.news) {
        Ok(v) => v,
        Err(e) => return error_response(&e),
    };

    let query = TrendingQuery {
        location,
        radius_km,
        limit,
    };

    match trending_news(&state.trending_deps(), query).await {
        Ok(payload) => match serde_json::to_value(&payload) {
            Ok(body) => (StatusCode::OK, body),
            Err(e) => error_response(&GeoNewsError::from(e)),
        },
        Err(e) => error_response(&e),
    }
}

pub async fn cache_stats_inner(state: &HttpState) -> (StatusCode, serde_json::Value) {
    let Some(cache) = state.cache() else {
        return (StatusCode::OK, json!({ "status": "disabled" }));
    };

    match cache.stats().await {
        Ok(stats) => (StatusCode::OK, json!(stats)),
        Err(e) => {
            tracing::warn!(error = %e, "cache stats failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "status": "error", "error": e.to_string() }),
            )
        }
    }
}

pub async fn cache_clear_inner(state: &HttpState) -> (StatusCode, serde_json::Value) {
    let Some(cache) = state.cache() else {
        return (
            StatusCode::OK,
            json!({ "message": "Cache disabled", "cleared": 0 }),
        );
    };

    match cache.clear(TRENDING_KEY_PREFIX).await {
        Ok(cleared) => {
            tracing::info!(cleared, "Trending cache cleared");
            (
                StatusCode::OK,
                json!({ "message": "Cache cleared successfully", "cleared": cleared }),
            )
        }
        Err(e) => {
            tracing::warn!(error = %e, "cache clear failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "message": "Cache clear failed", "status": "error", "error": e.to_string() }),
            )
        }
    }
}

// ============================================================================
// Axum handler wrappers (thin, delegate to inner functions)
// ============================================================================

pub async fn root_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(root_inner(&state.config)))
}

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state).await;
    (status, Json(body))
}

pub async fn query_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<NewsQueryRequest>,
) -> impl IntoResponse {
    let (status, body) = query_inner(&state, req).await;
    (status, Json(body))
}

pub async fn category_handler(
    State(state): State<Arc<HttpState>>,
    Query(params): Query<CategoryParams>,
) -> impl IntoResponse {
    let (status, body) = category_inner(&state, params).await;
    (status, Json(body))
}

pub async fn source_handler(
    State(state): State<Arc<HttpState>>,
    Query(params): Query<SourceParams>,
) -> impl IntoResponse {
    let (status, body) = source_inner(&state, params).await;
    (status, Json(body))
}

pub async fn search_handler(
    State(state): State<Arc<HttpState>>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    let (status, body) = search_inner(&state, params).await;
    (status, Json(body))
}

pub async fn score_handler(
    State(state): State<Arc<HttpState>>,
    Query(params): Query<ScoreParams>,
) -> impl IntoResponse {
    let (status, body) = score_inner(&state, params).await;
    (status, Json(body))
}

pub async fn nearby_handler(
    State(state): State<Arc<HttpState>>,
    Query(params): Query<GeoParams>,
) -> impl IntoResponse {
    let (status, body) = nearby_inner(&state, params).await;
    (status, Json(body))
}

pub async fn trending_handler(
    State(state): State<Arc<HttpState>>,
    Query(params): Query<GeoParams>,
) -> impl IntoResponse {
    let (status, body) = trending_inner(&state, params).await;
    (status, Json(body))
}

pub async fn cache_stats_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = cache_stats_inner(&state).await;
    (status, Json(body))
}

pub async fn cache_clear_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = cache_clear_inner(&state).await;
    (status, Json(body))
}

// ============================================================================
// Helpers
// ============================================================================

fn validate_geo(params: &GeoParams, news: &NewsConfig) -> Result<(GeoPoint, f64, u32), GeoNewsError> {
    let location = resolve_location(params.latitude, params.longitude)?;
    let radius_km = resolve_radius(params.radius_km, news)?;
    let limit = resolve_limit(params.limit, news)?;
    Ok((location, radius_km, limit))
}

async fn respond(
    state: &HttpState,
    request: NewsRequest,
    query_used: String,
    intent: QueryIntent,
    metadata: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    match handle_request(state, request).await {
        Ok(articles) => (
            StatusCode::OK,
            news_response(articles, &query_used, intent, metadata),
        ),
        Err(e) => error_response(&e),
    }
}

/// Standard article-list body.
pub fn news_response(
    articles: Vec<Article>,
    query_used: &str,
    intent: QueryIntent,
    metadata: Option<serde_json::Value>,
) -> serde_json::Value {
    json!({
        "total_count": articles.len(),
        "articles": articles,
        "query_used": query_used,
        "intent": intent,
        "metadata": metadata,
    })
}

/// Validation errors are the caller's fault (400); everything else is ours (500).
pub fn error_response(error: &GeoNewsError) -> (StatusCode, serde_json::Value) {
    let status = if error.is_validation() {
        StatusCode::BAD_REQUEST
    } else {
        tracing::error!(error = %error, "Request failed");
        StatusCode::INTERNAL_SERVER_ERROR
    };

    let message = match error {
        GeoNewsError::Validation(msg) => msg.clone(),
        other => other.to_string(),
    };

    (status, json!({ "status": "error", "error": message }))
}

// ============================================================================
// Unit Tests: call inner functions directly
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{article, pool_with};
    use geonews_core::MemoryCache;

    async fn make_state(with_cache: bool) -> HttpState {
        let mut a = article("sf-1", 37.7749, -122.4194);
        a.title = "Golden Gate bridge closure".to_string();
        a.category = vec!["national".to_string()];
        a.source_name = "Reuters".to_string();
        a.relevance_score = 0.8;
        let pool = pool_with(vec![a]).await;

        let cache: Option<Arc<dyn ResultCache>> = if with_cache {
            Some(Arc::new(MemoryCache::new()))
        } else {
            None
        };
        HttpState::new(pool, GeoNewsConfig::default(), None, cache)
    }

    // ========================================================================
    // TEST 1: root_inner is pure and names the service
    // ========================================================================
    #[test]
    fn test_root_inner_pure() {
        let v = root_inner(&GeoNewsConfig::default());
        assert_eq!(
            v["message"],
            "Welcome to the Contextual News Data Retrieval System"
        );
        assert_eq!(v["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(v["health"], "/health");
    }

    // ========================================================================
    // TEST 2: validators
    // ========================================================================
    #[test]
    fn test_resolve_limit_bounds() {
        let news = NewsConfig::default();
        assert_eq!(resolve_limit(None, &news).unwrap(), 5);
        assert_eq!(resolve_limit(Some(50), &news).unwrap(), 50);
        assert!(resolve_limit(Some(0), &news).unwrap_err().is_validation());
        assert!(resolve_limit(Some(51), &news).is_err());
    }

    #[test]
    fn test_resolve_radius_bounds() {
        let news = NewsConfig::default();
        assert_eq!(resolve_radius(None, &news).unwrap(), 10.0);
        assert_eq!(resolve_radius(Some(0.1), &news).unwrap(), 0.1);
        assert_eq!(resolve_radius(Some(100.0), &news).unwrap(), 100.0);
        assert!(resolve_radius(Some(0.05), &news).is_err());
        assert!(resolve_radius(Some(100.5), &news).is_err());
        assert!(resolve_radius(Some(f64::NAN), &news).is_err());
    }

    #[test]
    fn test_resolve_threshold_and_location() {
        let news = NewsConfig::default();
        assert_eq!(resolve_threshold(None, &news).unwrap(), 0.7);
        assert!(resolve_threshold(Some(1.5), &news).is_err());

        assert!(resolve_location(Some(37.0), Some(-122.0)).is_ok());
        assert!(resolve_location(Some(91.0), Some(0.0)).is_err());
        assert!(resolve_location(None, Some(0.0)).is_err());
    }

    #[test]
    fn test_error_response_status_mapping() {
        let (status, body) = error_response(&GeoNewsError::validation("bad radius"));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "status": "error", "error": "bad radius" }));

        let (status, body) = error_response(&GeoNewsError::Database(sqlx::Error::RowNotFound));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
    }

    // ========================================================================
    // TEST 3: health reports DB and cache
    // ========================================================================
    #[tokio::test]
    async fn test_health_inner_ok() {
        let state = make_state(true).await;
        let (status, body) = health_inner(&state).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database_connected"], true);
        assert_eq!(body["cache_connected"], true);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_health_inner_db_down() {
        let state = make_state(false).await;
        state.pool.close().await;

        let (status, body) = health_inner(&state).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["database_connected"], false);
        assert_eq!(body["cache_connected"], false);
    }

    // ========================================================================
    // TEST 4: query endpoint
    // ========================================================================
    #[tokio::test]
    async fn test_query_inner_blank_query_is_400() {
        let state = make_state(false).await;
        let req = NewsQueryRequest {
            query: Some("   ".to_string()),
            ..Default::default()
        };
        let (status, body) = query_inner(&state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_query_inner_rejects_bad_location() {
        let state = make_state(false).await;
        let req = NewsQueryRequest {
            query: Some("news near me".to_string()),
            location: Some(Location::new(120.0, 0.0)),
            ..Default::default()
        };
        let (status, _) = query_inner(&state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_query_inner_keyword_fallback_search() {
        let state = make_state(false).await;
        let req = NewsQueryRequest {
            query: Some("Golden Gate".to_string()),
            ..Default::default()
        };
        let (status, body) = query_inner(&state, req).await;
        assert_eq!(status, StatusCode::OK, "{:?}", body);
        assert_eq!(body["intent"], "search");
        assert_eq!(body["query_used"], "Golden Gate");
        assert_eq!(body["total_count"], 1);
        assert_eq!(body["articles"][0]["id"], "sf-1");
        assert!(body["articles"][0]["llm_summary"].is_string());
        assert!(body["metadata"]["entities"]
            .as_array()
            .unwrap()
            .contains(&json!("Golden Gate")));
    }

    #[tokio::test]
    async fn test_query_inner_nearby_uses_request_location() {
        let state = make_state(false).await;
        let req = NewsQueryRequest {
            query: Some("what's happening nearby".to_string()),
            location: Some(Location::new(37.77, -122.42)),
            limit: Some(3),
            radius_km: Some(5.0),
        };
        let (status, body) = query_inner(&state, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["intent"], "nearby");
        assert_eq!(body["total_count"], 1);
        assert_eq!(body["metadata"]["location"]["latitude"], 37.77);
    }

    // ========================================================================
    // TEST 5: direct lookups
    // ========================================================================
    #[tokio::test]
    async fn test_category_inner_requires_category() {
        let state = make_state(false).await;
        let (status, _) = category_inner(&state, CategoryParams::default()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let params = CategoryParams {
            category: Some("National".to_string()),
            limit: None,
        };
        let (status, body) = category_inner(&state, params).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["query_used"], "category: National");
        assert_eq!(body["intent"], "category");
        assert_eq!(body["total_count"], 1);
    }

    #[tokio::test]
    async fn test_score_inner_default_threshold() {
        let state = make_state(false).await;
        let (status, body) = score_inner(&state, ScoreParams::default()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["query_used"], "score >= 0.7");
        assert_eq!(body["total_count"], 1);
    }

    #[tokio::test]
    async fn test_nearby_inner_echoes_location_and_radius() {
        let state = make_state(false).await;
        let params = GeoParams {
            latitude: Some(37.7749),
            longitude: Some(-122.4194),
            radius_km: Some(2.0),
            limit: None,
        };
        let (status, body) = nearby_inner(&state, params).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["metadata"]["radius_km"], 2.0);
        assert_eq!(body["metadata"]["location"]["longitude"], -122.4194);
        assert_eq!(body["total_count"], 1);
    }

    #[tokio::test]
    async fn test_trending_inner_validates_and_returns_payload() {
        let state = make_state(true).await;

        let (status, _) = trending_inner(&state, GeoParams::default()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let params = GeoParams {
            latitude: Some(37.7749),
            longitude: Some(-122.4194),
            radius_km: None,
            limit: None,
        };
        let (status, body) = trending_inner(&state, params).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["radius_km"], 10.0);
        assert_eq!(body["total_count"], 0);
        assert!(body["articles"].as_array().unwrap().is_empty());
        assert!(body["trending_scores"].as_array().unwrap().is_empty());
    }

    // ========================================================================
    // TEST 6: cache administration
    // ========================================================================
    #[tokio::test]
    async fn test_cache_endpoints_when_disabled() {
        let state = make_state(false).await;
        let (_, body) = cache_stats_inner(&state).await;
        assert_eq!(body, json!({ "status": "disabled" }));

        let (status, body) = cache_clear_inner(&state).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cleared"], 0);
    }

    #[tokio::test]
    async fn test_cache_clear_reports_removed_entries() {
        let state = make_state(true).await;
        let params = || GeoParams {
            latitude: Some(37.7749),
            longitude: Some(-122.4194),
            radius_km: None,
            limit: None,
        };
        trending_inner(&state, params()).await;

        let (_, stats) = cache_stats_inner(&state).await;
        assert_eq!(stats["entries"], 1);

        let (status, body) = cache_clear_inner(&state).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Cache cleared successfully");
        assert_eq!(body["cleared"], 1);
    }
}
