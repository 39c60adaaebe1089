//! Trending subsystem: location-aware ranking by recent interactions
//!
//! Pipeline for one request:
//! 1. cache lookup by quantized key
//! 2. nearest `limit × candidate_multiplier` articles inside the radius
//! 3. per-article score from events in the last `decay_hours`, spatially
//!    filtered by the configured policy: a ±`bounding_box_degrees` window, or
//!    the exact query radius (SQL pre-filtered by a window covering the circle)
//! 4. rank, summarize the emitted articles, cache the payload
//!
//! Cache failures are logged and ignored; a cache outage never fails a request.

use std::time::Duration;

use chrono::{DateTime, Utc};
use geonews_core::cache::{trending_cache_key, ResultCache};
use geonews_core::config::{EventFilter, TrendingConfig};
use geonews_core::geo::{BoundingBox, GeoPoint};
use geonews_core::llm::LlmBackend;
use geonews_core::trending::{rank, trending_score, ScoringContext, ScoringEvent};
use geonews_core::{Article, GeoNewsError, Location};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::subsystems::news;
use crate::subsystems::summarizer::{ensure_summaries, SummarizerConfig};

/// Validated trending request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendingQuery {
    pub location: GeoPoint,
    pub radius_km: f64,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingPayload {
    pub articles: Vec<Article>,
    pub trending_scores: Vec<f64>,
    pub location: Location,
    pub radius_km: f64,
    /// Positively scored candidates before truncation to `limit`.
    pub total_count: usize,
}

impl TrendingPayload {
    fn empty(query: &TrendingQuery) -> Self {
        Self {
            articles: Vec::new(),
            trending_scores: Vec::new(),
            location: query.location,
            radius_km: query.radius_km,
            total_count: 0,
        }
    }
}

/// Everything the pipeline needs besides the query itself.
pub struct TrendingDeps<'a> {
    pub pool: &'a SqlitePool,
    pub llm: Option<&'a dyn LlmBackend>,
    pub cache: Option<&'a dyn ResultCache>,
    pub cache_ttl: Duration,
    pub trending: &'a TrendingConfig,
    pub summarizer: SummarizerConfig,
}

/// Cached entry point.
pub async fn trending_news(
    deps: &TrendingDeps<'_>,
    query: TrendingQuery,
) -> Result<TrendingPayload, GeoNewsError> {
    let key = trending_cache_key(
        query.location.latitude,
        query.location.longitude,
        query.radius_km,
        query.limit,
    );

    if let Some(cache) = deps.cache {
        match cache.get(&key).await {
            Ok(Some(value)) => match serde_json::from_value::<TrendingPayload>(value) {
                Ok(payload) => {
                    tracing::debug!(key = %key, "Trending cache hit");
                    return Ok(payload);
                }
                Err(e) => tracing::warn!(key = %key, error = %e, "Discarding unreadable cache entry"),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!(key = %key, error = %e, "cache get failed"),
        }
    }

    let payload = compute_trending(deps, query, Utc::now()).await?;

    if let Some(cache) = deps.cache {
        match serde_json::to_value(&payload) {
            Ok(value) => {
                if let Err(e) = cache.set(&key, value, deps.cache_ttl).await {
                    tracing::warn!(key = %key, error = %e, "cache set failed");
                }
            }
            Err(e) => tracing::warn!(key = %key, error = %e, "Trending payload not cacheable"),
        }
    }

    Ok(payload)
}

/// Uncached pipeline, scored as of `now`.
pub async fn compute_trending(
    deps: &TrendingDeps<'_>,
    query: TrendingQuery,
    now: DateTime<Utc>,
) -> Result<TrendingPayload, GeoNewsError> {
    let candidate_cap = query.limit as usize * deps.trending.candidate_multiplier.max(1) as usize;
    let candidates = news::nearby(deps.pool, query.location, query.radius_km, candidate_cap).await?;

    if candidates.is_empty() {
        return Ok(TrendingPayload::empty(&query));
    }

    let ctx = ScoringContext {
        origin: query.location,
        radius_km: query.radius_km,
        decay_hours: deps.trending.decay_hours,
        now,
    };
    let since = now - chrono::Duration::milliseconds((deps.trending.decay_hours * 3_600_000.0) as i64);
    let window = event_window(deps.trending, &query);

    let mut scored = Vec::with_capacity(candidates.len());
    for (article, _distance) in candidates {
        let mut events = recent_events(deps.pool, &article.id, since, window.as_ref()).await?;
        if deps.trending.event_filter == EventFilter::ExactRadius {
            events.retain(|e| query.location.distance_km(&e.location) <= query.radius_km);
        }
        let score = trending_score(&events, &ctx);
        scored.push((article, score));
    }

    let page = rank(scored, query.limit as usize);
    let (articles, trending_scores): (Vec<Article>, Vec<f64>) = page.items.into_iter().unzip();

    let articles = ensure_summaries(deps.pool, deps.llm, articles, deps.summarizer).await;

    tracing::debug!(
        emitted = articles.len(),
        total = page.total,
        "Computed trending articles"
    );

    Ok(TrendingPayload {
        articles,
        trending_scores,
        location: query.location,
        radius_km: query.radius_km,
        total_count: page.total,
    })
}

/// SQL-side spatial window for event lookup. `ExactRadius` windows cover the
/// whole query circle; `None` means no spatial SQL filter.
fn event_window(trending: &TrendingConfig, query: &TrendingQuery) -> Option<BoundingBox> {
    match trending.event_filter {
        EventFilter::BoundingBox => Some(BoundingBox::around(
            query.location,
            trending.bounding_box_degrees,
        )),
        EventFilter::ExactRadius => BoundingBox::covering(query.location, query.radius_km),
    }
}

/// Events for one article at or after `since`, inside `window` when given.
pub async fn recent_events(
    pool: &SqlitePool,
    article_id: &str,
    since: DateTime<Utc>,
    window: Option<&BoundingBox>,
) -> Result<Vec<ScoringEvent>, sqlx::Error> {
    let mut sql = String::from(
        "SELECT event_type, latitude, longitude, timestamp FROM user_events \
         WHERE article_id = ? AND timestamp >= ?",
    );
    if window.is_some() {
        sql.push_str(" AND latitude BETWEEN ? AND ? AND longitude BETWEEN ? AND ?");
    }

    let mut query = sqlx::query_as::<_, (String, f64, f64, DateTime<Utc>)>(&sql)
        .bind(article_id)
        .bind(since);
    if let Some(window) = window {
        query = query
            .bind(window.min_latitude)
            .bind(window.max_latitude)
            .bind(window.min_longitude)
            .bind(window.max_longitude);
    }
    let rows = query.fetch_all(pool).await?;

    Ok(rows
        .into_iter()
        .map(|(event_type, latitude, longitude, timestamp)| ScoringEvent {
            event_type,
            location: GeoPoint::new(latitude, longitude),
            timestamp,
        })
        .collect())
}
