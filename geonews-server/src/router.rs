//! Intent router: maps an analyzed query onto one store lookup
//!
//! `NewsRequest` is closed: every intent has exactly one handler. A request whose
//! required slot is missing (no category, no source, no search text, no location
//! for nearby) resolves to an empty result rather than an error.

use geonews_core::geo::GeoPoint;
use geonews_core::{Article, GeoNewsError, QueryAnalysis, QueryIntent};

use crate::http::HttpState;
use crate::subsystems::summarizer::{ensure_summaries, SummarizerConfig};
use crate::subsystems::{news, trending};

/// Text used when a query has nothing better to search for.
pub const DEFAULT_SEARCH_TEXT: &str = "news";

#[derive(Debug, Clone, PartialEq)]
pub enum NewsRequest {
    Category {
        category: Option<String>,
        limit: u32,
    },
    Source {
        source: Option<String>,
        limit: u32,
    },
    Search {
        text: Option<String>,
        limit: u32,
    },
    Score {
        threshold: f64,
        limit: u32,
    },
    Nearby {
        location: Option<GeoPoint>,
        radius_km: f64,
        limit: u32,
    },
    Trending {
        location: GeoPoint,
        radius_km: f64,
        limit: u32,
    },
}

impl NewsRequest {
    /// Build the request for an analysis. Score without a threshold uses
    /// `default_threshold`; trending without a location becomes a text search.
    pub fn from_analysis(
        analysis: &QueryAnalysis,
        limit: u32,
        radius_km: f64,
        default_threshold: f64,
    ) -> Self {
        match analysis.intent {
            QueryIntent::Category => NewsRequest::Category {
                category: analysis.category.clone(),
                limit,
            },
            QueryIntent::Source => NewsRequest::Source {
                source: analysis.source.clone(),
                limit,
            },
            QueryIntent::Search => NewsRequest::Search {
                text: analysis.search_query.clone(),
                limit,
            },
            QueryIntent::Score => NewsRequest::Score {
                threshold: analysis.score_threshold.unwrap_or(default_threshold),
                limit,
            },
            QueryIntent::Nearby => NewsRequest::Nearby {
                location: analysis.location,
                radius_km,
                limit,
            },
            QueryIntent::Trending => match analysis.location {
                Some(location) => NewsRequest::Trending {
                    location,
                    radius_km,
                    limit,
                },
                None => NewsRequest::Search {
                    text: Some(
                        analysis
                            .search_query
                            .clone()
                            .filter(|q| !q.trim().is_empty())
                            .unwrap_or_else(|| DEFAULT_SEARCH_TEXT.to_string()),
                    ),
                    limit,
                },
            },
        }
    }

    pub fn intent(&self) -> QueryIntent {
        match self {
            NewsRequest::Category { .. } => QueryIntent::Category,
            NewsRequest::Source { .. } => QueryIntent::Source,
            NewsRequest::Search { .. } => QueryIntent::Search,
            NewsRequest::Score { .. } => QueryIntent::Score,
            NewsRequest::Nearby { .. } => QueryIntent::Nearby,
            NewsRequest::Trending { .. } => QueryIntent::Trending,
        }
    }
}

fn present(slot: &Option<String>) -> Option<&str> {
    slot.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Run one request against the store. Every returned article carries a summary.
pub async fn handle_request(
    state: &HttpState,
    request: NewsRequest,
) -> Result<Vec<Article>, GeoNewsError> {
    let pool = &state.pool;

    let articles = match request {
        NewsRequest::Category { category, limit } => match present(&category) {
            Some(c) => news::by_category(pool, c, limit).await?,
            None => Vec::new(),
        },
        NewsRequest::Source { source, limit } => match present(&source) {
            Some(s) => news::by_source(pool, s, limit).await?,
            None => Vec::new(),
        },
        NewsRequest::Search { text, limit } => match present(&text) {
            Some(t) => news::search(pool, t, limit).await?,
            None => Vec::new(),
        },
        NewsRequest::Score { threshold, limit } => news::by_score(pool, threshold, limit).await?,
        NewsRequest::Nearby {
            location,
            radius_km,
            limit,
        } => match location {
            Some(origin) => news::nearby(pool, origin, radius_km, limit as usize)
                .await?
                .into_iter()
                .map(|(article, _)| article)
                .collect(),
            None => Vec::new(),
        },
        NewsRequest::Trending {
            location,
            radius_km,
            limit,
        } => {
            // summaries are already ensured by the pipeline
            let query = trending::TrendingQuery {
                location,
                radius_km,
                limit,
            };
            let payload = trending::trending_news(&state.trending_deps(), query).await?;
            return Ok(payload.articles);
        }
    };

    Ok(ensure_summaries(
        pool,
        state.llm(),
        articles,
        SummarizerConfig::from(&state.config.news),
    )
    .await)
}
