use serde::{Deserialize, Serialize};

pub use crate::geo::GeoPoint as Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryIntent {
    Category,
    Source,
    Search,
    Score,
    Nearby,
    Trending,
}

impl QueryIntent {
    /// Lenient mapping used for LLM replies: anything unrecognised is a text search.
    pub fn parse_or_search(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "category" => QueryIntent::Category,
            "source" => QueryIntent::Source,
            "score" => QueryIntent::Score,
            "nearby" => QueryIntent::Nearby,
            "trending" => QueryIntent::Trending,
            _ => QueryIntent::Search,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryIntent::Category => "category",
            QueryIntent::Source => "source",
            QueryIntent::Search => "search",
            QueryIntent::Score => "score",
            QueryIntent::Nearby => "nearby",
            QueryIntent::Trending => "trending",
        }
    }
}

/// Structured reading of a natural-language news query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub concepts: Vec<String>,
    pub intent: QueryIntent,
    pub location: Option<Location>,
    pub search_query: Option<String>,
    pub category: Option<String>,
    pub source: Option<String>,
    pub score_threshold: Option<f64>,
}

impl QueryAnalysis {
    pub fn new(intent: QueryIntent) -> Self {
        Self {
            entities: Vec::new(),
            concepts: Vec::new(),
            intent,
            location: None,
            search_query: None,
            category: None,
            source: None,
            score_threshold: None,
        }
    }
}
