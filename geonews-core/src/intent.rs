//! Query intent analysis
//!
//! Turns free text like "What's trending near me" into a `QueryAnalysis`.
//!
//! Two paths:
//! 1. LLM: prompt for a JSON object, parse the first `{...}` block of the reply
//! 2. Keyword fallback: fixed keyword groups checked in priority order
//!    (category → source → nearby → trending → score → search)
//!
//! Any LLM failure (transport, empty reply, unparsable JSON) drops to path 2,
//! applied to the user's original query text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::llm::{CompletionRequest, LlmBackend};
use crate::models::query::{Location, QueryAnalysis, QueryIntent};

const ANALYSIS_SYSTEM_PROMPT: &str = "You are an expert at analyzing news queries to extract entities, concepts, and determine user intent.";

const ANALYSIS_TEMPERATURE: f32 = 0.1;
const ANALYSIS_MAX_TOKENS: u32 = 500;

// ============================================================================
// Keyword tables
// ============================================================================

const CATEGORY_INTENT_WORDS: &[&str] = &[
    "category",
    "type",
    "sports",
    "technology",
    "politics",
    "business",
];
const SOURCE_INTENT_WORDS: &[&str] = &["from", "source", "cnn", "bbc", "reuters", "times"];
const NEARBY_INTENT_WORDS: &[&str] = &["near", "nearby", "location", "around"];
const TRENDING_INTENT_WORDS: &[&str] = &["trending", "popular", "viral"];
const SCORE_INTENT_WORDS: &[&str] = &["score", "relevance", "important"];

const CONCEPT_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "technology",
        &["tech", "ai", "software", "computer", "internet", "digital"],
    ),
    (
        "politics",
        &["election", "government", "president", "minister", "parliament"],
    ),
    (
        "sports",
        &["football", "cricket", "basketball", "tennis", "olympics"],
    ),
    (
        "business",
        &["economy", "market", "stock", "company", "business"],
    ),
    (
        "health",
        &["health", "medical", "disease", "hospital", "doctor"],
    ),
    (
        "entertainment",
        &["movie", "music", "celebrity", "actor", "singer"],
    ),
];

/// Checked in order; first substring hit wins.
const CATEGORY_KEYWORDS: &[(&str, &str)] = &[
    ("technology", "technology"),
    ("tech", "technology"),
    ("sports", "sports"),
    ("politics", "politics"),
    ("business", "business"),
    ("health", "health"),
    ("entertainment", "entertainment"),
    ("world", "world"),
    ("national", "national"),
];

/// Checked in order; first substring hit wins.
const SOURCE_KEYWORDS: &[(&str, &str)] = &[
    ("cnn", "CNN"),
    ("bbc", "BBC"),
    ("reuters", "Reuters"),
    ("times", "The New York Times"),
    ("guardian", "The Guardian"),
    ("fox", "Fox News"),
    ("nbc", "NBC"),
    ("abc", "ABC"),
];

static ENTITY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // proper names
        r"\b[A-Z][a-z]+ [A-Z][a-z]+\b",
        // acronyms
        r"\b[A-Z]{2,}\b",
        // honorific + surname
        r"\b(?:Mr|Ms|Dr|Prof)\. [A-Z][a-z]+\b",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// First `{` through last `}` of a reply.
static JSON_BLOCK: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").ok());

// ============================================================================
// PUBLIC API
// ============================================================================

/// Analyze `query`, preferring the LLM when one is available.
///
/// Never fails: every error path ends in `fallback_analysis`.
pub async fn analyze_query(
    backend: Option<&dyn LlmBackend>,
    query: &str,
    user_location: Option<Location>,
) -> QueryAnalysis {
    let Some(backend) = backend else {
        return fallback_analysis(query, user_location);
    };

    let request = analysis_request(query, user_location);
    match backend.generate(&request).await {
        Ok(reply) => match parse_query_analysis(&reply, user_location) {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!(backend = backend.name(), error = %e, "LLM analysis unparsable, using keyword fallback");
                fallback_analysis(query, user_location)
            }
        },
        Err(e) => {
            tracing::warn!(backend = backend.name(), error = %e, "LLM analysis failed, using keyword fallback");
            fallback_analysis(query, user_location)
        }
    }
}

/// Prompt asking the model for a JSON analysis of `query`.
pub fn analysis_request(query: &str, user_location: Option<Location>) -> CompletionRequest {
    let location_context = user_location
        .map(|loc| format!("\nUser location: {}, {}", loc.latitude, loc.longitude))
        .unwrap_or_default();

    let prompt = format!(
        r#"Analyze this news query and extract the following information:
Query: "{query}"{location_context}

Please provide a JSON response with:
1. "entities": List of named entities (people, organizations, locations, events)
2. "concepts": List of key concepts and topics
3. "intent": One of: "category", "source", "search", "score", "nearby", "trending"
4. "location": If location is relevant, provide {{"latitude": float, "longitude": float}}
5. "search_query": If this is a search query, provide the cleaned search terms
6. "category": If a specific category is mentioned (e.g., "technology", "sports", "politics")
7. "source": If a specific news source is mentioned (e.g., "CNN", "BBC", "Reuters")
8. "score_threshold": If relevance score is mentioned, provide the threshold

Examples:
- "Latest technology news" -> intent: "category", category: "technology"
- "News from CNN" -> intent: "source", source: "CNN"
- "Elon Musk Twitter acquisition" -> intent: "search", search_query: "Elon Musk Twitter acquisition"
- "High relevance news" -> intent: "score", score_threshold: 0.7
- "News near me" -> intent: "nearby"
- "What's trending" -> intent: "trending"

Response (JSON only):"#
    );

    CompletionRequest {
        system: Some(ANALYSIS_SYSTEM_PROMPT.to_string()),
        prompt,
        temperature: ANALYSIS_TEMPERATURE,
        max_tokens: ANALYSIS_MAX_TOKENS,
    }
}

/// Shape of the model's JSON reply. Every field is optional.
#[derive(Debug, Deserialize)]
struct AnalysisReply {
    #[serde(default)]
    entities: Vec<String>,
    #[serde(default)]
    concepts: Vec<String>,
    intent: Option<String>,
    location: Option<Location>,
    search_query: Option<String>,
    category: Option<String>,
    source: Option<String>,
    score_threshold: Option<f64>,
}

/// Parse the first `{...}` block of an LLM reply.
///
/// Unknown intents map to `search`. A missing or out-of-range location falls
/// back to the caller's; a `score_threshold` outside [0, 1] is dropped.
pub fn parse_query_analysis(
    reply: &str,
    user_location: Option<Location>,
) -> Result<QueryAnalysis, String> {
    let re = JSON_BLOCK
        .as_ref()
        .ok_or_else(|| "JSON block pattern failed to compile".to_string())?;
    let json = re
        .find(reply)
        .map(|m| m.as_str())
        .ok_or_else(|| "no JSON object in reply".to_string())?;

    let parsed: AnalysisReply =
        serde_json::from_str(json).map_err(|e| format!("invalid analysis JSON: {}", e))?;

    let intent = parsed
        .intent
        .as_deref()
        .map(QueryIntent::parse_or_search)
        .unwrap_or(QueryIntent::Search);

    Ok(QueryAnalysis {
        entities: parsed.entities,
        concepts: parsed.concepts,
        intent,
        location: parsed
            .location
            .filter(|loc| loc.validate().is_ok())
            .or(user_location),
        search_query: non_blank(parsed.search_query),
        category: non_blank(parsed.category),
        source: non_blank(parsed.source),
        score_threshold: parsed
            .score_threshold
            .filter(|t| (0.0..=1.0).contains(t)),
    })
}

/// Keyword-only analysis used when no LLM is available or it fails.
pub fn fallback_analysis(query: &str, user_location: Option<Location>) -> QueryAnalysis {
    let query_lower = query.to_lowercase();
    let intent = detect_intent(&query_lower);

    let mut analysis = QueryAnalysis::new(intent);
    analysis.entities = extract_entities(query);
    analysis.concepts = extract_concepts(&query_lower);
    analysis.location = user_location;

    match intent {
        QueryIntent::Search => analysis.search_query = Some(query.to_string()),
        QueryIntent::Category => analysis.category = extract_category(&query_lower),
        QueryIntent::Source => analysis.source = extract_source(&query_lower),
        _ => {}
    }

    analysis
}

/// Intent from keyword groups, first matching group wins.
pub fn detect_intent(query_lower: &str) -> QueryIntent {
    let groups: [(&[&str], QueryIntent); 5] = [
        (CATEGORY_INTENT_WORDS, QueryIntent::Category),
        (SOURCE_INTENT_WORDS, QueryIntent::Source),
        (NEARBY_INTENT_WORDS, QueryIntent::Nearby),
        (TRENDING_INTENT_WORDS, QueryIntent::Trending),
        (SCORE_INTENT_WORDS, QueryIntent::Score),
    ];

    groups
        .iter()
        .find(|(words, _)| contains_any(query_lower, words))
        .map(|(_, intent)| *intent)
        .unwrap_or(QueryIntent::Search)
}

/// Capitalised name pairs, acronyms and honorific names, deduplicated in order of appearance.
pub fn extract_entities(query: &str) -> Vec<String> {
    let mut entities: Vec<String> = Vec::new();

    for re in ENTITY_PATTERNS.iter() {
        for m in re.find_iter(query) {
            let entity = m.as_str().to_string();
            if !entities.contains(&entity) {
                entities.push(entity);
            }
        }
    }

    entities
}

pub fn extract_concepts(query_lower: &str) -> Vec<String> {
    CONCEPT_KEYWORDS
        .iter()
        .filter(|(_, keywords)| contains_any(query_lower, keywords))
        .map(|(concept, _)| concept.to_string())
        .collect()
}

pub fn extract_category(query_lower: &str) -> Option<String> {
    first_keyword_hit(query_lower, CATEGORY_KEYWORDS)
}

pub fn extract_source(query_lower: &str) -> Option<String> {
    first_keyword_hit(query_lower, SOURCE_KEYWORDS)
}

// ============================================================================
// Helpers
// ============================================================================

fn contains_any(haystack: &str, words: &[&str]) -> bool {
    words.iter().any(|w| haystack.contains(w))
}

fn first_keyword_hit(query_lower: &str, table: &[(&str, &str)]) -> Option<String> {
    table
        .iter()
        .find(|(keyword, _)| query_lower.contains(keyword))
        .map(|(_, value)| value.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ============================================================================
// TESTS
// ============================================================================
