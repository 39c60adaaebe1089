pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod geo;
pub mod intent;
pub mod llm;
pub mod models;
pub mod summary;
pub mod trending;

pub use cache::{
    create_cache, trending_cache_key, CacheError, CacheStats, MemoryCache, RedisCache, ResultCache,
};
pub use config::GeoNewsConfig;
pub use error::GeoNewsError;
pub use geo::{haversine_km, within_radius, GeoPoint, Located};
pub use llm::{
    create_backend, CompletionRequest, GeminiClient, LlmBackend, LlmClientConfig, LlmError,
    OpenAiClient,
};
pub use models::{
    Article, EventKind, InteractionEvent, Location, NewArticle, QueryAnalysis, QueryIntent,
};
pub use summary::Summary;
pub use trending::{rank, trending_score, RankedPage, ScoringContext, ScoringEvent};
