use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GeoNewsConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub trending: TrendingConfig,
    #[serde(default)]
    pub seed: SeedConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "Contextual News Data Retrieval System".to_string(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://news.db".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[serde(rename = "openai")]
    OpenAi,
    Gemini,
    #[default]
    None,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub openai_model: String,
    pub gemini_model: String,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::None,
            openai_model: "gpt-3.5-turbo".to_string(),
            gemini_model: "gemini-1.5-flash".to_string(),
            max_retries: 2,
            retry_delay_ms: 500,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub backend: CacheBackend,
    /// Only read when `backend = "redis"`.
    pub url: String,
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::Memory,
            url: "redis://127.0.0.1:6379".to_string(),
            ttl_seconds: 300,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NewsConfig {
    pub default_limit: u32,
    pub max_limit: u32,
    pub default_radius_km: f64,
    pub min_radius_km: f64,
    pub max_radius_km: f64,
    pub default_score_threshold: f64,
    pub summary_fallback_chars: usize,
    pub summary_concurrency: usize,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            default_limit: 5,
            max_limit: 50,
            default_radius_km: 10.0,
            min_radius_km: 0.1,
            max_radius_km: 100.0,
            default_score_threshold: 0.7,
            summary_fallback_chars: 200,
            summary_concurrency: 4,
        }
    }
}

/// How interaction events are narrowed down before distance decay is applied.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventFilter {
    /// Rectangular +/- `bounding_box_degrees` pre-filter only.
    #[default]
    BoundingBox,
    /// Drop events farther than the query radius.
    ExactRadius,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrendingConfig {
    pub decay_hours: f64,
    pub event_filter: EventFilter,
    pub bounding_box_degrees: f64,
    pub candidate_multiplier: u32,
}

impl Default for TrendingConfig {
    fn default() -> Self {
        Self {
            decay_hours: 24.0,
            event_filter: EventFilter::BoundingBox,
            bounding_box_degrees: 0.5,
            candidate_multiplier: 2,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SeedConfig {
    pub data_file: String,
    pub synthetic_events: usize,
    pub event_window_days: i64,
    pub event_jitter_degrees: f64,
    pub user_pool: u32,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            data_file: "news_data.json".to_string(),
            synthetic_events: 1000,
            event_window_days: 7,
            event_jitter_degrees: 0.5,
            user_pool: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub cors_permissive: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_permissive: true,
        }
    }
}

impl GeoNewsConfig {
    /// Load from a TOML file (optional) overlaid with `GEONEWS__SECTION__KEY` env vars.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("GEONEWS").separator("__"))
            .build()?;
        s.try_deserialize()
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        s.try_deserialize()
    }
}
