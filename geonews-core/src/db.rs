use std::str::FromStr;

use crate::config::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS news_articles (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        url TEXT NOT NULL DEFAULT '',
        publication_date TEXT NOT NULL,
        source_name TEXT NOT NULL,
        category TEXT NOT NULL DEFAULT '[]',
        relevance_score REAL NOT NULL,
        latitude REAL NOT NULL,
        longitude REAL NOT NULL,
        llm_summary TEXT,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_articles_publication_date ON news_articles (publication_date)",
    "CREATE INDEX IF NOT EXISTS idx_articles_source_name ON news_articles (source_name)",
    "CREATE INDEX IF NOT EXISTS idx_articles_relevance_score ON news_articles (relevance_score)",
    "CREATE INDEX IF NOT EXISTS idx_articles_location ON news_articles (latitude, longitude)",
    r#"CREATE TABLE IF NOT EXISTS user_events (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        article_id TEXT NOT NULL,
        event_type TEXT NOT NULL,
        latitude REAL NOT NULL,
        longitude REAL NOT NULL,
        timestamp TEXT NOT NULL,
        event_metadata TEXT,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_events_article_time ON user_events (article_id, timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_events_location ON user_events (latitude, longitude)",
];

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Connect to SQLite. In-memory databases get a single connection that is never
/// recycled, since each new connection would see an empty database.
pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool, sqlx::Error> {
    if is_memory_url(&config.url) {
        return SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(&config.url)
            .await;
    }

    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
}

pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::debug!(statements = SCHEMA.len(), "Schema ready");
    Ok(())
}

pub async fn health_check(pool: &SqlitePool) -> Result<String, sqlx::Error> {
    let row: (String,) = sqlx::query_as("SELECT sqlite_version()")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

/// In-memory pool with the schema applied. Used by tests across the workspace.
pub async fn memory_pool() -> Result<SqlitePool, sqlx::Error> {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    };
    let pool = create_pool(&config).await?;
    init_schema(&pool).await?;
    Ok(pool)
}
