//! Article store queries
//!
//! All lookups return full `Article` rows:
//! - category: case-insensitive substring against each decoded category value, newest first
//! - source:   case-insensitive substring of `source_name`, newest first
//! - search:   substring of title OR description, highest relevance first
//! - score:    `relevance_score >= threshold`, highest first
//! - nearby:   linear geo-filter over every article, nearest first
//!
//! `lower()` in SQLite folds ASCII only; non-ASCII text matches case-sensitively.

use geonews_core::geo::{nearest_within, GeoPoint};
use geonews_core::Article;
use sqlx::SqlitePool;

const ARTICLE_COLUMNS: &str = "id, title, description, url, publication_date, source_name, \
     category, relevance_score, latitude, longitude, llm_summary";

pub async fn by_category(
    pool: &SqlitePool,
    category: &str,
    limit: u32,
) -> Result<Vec<Article>, sqlx::Error> {
    let sql = format!(
        "SELECT {ARTICLE_COLUMNS} FROM news_articles \
         WHERE EXISTS (\
             SELECT 1 FROM json_each(news_articles.category) \
             WHERE instr(lower(json_each.value), lower(?)) > 0\
         ) \
         ORDER BY publication_date DESC LIMIT ?"
    );
    sqlx::query_as::<_, Article>(&sql)
        .bind(category)
        .bind(i64::from(limit))
        .fetch_all(pool)
        .await
}

pub async fn by_source(
    pool: &SqlitePool,
    source: &str,
    limit: u32,
) -> Result<Vec<Article>, sqlx::Error> {
    let sql = format!(
        "SELECT {ARTICLE_COLUMNS} FROM news_articles \
         WHERE instr(lower(source_name), lower(?)) > 0 \
         ORDER BY publication_date DESC LIMIT ?"
    );
    sqlx::query_as::<_, Article>(&sql)
        .bind(source)
        .bind(i64::from(limit))
        .fetch_all(pool)
        .await
}

pub async fn search(
    pool: &SqlitePool,
    text: &str,
    limit: u32,
) -> Result<Vec<Article>, sqlx::Error> {
    let sql = format!(
        "SELECT {ARTICLE_COLUMNS} FROM news_articles \
         WHERE instr(lower(title), lower(?)) > 0 OR instr(lower(description), lower(?)) > 0 \
         ORDER BY relevance_score DESC LIMIT ?"
    );
    sqlx::query_as::<_, Article>(&sql)
        .bind(text)
        .bind(text)
        .bind(i64::from(limit))
        .fetch_all(pool)
        .await
}

pub async fn by_score(
    pool: &SqlitePool,
    threshold: f64,
    limit: u32,
) -> Result<Vec<Article>, sqlx::Error> {
    let sql = format!(
        "SELECT {ARTICLE_COLUMNS} FROM news_articles \
         WHERE relevance_score >= ? \
         ORDER BY relevance_score DESC LIMIT ?"
    );
    sqlx::query_as::<_, Article>(&sql)
        .bind(threshold)
        .bind(i64::from(limit))
        .fetch_all(pool)
        .await
}

pub async fn all_articles(pool: &SqlitePool) -> Result<Vec<Article>, sqlx::Error> {
    let sql = format!("SELECT {ARTICLE_COLUMNS} FROM news_articles");
    sqlx::query_as::<_, Article>(&sql).fetch_all(pool).await
}

pub async fn by_id(pool: &SqlitePool, id: &str) -> Result<Option<Article>, sqlx::Error> {
    let sql = format!("SELECT {ARTICLE_COLUMNS} FROM news_articles WHERE id = ?");
    sqlx::query_as::<_, Article>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Articles within `radius_km` of `origin`, nearest first, with their distance.
pub async fn nearby(
    pool: &SqlitePool,
    origin: GeoPoint,
    radius_km: f64,
    limit: usize,
) -> Result<Vec<(Article, f64)>, sqlx::Error> {
    let articles = all_articles(pool).await?;
    let mut hits = nearest_within(origin, radius_km, articles);
    hits.truncate(limit);
    Ok(hits)
}

/// Store `summary` unless the article already has one. Returns whether a row changed.
pub async fn set_summary_if_absent(
    pool: &SqlitePool,
    id: &str,
    summary: &str,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE news_articles SET llm_summary = ? WHERE id = ? AND llm_summary IS NULL")
            .bind(summary)
            .bind(id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}
