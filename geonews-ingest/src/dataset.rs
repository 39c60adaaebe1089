use std::path::Path;

use geonews_core::NewArticle;
use serde_json::Value;
use sqlx::SqlitePool;

use crate::IngestError;

/// Result of reading the dataset file.
#[derive(Debug, Clone)]
pub struct DatasetLoad {
    pub articles: Vec<NewArticle>,
    /// Records dropped for a bad shape or out-of-range values.
    pub skipped: usize,
}

pub fn load_dataset(path: impl AsRef<Path>) -> Result<DatasetLoad, IngestError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| IngestError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_dataset(&raw)
}

/// Parse a JSON array of article records. Individual bad records are skipped
/// with a warning; only a non-array document is an error.
pub fn parse_dataset(raw: &str) -> Result<DatasetLoad, IngestError> {
    let records: Vec<Value> = serde_json::from_str(raw)?;

    let mut articles = Vec::with_capacity(records.len());
    let mut skipped = 0;

    for (index, record) in records.into_iter().enumerate() {
        let article = match serde_json::from_value::<NewArticle>(record) {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping malformed dataset record");
                skipped += 1;
                continue;
            }
        };

        if let Err(reason) = article.validate() {
            tracing::warn!(index, id = %article.id, reason = %reason, "Skipping invalid dataset record");
            skipped += 1;
            continue;
        }

        articles.push(article);
    }

    Ok(DatasetLoad { articles, skipped })
}

/// Insert `articles` in one transaction, but only into an empty table.
///
/// Returns the number of rows inserted (0 when the table already had data).
pub async fn populate_articles(
    pool: &SqlitePool,
    articles: &[NewArticle],
) -> Result<usize, IngestError> {
    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM news_articles")
        .fetch_one(pool)
        .await?;

    if existing > 0 {
        tracing::info!(existing, "Articles already loaded, skipping dataset insert");
        return Ok(0);
    }

    let mut tx = pool.begin().await?;

    for article in articles {
        sqlx::query(
            r#"
            INSERT INTO news_articles
                (id, title, description, url, publication_date, source_name,
                 category, relevance_score, latitude, longitude)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&article.id)
        .bind(&article.title)
        .bind(&article.description)
        .bind(&article.url)
        .bind(article.publication_date)
        .bind(&article.source_name)
        .bind(sqlx::types::Json(&article.category))
        .bind(article.relevance_score)
        .bind(article.latitude)
        .bind(article.longitude)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(count = articles.len(), "Loaded articles into database");
    Ok(articles.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DATASET: &str = r#"[
        {
            "id": "a-1",
            "title": "City council approves transit plan",
            "description": "The council voted 7-2 in favor.",
            "url": "https://example.com/a-1",
            "publication_date": "2025-03-01T10:00:00Z",
            "source_name": "Reuters",
            "category": ["national", "politics"],
            "relevance_score": 0.82,
            "latitude": 37.7749,
            "longitude": -122.4194
        },
        {
            "id": "a-2",
            "title": "Bad latitude",
            "description": "Should be skipped.",
            "url": "https://example.com/a-2",
            "publication_date": "2025-03-01T10:00:00Z",
            "source_name": "BBC",
            "category": [],
            "relevance_score": 0.5,
            "latitude": 123.0,
            "longitude": 0.0
        },
        { "id": "a-3", "title": "Missing most fields" },
        {
            "id": "a-4",
            "title": "No category field",
            "description": "Category defaults to empty.",
            "url": "https://example.com/a-4",
            "publication_date": "2025-02-27T08:30:00+02:00",
            "source_name": "CNN",
            "relevance_score": 0.4,
            "latitude": -33.8688,
            "longitude": 151.2093
        }
    ]"#;

    #[test]
    fn test_parse_skips_invalid_records() {
        let load = parse_dataset(DATASET).unwrap();
        let ids: Vec<&str> = load.articles.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a-1", "a-4"]);
        assert_eq!(load.skipped, 2);
        assert!(load.articles[1].category.is_empty());
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(matches!(
            parse_dataset(r#"{"id": "a-1"}"#),
            Err(IngestError::Parse(_))
        ));
    }

    #[test]
    fn test_load_dataset_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DATASET.as_bytes()).unwrap();

        let load = load_dataset(file.path()).unwrap();
        assert_eq!(load.articles.len(), 2);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = load_dataset("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, IngestError::Read { .. }));
    }

    #[tokio::test]
    async fn test_populate_only_when_empty() {
        let pool = geonews_core::db::memory_pool().await.unwrap();
        let load = parse_dataset(DATASET).unwrap();

        let inserted = populate_articles(&pool, &load.articles).await.unwrap();
        assert_eq!(inserted, 2);

        let again = populate_articles(&pool, &load.articles).await.unwrap();
        assert_eq!(again, 0);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM news_articles")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_populated_rows_decode_as_articles() {
        let pool = geonews_core::db::memory_pool().await.unwrap();
        let load = parse_dataset(DATASET).unwrap();
        populate_articles(&pool, &load.articles).await.unwrap();

        let article: geonews_core::Article = sqlx::query_as(
            "SELECT id, title, description, url, publication_date, source_name, category, \
             relevance_score, latitude, longitude, llm_summary FROM news_articles WHERE id = ?",
        )
        .bind("a-1")
        .fetch_one(&pool)
        .await
        .unwrap();

        assert_eq!(article.category, vec!["national", "politics"]);
        assert_eq!(article.source_name, "Reuters");
        assert!(article.llm_summary.is_none());
    }
}
