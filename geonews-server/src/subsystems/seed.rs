//! Startup seeding: dataset load + synthetic events
//!
//! Each step logs its own failure and the service keeps starting; an empty store
//! still answers every endpoint (with empty results).

use geonews_core::config::SeedConfig;
use geonews_ingest::{load_dataset, populate_articles, seed_events, EventSeedConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sqlx::SqlitePool;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub articles_inserted: usize,
    pub articles_skipped: usize,
    pub events_generated: usize,
}

pub async fn seed_store(pool: &SqlitePool, config: &SeedConfig) -> SeedReport {
    let mut report = SeedReport::default();

    match load_dataset(&config.data_file) {
        Ok(load) => {
            report.articles_skipped = load.skipped;
            match populate_articles(pool, &load.articles).await {
                Ok(n) => report.articles_inserted = n,
                Err(e) => tracing::error!(error = %e, "Failed to insert dataset articles"),
            }
        }
        Err(e) => {
            tracing::error!(file = %config.data_file, error = %e, "Failed to load dataset; continuing without it")
        }
    }

    let event_config = EventSeedConfig::from(config);
    let mut rng = StdRng::from_os_rng();
    match seed_events(pool, &event_config, &mut rng).await {
        Ok(n) => report.events_generated = n,
        Err(e) => tracing::error!(error = %e, "Failed to generate sample user events"),
    }

    tracing::info!(
        inserted = report.articles_inserted,
        skipped = report.articles_skipped,
        events = report.events_generated,
        "Store seeding finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_missing_dataset_still_completes() {
        let pool = geonews_core::db::memory_pool().await.unwrap();
        let config = SeedConfig {
            data_file: "/nonexistent/news_data.json".to_string(),
            ..SeedConfig::default()
        };

        let report = seed_store(&pool, &config).await;
        assert_eq!(report, SeedReport::default());
    }

    #[tokio::test]
    async fn test_seeds_articles_and_events() {
        let dataset = serde_json::json!([{
            "id": "s-1",
            "title": "Seeded",
            "description": "Seeded story",
            "url": "https://news.example.com/s-1",
            "publication_date": "2025-01-05T12:00:00Z",
            "source_name": "Test Wire",
            "category": ["general"],
            "relevance_score": 0.5,
            "latitude": 10.0,
            "longitude": 20.0
        }]);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(dataset.to_string().as_bytes()).unwrap();

        let pool = geonews_core::db::memory_pool().await.unwrap();
        let config = SeedConfig {
            data_file: file.path().display().to_string(),
            synthetic_events: 12,
            ..SeedConfig::default()
        };

        let report = seed_store(&pool, &config).await;
        assert_eq!(report.articles_inserted, 1);
        assert_eq!(report.events_generated, 12);

        let again = seed_store(&pool, &config).await;
        assert_eq!(again.articles_inserted, 0);
        assert_eq!(again.events_generated, 0);
    }
}
