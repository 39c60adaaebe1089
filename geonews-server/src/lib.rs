pub mod http;
pub mod router;

pub mod subsystems {
    pub mod news;
    pub mod seed;
    pub mod summarizer;
    pub mod trending;
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use geonews_core::{Article, NewArticle};
    use sqlx::SqlitePool;

    pub fn article(id: &str, latitude: f64, longitude: f64) -> NewArticle {
        NewArticle {
            id: id.to_string(),
            title: format!("Headline {}", id),
            description: format!("Details about story {}", id),
            url: format!("https://news.example.com/{}", id),
            publication_date: Utc::now(),
            source_name: "Test Wire".to_string(),
            category: vec!["general".to_string()],
            relevance_score: 0.5,
            latitude,
            longitude,
        }
    }

    pub fn stored(article: NewArticle) -> Article {
        Article {
            id: article.id,
            title: article.title,
            description: article.description,
            url: article.url,
            publication_date: article.publication_date,
            source_name: article.source_name,
            category: article.category,
            relevance_score: article.relevance_score,
            latitude: article.latitude,
            longitude: article.longitude,
            llm_summary: None,
        }
    }

    pub async fn pool_with(articles: Vec<NewArticle>) -> SqlitePool {
        let pool = geonews_core::db::memory_pool().await.unwrap();
        geonews_ingest::populate_articles(&pool, &articles)
            .await
            .unwrap();
        pool
    }
}
