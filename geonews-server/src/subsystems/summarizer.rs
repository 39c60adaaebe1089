//! Summarizer subsystem: fills `llm_summary` for articles about to be served
//!
//! Only articles that are actually returned get summarized. A generated summary
//! is written back once (`WHERE llm_summary IS NULL`); fallback text is returned
//! to the caller but never stored, so a later request can still upgrade it.

use futures::stream::{self, StreamExt};
use geonews_core::llm::LlmBackend;
use geonews_core::summary::summarize_article;
use geonews_core::Article;
use sqlx::SqlitePool;

use crate::subsystems::news;

#[derive(Debug, Clone, Copy)]
pub struct SummarizerConfig {
    pub fallback_chars: usize,
    pub concurrency: usize,
}

impl From<&geonews_core::config::NewsConfig> for SummarizerConfig {
    fn from(config: &geonews_core::config::NewsConfig) -> Self {
        Self {
            fallback_chars: config.summary_fallback_chars,
            concurrency: config.summary_concurrency.max(1),
        }
    }
}

/// Give every article a summary, preserving input order.
pub async fn ensure_summaries(
    pool: &SqlitePool,
    backend: Option<&dyn LlmBackend>,
    articles: Vec<Article>,
    config: SummarizerConfig,
) -> Vec<Article> {
    stream::iter(articles)
        .map(|article| ensure_summary(pool, backend, article, config))
        .buffered(config.concurrency.max(1))
        .collect()
        .await
}

async fn ensure_summary(
    pool: &SqlitePool,
    backend: Option<&dyn LlmBackend>,
    mut article: Article,
    config: SummarizerConfig,
) -> Article {
    if article.llm_summary.is_some() {
        return article;
    }

    let summary = summarize_article(
        backend,
        &article.title,
        &article.description,
        config.fallback_chars,
    )
    .await;

    if summary.is_generated() {
        match news::set_summary_if_absent(pool, &article.id, summary.text()).await {
            Ok(true) => tracing::debug!(article_id = %article.id, "Stored generated summary"),
            Ok(false) => {
                tracing::debug!(article_id = %article.id, "Summary already stored by another request")
            }
            Err(e) => {
                tracing::warn!(article_id = %article.id, error = %e, "Failed to store summary")
            }
        }
    }

    article.llm_summary = Some(summary.into_text());
    article
}
