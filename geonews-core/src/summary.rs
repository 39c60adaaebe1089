//! Article summaries
//!
//! A summary is either generated by the LLM or, when that is not possible, the
//! description cut down to a fixed number of characters. Callers persist only
//! generated summaries; see `Summary::is_generated`.

use crate::llm::{CompletionRequest, LlmBackend};

const SUMMARY_SYSTEM_PROMPT: &str =
    "You are an expert at summarizing news articles concisely and accurately.";

const SUMMARY_TEMPERATURE: f32 = 0.3;
const SUMMARY_MAX_TOKENS: u32 = 150;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Summary {
    Generated(String),
    Fallback(String),
}

impl Summary {
    pub fn text(&self) -> &str {
        match self {
            Summary::Generated(text) | Summary::Fallback(text) => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Summary::Generated(text) | Summary::Fallback(text) => text,
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, Summary::Generated(_))
    }
}

pub fn summary_request(title: &str, description: &str) -> CompletionRequest {
    let prompt = format!(
        "Summarize this news article in 2-3 sentences, focusing on the key facts and main points:\n\n\
         Title: {title}\n\
         Description: {description}\n\n\
         Summary:"
    );

    CompletionRequest {
        system: Some(SUMMARY_SYSTEM_PROMPT.to_string()),
        prompt,
        temperature: SUMMARY_TEMPERATURE,
        max_tokens: SUMMARY_MAX_TOKENS,
    }
}

/// First `max_chars` characters of `description` plus "...", or the whole
/// description when it already fits.
pub fn fallback_summary(description: &str, max_chars: usize) -> String {
    match description.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &description[..cut]),
        None => description.to_string(),
    }
}

/// Summarize one article, degrading to `fallback_summary` on any LLM failure.
pub async fn summarize_article(
    backend: Option<&dyn LlmBackend>,
    title: &str,
    description: &str,
    fallback_chars: usize,
) -> Summary {
    let Some(backend) = backend else {
        return Summary::Fallback(fallback_summary(description, fallback_chars));
    };

    match backend.generate(&summary_request(title, description)).await {
        Ok(text) => Summary::Generated(text),
        Err(e) => {
            tracing::warn!(backend = backend.name(), error = %e, "summary generation failed");
            Summary::Fallback(fallback_summary(description, fallback_chars))
        }
    }
}
