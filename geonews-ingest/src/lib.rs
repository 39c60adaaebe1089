//! Startup seeding for the news store.
//!
//! - `dataset`: load the static article file and insert it once
//! - `events`: synthesize interaction events so trending has something to rank

pub mod dataset;
pub mod events;

use thiserror::Error;

pub use dataset::{load_dataset, parse_dataset, populate_articles, DatasetLoad};
pub use events::{generate_sample_events, seed_events, EventSeedConfig};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to read dataset {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Dataset is not a JSON array of articles: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
