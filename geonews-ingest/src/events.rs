use chrono::{DateTime, Duration, Utc};
use geonews_core::config::SeedConfig;
use geonews_core::EventKind;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::IngestError;

/// Knobs for synthetic event generation.
#[derive(Debug, Clone)]
pub struct EventSeedConfig {
    pub count: usize,
    pub window_days: i64,
    pub jitter_degrees: f64,
    pub user_pool: u32,
}

impl From<&SeedConfig> for EventSeedConfig {
    fn from(config: &SeedConfig) -> Self {
        Self {
            count: config.synthetic_events,
            window_days: config.event_window_days,
            jitter_degrees: config.event_jitter_degrees,
            user_pool: config.user_pool,
        }
    }
}

/// A generated `user_events` row.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleEvent {
    pub id: String,
    pub user_id: String,
    pub article_id: String,
    pub event_type: EventKind,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

struct ArticleAnchor {
    id: String,
    latitude: f64,
    longitude: f64,
}

fn wrap_longitude(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid maps +180 to -180; keep the original sign at the seam
    if wrapped == -180.0 && lon > 0.0 {
        180.0
    } else {
        wrapped
    }
}

fn generate_events<R: Rng + ?Sized>(
    anchors: &[ArticleAnchor],
    config: &EventSeedConfig,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Vec<SampleEvent> {
    let window_secs = (config.window_days.max(0) * 86_400).max(1);
    let jitter = config.jitter_degrees.abs();
    let user_pool = config.user_pool.max(1);

    let mut events = Vec::with_capacity(config.count);
    for _ in 0..config.count {
        let Some(anchor) = anchors.choose(rng) else {
            break;
        };
        let kind = EventKind::ALL[rng.random_range(0..EventKind::ALL.len())];

        let (lat_offset, lon_offset) = if jitter > 0.0 {
            (
                rng.random_range(-jitter..=jitter),
                rng.random_range(-jitter..=jitter),
            )
        } else {
            (0.0, 0.0)
        };

        events.push(SampleEvent {
            id: Uuid::new_v4().to_string(),
            user_id: format!("user_{}", rng.random_range(1..=user_pool)),
            article_id: anchor.id.clone(),
            event_type: kind,
            latitude: (anchor.latitude + lat_offset).clamp(-90.0, 90.0),
            longitude: wrap_longitude(anchor.longitude + lon_offset),
            timestamp: now - Duration::seconds(rng.random_range(0..=window_secs)),
        });
    }

    events
}

/// Generate and insert `config.count` synthetic events in one transaction.
///
/// Returns how many rows were written; no articles means no events.
pub async fn generate_sample_events<R: Rng + ?Sized>(
    pool: &SqlitePool,
    config: &EventSeedConfig,
    rng: &mut R,
) -> Result<usize, IngestError> {
    let anchors: Vec<ArticleAnchor> =
        sqlx::query_as::<_, (String, f64, f64)>("SELECT id, latitude, longitude FROM news_articles")
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(|(id, latitude, longitude)| ArticleAnchor {
                id,
                latitude,
                longitude,
            })
            .collect();

    if anchors.is_empty() {
        tracing::warn!("No articles found, cannot generate user events");
        return Ok(0);
    }

    let events = generate_events(&anchors, config, Utc::now(), rng);
    let metadata = json!({ "generated": true });

    let mut tx = pool.begin().await?;
    for event in &events {
        sqlx::query(
            r#"
            INSERT INTO user_events
                (id, user_id, article_id, event_type, latitude, longitude, timestamp, event_metadata)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.id)
        .bind(&event.user_id)
        .bind(&event.article_id)
        .bind(event.event_type.as_str())
        .bind(event.latitude)
        .bind(event.longitude)
        .bind(event.timestamp)
        .bind(sqlx::types::Json(&metadata))
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    tracing::info!(count = events.len(), "Generated sample user events");
    Ok(events.len())
}

/// Generate events only when `user_events` is empty, so restarts don't pile up rows.
pub async fn seed_events<R: Rng + ?Sized>(
    pool: &SqlitePool,
    config: &EventSeedConfig,
    rng: &mut R,
) -> Result<usize, IngestError> {
    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM user_events")
        .fetch_one(pool)
        .await?;

    if existing > 0 {
        tracing::info!(existing, "User events already present, skipping generation");
        return Ok(0);
    }

    generate_sample_events(pool, config, rng).await
}
