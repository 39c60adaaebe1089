use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Weight applied to event kinds outside the known set.
pub const DEFAULT_EVENT_WEIGHT: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    View,
    Click,
    Share,
    Like,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::View,
        EventKind::Click,
        EventKind::Share,
        EventKind::Like,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(raw))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::View => "view",
            EventKind::Click => "click",
            EventKind::Share => "share",
            EventKind::Like => "like",
        }
    }

    pub fn weight(&self) -> f64 {
        match self {
            EventKind::View => 1.0,
            EventKind::Click => 2.0,
            EventKind::Share => 5.0,
            EventKind::Like => 3.0,
        }
    }
}

/// Weight for a stored event kind string. Unknown kinds are tolerated.
pub fn event_weight(raw: &str) -> f64 {
    EventKind::parse(raw)
        .map(|kind| kind.weight())
        .unwrap_or(DEFAULT_EVENT_WEIGHT)
}

/// A user interaction row from `user_events`.
///
/// `article_id` is not a foreign key; events for missing articles are kept.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InteractionEvent {
    pub id: String,
    pub user_id: String,
    pub article_id: String,
    pub event_type: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    pub event_metadata: Option<sqlx::types::Json<serde_json::Value>>,
}

impl InteractionEvent {
    pub fn kind(&self) -> Option<EventKind> {
        EventKind::parse(&self.event_type)
    }
}
