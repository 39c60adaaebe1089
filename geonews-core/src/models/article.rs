use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::geo::{GeoPoint, Located};

/// A geotagged news article as stored in `news_articles`.
///
/// Everything but `llm_summary` is fixed at load time; the summary is filled
/// in lazily the first time the article is served.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub publication_date: DateTime<Utc>,
    pub source_name: String,
    #[sqlx(json)]
    pub category: Vec<String>,
    pub relevance_score: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub llm_summary: Option<String>,
}

impl Located for Article {
    fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Article record as it appears in the static dataset file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewArticle {
    pub id: String,
    pub title: String,
    pub description: String,
    pub url: String,
    #[serde(deserialize_with = "lenient_datetime")]
    pub publication_date: DateTime<Utc>,
    pub source_name: String,
    #[serde(default)]
    pub category: Vec<String>,
    pub relevance_score: f64,
    pub latitude: f64,
    pub longitude: f64,
}

impl NewArticle {
    /// Range checks applied before a dataset record is accepted.
    pub fn validate(&self) -> Result<(), String> {
        GeoPoint::new(self.latitude, self.longitude).validate()?;
        if !(0.0..=1.0).contains(&self.relevance_score) {
            return Err(format!(
                "relevance_score {} outside [0, 1]",
                self.relevance_score
            ));
        }
        if self.id.trim().is_empty() {
            return Err("empty id".to_string());
        }
        Ok(())
    }
}

/// RFC 3339, or a naive ISO timestamp read as UTC.
fn lenient_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| de::Error::custom(format!("invalid publication_date {:?}: {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(lat: f64, lon: f64, score: f64) -> NewArticle {
        NewArticle {
            id: "a-1".to_string(),
            title: "Title".to_string(),
            description: "Description".to_string(),
            url: "https://example.com/a-1".to_string(),
            publication_date: Utc::now(),
            source_name: "Reuters".to_string(),
            category: vec!["world".to_string()],
            relevance_score: score,
            latitude: lat,
            longitude: lon,
        }
    }

    #[test]
    fn test_validate_accepts_in_range_record() {
        assert!(record(37.77, -122.41, 0.5).validate().is_ok());
        assert!(record(-90.0, 180.0, 1.0).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_coordinates_and_score() {
        assert!(record(91.0, 0.0, 0.5).validate().is_err());
        assert!(record(0.0, -181.0, 0.5).validate().is_err());
        assert!(record(0.0, 0.0, 1.5).validate().is_err());
        assert!(record(0.0, 0.0, -0.1).validate().is_err());
    }

    #[test]
    fn test_dataset_record_parses_iso_timestamp_and_categories() {
        let json = serde_json::json!({
            "id": "x",
            "title": "t",
            "description": "d",
            "url": "u",
            "publication_date": "2025-03-24T11:19:34Z",
            "source_name": "BBC",
            "category": ["technology", "business"],
            "relevance_score": 0.42,
            "latitude": 12.9,
            "longitude": 77.5
        });
        let parsed: NewArticle = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.category, vec!["technology", "business"]);
        assert_eq!(parsed.publication_date.to_rfc3339(), "2025-03-24T11:19:34+00:00");
    }

    #[test]
    fn test_dataset_record_accepts_naive_timestamp() {
        let json = serde_json::json!({
            "id": "x",
            "title": "t",
            "description": "d",
            "url": "u",
            "publication_date": "2025-03-24T11:19:34",
            "source_name": "BBC",
            "relevance_score": 0.42,
            "latitude": 12.9,
            "longitude": 77.5
        });
        let parsed: NewArticle = serde_json::from_value(json).unwrap();
        assert!(parsed.category.is_empty());
        assert_eq!(parsed.publication_date.to_rfc3339(), "2025-03-24T11:19:34+00:00");

        let bad = serde_json::json!({
            "id": "x", "title": "t", "description": "d", "url": "u",
            "publication_date": "yesterday", "source_name": "BBC",
            "relevance_score": 0.4, "latitude": 1.0, "longitude": 1.0
        });
        assert!(serde_json::from_value::<NewArticle>(bad).is_err());
    }
}
