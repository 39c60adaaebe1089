//! Trending score + ranking
//!
//! Per-event contribution: w(kind) × r(t) × g(d)
//!
//! Where:
//!   w(kind) = view 1.0, click 2.0, share 5.0, like 3.0 (unknown kinds 1.0)
//!   r(t)    = clamp(1 − t / decay_hours, 0.1, 1.0)   t = hours since the event
//!   g(d)    = clamp(1 − d / radius_km, 0.1, 1.0)     d = haversine km from origin
//!
//! An article's score is the sum over its matching events; no events → 0.
//! The ranker keeps positive scores only, sorts descending (stable) and truncates.

use chrono::{DateTime, Utc};

use crate::geo::GeoPoint;
use crate::models::event::event_weight;

/// Floor for both decay factors; old or distant events never count for nothing.
pub const MIN_DECAY_FACTOR: f64 = 0.1;

// ============================================================================
// PUBLIC API
// ============================================================================

/// The slice of an interaction event that scoring needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringEvent {
    pub event_type: String,
    pub location: GeoPoint,
    pub timestamp: DateTime<Utc>,
}

/// Inputs shared by every event of one trending query.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext {
    pub origin: GeoPoint,
    pub radius_km: f64,
    pub decay_hours: f64,
    pub now: DateTime<Utc>,
}

/// Linear recency decay over the window, clamped to [0.1, 1.0].
///
/// Events stamped in the future (negative age) count as brand new.
pub fn recency_factor(hours_since_event: f64, decay_hours: f64) -> f64 {
    if !(decay_hours > 0.0) {
        return if hours_since_event <= 0.0 { 1.0 } else { MIN_DECAY_FACTOR };
    }
    (1.0 - hours_since_event / decay_hours).clamp(MIN_DECAY_FACTOR, 1.0)
}

/// Linear distance decay over the query radius, clamped to [0.1, 1.0].
pub fn distance_factor(distance_km: f64, radius_km: f64) -> f64 {
    if !(radius_km > 0.0) {
        return if distance_km <= 0.0 { 1.0 } else { MIN_DECAY_FACTOR };
    }
    (1.0 - distance_km / radius_km).clamp(MIN_DECAY_FACTOR, 1.0)
}

/// Contribution of a single event.
pub fn event_score(event: &ScoringEvent, ctx: &ScoringContext) -> f64 {
    let hours_since = (ctx.now - event.timestamp).num_milliseconds() as f64 / 3_600_000.0;
    let distance = ctx.origin.distance_km(&event.location);

    event_weight(&event.event_type)
        * recency_factor(hours_since, ctx.decay_hours)
        * distance_factor(distance, ctx.radius_km)
}

/// Sum of event contributions. Empty input scores exactly 0.
pub fn trending_score(events: &[ScoringEvent], ctx: &ScoringContext) -> f64 {
    events.iter().map(|e| event_score(e, ctx)).sum()
}

/// Output of `rank`.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPage<T> {
    pub items: Vec<(T, f64)>,
    /// Number of positively scored candidates before truncation.
    pub total: usize,
}

/// Keep positive scores, sort descending (ties keep input order), truncate to `limit`.
pub fn rank<T>(candidates: Vec<(T, f64)>, limit: usize) -> RankedPage<T> {
    let mut items: Vec<(T, f64)> = candidates
        .into_iter()
        .filter(|(_, score)| *score > 0.0)
        .collect();

    let total = items.len();
    items.sort_by(|a, b| b.1.total_cmp(&a.1));
    items.truncate(limit);

    RankedPage { items, total }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const SF: GeoPoint = GeoPoint {
        latitude: 37.7749,
        longitude: -122.4194,
    };

    fn ctx(radius_km: f64) -> ScoringContext {
        ScoringContext {
            origin: SF,
            radius_km,
            decay_hours: 24.0,
            now: Utc::now(),
        }
    }

    /// A point due north of SF at the given distance.
    fn north_of_sf(km: f64) -> GeoPoint {
        GeoPoint::new(SF.latitude + km / 111.194_926_644_558_73, SF.longitude)
    }

    fn event(kind: &str, location: GeoPoint, age: Duration, now: DateTime<Utc>) -> ScoringEvent {
        ScoringEvent {
            event_type: kind.to_string(),
            location,
            timestamp: now - age,
        }
    }

    // ========================================================================
    // TEST 1: worked example, share, 2 km away, 1 hour ago, radius 10 km
    // ========================================================================
    #[test]
    fn test_share_two_km_one_hour_example() {
        let ctx = ctx(10.0);
        let e = event("share", north_of_sf(2.0), Duration::hours(1), ctx.now);

        let score = trending_score(&[e], &ctx);
        let expected: f64 = 5.0 * (1.0 - 1.0 / 24.0) * (1.0 - 2.0 / 10.0);

        assert!((expected - 3.83).abs() < 0.01);
        assert!(
            (score - expected).abs() < 1e-3,
            "expected ~{}, got {}",
            expected,
            score
        );
    }

    // ========================================================================
    // TEST 2: factors stay in [0.1, 1.0] for all inputs
    // ========================================================================
    #[test]
    fn test_factors_are_clamped() {
        for hours in [-48.0, -1.0, 0.0, 0.5, 12.0, 23.9, 24.0, 100.0, 1e9] {
            let r = recency_factor(hours, 24.0);
            assert!((MIN_DECAY_FACTOR..=1.0).contains(&r), "recency({}) = {}", hours, r);
        }
        for km in [-5.0, 0.0, 1.0, 9.99, 10.0, 50.0, 20_000.0] {
            let d = distance_factor(km, 10.0);
            assert!((MIN_DECAY_FACTOR..=1.0).contains(&d), "distance({}) = {}", km, d);
        }

        assert_eq!(recency_factor(-3.0, 24.0), 1.0);
        assert_eq!(recency_factor(48.0, 24.0), MIN_DECAY_FACTOR);
        assert_eq!(distance_factor(0.0, 10.0), 1.0);
        assert_eq!(distance_factor(30.0, 10.0), MIN_DECAY_FACTOR);
    }

    #[test]
    fn test_factors_with_degenerate_windows() {
        assert_eq!(distance_factor(0.0, 0.0), 1.0);
        assert_eq!(distance_factor(1.0, 0.0), MIN_DECAY_FACTOR);
        assert_eq!(distance_factor(1.0, -10.0), MIN_DECAY_FACTOR);
        assert_eq!(recency_factor(1.0, 0.0), MIN_DECAY_FACTOR);
    }

    // ========================================================================
    // TEST 3: no events scores exactly zero
    // ========================================================================
    #[test]
    fn test_no_events_scores_zero() {
        assert_eq!(trending_score(&[], &ctx(10.0)), 0.0);
    }

    // ========================================================================
    // TEST 4: unknown kinds weigh like a view
    // ========================================================================
    #[test]
    fn test_unknown_kind_weighs_like_view() {
        let ctx = ctx(10.0);
        let view = event("view", SF, Duration::zero(), ctx.now);
        let odd = event("bookmark", SF, Duration::zero(), ctx.now);
        assert!((event_score(&view, &ctx) - event_score(&odd, &ctx)).abs() < 1e-12);
        assert!((event_score(&odd, &ctx) - 1.0).abs() < 1e-6);
    }

    // ========================================================================
    // TEST 5: stale and distant events keep the 0.1 floor
    // ========================================================================
    #[test]
    fn test_old_far_event_keeps_floor() {
        let ctx = ctx(10.0);
        let e = event("like", north_of_sf(40.0), Duration::hours(72), ctx.now);
        let score = event_score(&e, &ctx);
        assert!((score - 3.0 * 0.1 * 0.1).abs() < 1e-9, "got {}", score);
    }

    #[test]
    fn test_scores_accumulate_and_stay_non_negative() {
        let ctx = ctx(25.0);
        let events: Vec<ScoringEvent> = ["view", "click", "share", "like", "other"]
            .iter()
            .enumerate()
            .map(|(i, kind)| {
                event(
                    kind,
                    north_of_sf(i as f64 * 3.0),
                    Duration::hours(i as i64 * 5),
                    ctx.now,
                )
            })
            .collect();

        let total = trending_score(&events, &ctx);
        let sum: f64 = events.iter().map(|e| event_score(e, &ctx)).sum();
        assert!(total > 0.0);
        assert!((total - sum).abs() < 1e-12);
    }

    // ========================================================================
    // TEST 6: ranker
    // ========================================================================
    #[test]
    fn test_rank_sorts_descending_and_truncates() {
        let page = rank(vec![("a", 1.0), ("b", 3.0), ("c", 2.0), ("d", 0.5)], 2);
        assert_eq!(page.items, vec![("b", 3.0), ("c", 2.0)]);
        assert_eq!(page.total, 4);
    }

    #[test]
    fn test_rank_drops_non_positive_scores() {
        let page = rank(vec![("a", 0.0), ("b", 1.5), ("c", -1.0)], 10);
        assert_eq!(page.items, vec![("b", 1.5)]);
        assert_eq!(page.total, 1);
        assert!(page.items.iter().all(|(_, s)| *s > 0.0));
    }

    #[test]
    fn test_rank_ties_keep_input_order() {
        let page = rank(vec![("first", 2.0), ("second", 2.0), ("third", 2.0)], 3);
        let names: Vec<&str> = page.items.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_rank_empty_and_zero_limit() {
        let page: RankedPage<&str> = rank(Vec::new(), 5);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);

        let page = rank(vec![("a", 1.0)], 0);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 1);
    }
}
