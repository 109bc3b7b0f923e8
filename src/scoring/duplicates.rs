use crate::geo::haversine_distance;
use crate::models::IssueRecord;

/// Radius within which a same-category unresolved report counts as a
/// duplicate of the issue being scored.
pub const DUPLICATE_RADIUS_METERS: f64 = 100.0;

/// Count nearby candidates and bucket the count into a reports score.
/// Candidates must already be same-category, unresolved, and exclude
/// the issue itself (the store query handles that; the geo filter
/// happens here).
pub fn duplicate_density(
    latitude: f64,
    longitude: f64,
    candidates: &[IssueRecord],
) -> (f64, usize) {
    let count = candidates
        .iter()
        .filter(|candidate| {
            haversine_distance(latitude, longitude, candidate.latitude, candidate.longitude)
                <= DUPLICATE_RADIUS_METERS
        })
        .count();

    (reports_score(count), count)
}

fn reports_score(duplicate_count: usize) -> f64 {
    match duplicate_count {
        0 => 1.0,
        1..=2 => 3.0,
        3..=5 => 6.0,
        6..=10 => 8.0,
        _ => 10.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IssueCategory, IssueStatus, PriorityLevel};
    use chrono::Utc;
    use uuid::Uuid;

    fn candidate_at(latitude: f64, longitude: f64) -> IssueRecord {
        IssueRecord {
            id: Uuid::new_v4(),
            category: IssueCategory::Road,
            title: "Pothole".to_string(),
            description: "deep pothole".to_string(),
            status: IssueStatus::Pending,
            latitude,
            longitude,
            address: "5th Street".to_string(),
            created_at: Utc::now(),
            priority_score: 5.0,
            priority_level: PriorityLevel::Medium,
            ai_severity_score: None,
            priority_stale: false,
        }
    }

    #[test]
    fn no_candidates_scores_one() {
        assert_eq!(duplicate_density(12.97, 77.59, &[]), (1.0, 0));
    }

    #[test]
    fn four_nearby_candidates_score_six() {
        // ~0.0003 deg latitude is ~33 m; all four are inside 100 m.
        let candidates = vec![
            candidate_at(12.9701, 77.5900),
            candidate_at(12.9702, 77.5901),
            candidate_at(12.9699, 77.5899),
            candidate_at(12.9700, 77.5902),
        ];
        assert_eq!(duplicate_density(12.9700, 77.5900, &candidates), (6.0, 4));
    }

    #[test]
    fn far_candidates_are_ignored() {
        // ~1.1 km away.
        let candidates = vec![candidate_at(12.9800, 77.5900)];
        assert_eq!(duplicate_density(12.9700, 77.5900, &candidates), (1.0, 0));
    }

    #[test]
    fn score_is_monotonic_in_count() {
        let mut previous = 0.0;
        for count in 0..=15 {
            let score = reports_score(count);
            assert!(score >= previous, "count {count} regressed");
            previous = score;
        }
    }

    #[test]
    fn bucket_boundaries() {
        assert_eq!(reports_score(0), 1.0);
        assert_eq!(reports_score(1), 3.0);
        assert_eq!(reports_score(2), 3.0);
        assert_eq!(reports_score(3), 6.0);
        assert_eq!(reports_score(5), 6.0);
        assert_eq!(reports_score(6), 8.0);
        assert_eq!(reports_score(10), 8.0);
        assert_eq!(reports_score(11), 10.0);
    }
}
