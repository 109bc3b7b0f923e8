use chrono::{DateTime, Utc};

/// Age-based priority: older unresolved issues climb monotonically.
/// A created_at in the future counts as age 0 rather than an error.
pub fn age_score(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_days = (now - created_at).num_days().max(0);
    score_for_age_days(age_days)
}

fn score_for_age_days(age_days: i64) -> f64 {
    match age_days {
        0..=1 => 2.0,
        2..=7 => 3.0,
        8..=30 => 5.0,
        31..=90 => 7.0,
        91..=180 => 8.5,
        _ => 10.0,
    }
}
