pub mod age;
pub mod duplicates;
pub mod location;
pub mod safety;
pub mod severity;

use chrono::{DateTime, Utc};

use crate::keywords::KeywordTaxonomy;
use crate::models::{
    FactorScores, FactorWeights, IssueRecord, PriorityBreakdown, PriorityLevel,
};

/// Factor weights for the final aggregation. Must sum to exactly 1.0.
pub const WEIGHTS: FactorWeights = FactorWeights {
    severity: 0.35,
    location: 0.25,
    reports_count: 0.15,
    age: 0.15,
    safety_impact: 0.10,
};

pub(crate) fn clamp_score(score: f64) -> f64 {
    score.clamp(1.0, 10.0)
}

pub(crate) fn round2(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}

pub fn level_for_score(score: f64) -> PriorityLevel {
    if score >= 8.0 {
        PriorityLevel::Critical
    } else if score >= 6.5 {
        PriorityLevel::High
    } else if score >= 4.5 {
        PriorityLevel::Medium
    } else if score >= 2.5 {
        PriorityLevel::Low
    } else {
        PriorityLevel::VeryLow
    }
}

/// Aggregate the five factor scores into a fresh breakdown. Pure given
/// its inputs: the same issue, votes, candidates, and `now` always
/// produce an identical breakdown.
pub fn calculate_priority(
    issue: &IssueRecord,
    votes: &[i32],
    candidates: &[IssueRecord],
    taxonomy: &KeywordTaxonomy,
    now: DateTime<Utc>,
) -> PriorityBreakdown {
    let severity = severity::severity_score(
        issue.category,
        &issue.title,
        &issue.description,
        votes,
        issue.ai_severity_score,
        taxonomy,
    );
    let location = location::location_score(issue.latitude, issue.longitude, &issue.address);
    let (reports_count, duplicate_count) =
        duplicates::duplicate_density(issue.latitude, issue.longitude, candidates);
    let age = age::age_score(issue.created_at, now);
    let safety_impact =
        safety::safety_impact_score(issue.category, &issue.title, &issue.description, taxonomy);

    let final_score = round2(
        severity * WEIGHTS.severity
            + location * WEIGHTS.location
            + reports_count * WEIGHTS.reports_count
            + age * WEIGHTS.age
            + safety_impact * WEIGHTS.safety_impact,
    );

    PriorityBreakdown {
        final_score,
        priority_level: level_for_score(final_score),
        factor_scores: FactorScores {
            severity,
            location,
            reports_count,
            age,
            safety_impact,
        },
        weights: WEIGHTS,
        duplicate_count,
        calculation_timestamp: now,
    }
}
