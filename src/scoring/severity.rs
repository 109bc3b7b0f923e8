use crate::keywords::KeywordTaxonomy;
use crate::models::IssueCategory;
use crate::scoring::{clamp_score, round2};

fn category_base(category: IssueCategory) -> f64 {
    match category {
        IssueCategory::Electricity => 9.0,
        IssueCategory::Water => 8.0,
        IssueCategory::Road => 7.0,
        IssueCategory::Transport => 6.0,
        IssueCategory::Others => 5.0,
        IssueCategory::Sanitation => 4.0,
    }
}

/// Severity blend: category base, keyword modifiers, citizen votes
/// (30% weight when present), AI image score (20% weight when present).
pub fn severity_score(
    category: IssueCategory,
    title: &str,
    description: &str,
    votes: &[i32],
    ai_severity: Option<f64>,
    taxonomy: &KeywordTaxonomy,
) -> f64 {
    let text = format!("{} {}", title, description).to_lowercase();

    let modifier = taxonomy.severity_high.modifier(&text)
        + taxonomy.severity_medium.modifier(&text)
        + taxonomy.severity_low.modifier(&text);

    let mut score = clamp_score(category_base(category) + modifier);

    if !votes.is_empty() {
        let avg_vote = votes.iter().sum::<i32>() as f64 / votes.len() as f64;
        score = score * 0.7 + avg_vote * 0.3;
    }

    if let Some(ai) = ai_severity {
        score = score * 0.8 + ai * 0.2;
    }

    round2(clamp_score(score))
}
