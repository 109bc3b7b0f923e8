use crate::keywords::KeywordTaxonomy;
use crate::models::IssueCategory;
use crate::scoring::{clamp_score, round2};

fn category_impact(category: IssueCategory) -> f64 {
    match category {
        IssueCategory::Electricity => 4.0,
        IssueCategory::Water => 3.5,
        IssueCategory::Road => 3.0,
        IssueCategory::Transport => 3.0,
        IssueCategory::Sanitation => 1.0,
        IssueCategory::Others => 2.0,
    }
}

/// Public safety and economic impact: a 5.0 base plus the category
/// impact plus keyword modifiers, clamped to [1, 10].
pub fn safety_impact_score(
    category: IssueCategory,
    title: &str,
    description: &str,
    taxonomy: &KeywordTaxonomy,
) -> f64 {
    let text = format!("{} {}", title, description).to_lowercase();

    let modifier =
        taxonomy.safety_impact.modifier(&text) + taxonomy.economic_impact.modifier(&text);

    round2(clamp_score(5.0 + category_impact(category) + modifier))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taxonomy() -> KeywordTaxonomy {
        KeywordTaxonomy::default()
    }

    #[test]
    fn sanitation_without_keywords_scores_base_plus_impact() {
        let score = safety_impact_score(
            IssueCategory::Sanitation,
            "Overflowing bin",
            "on the corner",
            &taxonomy(),
        );
        assert_eq!(score, 6.0);
    }

    #[test]
    fn safety_keywords_add_one_and_a_half_each() {
        // 5.0 + road 3.0 + "hazard" 1.5 = 9.5.
        let score = safety_impact_score(
            IssueCategory::Road,
            "Pothole hazard",
            "deep crater in the asphalt",
            &taxonomy(),
        );
        assert_eq!(score, 9.5);
    }

    #[test]
    fn economic_keywords_add_one_each() {
        // 5.0 + others 2.0 + "delivery" 1.0 + "business" 1.0 = 9.0.
        let score = safety_impact_score(
            IssueCategory::Others,
            "Delivery access",
            "business entrance obstructed",
            &taxonomy(),
        );
        assert_eq!(score, 9.0);
    }

    #[test]
    fn score_clamps_at_ten() {
        let score = safety_impact_score(
            IssueCategory::Electricity,
            "Dangerous hazard risk",
            "accident injury emergency near the police post",
            &taxonomy(),
        );
        assert_eq!(score, 10.0);
    }
}
