use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// One tier of a keyword taxonomy: every keyword in the tier carries
/// the same additive weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordTier {
    pub weight: f64,
    pub keywords: Vec<String>,
}

impl KeywordTier {
    fn new(weight: f64, keywords: &[&str]) -> KeywordTier {
        KeywordTier {
            weight,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Sum of weights for every keyword of this tier found as a
    /// case-insensitive substring of `text`. `text` must already be
    /// lowercased by the caller.
    pub fn modifier(&self, text: &str) -> f64 {
        self.keywords
            .iter()
            .filter(|keyword| text.contains(keyword.as_str()))
            .count() as f64
            * self.weight
    }
}

/// Keyword taxonomies for severity and safety/economic impact scoring.
/// Tunable without code changes: load overrides from a JSON file via
/// [`KeywordTaxonomy::from_file`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordTaxonomy {
    pub severity_high: KeywordTier,
    pub severity_medium: KeywordTier,
    pub severity_low: KeywordTier,
    pub safety_impact: KeywordTier,
    pub economic_impact: KeywordTier,
}

impl Default for KeywordTaxonomy {
    fn default() -> KeywordTaxonomy {
        KeywordTaxonomy {
            severity_high: KeywordTier::new(
                2.0,
                &[
                    "emergency", "urgent", "danger", "accident", "broke", "burst", "flood",
                    "fire", "electrical", "gas", "leak", "blocked", "collapsed", "severe",
                    "major", "critical", "sparking",
                ],
            ),
            severity_medium: KeywordTier::new(
                0.5,
                &[
                    "damage", "problem", "issue", "concern", "repair", "fix", "maintenance",
                    "replace", "broken",
                ],
            ),
            severity_low: KeywordTier::new(
                -1.0,
                &[
                    "minor", "small", "slight", "cosmetic", "aesthetic", "request",
                    "suggestion", "improvement",
                ],
            ),
            safety_impact: KeywordTier::new(
                1.5,
                &[
                    "accident", "traffic", "block", "congestion", "jam", "dangerous",
                    "hazard", "unsafe", "risk", "injury", "emergency", "ambulance",
                    "fire truck", "police",
                ],
            ),
            economic_impact: KeywordTier::new(
                1.0,
                &[
                    "business", "commerce", "shop", "delivery", "truck", "transport",
                    "goods", "supply", "economic", "revenue",
                ],
            ),
        }
    }
}

impl KeywordTaxonomy {
    pub fn from_file(path: &Path) -> anyhow::Result<KeywordTaxonomy> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read keyword taxonomy {}", path.display()))?;
        let taxonomy = serde_json::from_str(&raw)
            .with_context(|| format!("invalid keyword taxonomy {}", path.display()))?;
        Ok(taxonomy)
    }
}
