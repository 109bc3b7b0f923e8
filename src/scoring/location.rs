use crate::scoring::round2;

const FACILITY_BONUS_CAP: f64 = 3.0;

/// (bonus, address keywords) per facility class. Matching any keyword
/// of a class earns its bonus once.
const FACILITY_GROUPS: &[(f64, &[&str])] = &[
    (3.0, &["hospital", "medical", "clinic"]),
    (3.0, &["police", "fire station", "emergency"]),
    (2.5, &["school", "college", "university", "education"]),
    (2.0, &["bus stop", "metro", "station", "transport"]),
    (1.8, &["government", "municipal", "office", "admin"]),
    (1.5, &["mall", "market", "shopping", "commercial"]),
];

fn road_type_score(address: &str) -> f64 {
    const ROAD_GROUPS: &[(f64, &[&str])] = &[
        (10.0, &["highway", "expressway", "freeway"]),
        (8.0, &["main", "avenue", "boulevard"]),
        (6.0, &["street", "road", "drive"]),
        (4.0, &["lane", "circle", "court"]),
        (2.0, &["private", "alley"]),
    ];

    for (score, keywords) in ROAD_GROUPS {
        if keywords.iter().any(|keyword| address.contains(keyword)) {
            return *score;
        }
    }
    5.0
}

fn facility_bonus(address: &str) -> f64 {
    let bonus: f64 = FACILITY_GROUPS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|keyword| address.contains(keyword)))
        .map(|(bonus, _)| bonus)
        .sum();
    bonus.min(FACILITY_BONUS_CAP)
}

/// Location importance from the address text: road-type base plus a
/// capped facility-proximity bonus. Latitude/longitude are reserved
/// for future spatial lookups.
pub fn location_score(_latitude: f64, _longitude: f64, address: &str) -> f64 {
    let address = address.to_lowercase();
    let score = road_type_score(&address) + facility_bonus(&address);
    round2(score.min(10.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_avenue_scores_eight() {
        assert_eq!(location_score(0.0, 0.0, "123 Main Avenue"), 8.0);
    }

    #[test]
    fn highway_outranks_other_road_keywords() {
        // "highway" group matches before "road".
        assert_eq!(location_score(0.0, 0.0, "Service road along NH-44 Highway"), 10.0);
    }

    #[test]
    fn unmatched_address_defaults_to_five() {
        assert_eq!(location_score(0.0, 0.0, "Plot 17, Sector 9"), 5.0);
    }

    #[test]
    fn hospital_bonus_applies() {
        // street (6.0) + hospital (3.0).
        assert_eq!(location_score(0.0, 0.0, "4th Street, near City Hospital"), 9.0);
    }

    #[test]
    fn facility_bonus_caps_at_three() {
        // hospital 3.0 + school 2.5 + transport 2.0 would be 7.5, capped to 3.0.
        let score = location_score(0.0, 0.0, "Lane between hospital, school and metro station");
        assert_eq!(score, 7.0);
    }

    #[test]
    fn total_caps_at_ten() {
        assert_eq!(
            location_score(0.0, 0.0, "Expressway exit near the trauma hospital"),
            10.0
        );
    }
}
