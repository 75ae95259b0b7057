use regex::RegexBuilder;

/// Fallback id substituted by the pipeline when no industry matches.
pub const OTHER_INDUSTRY_ID: u32 = 45;

/// Industry name to internal id, in match-precedence order.
const INDUSTRIES: &[(&str, u32)] = &[
    ("Food Service / Hospitality", 1),
    ("Restaurant / Cafe", 2),
    ("QSR / Fast Casual", 3),
    ("Bar / Club / Sports Bar", 4),
    ("Coffee Shops", 5),
    ("Catering / Events", 6),
    ("Hotel / Resorts", 7),
    ("Other Hospitality", 8),
    ("Professional Service / Education", 9),
    ("Parking / Valet Service", 10),
    ("University / College / School", 11),
    ("Law Enforcement / Security", 12),
    ("Personal Care / Salon / Massage", 13),
    ("Non-profit / Volunteer", 14),
    ("Other Professional Service", 15),
    ("Healthcare / Medical", 16),
    ("Adult Care Agency", 17),
    ("Assisted Living / Care Center", 18),
    ("Hospitalist Organization", 19),
    ("Pharmacy", 20),
    ("Dental Practice", 21),
    ("Other Healthcare / Medical", 22),
    ("Entertainment / Seasonal", 23),
    ("Zoo / Aquarium", 24),
    ("Theme Park / Seasonal", 25),
    ("Ski Area / Seasonal", 26),
    ("Other Entertainment Services", 27),
    ("Retail", 28),
    ("Retail Store", 29),
    ("Wireless Retail Store", 30),
    ("Electronics", 31),
    ("Other Retail", 32),
    ("Fire Department / EMS", 33),
    ("Hardware / Home Improvement", 34),
    ("Food Truck / Mobile", 35),
    ("Cleaning Service", 36),
    ("Music / Dance / Art", 37),
    ("Call Center", 38),
    ("Veterinary / Animal Care", 39),
    ("Pet Care / Boarding", 40),
    ("Parks / Recreation", 42),
    ("Other", 45),
    ("Technology / Software", 48),
    ("Sharing Economy", 51),
    ("Customer Support/Care", 54),
    ("Other Software / Technology", 57),
];

/// Keywords too generic to key an industry on.
const STOP_WORDS: &[&str] = &["of", "or"];

/// Maps provider place types to industry ids. Each type becomes one
/// alternation regex over its underscore-separated tokens; every industry
/// name the regex hits contributes its id, in table order per type. Returns
/// empty when nothing matches.
pub fn types_to_industry_ids(types: &[String]) -> Vec<u32> {
    let mut ids = Vec::new();
    for regex in type_regexes(types) {
        for (industry, id) in INDUSTRIES {
            if regex.is_match(industry) && !ids.contains(id) {
                ids.push(*id);
            }
        }
    }
    ids
}

fn type_regexes(types: &[String]) -> Vec<regex::Regex> {
    types
        .iter()
        .filter_map(|place_type| {
            let tokens: Vec<String> = place_type
                .to_lowercase()
                .split('_')
                .filter(|token| !token.is_empty() && !STOP_WORDS.contains(token))
                .map(regex::escape)
                .collect();
            if tokens.is_empty() {
                return None;
            }
            RegexBuilder::new(&format!("(?:{})", tokens.join("|")))
                .case_insensitive(true)
                .build()
                .ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(types: &[&str]) -> Vec<u32> {
        let owned: Vec<String> = types.iter().map(|t| t.to_string()).collect();
        types_to_industry_ids(&owned)
    }

    #[test]
    fn cafe_maps_to_food_service_industries() {
        let ids = classify(&["cafe"]);
        assert!(ids.contains(&2)); // Restaurant / Cafe
        assert!(!ids.contains(&48));
    }

    #[test]
    fn underscored_types_match_on_tokens() {
        // "point_of_interest" tokenizes to point|interest; "of" is dropped.
        let ids = classify(&["veterinary_care"]);
        assert!(ids.contains(&39)); // Veterinary / Animal Care
        assert!(ids.contains(&17)); // Adult Care Agency, via "care"
    }

    #[test]
    fn unmatched_types_return_empty() {
        assert!(classify(&["locality"]).is_empty());
        assert!(classify(&[]).is_empty());
    }

    #[test]
    fn ids_are_deduplicated_across_types() {
        let ids = classify(&["cafe", "cafe"]);
        let restaurant_hits = ids.iter().filter(|id| **id == 2).count();
        assert_eq!(restaurant_hits, 1);
    }
}
