use crate::candidates::Candidate;
use crate::record::{present, Record};
use crate::scoring::round_coord;

/// Compares the selected candidate against the record's reference fields and
/// against the address-only baseline, producing every applicable tag. Tags
/// are independent; none suppresses another.
pub fn detect_issues(record: &Record, winner: Option<&Candidate>, scale: u32) -> Vec<&'static str> {
    let mut issues = Vec::new();

    match record.using_coordinates() {
        None => issues.push("missing_lat_lng"),
        Some((lat, lng)) => {
            if let Some(candidate) = winner {
                if round_coord(candidate.result.latitude, scale) != round_coord(lat, scale)
                    || round_coord(candidate.result.longitude, scale) != round_coord(lng, scale)
                {
                    issues.push("lat_lng_mismatch");
                }
            }
        }
    }

    match present(&record.using_place_id) {
        None => issues.push("missing_place_id"),
        Some(reference) => {
            if let Some(candidate) = winner {
                if candidate.result.place_id != reference {
                    issues.push("place_id_mismatch");
                }
            }
        }
    }

    if let (Some(candidate), Some(company)) = (winner, present(&record.using_company)) {
        if let Some(name) = candidate.result.name.as_deref().filter(|v| !v.is_empty()) {
            if name.to_lowercase() != company.to_lowercase() {
                issues.push("company_mismatch");
            }
        }
    }

    // Structural fields compare against the address-only geocode, not the
    // raw input address.
    if let Some(candidate) = winner {
        if let Some(baseline) = candidate.address_result.as_ref() {
            if field_differs(&candidate.result.street_address, &baseline.street_address) {
                issues.push("street_address_mismatch");
            }
            if field_differs(&candidate.result.city, &baseline.city) {
                issues.push("city_mismatch");
            }
            if field_differs(&candidate.result.state_code, &baseline.state_code) {
                issues.push("state_mismatch");
            }
            if field_differs(&candidate.result.postal_code, &baseline.postal_code) {
                issues.push("postal_mismatch");
            }
            if field_differs(&candidate.result.country_code, &baseline.country_code) {
                issues.push("country_mismatch");
            }
        }
    }

    if winner.is_none() {
        issues.push("geocode_failed");
    }

    issues
}

/// Fires only when the candidate actually has a value for the field and it
/// disagrees with the baseline.
fn field_differs(candidate: &Option<String>, baseline: &Option<String>) -> bool {
    match candidate.as_deref().filter(|v| !v.is_empty()) {
        Some(value) => baseline.as_deref() != Some(value),
        None => false,
    }
}
