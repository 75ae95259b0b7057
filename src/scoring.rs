use std::cmp::Ordering;

use crate::candidates::{Candidate, Channel};
use crate::config::AppConfig;
use crate::record::{present, Record};

const COORD_MATCH_BONUS: f64 = 1000.0;
const COMPANY_MATCH_BONUS: f64 = 1500.0;
const STREET_BONUS_DIRECT: f64 = 800.0;
const STREET_BONUS_DETAILS: f64 = 1500.0;
const CITY_BONUS_DIRECT: f64 = 250.0;
const CITY_BONUS_DETAILS: f64 = 500.0;
const STATE_BONUS: f64 = 750.0;
const POSTAL_BONUS: f64 = 250.0;
const COUNTRY_BONUS: f64 = 100.0;
const PLACE_TYPE_BONUS: f64 = 2000.0;
const TABLE_PLACE_ID_DIRECT: f64 = 500.0;
const TABLE_PLACE_ID_DETAILS: f64 = 500_000.0;
const PLACES_PLACE_ID_DIRECT: f64 = 1500.0;
const PLACES_PLACE_ID_DETAILS: f64 = 1_000_000.0;

const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Applies every rule to every candidate. Rules are independent and
/// additive; no rule short-circuits another, and a candidate's score never
/// depends on its neighbors.
pub fn score_candidates(candidates: &mut [Candidate], record: &Record, config: &AppConfig) {
    for candidate in candidates {
        score_candidate(candidate, record, config);
    }
}

fn score_candidate(candidate: &mut Candidate, record: &Record, config: &AppConfig) {
    let scale = config.lat_lng_scale;
    let reference = record.using_coordinates();

    if let Some((lat, lng)) = reference {
        if round_coord(candidate.result.latitude, scale) == round_coord(lat, scale)
            && round_coord(candidate.result.longitude, scale) == round_coord(lng, scale)
        {
            bump(candidate, COORD_MATCH_BONUS, "lat_lng");
        }
    }

    if let Some((lat, lng)) = reference {
        let distance =
            haversine_miles(candidate.result.latitude, candidate.result.longitude, lat, lng);
        bump(candidate, -distance, "lat_lng_distance");
    }

    if let (Some(name), Some(company)) = (
        candidate.result.name.as_deref().filter(|v| !v.is_empty()),
        present(&record.using_company),
    ) {
        if name.to_lowercase() == company.to_lowercase() {
            bump(candidate, COMPANY_MATCH_BONUS, "company");
        }
    }

    if let Some(baseline) = candidate.address_result.clone() {
        if field_matches(&candidate.result.street_address, &baseline.street_address) {
            bump(
                candidate,
                by_channel(candidate.channel, STREET_BONUS_DIRECT, STREET_BONUS_DETAILS),
                "street_address",
            );
        }
        if field_matches(&candidate.result.city, &baseline.city) {
            bump(
                candidate,
                by_channel(candidate.channel, CITY_BONUS_DIRECT, CITY_BONUS_DETAILS),
                "city",
            );
        }
        if field_matches(&candidate.result.state_code, &baseline.state_code) {
            bump(candidate, STATE_BONUS, "state");
        }
        if field_matches(&candidate.result.postal_code, &baseline.postal_code) {
            bump(candidate, POSTAL_BONUS, "postal");
        }
        if field_matches(&candidate.result.country_code, &baseline.country_code) {
            bump(candidate, COUNTRY_BONUS, "country");
        }
    }

    if !config.limit_place_types.is_empty()
        && candidate
            .result
            .types
            .iter()
            .any(|t| config.limit_place_types.iter().any(|allowed| allowed == t))
    {
        bump(candidate, PLACE_TYPE_BONUS, "place_type");
    }

    if let Some(table_place_id) = present(&record.table_place_id) {
        if candidate.result.place_id == table_place_id {
            bump(
                candidate,
                by_channel(candidate.channel, TABLE_PLACE_ID_DIRECT, TABLE_PLACE_ID_DETAILS),
                "table_place_id",
            );
        }
    }

    if let Some(places_place_id) = present(&record.places_place_id) {
        if candidate.result.place_id == places_place_id {
            bump(
                candidate,
                by_channel(
                    candidate.channel,
                    PLACES_PLACE_ID_DIRECT,
                    PLACES_PLACE_ID_DETAILS,
                ),
                "places_place_id",
            );
        }
    }

    // Provenance marker for direct-channel candidates. Despite the name it
    // carries no deduction; the tag is informational only.
    if candidate.channel == Channel::Google {
        candidate.scored_by.push("google_maps_penalty".to_string());
    }
}

/// Stable sort by score descending; post-dedup insertion order breaks ties.
pub fn select(mut candidates: Vec<Candidate>) -> Option<Candidate> {
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    candidates.into_iter().next()
}

pub fn round_coord(value: f64, scale: u32) -> f64 {
    let factor = 10_f64.powi(scale as i32);
    (value * factor).round() / factor
}

fn bump(candidate: &mut Candidate, amount: f64, tag: &str) {
    candidate.score += amount;
    candidate.scored_by.push(tag.to_string());
}

fn by_channel(channel: Channel, direct: f64, details: f64) -> f64 {
    if channel.is_details() {
        details
    } else {
        direct
    }
}

fn field_matches(candidate: &Option<String>, baseline: &Option<String>) -> bool {
    match (candidate.as_deref(), baseline.as_deref()) {
        (Some(a), Some(b)) => !a.is_empty() && a == b,
        _ => false,
    }
}

fn haversine_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let (delta_phi, delta_lambda) = ((lat2 - lat1).to_radians(), (lon2 - lon1).to_radians());
    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * a.sqrt().atan2((1.0 - a).sqrt())
}
