use serde::{Deserialize, Serialize};

/// One row of the input table, mutated in place through the pipeline and
/// written once to the output. Field order is the output column order; the
/// csv writer emits the header from it exactly once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub table_id: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub account_company: Option<String>,
    #[serde(default)]
    pub account_address: Option<String>,
    #[serde(default)]
    pub table_place_id: Option<String>,
    #[serde(default)]
    pub places_place_id: Option<String>,
    #[serde(default)]
    pub table_latitude: Option<String>,
    #[serde(default)]
    pub table_longitude: Option<String>,
    #[serde(default)]
    pub places_latitude: Option<String>,
    #[serde(default)]
    pub places_longitude: Option<String>,
    #[serde(default)]
    pub using_place_id: Option<String>,
    #[serde(default)]
    pub using_latitude: Option<String>,
    #[serde(default)]
    pub using_longitude: Option<String>,
    #[serde(default)]
    pub using_company: Option<String>,
    #[serde(default)]
    pub using_address: Option<String>,
    #[serde(default)]
    pub geocoded_company: Option<String>,
    #[serde(default)]
    pub geocoded_place_id: Option<String>,
    #[serde(default)]
    pub geocoded_latitude: Option<String>,
    #[serde(default)]
    pub geocoded_longitude: Option<String>,
    #[serde(default)]
    pub geocoded_address: Option<String>,
    #[serde(default)]
    pub geocoded_street_address: Option<String>,
    #[serde(default)]
    pub geocoded_city: Option<String>,
    #[serde(default)]
    pub geocoded_state: Option<String>,
    #[serde(default)]
    pub geocoded_sub_state: Option<String>,
    #[serde(default)]
    pub geocoded_postal_code: Option<String>,
    #[serde(default)]
    pub geocoded_country: Option<String>,
    #[serde(default)]
    pub geocoded_types: Option<String>,
    #[serde(default)]
    pub geocoded_wiw_industry: Option<String>,
    #[serde(default)]
    pub geocoded_score: Option<String>,
    #[serde(default)]
    pub geocoded_scored_by: Option<String>,
    #[serde(default)]
    pub geocoded_lookup: Option<String>,
    #[serde(default)]
    pub possible_issues: Option<String>,
    #[serde(default)]
    pub geocoded_status: Option<String>,
}

impl Record {
    /// Computes the using_* reference fields: places_* wins over table_*,
    /// company over account_company, address over account_address.
    pub fn derive_using_fields(&mut self) {
        self.using_place_id = pick(&self.places_place_id, &self.table_place_id);
        self.using_latitude = pick(&self.places_latitude, &self.table_latitude);
        self.using_longitude = pick(&self.places_longitude, &self.table_longitude);
        self.using_company = pick(&self.company, &self.account_company);
        self.using_address = pick(&self.address, &self.account_address);
    }

    /// The best-known reference coordinate, when both halves parse.
    pub fn using_coordinates(&self) -> Option<(f64, f64)> {
        let lat = present(&self.using_latitude)?.parse().ok()?;
        let lng = present(&self.using_longitude)?.parse().ok()?;
        Some((lat, lng))
    }

    /// Resets the output fields so a re-run never carries stale values from
    /// a previous output file into a freshly processed row.
    pub fn clear_outputs(&mut self) {
        self.geocoded_company = None;
        self.geocoded_place_id = None;
        self.geocoded_latitude = None;
        self.geocoded_longitude = None;
        self.geocoded_address = None;
        self.geocoded_street_address = None;
        self.geocoded_city = None;
        self.geocoded_state = None;
        self.geocoded_sub_state = None;
        self.geocoded_postal_code = None;
        self.geocoded_country = None;
        self.geocoded_types = None;
        self.geocoded_wiw_industry = None;
        self.geocoded_score = None;
        self.geocoded_scored_by = None;
        self.geocoded_lookup = None;
        self.possible_issues = None;
        self.geocoded_status = None;
    }

    pub fn identity(&self) -> String {
        format!(
            "{}:{}:{}",
            present(&self.table).unwrap_or(""),
            present(&self.table_id).unwrap_or(""),
            present(&self.account_id).unwrap_or(""),
        )
    }
}

/// Non-empty trimmed view of an optional field.
pub fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn pick(preferred: &Option<String>, fallback: &Option<String>) -> Option<String> {
    present(preferred)
        .or_else(|| present(fallback))
        .map(str::to_string)
}
