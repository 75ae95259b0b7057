use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};

const HTTP_TIMEOUT_SECS: u64 = 10;

/// Provider lookup mode. `Google` is the direct geocode endpoint; the other
/// two form the autocomplete-then-details chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lookup {
    Google,
    GooglePlacesAutocomplete,
    GooglePlacesDetails,
}

impl Lookup {
    pub fn as_tag(&self) -> &'static str {
        match self {
            Lookup::Google => "google",
            Lookup::GooglePlacesAutocomplete => "google_places_autocomplete",
            Lookup::GooglePlacesDetails => "google_places_details",
        }
    }
}

/// One provider place result, flattened to the fields the pipeline consumes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoResult {
    pub place_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state_code: Option<String>,
    pub sub_state: Option<String>,
    pub postal_code: Option<String>,
    pub country_code: Option<String>,
    pub types: Vec<String>,
    pub name: Option<String>,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn search(&self, query: &str, lookup: Lookup) -> AppResult<Vec<GeoResult>>;
}

pub struct GoogleGeocoder {
    http: reqwest::Client,
    api_key: Option<SecretString>,
    geocode_endpoint: String,
    autocomplete_endpoint: String,
    details_endpoint: String,
}

impl GoogleGeocoder {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            api_key: config.geocoder_api_key.clone(),
            geocode_endpoint: config.geocode_endpoint.clone(),
            autocomplete_endpoint: config.autocomplete_endpoint.clone(),
            details_endpoint: config.details_endpoint.clone(),
        })
    }

    async fn geocode(&self, query: &str) -> AppResult<Vec<GeoResult>> {
        let response: GeocodeResponse = self
            .get(&self.geocode_endpoint, &[("address", query)])
            .await?;
        ensure_usable_status(&response.status, response.error_message)?;
        Ok(response
            .results
            .into_iter()
            .map(PlacePayload::into_result)
            .collect())
    }

    async fn autocomplete(&self, query: &str) -> AppResult<Vec<GeoResult>> {
        let response: AutocompleteResponse = self
            .get(&self.autocomplete_endpoint, &[("input", query)])
            .await?;
        ensure_usable_status(&response.status, response.error_message)?;
        Ok(response
            .predictions
            .into_iter()
            .map(|prediction| GeoResult {
                place_id: prediction.place_id,
                address: prediction.description,
                ..GeoResult::default()
            })
            .collect())
    }

    async fn place_details(&self, place_id: &str) -> AppResult<Vec<GeoResult>> {
        let response: DetailsResponse = self
            .get(&self.details_endpoint, &[("place_id", place_id)])
            .await?;
        ensure_usable_status(&response.status, response.error_message)?;
        Ok(response
            .result
            .map(PlacePayload::into_result)
            .into_iter()
            .collect())
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> AppResult<T> {
        let mut request = self.http.get(endpoint).query(params);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.expose_secret())]);
        }
        let response = request.send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn search(&self, query: &str, lookup: Lookup) -> AppResult<Vec<GeoResult>> {
        match lookup {
            Lookup::Google => self.geocode(query).await,
            Lookup::GooglePlacesAutocomplete => self.autocomplete(query).await,
            Lookup::GooglePlacesDetails => self.place_details(query).await,
        }
    }
}

/// `OK` carries results and `ZERO_RESULTS` an empty set; anything else is the
/// provider refusing the call (quota, key, malformed request).
fn ensure_usable_status(status: &str, error_message: Option<String>) -> AppResult<()> {
    match status {
        "OK" | "ZERO_RESULTS" => Ok(()),
        other => {
            let detail = error_message
                .map(|message| format!("{other}: {message}"))
                .unwrap_or_else(|| other.to_string());
            Err(AppError::Provider(detail))
        }
    }
}

#[derive(Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<PlacePayload>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct AutocompleteResponse {
    status: String,
    #[serde(default)]
    predictions: Vec<PredictionPayload>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct DetailsResponse {
    status: String,
    #[serde(default)]
    result: Option<PlacePayload>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct PredictionPayload {
    place_id: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Default, Deserialize)]
struct PlacePayload {
    #[serde(default)]
    place_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    formatted_address: Option<String>,
    #[serde(default)]
    geometry: Option<GeometryPayload>,
    #[serde(default)]
    types: Vec<String>,
    #[serde(default)]
    address_components: Vec<ComponentPayload>,
}

#[derive(Deserialize)]
struct GeometryPayload {
    location: LocationPayload,
}

#[derive(Deserialize)]
struct LocationPayload {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct ComponentPayload {
    #[serde(default)]
    long_name: Option<String>,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    types: Vec<String>,
}

impl PlacePayload {
    fn into_result(self) -> GeoResult {
        let (latitude, longitude) = self
            .geometry
            .map(|g| (g.location.lat, g.location.lng))
            .unwrap_or_default();

        let mut result = GeoResult {
            place_id: self.place_id,
            latitude,
            longitude,
            address: self.formatted_address,
            types: self.types,
            name: self.name,
            ..GeoResult::default()
        };

        let mut street_number = None;
        let mut route = None;
        for component in self.address_components {
            let kinds = &component.types;
            if kinds.iter().any(|t| t == "street_number") {
                street_number = component.long_name.clone();
            } else if kinds.iter().any(|t| t == "route") {
                route = component.long_name.clone();
            } else if kinds.iter().any(|t| t == "locality" || t == "postal_town") {
                result.city = result.city.or(component.long_name.clone());
            } else if kinds.iter().any(|t| t == "administrative_area_level_1") {
                result.state_code = component.short_name.clone();
            } else if kinds.iter().any(|t| t == "administrative_area_level_2") {
                result.sub_state = component.long_name.clone();
            } else if kinds.iter().any(|t| t == "postal_code") {
                result.postal_code = component.long_name.clone();
            } else if kinds.iter().any(|t| t == "country") {
                result.country_code = component.short_name.clone();
            }
        }
        result.street_address = match (street_number, route) {
            (Some(number), Some(route)) => Some(format!("{number} {route}")),
            (None, Some(route)) => Some(route),
            _ => None,
        };

        result
    }
}
