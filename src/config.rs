use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::{env, fs, io};

use secrecy::SecretString;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::{AppError, AppResult};

const DEFAULT_INPUT_FILE: &str = "input.csv";
const DEFAULT_OUTPUT_FILE: &str = "output.csv";
const DEFAULT_LAT_LNG_SCALE: u32 = 8;
const DEFAULT_LINE_SLEEP_SECS: f64 = 1.0;

const DEFAULT_GEOCODE_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const DEFAULT_AUTOCOMPLETE_ENDPOINT: &str =
    "https://maps.googleapis.com/maps/api/place/autocomplete/json";
const DEFAULT_DETAILS_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/place/details/json";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub input_file: PathBuf,
    pub output_file: PathBuf,
    pub geocoder_api_key: Option<SecretString>,
    /// Decimal places coordinates are rounded to before comparison and output.
    pub lat_lng_scale: u32,
    /// Delay in seconds after every provider call.
    pub sleep: f64,
    /// Delay in seconds after every completed record.
    pub line_sleep: f64,
    /// Prior-run statuses that skip the record on a resumed run.
    pub skip_status: HashSet<String>,
    /// Omit skipped rows from the output entirely instead of passing them through.
    pub exclude_skipped: bool,
    /// Place types a candidate must intersect to earn the place-type bonus.
    pub limit_place_types: Vec<String>,
    pub geocode_endpoint: String,
    pub autocomplete_endpoint: String,
    pub details_endpoint: String,
}

/// Subset of options a caller may override after the file is loaded.
/// Unset fields keep the file's (or default) value.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub input_file: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
    pub geocoder_api_key: Option<String>,
    pub lat_lng_scale: Option<u32>,
    pub sleep: Option<f64>,
    pub line_sleep: Option<f64>,
    pub skip_status: Option<Vec<String>>,
    pub exclude_skipped: Option<bool>,
    pub limit_place_types: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    input_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
    geocoder_api_key: Option<String>,
    lat_lng_scale: Option<u32>,
    sleep: Option<f64>,
    line_sleep: Option<f64>,
    skip_status: Option<Vec<String>>,
    exclude_skipped: Option<bool>,
    limit_place_types: Option<Vec<String>>,
}

impl AppConfig {
    pub fn load(config_path: &Path, overrides: ConfigOverrides) -> AppResult<Self> {
        load_dotenv_if_applicable();
        let file = read_file_config(config_path)?;

        let api_key = overrides
            .geocoder_api_key
            .or(file.geocoder_api_key)
            .or_else(|| env::var("GEOCODER_API_KEY").ok())
            .filter(|v| !v.trim().is_empty())
            .map(SecretString::from);

        Ok(Self {
            input_file: overrides
                .input_file
                .or(file.input_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_FILE)),
            output_file: overrides
                .output_file
                .or(file.output_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_FILE)),
            geocoder_api_key: api_key,
            lat_lng_scale: overrides
                .lat_lng_scale
                .or(file.lat_lng_scale)
                .unwrap_or(DEFAULT_LAT_LNG_SCALE),
            sleep: overrides.sleep.or(file.sleep).unwrap_or(0.0).max(0.0),
            line_sleep: overrides
                .line_sleep
                .or(file.line_sleep)
                .unwrap_or(DEFAULT_LINE_SLEEP_SECS)
                .max(0.0),
            skip_status: overrides
                .skip_status
                .or(file.skip_status)
                .unwrap_or_default()
                .into_iter()
                .collect(),
            exclude_skipped: overrides
                .exclude_skipped
                .or(file.exclude_skipped)
                .unwrap_or(false),
            limit_place_types: overrides
                .limit_place_types
                .or(file.limit_place_types)
                .unwrap_or_default(),
            geocode_endpoint: endpoint_from_env("GEOCODER_GEOCODE_ENDPOINT", DEFAULT_GEOCODE_ENDPOINT),
            autocomplete_endpoint: endpoint_from_env(
                "GEOCODER_AUTOCOMPLETE_ENDPOINT",
                DEFAULT_AUTOCOMPLETE_ENDPOINT,
            ),
            details_endpoint: endpoint_from_env("GEOCODER_DETAILS_ENDPOINT", DEFAULT_DETAILS_ENDPOINT),
        })
    }
}

fn read_file_config(path: &Path) -> AppResult<FileConfig> {
    match fs::read_to_string(path) {
        Ok(contents) => serde_yaml::from_str(&contents).map_err(AppError::from),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "config file not found; using defaults");
            Ok(FileConfig::default())
        }
        Err(err) => Err(AppError::Io(err)),
    }
}

fn endpoint_from_env(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn load_dotenv_if_applicable() {
    if let Err(err) = dotenvy::dotenv() {
        match &err {
            dotenvy::Error::Io(io_err) if io_err.kind() == io::ErrorKind::NotFound => {}
            _ => debug!(?err, "unable to load .env file"),
        }
    }
}
