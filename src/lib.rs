pub mod candidates;
pub mod config;
pub mod errors;
pub mod geocoder;
pub mod industry;
pub mod issues;
pub mod pipeline;
pub mod planner;
pub mod record;
pub mod scoring;

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use crate::config::{AppConfig, ConfigOverrides};
pub use crate::errors::{AppError, AppResult};
pub use crate::geocoder::{GeoResult, Geocoder, GoogleGeocoder, Lookup};
pub use crate::pipeline::{Pipeline, RunSummary};
pub use crate::record::Record;

pub fn init_tracing() {
    static INIT: OnceCell<()> = OnceCell::new();
    let _ = INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,batch_geocode=debug"));
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    });
}

/// Wires the HTTP geocoder into a pipeline and processes the whole input
/// table.
pub async fn run(config: AppConfig) -> AppResult<RunSummary> {
    let geocoder = GoogleGeocoder::new(&config)?;
    let pipeline = Pipeline::new(config, Arc::new(geocoder));
    pipeline.run().await
}
