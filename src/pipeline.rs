use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::candidates::{dedup_candidates, Candidate, CandidateCollector};
use crate::config::AppConfig;
use crate::errors::AppResult;
use crate::geocoder::Geocoder;
use crate::industry::{types_to_industry_ids, OTHER_INDUSTRY_ID};
use crate::issues::detect_issues;
use crate::record::{present, Record};
use crate::scoring::{round_coord, score_candidates, select};

/// Pacing for the external provider. Both delays exist only to respect the
/// provider's rate limits, not for correctness.
pub struct Throttle {
    call_delay: Duration,
    record_delay: Duration,
}

impl Throttle {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            call_delay: Duration::from_secs_f64(config.sleep),
            record_delay: Duration::from_secs_f64(config.line_sleep),
        }
    }

    pub fn none() -> Self {
        Self {
            call_delay: Duration::ZERO,
            record_delay: Duration::ZERO,
        }
    }

    pub async fn after_call(&self) {
        if !self.call_delay.is_zero() {
            sleep(self.call_delay).await;
        }
    }

    pub async fn after_record(&self) {
        if !self.record_delay.is_zero() {
            sleep(self.record_delay).await;
        }
    }
}

/// Resumability: records whose prior-run status is in the configured set
/// bypass the pipeline entirely.
pub struct SkipPolicy {
    statuses: HashSet<String>,
    exclude_skipped: bool,
}

impl SkipPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            statuses: config.skip_status.clone(),
            exclude_skipped: config.exclude_skipped,
        }
    }

    pub fn should_skip(&self, record: &Record) -> bool {
        present(&record.geocoded_status)
            .map(|status| self.statuses.contains(status))
            .unwrap_or(false)
    }

    /// Skipped rows pass through to the output unchanged unless the run is
    /// configured to drop them.
    pub fn writes_skipped(&self) -> bool {
        !self.exclude_skipped
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub processed: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub failed: usize,
    pub skipped: usize,
    pub written: usize,
}

pub struct Pipeline {
    config: AppConfig,
    geocoder: Arc<dyn Geocoder>,
    skip: SkipPolicy,
    throttle: Throttle,
}

impl Pipeline {
    pub fn new(config: AppConfig, geocoder: Arc<dyn Geocoder>) -> Self {
        let skip = SkipPolicy::from_config(&config);
        let throttle = Throttle::from_config(&config);
        Self {
            config,
            geocoder,
            skip,
            throttle,
        }
    }

    /// Processes the input table row by row. No record failure is fatal to
    /// the batch; every failure is recorded on the row and the run moves on.
    pub async fn run(&self) -> AppResult<RunSummary> {
        let mut reader = csv::Reader::from_path(&self.config.input_file)?;
        let mut writer = csv::Writer::from_path(&self.config.output_file)?;
        let mut summary = RunSummary::default();

        for row in reader.deserialize() {
            let mut record: Record = match row {
                Ok(record) => record,
                Err(err) => {
                    warn!(?err, "dropping unreadable input row");
                    summary.failed += 1;
                    continue;
                }
            };
            summary.processed += 1;

            if self.skip.should_skip(&record) {
                summary.skipped += 1;
                debug!(identity = %record.identity(), "skipping by prior status");
                if self.skip.writes_skipped() {
                    writer.serialize(&record)?;
                    summary.written += 1;
                }
                continue;
            }

            record.clear_outputs();
            record.derive_using_fields();

            match self.process_record(&mut record).await {
                Ok(true) => summary.resolved += 1,
                Ok(false) => summary.unresolved += 1,
                Err(err) => {
                    if err.is_provider() {
                        warn!(identity = %record.identity(), error = %err, "provider failure");
                    } else {
                        warn!(identity = %record.identity(), error = %err, "record processing failed");
                    }
                    record.geocoded_status = Some(err.to_string());
                    summary.failed += 1;
                }
            }

            writer.serialize(&record)?;
            summary.written += 1;
            self.throttle.after_record().await;
        }

        writer.flush()?;
        Ok(summary)
    }

    async fn process_record(&self, record: &mut Record) -> AppResult<bool> {
        let collector = CandidateCollector::new(self.geocoder.as_ref(), &self.throttle);
        let collected = collector.collect(record).await?;
        let mut survivors = dedup_candidates(collected);
        score_candidates(&mut survivors, record, &self.config);
        let winner = select(survivors);

        let issues = detect_issues(record, winner.as_ref(), self.config.lat_lng_scale);
        record.possible_issues = Some(issues.join(", "));

        let resolved = match &winner {
            Some(candidate) => {
                self.apply_candidate(record, candidate);
                record.geocoded_status = Some("success".to_string());
                true
            }
            None => {
                record.geocoded_status = Some("geocode_failed".to_string());
                false
            }
        };

        info!(
            identity = %record.identity(),
            address = record.geocoded_address.as_deref().unwrap_or(""),
            latitude = record.geocoded_latitude.as_deref().unwrap_or(""),
            longitude = record.geocoded_longitude.as_deref().unwrap_or(""),
            place_id = record.geocoded_place_id.as_deref().unwrap_or(""),
            reference_place_id = record.using_place_id.as_deref().unwrap_or(""),
            lookup = record.geocoded_lookup.as_deref().unwrap_or(""),
            status = record.geocoded_status.as_deref().unwrap_or(""),
            "processed record"
        );

        Ok(resolved)
    }

    fn apply_candidate(&self, record: &mut Record, candidate: &Candidate) {
        let scale = self.config.lat_lng_scale;
        let result = &candidate.result;

        record.geocoded_company = result.name.clone();
        record.geocoded_place_id = Some(result.place_id.clone());
        record.geocoded_latitude = Some(format_coord(result.latitude, scale));
        record.geocoded_longitude = Some(format_coord(result.longitude, scale));
        record.geocoded_address = result.address.clone();
        record.geocoded_street_address = result.street_address.clone();
        record.geocoded_city = result.city.clone();
        record.geocoded_state = result.state_code.clone();
        record.geocoded_sub_state = result.sub_state.clone();
        record.geocoded_postal_code = result.postal_code.clone();
        record.geocoded_country = result.country_code.clone();
        record.geocoded_types = (!result.types.is_empty()).then(|| result.types.join(", "));

        let industries = types_to_industry_ids(&result.types);
        record.geocoded_wiw_industry = Some(if industries.is_empty() {
            OTHER_INDUSTRY_ID.to_string()
        } else {
            industries
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        });

        record.geocoded_score = Some(format_score(candidate.score));
        record.geocoded_scored_by = Some(candidate.scored_by.join(", "));
        record.geocoded_lookup = Some(candidate.lookup_tag());
    }
}

fn format_coord(value: f64, scale: u32) -> String {
    round_coord(value, scale).to_string()
}

fn format_score(score: f64) -> String {
    if score.fract() == 0.0 && score.abs() < i64::MAX as f64 {
        (score as i64).to_string()
    } else {
        score.to_string()
    }
}
