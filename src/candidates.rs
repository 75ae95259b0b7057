use std::collections::HashSet;

use tracing::debug;

use crate::errors::AppResult;
use crate::geocoder::{GeoResult, Geocoder, Lookup};
use crate::pipeline::Throttle;
use crate::planner::{plan_queries, plan_record, QuerySpec};
use crate::record::Record;

/// Which lookup channel produced a candidate. The autocomplete channel
/// covers the whole autocomplete-then-details chain; its candidates carry
/// the heavier details-channel weights during scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Google,
    PlacesAutocomplete,
}

impl Channel {
    pub fn as_tag(&self) -> &'static str {
        match self {
            Channel::Google => "google",
            Channel::PlacesAutocomplete => "google_places_autocomplete",
        }
    }

    pub fn is_details(&self) -> bool {
        matches!(self, Channel::PlacesAutocomplete)
    }
}

/// One provider result plus the provenance it was collected under. Scoring
/// mutates only `score` and `scored_by`; everything else is fixed at
/// collection time.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub result: GeoResult,
    pub channel: Channel,
    pub query: QuerySpec,
    pub address_used: Option<String>,
    pub company_used: Option<String>,
    /// Address-only geocode of the originating address, the structural
    /// ground truth for field-level comparisons.
    pub address_result: Option<GeoResult>,
    pub score: f64,
    pub scored_by: Vec<String>,
}

impl Candidate {
    fn collected(
        result: GeoResult,
        channel: Channel,
        query: &QuerySpec,
        address: &Option<String>,
        company: &Option<String>,
        address_result: Option<GeoResult>,
    ) -> Self {
        Self {
            result,
            channel,
            query: query.clone(),
            address_used: address.clone(),
            company_used: company.clone(),
            address_result,
            score: query.base_score,
            scored_by: vec![query.strategy.as_tag().to_string()],
        }
    }

    /// Channel and strategy combined, e.g. `google_places_autocomplete_company_and_postal`.
    pub fn lookup_tag(&self) -> String {
        format!("{}_{}", self.channel.as_tag(), self.query.strategy.as_tag())
    }
}

pub struct CandidateCollector<'a> {
    geocoder: &'a dyn Geocoder,
    throttle: &'a Throttle,
}

impl<'a> CandidateCollector<'a> {
    pub fn new(geocoder: &'a dyn Geocoder, throttle: &'a Throttle) -> Self {
        Self { geocoder, throttle }
    }

    /// Collects every candidate for a record along the canonical iteration
    /// order: addresses, then companies, then strategies, autocomplete
    /// channel before direct. Downstream dedup is first-wins, so this order
    /// is a contract, not an implementation detail.
    pub async fn collect(&self, record: &Record) -> AppResult<Vec<Candidate>> {
        let plan = plan_record(record);
        if plan.is_empty() {
            return Ok(Vec::new());
        }

        let mut candidates = Vec::new();
        for address in &plan.addresses {
            let baseline = match address.as_deref() {
                Some(value) => self.address_baseline(value).await?,
                None => None,
            };
            for company in &plan.companies {
                for query in plan_queries(address.as_deref(), company.as_deref(), baseline.as_ref())
                {
                    debug!(
                        strategy = query.strategy.as_tag(),
                        text = query.text,
                        "issuing query"
                    );
                    for hit in self
                        .search(&query.text, Lookup::GooglePlacesAutocomplete)
                        .await?
                    {
                        for result in
                            self.search(&hit.place_id, Lookup::GooglePlacesDetails).await?
                        {
                            candidates.push(Candidate::collected(
                                result,
                                Channel::PlacesAutocomplete,
                                &query,
                                address,
                                company,
                                baseline.clone(),
                            ));
                        }
                    }
                    for result in self.search(&query.text, Lookup::Google).await? {
                        candidates.push(Candidate::collected(
                            result,
                            Channel::Google,
                            &query,
                            address,
                            company,
                            baseline.clone(),
                        ));
                    }
                }
            }
        }
        Ok(candidates)
    }

    /// One direct geocode per distinct address seeds the postal and
    /// city/state query shapes and the structural baseline.
    async fn address_baseline(&self, address: &str) -> AppResult<Option<GeoResult>> {
        Ok(self.search(address, Lookup::Google).await?.into_iter().next())
    }

    async fn search(&self, query: &str, lookup: Lookup) -> AppResult<Vec<GeoResult>> {
        let results = self.geocoder.search(query, lookup).await?;
        self.throttle.after_call().await;
        Ok(results)
    }
}

/// First candidate per place id wins; later duplicates are dropped with
/// their provenance, even when a stronger query produced them.
pub fn dedup_candidates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|candidate| seen.insert(candidate.result.place_id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::pipeline::Throttle;
    use crate::planner::Strategy;

    use super::*;

    struct ScriptedGeocoder {
        responses: HashMap<(String, Lookup), Vec<GeoResult>>,
        calls: Mutex<Vec<(String, Lookup)>>,
    }

    impl ScriptedGeocoder {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn respond(mut self, query: &str, lookup: Lookup, results: Vec<GeoResult>) -> Self {
            self.responses.insert((query.to_string(), lookup), results);
            self
        }
    }

    #[async_trait]
    impl Geocoder for ScriptedGeocoder {
        async fn search(&self, query: &str, lookup: Lookup) -> AppResult<Vec<GeoResult>> {
            self.calls.lock().push((query.to_string(), lookup));
            Ok(self
                .responses
                .get(&(query.to_string(), lookup))
                .cloned()
                .unwrap_or_default())
        }
    }

    fn place(id: &str) -> GeoResult {
        GeoResult {
            place_id: id.into(),
            ..GeoResult::default()
        }
    }

    fn synthetic_candidate(id: &str, strategy: Strategy, channel: Channel) -> Candidate {
        let query = QuerySpec {
            strategy,
            text: "q".into(),
            base_score: strategy.base_score(),
        };
        Candidate::collected(place(id), channel, &query, &None, &None, None)
    }

    #[test]
    fn dedup_keeps_first_seen_provenance() {
        let first = synthetic_candidate("P1", Strategy::Company, Channel::PlacesAutocomplete);
        let duplicate = synthetic_candidate("P1", Strategy::CompanyAndAddress, Channel::Google);
        let other = synthetic_candidate("P2", Strategy::Address, Channel::Google);

        let survivors = dedup_candidates(vec![first, duplicate, other]);
        assert_eq!(survivors.len(), 2);
        assert_eq!(survivors[0].result.place_id, "P1");
        assert_eq!(survivors[0].query.strategy, Strategy::Company);
        assert_eq!(survivors[0].channel, Channel::PlacesAutocomplete);
        assert_eq!(survivors[1].result.place_id, "P2");
    }

    #[tokio::test]
    async fn collects_along_canonical_order() {
        let geocoder = ScriptedGeocoder::new()
            .respond("123 Main St", Lookup::Google, vec![place("ADDR")])
            .respond(
                "Acme Cafe, 123 Main St",
                Lookup::GooglePlacesAutocomplete,
                vec![place("HIT")],
            )
            .respond("HIT", Lookup::GooglePlacesDetails, vec![place("P1")])
            .respond("Acme Cafe, 123 Main St", Lookup::Google, vec![place("P2")]);
        let throttle = Throttle::none();
        let collector = CandidateCollector::new(&geocoder, &throttle);

        let record = Record {
            company: Some("Acme Cafe".into()),
            address: Some("123 Main St".into()),
            ..Record::default()
        };
        let candidates = collector.collect(&record).await.unwrap();

        let calls = geocoder.calls.lock();
        assert_eq!(calls[0], ("123 Main St".to_string(), Lookup::Google));
        assert_eq!(
            calls[1],
            (
                "Acme Cafe, 123 Main St".to_string(),
                Lookup::GooglePlacesAutocomplete
            )
        );
        assert_eq!(calls[2], ("HIT".to_string(), Lookup::GooglePlacesDetails));
        assert_eq!(calls[3], ("Acme Cafe, 123 Main St".to_string(), Lookup::Google));

        let first = &candidates[0];
        assert_eq!(first.result.place_id, "P1");
        assert_eq!(first.channel, Channel::PlacesAutocomplete);
        assert_eq!(first.score, Strategy::CompanyAndAddress.base_score());
        assert_eq!(first.scored_by, vec!["company_and_address".to_string()]);
        assert_eq!(first.address_result.as_ref().unwrap().place_id, "ADDR");

        let direct = candidates
            .iter()
            .find(|c| c.result.place_id == "P2")
            .unwrap();
        assert_eq!(direct.channel, Channel::Google);
        assert_eq!(direct.lookup_tag(), "google_company_and_address");
    }

    #[tokio::test]
    async fn empty_plan_makes_no_calls() {
        let geocoder = ScriptedGeocoder::new();
        let throttle = Throttle::none();
        let collector = CandidateCollector::new(&geocoder, &throttle);

        let candidates = collector.collect(&Record::default()).await.unwrap();
        assert!(candidates.is_empty());
        assert!(geocoder.calls.lock().is_empty());
    }
}
