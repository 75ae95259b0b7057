use crate::geocoder::GeoResult;
use crate::record::{present, Record};

/// The five canonical query shapes, strongest first. The postal and
/// city/state shapes substitute fields from the address-level geocode, so
/// they only exist once that baseline has been fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    CompanyAndAddress,
    CompanyAndPostal,
    CompanyCityAndState,
    Company,
    Address,
}

impl Strategy {
    pub fn as_tag(&self) -> &'static str {
        match self {
            Strategy::CompanyAndAddress => "company_and_address",
            Strategy::CompanyAndPostal => "company_and_postal",
            Strategy::CompanyCityAndState => "company_city_and_state",
            Strategy::Company => "company",
            Strategy::Address => "address",
        }
    }

    /// Seed score a query's candidates start with. All strategies currently
    /// start even; fallback preference is carried by generation order plus
    /// first-wins dedup rather than by seed weight.
    pub fn base_score(&self) -> f64 {
        0.0
    }
}

#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub strategy: Strategy,
    pub text: String,
    pub base_score: f64,
}

impl QuerySpec {
    fn new(strategy: Strategy, text: String) -> Self {
        let base_score = strategy.base_score();
        Self {
            strategy,
            text,
            base_score,
        }
    }
}

/// The (address, company) slots the collector iterates, addresses outer.
/// A side with no present values contracts to a single `None` slot, unless
/// the record has neither side, in which case the plan is empty and the
/// record is terminal.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub addresses: Vec<Option<String>>,
    pub companies: Vec<Option<String>>,
}

impl QueryPlan {
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty() && self.companies.is_empty()
    }
}

pub fn plan_record(record: &Record) -> QueryPlan {
    let addresses = distinct_values(&[&record.address, &record.account_address]);
    let companies = distinct_values(&[&record.company, &record.account_company]);
    if addresses.is_empty() && companies.is_empty() {
        return QueryPlan {
            addresses: Vec::new(),
            companies: Vec::new(),
        };
    }
    QueryPlan {
        addresses: into_slots(addresses),
        companies: into_slots(companies),
    }
}

/// Queries for one (address, company) slot pair, emitted strongest first.
pub fn plan_queries(
    address: Option<&str>,
    company: Option<&str>,
    baseline: Option<&GeoResult>,
) -> Vec<QuerySpec> {
    let mut queries = Vec::new();

    if let (Some(company), Some(address)) = (company, address) {
        queries.push(QuerySpec::new(
            Strategy::CompanyAndAddress,
            format!("{company}, {address}"),
        ));
    }
    if let (Some(company), Some(baseline)) = (company, baseline) {
        if let Some(postal) = baseline.postal_code.as_deref().filter(|v| !v.is_empty()) {
            queries.push(QuerySpec::new(
                Strategy::CompanyAndPostal,
                format!("{company}, {postal}"),
            ));
        }
        if let (Some(city), Some(state)) = (
            baseline.city.as_deref().filter(|v| !v.is_empty()),
            baseline.state_code.as_deref().filter(|v| !v.is_empty()),
        ) {
            queries.push(QuerySpec::new(
                Strategy::CompanyCityAndState,
                format!("{company}, {city} {state}"),
            ));
        }
    }
    if let Some(company) = company {
        queries.push(QuerySpec::new(Strategy::Company, company.to_string()));
    }
    if let Some(address) = address {
        queries.push(QuerySpec::new(Strategy::Address, address.to_string()));
    }

    queries
}

fn distinct_values(fields: &[&Option<String>]) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for field in fields {
        if let Some(value) = present(field) {
            if !values.iter().any(|existing| existing == value) {
                values.push(value.to_string());
            }
        }
    }
    values
}

fn into_slots(values: Vec<String>) -> Vec<Option<String>> {
    if values.is_empty() {
        vec![None]
    } else {
        values.into_iter().map(Some).collect()
    }
}
