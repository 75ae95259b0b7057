use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use httptest::matchers::{all_of, request};
use httptest::responders::json_encoded;
use httptest::{Expectation, Server};
use serde_json::json;
use tempfile::tempdir;

use batch_geocode::{AppConfig, GoogleGeocoder, Pipeline, Record};

fn server_config(server: &Server, dir: &Path) -> AppConfig {
    AppConfig {
        input_file: dir.join("input.csv"),
        output_file: dir.join("output.csv"),
        geocoder_api_key: None,
        lat_lng_scale: 8,
        sleep: 0.0,
        line_sleep: 0.0,
        skip_status: HashSet::new(),
        exclude_skipped: false,
        limit_place_types: Vec::new(),
        geocode_endpoint: server.url_str("/maps/api/geocode/json"),
        autocomplete_endpoint: server.url_str("/maps/api/place/autocomplete/json"),
        details_endpoint: server.url_str("/maps/api/place/details/json"),
    }
}

fn read_output(path: &Path) -> Vec<Record> {
    csv::Reader::from_path(path)
        .unwrap()
        .deserialize()
        .collect::<Result<Vec<Record>, _>>()
        .unwrap()
}

#[tokio::test]
async fn resolves_and_annotates_over_http() {
    let server = Server::run();

    // Address baseline and direct lookups find nothing; the autocomplete
    // chain resolves the place. One prediction is returned for each of the
    // three planned queries, so dedup collapses them to the first-seen.
    server.expect(
        Expectation::matching(all_of![
            request::method("GET"),
            request::path("/maps/api/geocode/json"),
        ])
        .times(4)
        .respond_with(json_encoded(json!({
            "status": "ZERO_RESULTS",
            "results": []
        }))),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method("GET"),
            request::path("/maps/api/place/autocomplete/json"),
        ])
        .times(3)
        .respond_with(json_encoded(json!({
            "status": "OK",
            "predictions": [{
                "place_id": "AC1",
                "description": "Acme Cafe, 123 Main St, Springfield, IL, USA"
            }]
        }))),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method("GET"),
            request::path("/maps/api/place/details/json"),
        ])
        .times(3)
        .respond_with(json_encoded(json!({
            "status": "OK",
            "result": {
                "place_id": "P1",
                "name": "Acme Cafe",
                "formatted_address": "123 Main St, Springfield, IL 62701, USA",
                "geometry": {"location": {"lat": 39.0, "lng": -89.0}},
                "types": ["cafe", "establishment"],
                "address_components": [
                    {"long_name": "123", "short_name": "123", "types": ["street_number"]},
                    {"long_name": "Main St", "short_name": "Main St", "types": ["route"]},
                    {"long_name": "Springfield", "short_name": "Springfield", "types": ["locality"]},
                    {"long_name": "Illinois", "short_name": "IL", "types": ["administrative_area_level_1"]},
                    {"long_name": "62701", "short_name": "62701", "types": ["postal_code"]},
                    {"long_name": "United States", "short_name": "US", "types": ["country"]}
                ]
            }
        }))),
    );

    let dir = tempdir().unwrap();
    let config = server_config(&server, dir.path());
    fs::write(
        &config.input_file,
        "table,table_id,account_id,company,address,places_place_id,places_latitude,places_longitude\n\
         locations,7,42,Acme Cafe,\"123 Main St, Springfield\",P1,39.0000,-89.0000\n",
    )
    .unwrap();

    let geocoder = GoogleGeocoder::new(&config).unwrap();
    let pipeline = Pipeline::new(config.clone(), Arc::new(geocoder));
    let summary = pipeline.run().await.unwrap();
    assert_eq!(summary.resolved, 1);

    let rows = read_output(&config.output_file);
    let row = &rows[0];
    assert_eq!(row.geocoded_status.as_deref(), Some("success"));
    assert_eq!(row.geocoded_place_id.as_deref(), Some("P1"));
    assert_eq!(row.geocoded_company.as_deref(), Some("Acme Cafe"));
    assert_eq!(row.geocoded_street_address.as_deref(), Some("123 Main St"));
    assert_eq!(row.geocoded_city.as_deref(), Some("Springfield"));
    assert_eq!(row.geocoded_state.as_deref(), Some("IL"));
    assert_eq!(row.geocoded_postal_code.as_deref(), Some("62701"));
    assert_eq!(row.geocoded_country.as_deref(), Some("US"));
    assert_eq!(row.geocoded_types.as_deref(), Some("cafe, establishment"));
    assert_eq!(row.geocoded_score.as_deref(), Some("1002500"));
    assert_eq!(
        row.geocoded_lookup.as_deref(),
        Some("google_places_autocomplete_company_and_address")
    );
    assert_eq!(row.possible_issues, None);
    // cafe maps into the food-service industries
    assert!(row
        .geocoded_wiw_industry
        .as_deref()
        .unwrap()
        .split(", ")
        .any(|id| id == "2"));
}

#[tokio::test]
async fn quota_errors_mark_the_row_and_continue() {
    let server = Server::run();

    // The baseline geocode is the first call for each record; the quota
    // refusal aborts the record before any other channel is tried.
    server.expect(
        Expectation::matching(all_of![
            request::method("GET"),
            request::path("/maps/api/geocode/json"),
        ])
        .times(2)
        .respond_with(json_encoded(json!({
            "status": "OVER_QUERY_LIMIT",
            "error_message": "You have exceeded your daily request quota",
            "results": []
        }))),
    );

    let dir = tempdir().unwrap();
    let config = server_config(&server, dir.path());
    fs::write(
        &config.input_file,
        "table,table_id,account_id,company,address\n\
         locations,1,,Acme Cafe,123 Main St\n\
         locations,2,,Beta Bar,9 Side St\n",
    )
    .unwrap();

    let geocoder = GoogleGeocoder::new(&config).unwrap();
    let pipeline = Pipeline::new(config.clone(), Arc::new(geocoder));
    let summary = pipeline.run().await.unwrap();
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.written, 2);

    let rows = read_output(&config.output_file);
    assert_eq!(rows.len(), 2);
    for row in &rows {
        let status = row.geocoded_status.as_deref().unwrap();
        assert!(status.starts_with("geocoder error: OVER_QUERY_LIMIT"));
        assert_eq!(row.geocoded_place_id, None);
    }
}

#[tokio::test]
async fn skipped_rows_make_no_http_calls() {
    // No expectations registered: any request would fail the test.
    let server = Server::run();

    let dir = tempdir().unwrap();
    let mut config = server_config(&server, dir.path());
    config.skip_status.insert("success".to_string());
    fs::write(
        &config.input_file,
        "table,table_id,account_id,company,address,geocoded_place_id,geocoded_status\n\
         locations,1,,Acme Cafe,123 Main St,KNOWN,success\n",
    )
    .unwrap();

    let geocoder = GoogleGeocoder::new(&config).unwrap();
    let pipeline = Pipeline::new(config.clone(), Arc::new(geocoder));
    let summary = pipeline.run().await.unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.written, 1);

    let rows = read_output(&config.output_file);
    assert_eq!(rows[0].geocoded_place_id.as_deref(), Some("KNOWN"));
    assert_eq!(rows[0].geocoded_status.as_deref(), Some("success"));
}
