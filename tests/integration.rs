//! Integration tests: fixture dataset through store, panels and dashboard

use report_lens::dashboard::{compute, select_panels};
use report_lens::panels::{self, PanelSession, PanelState};
use report_lens::query::{query, Aggregation, DuplicatePolicy, FilterSpec, QueryRequest};
use report_lens::store::{CancellationToken, FileSource, ReportStore, Snapshot};
use report_lens::{Field, Report};
use std::sync::Arc;

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/reports.json");

fn store() -> Arc<ReportStore> {
    Arc::new(ReportStore::new(FileSource::new(FIXTURE)))
}

fn snapshot() -> Arc<Snapshot> {
    store().load(&CancellationToken::new()).unwrap()
}

fn rows(json: &str) -> Vec<Report> {
    serde_json::from_str(json).unwrap()
}

// --- Worked examples ---

#[test]
fn max_intensity_by_country() {
    let data = rows(
        r#"[
            {"country": "USA", "intensity": 3},
            {"country": "USA", "intensity": 7},
            {"country": "UK", "intensity": 2}
        ]"#,
    );
    let result = query(
        &data,
        &QueryRequest::new().aggregate(Aggregation::Dedup {
            key: Field::Country,
            value: Field::Intensity,
            policy: DuplicatePolicy::Max,
        }),
    );
    assert_eq!(result.series[0].labels(), vec!["USA", "UK"]);
    assert_eq!(result.series[0].values(), vec![7.0, 2.0]);
}

#[test]
fn count_by_sector_keeps_first_occurrence_order() {
    let data = rows(r#"[{"sector": "Energy"}, {"sector": "Retail"}, {"sector": "Energy"}]"#);
    let result = query(
        &data,
        &QueryRequest::new().aggregate(Aggregation::Count { key: Field::Sector }),
    );
    assert_eq!(result.series[0].labels(), vec!["Energy", "Retail"]);
    assert_eq!(result.series[0].values(), vec![2.0, 1.0]);
}

#[test]
fn options_come_from_unfiltered_rows() {
    let data = rows(
        r#"[
            {"region": "Asia", "country": "India"},
            {"region": "Europe", "country": "UK"},
            {"region": "Asia", "country": "Japan"}
        ]"#,
    );
    let request = QueryRequest::new()
        .with_filters(FilterSpec::new().with(Field::Region, "Asia").unwrap())
        .aggregate(Aggregation::Count { key: Field::Country });
    let result = query(&data, &request);

    assert_eq!(result.options.get(Field::Region).unwrap(), &["Asia", "Europe"]);
    assert_eq!(result.series[0].labels(), vec!["India", "Japan"]);
}

// --- Fixture dataset ---

#[test]
fn fixture_loads_every_row() {
    let snapshot = snapshot();
    assert_eq!(snapshot.len(), 12);
    // Empty strings and unknown keys do not break parsing
    assert_eq!(snapshot.reports()[1].end_year, None);
    assert_eq!(snapshot.reports()[2].intensity, None);
    assert_eq!(snapshot.reports()[8].country, None);
}

#[test]
fn country_reports_keeps_frequent_countries() {
    let snapshot = snapshot();
    let result = panels::find("country-reports")
        .unwrap()
        .evaluate(snapshot.reports(), &FilterSpec::new());
    assert_eq!(result.series[0].labels(), vec!["India"]);
    assert_eq!(result.series[0].values(), vec![5.0]);
}

#[test]
fn likelihood_relevance_takes_first_row_per_country() {
    let snapshot = snapshot();
    let result = panels::find("likelihood-relevance")
        .unwrap()
        .evaluate(snapshot.reports(), &FilterSpec::new());

    let likelihood = &result.series[0];
    let relevance = &result.series[1];
    assert_eq!(likelihood.name, "Likelihood");
    assert_eq!(likelihood.get("India"), Some(3.0));
    assert_eq!(relevance.get("India"), Some(2.0));
    // Brazil has no likelihood but still has relevance
    assert_eq!(likelihood.get("Brazil"), None);
    assert_eq!(relevance.get("Brazil"), Some(2.0));
}

#[test]
fn topic_intensity_drops_zero_and_missing() {
    let snapshot = snapshot();
    let result = panels::find("topic-intensity")
        .unwrap()
        .evaluate(snapshot.reports(), &FilterSpec::new());
    // 12 rows: one intensity missing, one zero
    assert_eq!(result.matched_rows, 11);
    assert_eq!(result.series[0].len(), 10);
    assert!(result.series[0].values().iter().all(|v| *v != 0.0));
}

#[test]
fn gauges_average_present_values() {
    let snapshot = snapshot();
    let result = panels::find("gauges")
        .unwrap()
        .evaluate(snapshot.reports(), &FilterSpec::new());

    // Intensities present: 6 4 10 0 8 2 12 4 3 1 5 -> 55 / 11
    let intensity = result.series[0].get("intensity").unwrap();
    assert!((intensity - 5.0).abs() < 1e-9);
}

#[test]
fn city_filter_only_reaches_intensity_panel() {
    let snapshot = snapshot();
    let selections = FilterSpec::new().with(Field::City, "Houston").unwrap();

    let intensity = panels::find("intensity-by-country")
        .unwrap()
        .evaluate(snapshot.reports(), &selections);
    assert_eq!(intensity.series[0].labels(), vec!["United States of America"]);

    let country = panels::find("country")
        .unwrap()
        .evaluate(snapshot.reports(), &selections);
    assert_eq!(country.matched_rows, 12);
}

#[test]
fn dashboard_from_fixture() {
    let snapshot = snapshot();
    let selections = FilterSpec::new().with(Field::Region, "Asia").unwrap();
    let board = compute(&snapshot, &select_panels(&[]).unwrap(), &selections);

    assert_eq!(board.stats.panels, 14);
    assert_eq!(board.stats.total_rows, 12);
    assert_eq!(board.stats.fingerprint, snapshot.fingerprint);

    let sectors = board.panels.iter().find(|p| p.id == "intensity-by-sector").unwrap();
    assert_eq!(sectors.result.matched_rows, 6);
    // Energy in Asia: 6, 4, 0, 5
    assert_eq!(sectors.result.series[0].get("Energy"), Some(3.75));
}

#[test]
fn sessions_share_snapshot_and_recompute_locally() {
    let store = store();
    let mut country = PanelSession::new(panels::find("country").unwrap(), Arc::clone(&store));
    let mut year = PanelSession::new(panels::find("year").unwrap(), Arc::clone(&store));

    country.load().unwrap();
    year.load().unwrap();
    assert_eq!(store.fetch_count(), 1);

    country.set_filter(Field::Region, "Asia").unwrap();
    let result = country.result().unwrap();
    assert_eq!(result.series[0].labels(), vec!["India", "China"]);
    assert_eq!(store.fetch_count(), 1);

    year.refresh().unwrap();
    assert!(matches!(year.state(), PanelState::Ready(_)));
    assert_eq!(store.fetch_count(), 2);
}
