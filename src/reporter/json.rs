//! JSON reporter for machine-readable output
//!
//! Chart data is emitted in the shape chart widgets consume:
//! `{ "labels": [...], "datasets": [{ "label": ..., "data": [...] }] }`.
//! A dataset grouped on a different field than its siblings also carries
//! its own `labels`.

use crate::dashboard::{Dashboard, DashboardStats};
use crate::panels::{ChartKind, PanelDefinition};
use crate::query::{OptionSet, QueryResult};
use crate::Series;
use serde::Serialize;

/// One dataset of a chart payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub label: String,
    /// Present when this dataset is not keyed like the others and carries its own labels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    /// `null` where this series has no point for the label
    pub data: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPayload {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

impl ChartPayload {
    /// Series grouped by the same field share one label axis (the merged labels,
    /// `null` for gaps). Otherwise every dataset keeps its own labels and the
    /// payload labels are just their union.
    pub fn from_series(series: &[Series]) -> Self {
        let labels = merged_labels(series);
        let shared_key = series
            .first()
            .and_then(|s| s.key)
            .filter(|key| series.iter().all(|s| s.key == Some(*key)));

        let datasets = series
            .iter()
            .map(|s| match shared_key {
                Some(_) => Dataset {
                    label: s.name.clone(),
                    labels: None,
                    data: aligned(s, &labels),
                },
                None if series.len() == 1 => Dataset {
                    label: s.name.clone(),
                    labels: None,
                    data: s.points.iter().map(|p| Some(p.value)).collect(),
                },
                None => Dataset {
                    label: s.name.clone(),
                    labels: Some(s.points.iter().map(|p| p.label.clone()).collect()),
                    data: s.points.iter().map(|p| Some(p.value)).collect(),
                },
            })
            .collect();

        Self { labels, datasets }
    }
}

/// Values of `series` at each label
fn aligned(series: &Series, labels: &[String]) -> Vec<Option<f64>> {
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| match series.points.get(i) {
            // Same position, same label: per-row series keep repeated labels apart
            Some(point) if &point.label == label => Some(point.value),
            _ => series.get(label),
        })
        .collect()
}

/// First series' labels, then labels only later series have. A new label is
/// placed before the next label of its series already present, so relative
/// order within each series survives.
fn merged_labels(series: &[Series]) -> Vec<String> {
    let mut merged: Vec<String> = series
        .first()
        .map(|s| s.points.iter().map(|p| p.label.clone()).collect())
        .unwrap_or_default();

    for s in series.iter().skip(1) {
        let mut pending: Vec<String> = Vec::new();
        for point in &s.points {
            match merged.iter().position(|l| *l == point.label) {
                Some(at) => {
                    for (offset, label) in pending.drain(..).enumerate() {
                        merged.insert(at + offset, label);
                    }
                }
                None if !pending.contains(&point.label) => pending.push(point.label.clone()),
                None => {}
            }
        }
        merged.extend(pending);
    }
    merged
}

/// Reporter for JSON output
pub struct JsonReporter {
    /// Whether to pretty-print JSON
    pretty: bool,
}

impl JsonReporter {
    /// Create a new JSON reporter
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Enable pretty-printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// One chart: payload plus options and row counts
    pub fn report(&self, title: &str, kind: Option<ChartKind>, result: &QueryResult) -> String {
        self.to_json(&JsonChart::new(None, title, kind, result), "{}")
    }

    pub fn report_dashboard(&self, dashboard: &Dashboard) -> String {
        let output = JsonDashboard {
            summary: &dashboard.stats,
            panels: dashboard
                .panels
                .iter()
                .map(|p| JsonChart::new(Some(p.id.as_str()), &p.title, Some(p.chart), &p.result))
                .collect(),
        };
        self.to_json(&output, "{}")
    }

    pub fn report_options(&self, options: &OptionSet) -> String {
        self.to_json(options, "{}")
    }

    pub fn report_catalog(&self, panels: &[PanelDefinition]) -> String {
        self.to_json(panels, "[]")
    }

    fn to_json<T: Serialize + ?Sized>(&self, value: &T, fallback: &str) -> String {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        json.unwrap_or_else(|_| fallback.to_string())
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonChart<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<ChartKind>,
    chart: ChartPayload,
    options: &'a OptionSet,
    matched_rows: usize,
    total_rows: usize,
}

impl<'a> JsonChart<'a> {
    fn new(
        id: Option<&'a str>,
        title: &'a str,
        kind: Option<ChartKind>,
        result: &'a QueryResult,
    ) -> Self {
        Self {
            id,
            title,
            kind,
            chart: ChartPayload::from_series(&result.series),
            options: &result.options,
            matched_rows: result.matched_rows,
            total_rows: result.total_rows,
        }
    }
}

#[derive(Serialize)]
struct JsonDashboard<'a> {
    summary: &'a DashboardStats,
    panels: Vec<JsonChart<'a>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panels::find;
    use crate::query::{query, Aggregation, DuplicatePolicy, FilterSpec, QueryRequest};
    use crate::{Field, Report, SeriesPoint};

    fn series(name: &str, points: &[(&str, f64)]) -> Series {
        Series::with_points(
            name,
            points.iter().map(|(l, v)| SeriesPoint::new(*l, *v)).collect(),
        )
    }

    #[test]
    fn test_payload_single_series() {
        let payload = ChartPayload::from_series(&[series("Count", &[("Energy", 2.0), ("Retail", 1.0)])]);
        assert_eq!(payload.labels, vec!["Energy", "Retail"]);
        assert_eq!(payload.datasets[0].label, "Count");
        assert_eq!(payload.datasets[0].data, vec![Some(2.0), Some(1.0)]);
    }

    #[test]
    fn test_payload_aligns_later_series() {
        let payload = ChartPayload::from_series(&[
            series("Likelihood", &[("USA", 3.0), ("UK", 2.0)]).keyed_by(Field::Country),
            series("Relevance", &[("UK", 5.0)]).keyed_by(Field::Country),
        ]);
        assert_eq!(payload.labels, vec!["USA", "UK"]);
        assert_eq!(payload.datasets[1].data, vec![None, Some(5.0)]);
    }

    #[test]
    fn test_payload_keeps_repeated_labels_positional() {
        let payload = ChartPayload::from_series(&[
            series("Intensity", &[("Asia", 1.0), ("Asia", 4.0)]).keyed_by(Field::Region),
            series("Likelihood", &[("Asia", 2.0), ("Asia", 3.0)]).keyed_by(Field::Region),
        ]);
        assert_eq!(payload.datasets[1].data, vec![Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_payload_merges_labels_of_same_key() {
        let payload = ChartPayload::from_series(&[
            series("Likelihood", &[("UK", 2.0)]).keyed_by(Field::Country),
            series("Relevance", &[("USA", 4.0), ("UK", 5.0), ("Brazil", 1.0)]).keyed_by(Field::Country),
        ]);
        assert_eq!(payload.labels, vec!["USA", "UK", "Brazil"]);
        assert_eq!(payload.datasets[0].data, vec![None, Some(2.0), None]);
        assert_eq!(payload.datasets[1].data, vec![Some(4.0), Some(5.0), Some(1.0)]);
        assert!(payload.datasets.iter().all(|d| d.labels.is_none()));
    }

    #[test]
    fn test_gauges_payload_keeps_every_mean() {
        let rows = vec![
            Report {
                intensity: Some(4.0),
                relevance: Some(3.0),
                likelihood: Some(2.0),
                ..Report::default()
            },
            Report {
                intensity: Some(6.0),
                relevance: Some(3.0),
                likelihood: Some(3.0),
                ..Report::default()
            },
        ];
        let result = find("gauges").unwrap().evaluate(&rows, &FilterSpec::new());
        let payload = ChartPayload::from_series(&result.series);

        assert_eq!(payload.labels, vec!["intensity", "relevance", "likelihood"]);
        let values: Vec<Vec<Option<f64>>> = payload.datasets.iter().map(|d| d.data.clone()).collect();
        assert_eq!(values, vec![vec![Some(5.0)], vec![Some(3.0)], vec![Some(2.5)]]);
        assert_eq!(payload.datasets[1].labels, Some(vec!["relevance".to_string()]));
    }

    #[test]
    fn test_sunburst_payload_keeps_topics() {
        let rows = vec![
            Report {
                sector: Some("Energy".to_string()),
                topic: Some("oil".to_string()),
                ..Report::default()
            },
            Report {
                sector: Some("Retail".to_string()),
                topic: Some("gas".to_string()),
                ..Report::default()
            },
        ];
        let result = find("sunburst").unwrap().evaluate(&rows, &FilterSpec::new());
        let json = serde_json::to_value(ChartPayload::from_series(&result.series)).unwrap();

        assert_eq!(json["datasets"][0]["labels"], serde_json::json!(["Energy", "Retail"]));
        assert_eq!(json["datasets"][1]["labels"], serde_json::json!(["oil", "gas"]));
        assert_eq!(json["datasets"][1]["data"], serde_json::json!([1.0, 1.0]));
    }

    #[test]
    fn test_likelihood_relevance_payload_pairs_one_row() {
        let india_without_likelihood = Report {
            country: Some("India".to_string()),
            relevance: Some(2.0),
            ..Report::default()
        };
        let india = Report {
            country: Some("India".to_string()),
            likelihood: Some(4.0),
            relevance: Some(5.0),
            ..Report::default()
        };
        let brazil = Report {
            country: Some("Brazil".to_string()),
            relevance: Some(3.0),
            ..Report::default()
        };
        let rows = vec![india_without_likelihood, india, brazil];
        let result = find("likelihood-relevance")
            .unwrap()
            .evaluate(&rows, &FilterSpec::new());
        let payload = ChartPayload::from_series(&result.series);

        assert_eq!(payload.labels, vec!["India", "Brazil"]);
        // Both values come from the first India row, which has no likelihood
        assert_eq!(payload.datasets[0].data, vec![None, None]);
        assert_eq!(payload.datasets[1].data, vec![Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_payload_empty() {
        let payload = ChartPayload::from_series(&[]);
        assert!(payload.labels.is_empty());
        assert!(payload.datasets.is_empty());

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json["labels"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_report_shape() {
        let rows = vec![
            Report {
                country: Some("USA".to_string()),
                intensity: Some(3.0),
                ..Report::default()
            },
            Report {
                country: Some("USA".to_string()),
                intensity: Some(7.0),
                ..Report::default()
            },
        ];
        let result = query(
            &rows,
            &QueryRequest::new().aggregate(Aggregation::Dedup {
                key: Field::Country,
                value: Field::Intensity,
                policy: DuplicatePolicy::Max,
            }),
        );

        let json = JsonReporter::new().report("Intensity", Some(ChartKind::Area), &result);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["title"], "Intensity");
        assert_eq!(parsed["kind"], "area");
        assert_eq!(parsed["chart"]["labels"][0], "USA");
        assert_eq!(parsed["chart"]["datasets"][0]["data"][0], 7.0);
        assert_eq!(parsed["matchedRows"], 2);
        assert!(parsed.get("id").is_none());
        assert_eq!(parsed["options"]["country"][0], "USA");
    }

    #[test]
    fn test_pretty_output() {
        let json = JsonReporter::new().pretty().report_options(&OptionSet::default());
        assert_eq!(json, "{}");
        let json = JsonReporter::new()
            .pretty()
            .report_catalog(&crate::panels::catalog());
        assert!(json.contains('\n'), "pretty JSON should have newlines");
        assert!(json.contains("\"filterFields\""));
    }
}
