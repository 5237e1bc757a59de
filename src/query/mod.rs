//! The filter-and-aggregate pipeline
//!
//! [`query`] is the single entry point: it derives option lists from the full
//! row set, applies the filters, drops rows missing required fields and
//! evaluates each series. It holds no state, so identical inputs always give
//! identical results.

pub mod aggregate;
pub mod filter;
pub mod options;

pub use aggregate::{
    average_by_key, count_by_key, dedup_by_key, max_by_key, mean, per_row, sum_by_key,
    Aggregation, DuplicatePolicy, SeriesSpec, ValueBound,
};
pub use filter::{apply_filters, FilterSpec};
pub use options::{extract_options, OptionSet};

use crate::{Field, Report, Series};
use serde::Serialize;

/// Everything one chart needs to be recomputed
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub filters: FilterSpec,
    /// Fields whose option lists are returned
    pub option_fields: Vec<Field>,
    /// Rows lacking any of these fields are dropped before aggregation
    pub required: Vec<Field>,
    pub series: Vec<SeriesSpec>,
}

impl QueryRequest {
    pub fn new() -> Self {
        Self {
            filters: FilterSpec::new(),
            option_fields: Field::FILTER_FIELDS.to_vec(),
            required: Vec::new(),
            series: Vec::new(),
        }
    }

    pub fn with_filters(mut self, filters: FilterSpec) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_option_fields(mut self, fields: &[Field]) -> Self {
        self.option_fields = fields.to_vec();
        self
    }

    pub fn require(mut self, field: Field) -> Self {
        if !self.required.contains(&field) {
            self.required.push(field);
        }
        self
    }

    pub fn with_series(mut self, spec: SeriesSpec) -> Self {
        self.series.push(spec);
        self
    }

    /// Shorthand for a series with its default label
    pub fn aggregate(self, aggregation: Aggregation) -> Self {
        self.with_series(SeriesSpec::new(aggregation))
    }
}

impl Default for QueryRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Options plus series for one chart
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    /// Option lists computed from the unfiltered rows
    pub options: OptionSet,
    pub series: Vec<Series>,
    /// Rows left after filters and required-field checks
    pub matched_rows: usize,
    pub total_rows: usize,
}

impl QueryResult {
    /// The filters removed every row
    pub fn is_empty(&self) -> bool {
        self.matched_rows == 0
    }
}

/// Run one request against the full row set
pub fn query(rows: &[Report], request: &QueryRequest) -> QueryResult {
    let options = extract_options(rows, &request.option_fields);

    let matched: Vec<&Report> = apply_filters(rows, &request.filters)
        .into_iter()
        .filter(|r| request.required.iter().all(|f| r.has(*f)))
        .collect();

    let series = request
        .series
        .iter()
        .map(|spec| spec.evaluate(matched.iter().copied()))
        .collect();

    QueryResult {
        options,
        series,
        matched_rows: matched.len(),
        total_rows: rows.len(),
    }
}
