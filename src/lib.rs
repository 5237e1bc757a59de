//! Report Lens: filter-and-aggregate query engine for report datasets
//!
//! This library loads a flat list of reports (topic, sector, region, country,
//! intensity, likelihood, relevance, ...) and turns it into the label/value
//! series that chart widgets consume: option lists per field, equality
//! filtering, and grouped aggregation.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod panels;
pub mod query;
pub mod reporter;
pub mod store;
pub mod watcher;

pub use error::{FetchError, QueryError, TransitionError};

use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;

/// One row of the dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub end_year: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub start_year: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub pestle: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub likelihood: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
}

impl Report {
    /// Text value of a text field. Numeric fields always return None.
    pub fn text(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::EndYear => &self.end_year,
            Field::StartYear => &self.start_year,
            Field::Topic => &self.topic,
            Field::Sector => &self.sector,
            Field::Region => &self.region,
            Field::Pestle => &self.pestle,
            Field::Source => &self.source,
            Field::Country => &self.country,
            Field::City => &self.city,
            Field::Intensity | Field::Likelihood | Field::Relevance => return None,
        };
        value.as_deref()
    }

    /// Numeric value of a numeric field. Text fields always return None.
    pub fn number(&self, field: Field) -> Option<f64> {
        match field {
            Field::Intensity => self.intensity,
            Field::Likelihood => self.likelihood,
            Field::Relevance => self.relevance,
            _ => None,
        }
    }

    /// Value of any field rendered as a label (grouping key, option, filter operand)
    pub fn key(&self, field: Field) -> Option<Cow<'_, str>> {
        if field.is_numeric() {
            self.number(field).map(|n| Cow::Owned(n.to_string()))
        } else {
            self.text(field).map(Cow::Borrowed)
        }
    }

    /// Whether the field carries a value in this row
    pub fn has(&self, field: Field) -> bool {
        if field.is_numeric() {
            self.number(field).is_some()
        } else {
            self.text(field).is_some()
        }
    }
}

/// Empty strings and non-scalar values are treated as absent; numbers become text.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Accepts JSON numbers and numeric strings; anything else is absent.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let number = match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(number.filter(|n| n.is_finite()))
}

/// Report fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    EndYear,
    StartYear,
    Topic,
    Sector,
    Region,
    Pestle,
    Source,
    Country,
    City,
    Intensity,
    Likelihood,
    Relevance,
}

impl Field {
    pub const ALL: [Field; 12] = [
        Field::EndYear,
        Field::StartYear,
        Field::Topic,
        Field::Sector,
        Field::Region,
        Field::Pestle,
        Field::Source,
        Field::Country,
        Field::City,
        Field::Intensity,
        Field::Likelihood,
        Field::Relevance,
    ];

    /// Fields offered as filter dropdowns, in form order
    pub const FILTER_FIELDS: [Field; 8] = [
        Field::EndYear,
        Field::Topic,
        Field::Sector,
        Field::Region,
        Field::Pestle,
        Field::Source,
        Field::Country,
        Field::City,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::EndYear => "end_year",
            Field::StartYear => "start_year",
            Field::Topic => "topic",
            Field::Sector => "sector",
            Field::Region => "region",
            Field::Pestle => "pestle",
            Field::Source => "source",
            Field::Country => "country",
            Field::City => "city",
            Field::Intensity => "intensity",
            Field::Likelihood => "likelihood",
            Field::Relevance => "relevance",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Field::Intensity | Field::Likelihood | Field::Relevance)
    }

    /// Only text fields take equality filters
    pub fn is_filterable(self) -> bool {
        !self.is_numeric()
    }

    /// Human label for headers and series names
    pub fn title(self) -> &'static str {
        match self {
            Field::EndYear => "End Year",
            Field::StartYear => "Start Year",
            Field::Topic => "Topic",
            Field::Sector => "Sector",
            Field::Region => "Region",
            Field::Pestle => "PESTLE",
            Field::Source => "Source",
            Field::Country => "Country",
            Field::City => "City",
            Field::Intensity => "Intensity",
            Field::Likelihood => "Likelihood",
            Field::Relevance => "Relevance",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Field {
    type Err = QueryError;

    /// Accepts snake_case names plus the dashboard form keys (`endYear`, `topics`, `pest`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "end_year" | "endYear" => Ok(Field::EndYear),
            "start_year" | "startYear" => Ok(Field::StartYear),
            "topic" | "topics" => Ok(Field::Topic),
            "sector" => Ok(Field::Sector),
            "region" => Ok(Field::Region),
            "pestle" | "pest" => Ok(Field::Pestle),
            "source" => Ok(Field::Source),
            "country" => Ok(Field::Country),
            "city" => Ok(Field::City),
            "intensity" => Ok(Field::Intensity),
            "likelihood" => Ok(Field::Likelihood),
            "relevance" => Ok(Field::Relevance),
            "swot" => Err(QueryError::RemovedField("swot".to_string())),
            other => Err(QueryError::UnknownField(other.to_string())),
        }
    }
}

/// A single (label, value) point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// Ordered (label, value) pairs feeding one chart dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Dataset label (e.g. "Intensity by Country")
    pub name: String,
    pub points: Vec<SeriesPoint>,
    /// Field the labels are values of; None for single-point summaries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Field>,
}

impl Series {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_points(name, Vec::new())
    }

    pub fn with_points(name: impl Into<String>, points: Vec<SeriesPoint>) -> Self {
        Self {
            name: name.into(),
            points,
            key: None,
        }
    }

    pub fn keyed_by(mut self, field: Field) -> Self {
        self.key = Some(field);
        self
    }

    pub fn labels(&self) -> Vec<&str> {
        self.points.iter().map(|p| p.label.as_str()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Value for a label (first match when labels repeat)
    pub fn get(&self, label: &str) -> Option<f64> {
        self.points.iter().find(|p| p.label == label).map(|p| p.value)
    }

    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.value).sum()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
