//! Preset chart panels
//!
//! Each panel fixes which filter fields it honours, which fields a row must
//! carry, and the series it draws. Panels only describe queries; evaluation
//! goes through [`crate::query::query`].

pub mod session;

pub use session::{PanelSession, PanelState, TransitionError};

use crate::query::{
    query, Aggregation, DuplicatePolicy, FilterSpec, QueryRequest, QueryResult, SeriesSpec,
    ValueBound,
};
use crate::{Field, QueryError, Report};
use serde::Serialize;

/// Chart widget a panel feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartKind {
    Pie,
    Doughnut,
    Line,
    Area,
    Bar,
    HorizontalBar,
    Bubble,
    PolarArea,
    Radar,
    Scatter,
    Treemap,
    Gauge,
    Sunburst,
}

impl std::fmt::Display for ChartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ChartKind::Pie => "pie",
            ChartKind::Doughnut => "doughnut",
            ChartKind::Line => "line",
            ChartKind::Area => "area",
            ChartKind::Bar => "bar",
            ChartKind::HorizontalBar => "horizontal-bar",
            ChartKind::Bubble => "bubble",
            ChartKind::PolarArea => "polar-area",
            ChartKind::Radar => "radar",
            ChartKind::Scatter => "scatter",
            ChartKind::Treemap => "treemap",
            ChartKind::Gauge => "gauge",
            ChartKind::Sunburst => "sunburst",
        };
        write!(f, "{}", name)
    }
}

/// The seven dropdowns most panels expose
const STANDARD_FILTERS: [Field; 7] = [
    Field::EndYear,
    Field::Topic,
    Field::Sector,
    Field::Region,
    Field::Pestle,
    Field::Source,
    Field::Country,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelDefinition {
    pub id: &'static str,
    pub title: &'static str,
    pub chart: ChartKind,
    /// Filter fields the panel honours; selections on other fields are ignored
    pub filter_fields: Vec<Field>,
    pub required: Vec<Field>,
    pub series: Vec<SeriesSpec>,
}

impl PanelDefinition {
    fn new(id: &'static str, title: &'static str, chart: ChartKind) -> Self {
        Self {
            id,
            title,
            chart,
            filter_fields: STANDARD_FILTERS.to_vec(),
            required: Vec::new(),
            series: Vec::new(),
        }
    }

    fn filters(mut self, fields: &[Field]) -> Self {
        self.filter_fields = fields.to_vec();
        self
    }

    fn require(mut self, fields: &[Field]) -> Self {
        self.required = fields.to_vec();
        self
    }

    fn series(mut self, spec: SeriesSpec) -> Self {
        self.series.push(spec);
        self
    }

    /// Panels without filter fields draw the whole dataset
    pub fn is_filterable(&self) -> bool {
        !self.filter_fields.is_empty()
    }

    /// Build the query for this panel, keeping only selections it honours
    pub fn request(&self, selections: &FilterSpec) -> QueryRequest {
        let mut request = QueryRequest::new()
            .with_filters(selections.restricted_to(&self.filter_fields))
            .with_option_fields(&self.filter_fields);
        for field in &self.required {
            request = request.require(*field);
        }
        for spec in &self.series {
            request = request.with_series(spec.clone());
        }
        request
    }

    pub fn evaluate(&self, rows: &[Report], selections: &FilterSpec) -> QueryResult {
        query(rows, &self.request(selections))
    }
}

/// Every preset panel, in dashboard order
pub fn catalog() -> Vec<PanelDefinition> {
    use Aggregation::*;
    use Field::*;

    let mut intensity_filters = STANDARD_FILTERS.to_vec();
    intensity_filters.push(City);

    vec![
        PanelDefinition::new("country", "Country Chart", ChartKind::Pie)
            .series(SeriesSpec::new(Count { key: Country })),
        PanelDefinition::new("topics", "Topics Chart", ChartKind::Doughnut)
            .filters(&[EndYear, Sector, Region, Pestle, Source, Country])
            .series(SeriesSpec::new(Count { key: Topic })),
        PanelDefinition::new("year", "Reports by Year", ChartKind::Line)
            .series(SeriesSpec::new(Count { key: StartYear })),
        PanelDefinition::new("region-bubble", "Region Data", ChartKind::Bubble)
            .require(&[Intensity, Likelihood, Relevance])
            .series(SeriesSpec::new(PerRow {
                label: Region,
                value: Intensity,
            }))
            .series(SeriesSpec::new(PerRow {
                label: Region,
                value: Likelihood,
            }))
            .series(SeriesSpec::new(PerRow {
                label: Region,
                value: Relevance,
            })),
        PanelDefinition::new("relevance-by-region", "Relevance by Region", ChartKind::Bar)
            .series(SeriesSpec::new(Sum {
                key: Region,
                value: Relevance,
            })),
        PanelDefinition::new("intensity-by-sector", "Intensity by Sector", ChartKind::PolarArea)
            .series(SeriesSpec::new(Average {
                key: Sector,
                value: Intensity,
            })),
        PanelDefinition::new("relevance-by-topic", "Relevance by Topic", ChartKind::Radar)
            .series(SeriesSpec::new(Average {
                key: Topic,
                value: Relevance,
            })),
        PanelDefinition::new("intensity-by-country", "Intensity by Country", ChartKind::Area)
            .filters(&intensity_filters)
            .series(SeriesSpec::new(Dedup {
                key: Country,
                value: Intensity,
                policy: DuplicatePolicy::Max,
            })),
        PanelDefinition::new("likelihood-relevance", "Likelihood and Relevance", ChartKind::Bar)
            .filters(&[Country, Sector, Region])
            .series(SeriesSpec::labelled(
                "Likelihood",
                Dedup {
                    key: Country,
                    value: Likelihood,
                    policy: DuplicatePolicy::First,
                },
            ))
            .series(SeriesSpec::labelled(
                "Relevance",
                Dedup {
                    key: Country,
                    value: Relevance,
                    policy: DuplicatePolicy::First,
                },
            )),
        PanelDefinition::new("likelihood-by-topic", "Likelihood by Topic", ChartKind::Scatter)
            .series(SeriesSpec::new(PerRow {
                label: Topic,
                value: Likelihood,
            })),
        PanelDefinition::new("topic-intensity", "Intensity by Topic", ChartKind::Treemap)
            .filters(&[])
            .require(&[Topic, Intensity])
            .series(
                SeriesSpec::new(PerRow {
                    label: Topic,
                    value: Intensity,
                })
                .bounded(ValueBound::NonZero),
            ),
        PanelDefinition::new(
            "country-reports",
            "Reports Distribution by Country",
            ChartKind::HorizontalBar,
        )
        .filters(&[])
        .series(SeriesSpec::new(Count { key: Country }).bounded(ValueBound::AtLeast(5.0))),
        PanelDefinition::new("gauges", "Averages", ChartKind::Gauge)
            .filters(&[])
            .series(SeriesSpec::new(Mean { value: Intensity }))
            .series(SeriesSpec::new(Mean { value: Relevance }))
            .series(SeriesSpec::new(Mean { value: Likelihood })),
        PanelDefinition::new("sunburst", "Sectors and Topics", ChartKind::Sunburst)
            .filters(&[])
            .series(SeriesSpec::new(Count { key: Sector }))
            .series(SeriesSpec::new(Count { key: Topic })),
    ]
}

/// Look up a panel by id
pub fn find(id: &str) -> Result<PanelDefinition, QueryError> {
    catalog()
        .into_iter()
        .find(|p| p.id == id)
        .ok_or_else(|| QueryError::UnknownPanel(id.to_string()))
}

pub fn panel_ids() -> Vec<&'static str> {
    catalog().iter().map(|p| p.id).collect()
}
