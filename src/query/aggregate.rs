//! Aggregation policies: reduce a row view into a labelled series
//!
//! Every policy skips rows missing the grouping key or the value field and
//! never fails; empty input yields an empty series. Grouped output keeps the
//! first-occurrence order of its keys.

use crate::{Field, QueryError, Report, Series, SeriesPoint};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which row wins when several rows share a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Greatest value; ties keep the first encountered
    Max,
    /// First row carrying the key. If that row lacks the value the key gets
    /// no point, so values paired across series always come from one row.
    First,
    /// Last row carrying the key, with the same gap rule as `First`
    Last,
}

impl std::fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicatePolicy::Max => write!(f, "max"),
            DuplicatePolicy::First => write!(f, "first"),
            DuplicatePolicy::Last => write!(f, "last"),
        }
    }
}

/// Reduction applied to the filtered rows
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Aggregation {
    /// Occurrences per key
    Count { key: Field },
    /// Sum of `value` per key
    Sum { key: Field, value: Field },
    /// Arithmetic mean of `value` per key
    Average { key: Field, value: Field },
    /// One value per key, chosen by a duplicate policy
    Dedup {
        key: Field,
        value: Field,
        policy: DuplicatePolicy,
    },
    /// One point per row, labelled by `label` (no grouping)
    PerRow { label: Field, value: Field },
    /// Overall mean of `value` as a single point
    Mean { value: Field },
}

impl Aggregation {
    pub fn apply<'a, I>(&self, rows: I) -> Series
    where
        I: IntoIterator<Item = &'a Report>,
    {
        match *self {
            Aggregation::Count { key } => count_by_key(rows, key),
            Aggregation::Sum { key, value } => sum_by_key(rows, key, value),
            Aggregation::Average { key, value } => average_by_key(rows, key, value),
            Aggregation::Dedup { key, value, policy } => dedup_by_key(rows, key, value, policy),
            Aggregation::PerRow { label, value } => per_row(rows, label, value),
            Aggregation::Mean { value } => mean(rows, value),
        }
    }

    /// Default dataset label, e.g. "Average Intensity by Sector"
    pub fn default_label(&self) -> String {
        match *self {
            Aggregation::Count { key } => format!("Reports by {}", key.title()),
            Aggregation::Sum { key, value } => format!("Total {} by {}", value.title(), key.title()),
            Aggregation::Average { key, value } => {
                format!("Average {} by {}", value.title(), key.title())
            }
            Aggregation::Dedup {
                key,
                value,
                policy: DuplicatePolicy::Max,
            } => format!("Max {} by {}", value.title(), key.title()),
            Aggregation::Dedup { key, value, .. } => format!("{} by {}", value.title(), key.title()),
            Aggregation::PerRow { label, value } => format!("{} by {}", value.title(), label.title()),
            Aggregation::Mean { value } => format!("Mean {}", value.title()),
        }
    }
}

impl std::str::FromStr for Aggregation {
    type Err = QueryError;

    /// Compact syntax: `count:country`, `sum:region:relevance`, `avg:sector:intensity`,
    /// `max|first|last:country:intensity`, `rows:topic:likelihood`, `mean:intensity`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| QueryError::InvalidAggregation(s.to_string(), reason.to_string());
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();

        let numeric = |name: &str| -> Result<Field, QueryError> {
            let field: Field = name.parse()?;
            if field.is_numeric() {
                Ok(field)
            } else {
                Err(QueryError::NotNumeric(field.to_string()))
            }
        };

        match parts.as_slice() {
            ["count", key] => Ok(Aggregation::Count { key: key.parse()? }),
            ["mean", value] => Ok(Aggregation::Mean {
                value: numeric(*value)?,
            }),
            [op, key, value] => {
                let key: Field = key.parse()?;
                let value = numeric(*value)?;
                match *op {
                    "sum" => Ok(Aggregation::Sum { key, value }),
                    "avg" | "average" => Ok(Aggregation::Average { key, value }),
                    "max" => Ok(Aggregation::Dedup {
                        key,
                        value,
                        policy: DuplicatePolicy::Max,
                    }),
                    "first" => Ok(Aggregation::Dedup {
                        key,
                        value,
                        policy: DuplicatePolicy::First,
                    }),
                    "last" => Ok(Aggregation::Dedup {
                        key,
                        value,
                        policy: DuplicatePolicy::Last,
                    }),
                    "rows" => Ok(Aggregation::PerRow { label: key, value }),
                    _ => Err(invalid("unknown operation")),
                }
            }
            _ => Err(invalid("expected op:key[:value]")),
        }
    }
}

/// Post-aggregation bound on point values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueBound {
    /// Keep points with value >= n
    AtLeast(f64),
    /// Drop points whose value is exactly zero
    NonZero,
}

impl ValueBound {
    pub fn admits(&self, value: f64) -> bool {
        match *self {
            ValueBound::AtLeast(min) => value >= min,
            ValueBound::NonZero => value != 0.0,
        }
    }
}

/// An aggregation plus its dataset label and optional bound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSpec {
    pub label: String,
    pub aggregation: Aggregation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound: Option<ValueBound>,
}

impl SeriesSpec {
    pub fn new(aggregation: Aggregation) -> Self {
        Self {
            label: aggregation.default_label(),
            aggregation,
            bound: None,
        }
    }

    pub fn labelled(label: impl Into<String>, aggregation: Aggregation) -> Self {
        Self {
            label: label.into(),
            aggregation,
            bound: None,
        }
    }

    pub fn bounded(mut self, bound: ValueBound) -> Self {
        self.bound = Some(bound);
        self
    }

    pub fn evaluate<'a, I>(&self, rows: I) -> Series
    where
        I: IntoIterator<Item = &'a Report>,
    {
        let mut series = self.aggregation.apply(rows);
        series.name = self.label.clone();
        if let Some(bound) = self.bound {
            series.points.retain(|p| bound.admits(p.value));
        }
        series
    }
}

/// Insertion-ordered accumulator keyed by label
struct Groups<T> {
    index: HashMap<String, usize>,
    entries: Vec<(String, T)>,
}

impl<T> Groups<T> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        let i = *self.index.get(key)?;
        Some(&mut self.entries[i].1)
    }

    fn insert(&mut self, key: &str, value: T) {
        self.index.insert(key.to_string(), self.entries.len());
        self.entries.push((key.to_string(), value));
    }

    /// Groups whose accumulator maps to None are left out
    fn into_series(self, name: String, key: Field, to_value: impl Fn(T) -> Option<f64>) -> Series {
        let points = self
            .entries
            .into_iter()
            .filter_map(|(label, acc)| Some(SeriesPoint::new(label, to_value(acc)?)))
            .collect();
        Series::with_points(name, points).keyed_by(key)
    }
}

/// Rows carrying both the key and the numeric value
fn keyed_values<'a, I>(rows: I, key: Field, value: Field) -> impl Iterator<Item = (std::borrow::Cow<'a, str>, f64)>
where
    I: IntoIterator<Item = &'a Report>,
{
    rows.into_iter()
        .filter_map(move |r| Some((r.key(key)?, r.number(value)?)))
}

pub fn count_by_key<'a, I>(rows: I, key: Field) -> Series
where
    I: IntoIterator<Item = &'a Report>,
{
    let mut groups: Groups<usize> = Groups::new();
    for report in rows {
        let Some(label) = report.key(key) else {
            continue;
        };
        match groups.get_mut(&label) {
            Some(count) => *count += 1,
            None => groups.insert(&label, 1),
        }
    }
    groups.into_series(Aggregation::Count { key }.default_label(), key, |c| Some(c as f64))
}

pub fn sum_by_key<'a, I>(rows: I, key: Field, value: Field) -> Series
where
    I: IntoIterator<Item = &'a Report>,
{
    let mut groups: Groups<f64> = Groups::new();
    for (label, v) in keyed_values(rows, key, value) {
        match groups.get_mut(&label) {
            Some(sum) => *sum += v,
            None => groups.insert(&label, v),
        }
    }
    groups.into_series(Aggregation::Sum { key, value }.default_label(), key, Some)
}

pub fn average_by_key<'a, I>(rows: I, key: Field, value: Field) -> Series
where
    I: IntoIterator<Item = &'a Report>,
{
    // A group exists only once a row has been added, so count >= 1
    let mut groups: Groups<(f64, usize)> = Groups::new();
    for (label, v) in keyed_values(rows, key, value) {
        match groups.get_mut(&label) {
            Some((sum, count)) => {
                *sum += v;
                *count += 1;
            }
            None => groups.insert(&label, (v, 1)),
        }
    }
    groups.into_series(
        Aggregation::Average { key, value }.default_label(),
        key,
        |(sum, count)| Some(sum / count as f64),
    )
}

/// Greatest value per key; a later row replaces the kept one only if strictly greater
pub fn max_by_key<'a, I>(rows: I, key: Field, value: Field) -> Series
where
    I: IntoIterator<Item = &'a Report>,
{
    dedup_by_key(rows, key, value, DuplicatePolicy::Max)
}

pub fn dedup_by_key<'a, I>(rows: I, key: Field, value: Field, policy: DuplicatePolicy) -> Series
where
    I: IntoIterator<Item = &'a Report>,
{
    let name = Aggregation::Dedup { key, value, policy }.default_label();
    let mut groups: Groups<Option<f64>> = Groups::new();

    if policy == DuplicatePolicy::Max {
        for (label, v) in keyed_values(rows, key, value) {
            match groups.get_mut(&label) {
                Some(Some(kept)) if v > *kept => *kept = v,
                Some(_) => {}
                None => groups.insert(&label, Some(v)),
            }
        }
    } else {
        for report in rows {
            let Some(label) = report.key(key) else {
                continue;
            };
            let v = report.number(value);
            match groups.get_mut(&label) {
                Some(kept) if policy == DuplicatePolicy::Last => *kept = v,
                Some(_) => {}
                None => groups.insert(&label, v),
            }
        }
    }

    groups.into_series(name, key, |v| v)
}

/// One point per row; labels may repeat
pub fn per_row<'a, I>(rows: I, label: Field, value: Field) -> Series
where
    I: IntoIterator<Item = &'a Report>,
{
    let points = keyed_values(rows, label, value)
        .map(|(l, v)| SeriesPoint::new(l.into_owned(), v))
        .collect();
    Series::with_points(Aggregation::PerRow { label, value }.default_label(), points).keyed_by(label)
}

/// Mean of `value` over every row carrying it, as a single point labelled by the field
pub fn mean<'a, I>(rows: I, value: Field) -> Series
where
    I: IntoIterator<Item = &'a Report>,
{
    let (sum, count) = rows
        .into_iter()
        .filter_map(|r| r.number(value))
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));

    let mut series = Series::new(Aggregation::Mean { value }.default_label());
    if count > 0 {
        series
            .points
            .push(SeriesPoint::new(value.name(), sum / count as f64));
    }
    series
}


#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    fn arbitrary_rows() -> impl Strategy<Value = Vec<Report>> {
        prop::collection::vec(
            (
                prop::option::of(prop::sample::select(vec!["USA", "UK", "India", "Brazil"])),
                prop::option::of(0u8..=10),
            ),
            0..80,
        )
        .prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(country, intensity)| Report {
                    country: country.map(str::to_string),
                    intensity: intensity.map(f64::from),
                    ..Report::default()
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn count_partitions_rows(rows in arbitrary_rows()) {
            let series = count_by_key(&rows, Field::Country);
            let keyed = rows.iter().filter(|r| r.country.is_some()).count();
            prop_assert_eq!(series.total() as usize, keyed);
        }

        #[test]
        fn average_matches_group_mean(rows in arbitrary_rows()) {
            let series = average_by_key(&rows, Field::Country, Field::Intensity);
            for point in &series.points {
                let group: Vec<f64> = rows
                    .iter()
                    .filter(|r| r.country.as_deref() == Some(point.label.as_str()))
                    .filter_map(|r| r.intensity)
                    .collect();
                prop_assert!(!group.is_empty());
                let expected = group.iter().sum::<f64>() / group.len() as f64;
                prop_assert!(!point.value.is_nan());
                prop_assert!((point.value - expected).abs() < 1e-9);
            }
        }

        #[test]
        fn max_is_group_maximum(rows in arbitrary_rows()) {
            let series = max_by_key(&rows, Field::Country, Field::Intensity);
            for point in &series.points {
                let max = rows
                    .iter()
                    .filter(|r| r.country.as_deref() == Some(point.label.as_str()))
                    .filter_map(|r| r.intensity)
                    .fold(f64::MIN, f64::max);
                prop_assert_eq!(point.value, max);
            }
        }

        #[test]
        fn grouped_labels_are_unique(rows in arbitrary_rows()) {
            let series = sum_by_key(&rows, Field::Country, Field::Intensity);
            let mut labels = series.labels();
            let before = labels.len();
            labels.sort();
            labels.dedup();
            prop_assert_eq!(labels.len(), before);
        }
    }
}
