//! Equality filters over report fields

use crate::{Field, QueryError, Report};
use serde::Serialize;
use std::collections::BTreeMap;

/// User-selected equality constraints, one value per field.
///
/// A field without a selection is not filtered on. Setting an empty value
/// removes the constraint rather than matching empty cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FilterSpec {
    constraints: BTreeMap<Field, String>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a value for a field. An empty value clears the field.
    pub fn set(&mut self, field: Field, value: impl Into<String>) -> Result<(), QueryError> {
        if !field.is_filterable() {
            return Err(QueryError::NotFilterable(field.to_string()));
        }
        let value = value.into();
        if value.is_empty() {
            self.constraints.remove(&field);
        } else {
            self.constraints.insert(field, value);
        }
        Ok(())
    }

    /// Builder form of [`FilterSpec::set`]
    pub fn with(mut self, field: Field, value: impl Into<String>) -> Result<Self, QueryError> {
        self.set(field, value)?;
        Ok(self)
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.constraints.get(&field).map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.constraints.iter().map(|(f, v)| (*f, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Keep only constraints on the given fields (panels ignore fields they don't expose)
    pub fn restricted_to(&self, fields: &[Field]) -> FilterSpec {
        FilterSpec {
            constraints: self
                .constraints
                .iter()
                .filter(|(f, _)| fields.contains(f))
                .map(|(f, v)| (*f, v.clone()))
                .collect(),
        }
    }

    /// Layer another spec on top of this one; its selections win
    pub fn overlay(&mut self, other: &FilterSpec) {
        for (field, value) in &other.constraints {
            self.constraints.insert(*field, value.clone());
        }
    }

    /// Whether a row satisfies every constraint
    pub fn matches(&self, report: &Report) -> bool {
        self.constraints
            .iter()
            .all(|(field, value)| report.text(*field) == Some(value.as_str()))
    }

    /// Parse `field=value`. An empty value (`region=`) is allowed and clears the field.
    pub fn parse_assignment(input: &str) -> Result<(Field, String), QueryError> {
        let (name, value) = input
            .split_once('=')
            .ok_or_else(|| QueryError::InvalidFilter(input.to_string()))?;
        let field: Field = name.parse()?;
        if !field.is_filterable() {
            return Err(QueryError::NotFilterable(field.to_string()));
        }
        Ok((field, value.to_string()))
    }

    /// Build a spec from `(name, value)` pairs such as config file selections
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut spec = FilterSpec::new();
        for (name, value) in pairs {
            spec.set(name.parse()?, value)?;
        }
        Ok(spec)
    }
}

/// Rows satisfying every constraint of the spec, in input order.
///
/// An empty spec returns every row.
pub fn apply_filters<'a, I>(rows: I, spec: &FilterSpec) -> Vec<&'a Report>
where
    I: IntoIterator<Item = &'a Report>,
{
    rows.into_iter().filter(|r| spec.matches(r)).collect()
}
