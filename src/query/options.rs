//! Filter option extraction: distinct values per field

use crate::{Field, Report};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Selectable values per field, each list in first-occurrence order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OptionSet {
    fields: BTreeMap<Field, Vec<String>>,
}

impl OptionSet {
    /// Values for a field, if it was requested
    pub fn get(&self, field: Field) -> Option<&[String]> {
        self.fields.get(&field).map(|v| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &[String])> {
        self.fields.iter().map(|(f, v)| (*f, v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Distinct present values of each requested field, in order of first occurrence.
///
/// No normalization is applied: values are compared case- and
/// whitespace-sensitively. Rows where the field is absent contribute nothing.
pub fn extract_options<'a, I>(rows: I, fields: &[Field]) -> OptionSet
where
    I: IntoIterator<Item = &'a Report>,
{
    let mut seen: Vec<HashSet<String>> = vec![HashSet::new(); fields.len()];
    let mut lists: Vec<Vec<String>> = vec![Vec::new(); fields.len()];

    for report in rows {
        for (i, field) in fields.iter().enumerate() {
            if let Some(value) = report.key(*field) {
                if !seen[i].contains(value.as_ref()) {
                    seen[i].insert(value.to_string());
                    lists[i].push(value.into_owned());
                }
            }
        }
    }

    let mut set = OptionSet::default();
    for (field, values) in fields.iter().zip(lists) {
        set.fields.entry(*field).or_insert(values);
    }
    set
}
