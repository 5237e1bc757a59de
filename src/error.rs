//! Error types for loading and querying reports

use thiserror::Error;

/// Failure to obtain the dataset. Displayed to the user verbatim.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request to {url} failed with status {status}")]
    Status { status: u16, url: String },

    #[error("Malformed report data: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported source: {0}")]
    Unsupported(String),

    #[error("Fetch cancelled")]
    Cancelled,
}

/// Invalid query input (field names, filter and aggregation syntax, panel ids)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Field '{0}' was removed: it is never populated by the dataset")]
    RemovedField(String),

    #[error("Field '{0}' cannot be filtered on (numeric fields take no equality filter)")]
    NotFilterable(String),

    #[error("Field '{0}' is not numeric")]
    NotNumeric(String),

    #[error("Invalid filter '{0}': expected field=value")]
    InvalidFilter(String),

    #[error("Invalid aggregation '{0}': {1}")]
    InvalidAggregation(String, String),

    #[error("Unknown panel: {0}")]
    UnknownPanel(String),
}

/// A panel session was asked to do something its current state forbids
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransitionError {
    #[error("Cannot {action} a panel that is {state}")]
    Invalid {
        action: &'static str,
        state: &'static str,
    },

    #[error(transparent)]
    Query(#[from] QueryError),
}
