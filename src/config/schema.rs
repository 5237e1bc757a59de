//! Config schema and deserialization

use crate::query::FilterSpec;
use crate::QueryError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://visualisation-dashboard-server-final.vercel.app";
pub const DEFAULT_DATA_PATH: &str = "/api/data";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Root config structure for .reportlensrc.json
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Extend another config file (path relative to this config)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    /// Base URL of the report API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,

    /// Path of the dataset endpoint, appended to `apiBaseUrl`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_path: Option<String>,

    /// Full URL or local JSON file; takes precedence over `apiBaseUrl` + `dataPath`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Fetch timeout in seconds. Default: 30
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Default filter selections, field name -> value
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<String, String>,

    /// Enabled panel ids, in display order. Empty enables every panel.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub panels: Vec<String>,
}

impl Config {
    /// Starter config written by `init`
    pub fn starter(api_base_url: Option<&str>) -> Self {
        Self {
            api_base_url: Some(api_base_url.unwrap_or(DEFAULT_API_BASE_URL).to_string()),
            data_path: Some(DEFAULT_DATA_PATH.to_string()),
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            ..Self::default()
        }
    }

    /// Merge CLI overrides into config. CLI values take precedence.
    pub fn merge_with_cli(mut self, cli_source: Option<&str>, cli_timeout: Option<u64>) -> Self {
        if let Some(source) = cli_source {
            self.source = Some(source.to_string());
        }
        if cli_timeout.is_some() {
            self.timeout_secs = cli_timeout;
        }
        self
    }

    /// `apiBaseUrl` joined with `dataPath`
    pub fn endpoint_url(&self) -> String {
        let base = self
            .api_base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE_URL)
            .trim_end_matches('/');
        let path = self.data_path.as_deref().unwrap_or(DEFAULT_DATA_PATH);
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }

    /// Where the dataset is read from: explicit `source`, else the API endpoint
    pub fn data_location(&self) -> String {
        match &self.source {
            Some(source) if !source.is_empty() => source.clone(),
            _ => self.endpoint_url(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Configured default selections as a filter spec
    pub fn selections(&self) -> Result<FilterSpec, QueryError> {
        FilterSpec::from_pairs(self.filters.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// Merge another config into this one (for extends)
    pub fn merge_from(&mut self, base: Config) {
        // Base values are overridden by this config's values
        if self.extends.is_none() {
            self.extends = base.extends;
        }
        if self.api_base_url.is_none() {
            self.api_base_url = base.api_base_url;
        }
        if self.data_path.is_none() {
            self.data_path = base.data_path;
        }
        if self.source.is_none() {
            self.source = base.source;
        }
        if self.timeout_secs.is_none() {
            self.timeout_secs = base.timeout_secs;
        }

        for (field, value) in base.filters {
            self.filters.entry(field).or_insert(value);
        }

        if self.panels.is_empty() {
            self.panels = base.panels;
        }
    }
}
