//! Where the dataset comes from

use super::http::HttpSource;
use crate::FetchError;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Supplies the raw JSON body of the full dataset
pub trait ReportSource: Send + Sync {
    /// Human-readable origin (URL or path)
    fn describe(&self) -> String;

    fn fetch_raw(&self) -> Result<String, FetchError>;
}

/// Local JSON file
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch_raw(&self) -> Result<String, FetchError> {
        Ok(fs::read_to_string(&self.path)?)
    }
}

/// In-memory body, for embedding and tests
pub struct MemorySource {
    label: String,
    body: String,
}

impl MemorySource {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            label: "memory".to_string(),
            body: body.into(),
        }
    }

    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

impl ReportSource for MemorySource {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn fetch_raw(&self) -> Result<String, FetchError> {
        Ok(self.body.clone())
    }
}

pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Pick a source for a CLI/config location: URLs go over HTTP, anything else is a file path
pub fn source_for(location: &str, timeout: Duration) -> Box<dyn ReportSource> {
    if is_remote(location) {
        Box::new(HttpSource::new(location).with_timeout(timeout))
    } else {
        Box::new(FileSource::new(location))
    }
}
