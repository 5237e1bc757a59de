//! HTTP report source
//!
//! Requires the `http` feature (enabled by default):
//! ```toml
//! report-lens = { version = "0.3", features = ["http"] }
//! ```

use super::source::ReportSource;
use crate::FetchError;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches the whole dataset with a single GET
#[allow(dead_code)]
pub struct HttpSource {
    url: String,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    #[cfg(feature = "http")]
    fn get(&self) -> Result<String, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let response = client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        response
            .text()
            .map_err(|e| FetchError::Network(e.to_string()))
    }

    /// Built without the `http` feature
    #[cfg(not(feature = "http"))]
    fn get(&self) -> Result<String, FetchError> {
        Err(FetchError::Unsupported(
            "HTTP support not enabled. Rebuild with: cargo build --features http".to_string(),
        ))
    }
}

impl ReportSource for HttpSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn fetch_raw(&self) -> Result<String, FetchError> {
        self.get()
    }
}
