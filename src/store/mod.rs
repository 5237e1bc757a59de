//! Shared row store
//!
//! The dataset is fetched once and shared by every consumer through an
//! `Arc<Snapshot>`. It is replaced only by an explicit [`ReportStore::refresh`]
//! or [`ReportStore::invalidate`].

pub mod cancel;
pub mod http;
pub mod source;

pub use cancel::CancellationToken;
pub use http::HttpSource;
pub use source::{source_for, FileSource, MemorySource, ReportSource};

use crate::{FetchError, Report};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// One fetched, parsed, read-only copy of the dataset
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// URL or path the rows came from
    pub origin: String,
    /// SHA256 of the raw body (hex)
    pub fingerprint: String,
    pub fetched_at: DateTime<Utc>,
    #[serde(skip)]
    reports: Vec<Report>,
}

impl Snapshot {
    /// Parse a JSON array of report objects
    pub fn parse(origin: impl Into<String>, body: &str) -> Result<Self, FetchError> {
        let reports: Vec<Report> = serde_json::from_str(body)?;
        Ok(Self {
            origin: origin.into(),
            fingerprint: hash_content(body),
            fetched_at: Utc::now(),
            reports,
        })
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Whether the data differs from an earlier snapshot
    pub fn changed_since(&self, earlier: &Snapshot) -> bool {
        self.fingerprint != earlier.fingerprint
    }
}

/// Compute SHA256 hash of a body
fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Process-wide cache in front of a [`ReportSource`]
pub struct ReportStore {
    source: Box<dyn ReportSource>,
    snapshot: Mutex<Option<Arc<Snapshot>>>,
    fetches: AtomicUsize,
}

impl ReportStore {
    pub fn new(source: impl ReportSource + 'static) -> Self {
        Self::from_boxed(Box::new(source))
    }

    pub fn from_boxed(source: Box<dyn ReportSource>) -> Self {
        Self {
            source,
            snapshot: Mutex::new(None),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn origin(&self) -> String {
        self.source.describe()
    }

    /// Cached snapshot, fetching it first if the cache is empty.
    /// Concurrent callers wait for a single fetch.
    pub fn load(&self, cancel: &CancellationToken) -> Result<Arc<Snapshot>, FetchError> {
        let mut slot = self.lock();
        if let Some(snapshot) = slot.as_ref() {
            return Ok(Arc::clone(snapshot));
        }
        self.fetch_into(&mut slot, cancel)
    }

    /// Drop the cache and fetch again
    pub fn refresh(&self, cancel: &CancellationToken) -> Result<Arc<Snapshot>, FetchError> {
        let mut slot = self.lock();
        self.fetch_into(&mut slot, cancel)
    }

    pub fn invalidate(&self) {
        *self.lock() = None;
    }

    /// Peek at the cache without fetching
    pub fn cached(&self) -> Option<Arc<Snapshot>> {
        self.lock().clone()
    }

    /// Number of fetches issued against the source
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<Snapshot>>> {
        // Snapshots are immutable, so a poisoned slot is still consistent
        self.snapshot.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn fetch_into(
        &self,
        slot: &mut Option<Arc<Snapshot>>,
        cancel: &CancellationToken,
    ) -> Result<Arc<Snapshot>, FetchError> {
        *slot = None;
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        self.fetches.fetch_add(1, Ordering::Relaxed);
        let body = self.source.fetch_raw()?;

        // The consumer went away while the request was in flight
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let snapshot = Arc::new(Snapshot::parse(self.source.describe(), &body)?);
        *slot = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"[
        {"country": "USA", "intensity": 3, "region": "Northern America"},
        {"country": "UK", "intensity": "", "region": "Europe"}
    ]"#;

    /// Cancels the token from inside the fetch, as if the consumer unmounted mid-request
    struct CancellingSource {
        token: CancellationToken,
    }

    impl ReportSource for CancellingSource {
        fn describe(&self) -> String {
            "cancelling".to_string()
        }

        fn fetch_raw(&self) -> Result<String, FetchError> {
            self.token.cancel();
            Ok(BODY.to_string())
        }
    }

    #[test]
    fn test_hash_content() {
        let hash1 = hash_content("test content");
        let hash2 = hash_content("test content");
        let hash3 = hash_content("different content");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_snapshot_parse() {
        let snapshot = Snapshot::parse("fixture", BODY).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.origin, "fixture");
        assert_eq!(snapshot.reports()[1].intensity, None);
    }

    #[test]
    fn test_snapshot_malformed() {
        assert!(matches!(
            Snapshot::parse("fixture", "{not json"),
            Err(FetchError::Malformed(_))
        ));
        assert!(matches!(
            Snapshot::parse("fixture", r#"{"country": "USA"}"#),
            Err(FetchError::Malformed(_))
        ));
    }

    #[test]
    fn test_changed_since() {
        let a = Snapshot::parse("a", BODY).unwrap();
        let b = Snapshot::parse("b", BODY).unwrap();
        let c = Snapshot::parse("c", "[]").unwrap();
        assert!(!b.changed_since(&a));
        assert!(c.changed_since(&a));
    }

    #[test]
    fn test_load_fetches_once() {
        let store = ReportStore::new(MemorySource::new(BODY));
        let token = CancellationToken::new();

        let first = store.load(&token).unwrap();
        let second = store.load(&token).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.fetch_count(), 1);
    }

    #[test]
    fn test_refresh_refetches() {
        let store = ReportStore::new(MemorySource::new(BODY));
        let token = CancellationToken::new();

        let first = store.load(&token).unwrap();
        let refreshed = store.refresh(&token).unwrap();

        assert!(!Arc::ptr_eq(&first, &refreshed));
        assert_eq!(store.fetch_count(), 2);
        assert!(!refreshed.changed_since(&first));
    }

    #[test]
    fn test_invalidate_clears_cache() {
        let store = ReportStore::new(MemorySource::new(BODY));
        let token = CancellationToken::new();
        store.load(&token).unwrap();
        assert!(store.cached().is_some());

        store.invalidate();
        assert!(store.cached().is_none());
        store.load(&token).unwrap();
        assert_eq!(store.fetch_count(), 2);
    }

    #[test]
    fn test_cancelled_before_fetch() {
        let store = ReportStore::new(MemorySource::new(BODY));
        let token = CancellationToken::new();
        token.cancel();

        assert!(matches!(store.load(&token), Err(FetchError::Cancelled)));
        assert_eq!(store.fetch_count(), 0);
    }

    #[test]
    fn test_cancelled_in_flight_is_discarded() {
        let token = CancellationToken::new();
        let store = ReportStore::new(CancellingSource {
            token: token.clone(),
        });

        assert!(matches!(store.load(&token), Err(FetchError::Cancelled)));
        assert_eq!(store.fetch_count(), 1);
        assert!(store.cached().is_none(), "cancelled result must not be cached");
    }

    #[test]
    fn test_malformed_body_not_cached() {
        let store = ReportStore::new(MemorySource::new("oops"));
        let token = CancellationToken::new();
        assert!(matches!(store.load(&token), Err(FetchError::Malformed(_))));
        assert!(store.cached().is_none());
    }

    #[test]
    fn test_concurrent_loads_share_one_fetch() {
        let store = Arc::new(ReportStore::new(MemorySource::new(BODY)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.load(&CancellationToken::new()).map(|s| s.len()))
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), 2);
        }
        assert_eq!(store.fetch_count(), 1);
    }
}
