//! Change notifications for local data and config files

use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::time::Duration;
use thiserror::Error;

/// Quiet period after the first write before a batch is reported
const SETTLE: Duration = Duration::from_millis(300);

/// The notification backend went away; no further changes will arrive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("file watcher stopped delivering events")]
pub struct WatcherClosed;

/// Watches a local data file (and optionally the config) and reports when
/// either is rewritten
pub struct DataWatcher {
    _watcher: RecommendedWatcher,
    events: Receiver<notify::Result<notify::Event>>,
    names: HashSet<OsString>,
}

/// Creations and modifications; removals and access events are ignored
fn is_write(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

impl DataWatcher {
    /// Start watching the given files. Their parent directories are watched so
    /// that editors replacing the file atomically are still seen.
    pub fn watch(files: &[&Path]) -> notify::Result<Self> {
        let (tx, rx) = channel();
        let mut watcher = RecommendedWatcher::new(
            move |event| {
                // Receiver gone means the watcher is being dropped
                tx.send(event).ok();
            },
            Config::default().with_poll_interval(SETTLE),
        )?;

        let mut names = HashSet::new();
        let mut watched_dirs = HashSet::new();
        for file in files {
            if let Some(name) = file.file_name() {
                names.insert(name.to_os_string());
            }
            let dir = file
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."))
                .to_path_buf();
            if watched_dirs.insert(dir.clone()) {
                watcher.watch(&dir, RecursiveMode::NonRecursive)?;
            }
        }

        Ok(Self {
            _watcher: watcher,
            events: rx,
            names,
        })
    }

    /// Whether a changed path is one of the watched files
    pub fn is_watched(&self, p: &Path) -> bool {
        p.file_name().is_some_and(|n| self.names.contains(n))
    }

    fn relevant_paths<'e>(&'e self, event: &'e notify::Event) -> impl Iterator<Item = PathBuf> + 'e {
        event
            .paths
            .iter()
            .filter(move |p| is_write(&event.kind) && self.is_watched(p))
            .cloned()
    }

    /// Block until a watched file is written, then gather anything else that
    /// lands within the settle window. `Ok(None)` on timeout.
    pub fn next_changes(&self, timeout: Duration) -> Result<Option<Vec<PathBuf>>, WatcherClosed> {
        let mut changed: HashSet<PathBuf> = HashSet::new();

        while changed.is_empty() {
            match self.events.recv_timeout(timeout) {
                Ok(Ok(event)) => changed.extend(self.relevant_paths(&event)),
                Ok(Err(_)) => continue,
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => return Err(WatcherClosed),
            }
        }

        std::thread::sleep(SETTLE);
        for event in self.events.try_iter().flatten() {
            changed.extend(self.relevant_paths(&event));
        }

        Ok(Some(changed.into_iter().collect()))
    }
}
