//! Per-panel lifecycle: `Idle -> Loading -> Ready | Failed`

use super::PanelDefinition;
use crate::query::{FilterSpec, QueryResult};
use crate::store::{CancellationToken, ReportStore, Snapshot};
use crate::{FetchError, Field};
use std::sync::Arc;

pub use crate::TransitionError;

#[derive(Debug, Clone, PartialEq)]
pub enum PanelState {
    Idle,
    Loading,
    Ready(QueryResult),
    /// Terminal; the message is the fetch error as shown to the user
    Failed(String),
}

impl PanelState {
    pub fn name(&self) -> &'static str {
        match self {
            PanelState::Idle => "idle",
            PanelState::Loading => "loading",
            PanelState::Ready(_) => "ready",
            PanelState::Failed(_) => "failed",
        }
    }
}

/// One mounted panel: its selections, its state and the snapshot it last drew from.
/// Dropping the session cancels any load it started.
pub struct PanelSession {
    panel: PanelDefinition,
    store: Arc<ReportStore>,
    selections: FilterSpec,
    state: PanelState,
    snapshot: Option<Arc<Snapshot>>,
    cancel: CancellationToken,
}

impl PanelSession {
    pub fn new(panel: PanelDefinition, store: Arc<ReportStore>) -> Self {
        Self {
            panel,
            store,
            selections: FilterSpec::new(),
            state: PanelState::Idle,
            snapshot: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Start with default selections (config `filters`)
    pub fn with_selections(mut self, selections: FilterSpec) -> Self {
        self.selections = selections;
        self
    }

    pub fn panel(&self) -> &PanelDefinition {
        &self.panel
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn selections(&self) -> &FilterSpec {
        &self.selections
    }

    pub fn result(&self) -> Option<&QueryResult> {
        match &self.state {
            PanelState::Ready(result) => Some(result),
            _ => None,
        }
    }

    /// Token another thread can use to abandon this session's fetch
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Idle -> Loading
    pub fn begin_load(&mut self) -> Result<(), TransitionError> {
        match self.state {
            PanelState::Idle => {
                self.state = PanelState::Loading;
                Ok(())
            }
            _ => Err(self.invalid("load")),
        }
    }

    /// Loading -> Ready | Failed
    pub fn finish_load(
        &mut self,
        outcome: Result<Arc<Snapshot>, FetchError>,
    ) -> Result<&PanelState, TransitionError> {
        if self.state != PanelState::Loading {
            return Err(self.invalid("finish loading"));
        }
        self.state = match outcome {
            Ok(snapshot) => {
                let result = self.panel.evaluate(snapshot.reports(), &self.selections);
                self.snapshot = Some(snapshot);
                PanelState::Ready(result)
            }
            Err(e) => PanelState::Failed(e.to_string()),
        };
        Ok(&self.state)
    }

    /// Fetch (or reuse) the shared snapshot and compute the panel
    pub fn load(&mut self) -> Result<&PanelState, TransitionError> {
        self.begin_load()?;
        let outcome = self.store.load(&self.cancel);
        self.finish_load(outcome)
    }

    /// Ready -> Loading -> Ready | Failed, forcing a new fetch
    pub fn refresh(&mut self) -> Result<&PanelState, TransitionError> {
        if !matches!(self.state, PanelState::Ready(_)) {
            return Err(self.invalid("refresh"));
        }
        self.state = PanelState::Loading;
        let outcome = self.store.refresh(&self.cancel);
        self.finish_load(outcome)
    }

    /// Change one selection. An empty value clears it. In `Ready` the panel is
    /// recomputed from the snapshot it already holds; nothing is fetched.
    pub fn set_filter(&mut self, field: Field, value: &str) -> Result<(), TransitionError> {
        if matches!(self.state, PanelState::Failed(_)) {
            return Err(self.invalid("filter"));
        }
        self.selections.set(field, value)?;
        self.recompute();
        Ok(())
    }

    pub fn clear_filters(&mut self) -> Result<(), TransitionError> {
        if matches!(self.state, PanelState::Failed(_)) {
            return Err(self.invalid("filter"));
        }
        self.selections = FilterSpec::new();
        self.recompute();
        Ok(())
    }

    fn recompute(&mut self) {
        if !matches!(self.state, PanelState::Ready(_)) {
            return;
        }
        if let Some(snapshot) = &self.snapshot {
            let result = self.panel.evaluate(snapshot.reports(), &self.selections);
            self.state = PanelState::Ready(result);
        }
    }

    fn invalid(&self, action: &'static str) -> TransitionError {
        TransitionError::Invalid {
            action,
            state: self.state.name(),
        }
    }
}

impl Drop for PanelSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
