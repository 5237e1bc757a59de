//! Every enabled panel computed from one snapshot

use crate::panels::{self, ChartKind, PanelDefinition};
use crate::query::{FilterSpec, QueryResult};
use crate::store::Snapshot;
use crate::QueryError;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;

/// One computed panel
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelReport {
    pub id: String,
    pub title: String,
    pub chart: ChartKind,
    pub result: QueryResult,
}

impl PanelReport {
    /// No series has a single point
    pub fn is_empty(&self) -> bool {
        self.result.series.iter().all(|s| s.is_empty())
    }
}

/// Summary across the dashboard
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub origin: String,
    pub fingerprint: String,
    pub fetched_at: DateTime<Utc>,
    pub total_rows: usize,
    pub panels: usize,
    /// Panels whose filters left nothing to draw
    pub empty_panels: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub panels: Vec<PanelReport>,
}

/// Resolve configured panel ids; an empty list enables the whole catalog
pub fn select_panels(ids: &[String]) -> Result<Vec<PanelDefinition>, QueryError> {
    if ids.is_empty() {
        return Ok(panels::catalog());
    }
    ids.iter().map(|id| panels::find(id)).collect()
}

/// Compute panels in parallel over the shared rows. Output keeps the order of `panels`.
pub fn compute(snapshot: &Snapshot, panels: &[PanelDefinition], selections: &FilterSpec) -> Dashboard {
    let rows = snapshot.reports();

    let reports: Vec<PanelReport> = panels
        .par_iter()
        .map(|panel| PanelReport {
            id: panel.id.to_string(),
            title: panel.title.to_string(),
            chart: panel.chart,
            result: panel.evaluate(rows, selections),
        })
        .collect();

    let stats = DashboardStats {
        origin: snapshot.origin.clone(),
        fingerprint: snapshot.fingerprint.clone(),
        fetched_at: snapshot.fetched_at,
        total_rows: rows.len(),
        panels: reports.len(),
        empty_panels: reports.iter().filter(|p| p.is_empty()).count(),
    };

    Dashboard {
        stats,
        panels: reports,
    }
}
