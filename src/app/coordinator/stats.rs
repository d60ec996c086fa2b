//! Session results
//!
//! Every phase of a session contributes one [`PhaseSummary`]. Per-item
//! failures are collected so the CLI can list them at the end of a run.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app::models::BatchReport;
use crate::app::patch::PatchReport;

/// Written and failed counts for one phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseSummary {
    /// Phase name
    pub name: &'static str,
    /// Files written
    pub written: usize,
    /// Files that failed
    pub failed: usize,
    /// Bytes written
    pub bytes: u64,
}

/// Patch rule counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PatchSummary {
    pub applied: usize,
    pub already_applied: usize,
    pub skipped: usize,
}

impl From<&PatchReport> for PatchSummary {
    fn from(report: &PatchReport) -> Self {
        Self {
            applied: report.applied(),
            already_applied: report.already_applied(),
            skipped: report.skipped(),
        }
    }
}

/// Outcome of a completed session
#[derive(Debug, Clone, Serialize)]
pub struct SessionResult {
    /// When the session started
    pub started_at: DateTime<Utc>,
    /// Time taken for the entire session
    #[serde(with = "humantime_serde")]
    pub total_duration: Duration,
    /// Resolved dynamic paths as (name, path)
    pub dynamic_paths: Vec<(String, String)>,
    /// Download phases in execution order
    pub phases: Vec<PhaseSummary>,
    /// (file, reason) for every failed download
    pub failures: Vec<(String, String)>,
    /// Number of fonts decoded from the catalog, if it was present
    pub fonts_decoded: Option<usize>,
    /// Patch rule counts
    pub patches: PatchSummary,
    /// Unreferenced templates removed
    pub templates_removed: usize,
    /// Non-fatal problems that skipped part of a phase
    pub warnings: Vec<String>,
}

impl SessionResult {
    /// Empty result for a session starting now
    pub fn started() -> Self {
        Self {
            started_at: Utc::now(),
            total_duration: Duration::ZERO,
            dynamic_paths: Vec::new(),
            phases: Vec::new(),
            failures: Vec::new(),
            fonts_decoded: None,
            patches: PatchSummary::default(),
            templates_removed: 0,
            warnings: Vec::new(),
        }
    }

    /// Records the outcome of one download phase
    pub fn record_phase(&mut self, name: &'static str, report: &BatchReport) {
        self.phases.push(PhaseSummary {
            name,
            written: report.written.len(),
            failed: report.failed.len(),
            bytes: report.bytes_written(),
        });
        self.failures.extend(report.failures());
    }

    /// Records a non-fatal problem
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Summary of one phase, if it ran
    pub fn phase(&self, name: &str) -> Option<&PhaseSummary> {
        self.phases.iter().find(|p| p.name == name)
    }

    /// Total files written across phases
    pub fn files_written(&self) -> usize {
        self.phases.iter().map(|p| p.written).sum()
    }

    /// Total downloads that failed across phases
    pub fn files_failed(&self) -> usize {
        self.phases.iter().map(|p| p.failed).sum()
    }

    /// Whether any item failed or any phase was partly skipped
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty() || self.patches.skipped > 0 || !self.warnings.is_empty()
    }

    /// Get a summary of the session result
    pub fn summary(&self) -> String {
        if self.has_failures() {
            format!(
                "Session finished with problems: {} files written, {} failed, {} patches skipped in {:.1}s",
                self.files_written(),
                self.files_failed(),
                self.patches.skipped,
                self.total_duration.as_secs_f64()
            )
        } else {
            format!(
                "Session completed successfully: {} files written in {:.1}s",
                self.files_written(),
                self.total_duration.as_secs_f64()
            )
        }
    }
}
