//! Run reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::diff::ChangeOp;

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every entry reached success.
    Success,
    /// At least one entry failed, was blocked, or was cancelled;
    /// independent branches may still have applied.
    PartialFailure,
    /// Graph-level or state-store error; construction-time status used
    /// when no change was applied at all.
    Fatal,
}

/// Terminal outcome of a single change entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryOutcome {
    /// Created, updated or replaced successfully.
    Applied,
    /// Destroyed successfully.
    Destroyed,
    /// Provider call failed (permanently, or transiently past the
    /// attempt limit).
    Failed { error: String },
    /// Never dispatched: a dependency did not reach success.
    Blocked { dependency: String },
    /// Aborted by run-level cancellation.
    Cancelled,
}

impl EntryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, EntryOutcome::Applied | EntryOutcome::Destroyed)
    }
}

/// Per-entry record in the run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryReport {
    pub name: String,
    pub kind: String,
    pub op: ChangeOp,
    pub outcome: EntryOutcome,
    /// Provider call attempts made, across all calls for this entry.
    pub attempts: u32,
}

/// Final report for one run. No partial success is hidden: every entry
/// appears with its terminal outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub manifest: String,
    pub status: RunStatus,
    pub entries: Vec<EntryReport>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Set only for Fatal reports built from an error.
    pub error: Option<String>,
}

impl RunReport {
    /// Build a report from executed entries, deriving the status.
    pub fn from_entries(
        manifest: impl Into<String>,
        started_at: DateTime<Utc>,
        entries: Vec<EntryReport>,
    ) -> Self {
        let status = if entries.iter().all(|e| e.outcome.is_success()) {
            RunStatus::Success
        } else {
            RunStatus::PartialFailure
        };
        Self {
            run_id: Uuid::new_v4(),
            manifest: manifest.into(),
            status,
            entries,
            started_at,
            completed_at: Utc::now(),
            error: None,
        }
    }

    /// Report for a run that failed before any side effect.
    pub fn fatal(manifest: impl Into<String>, error: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            manifest: manifest.into(),
            status: RunStatus::Fatal,
            entries: Vec::new(),
            started_at: now,
            completed_at: now,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    /// Logical names of entries that failed outright.
    pub fn failed_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, EntryOutcome::Failed { .. }))
            .map(|e| e.name.clone())
            .collect()
    }

    /// Logical names of entries blocked by a failed dependency.
    pub fn blocked_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, EntryOutcome::Blocked { .. }))
            .map(|e| e.name.clone())
            .collect()
    }

    /// One-line summary, e.g. `3 applied, 1 failed, 1 blocked`.
    pub fn summary(&self) -> String {
        let applied = self
            .entries
            .iter()
            .filter(|e| e.outcome.is_success())
            .count();
        let failed = self.failed_names().len();
        let blocked = self.blocked_names().len();
        let cancelled = self
            .entries
            .iter()
            .filter(|e| e.outcome == EntryOutcome::Cancelled)
            .count();

        let mut parts = vec![format!("{} applied", applied)];
        if failed > 0 {
            parts.push(format!("{} failed", failed));
        }
        if blocked > 0 {
            parts.push(format!("{} blocked", blocked));
        }
        if cancelled > 0 {
            parts.push(format!("{} cancelled", cancelled));
        }
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, outcome: EntryOutcome) -> EntryReport {
        EntryReport {
            name: name.to_string(),
            kind: "network/vpc".to_string(),
            op: ChangeOp::Create,
            outcome,
            attempts: 1,
        }
    }

    #[test]
    fn test_all_success() {
        let report = RunReport::from_entries(
            "webapp",
            Utc::now(),
            vec![entry("a", EntryOutcome::Applied), entry("b", EntryOutcome::Destroyed)],
        );
        assert_eq!(report.status, RunStatus::Success);
        assert!(report.failed_names().is_empty());
    }

    #[test]
    fn test_partial_failure() {
        let report = RunReport::from_entries(
            "webapp",
            Utc::now(),
            vec![
                entry("a", EntryOutcome::Applied),
                entry("b", EntryOutcome::Failed { error: "denied".into() }),
                entry(
                    "c",
                    EntryOutcome::Blocked { dependency: "b".into() },
                ),
            ],
        );
        assert_eq!(report.status, RunStatus::PartialFailure);
        assert_eq!(report.failed_names(), vec!["b"]);
        assert_eq!(report.blocked_names(), vec!["c"]);
        assert_eq!(report.summary(), "1 applied, 1 failed, 1 blocked");
    }

    #[test]
    fn test_fatal_report() {
        let report = RunReport::fatal("webapp", "cycle involving: a, b");
        assert_eq!(report.status, RunStatus::Fatal);
        assert!(report.entries.is_empty());
        assert!(report.error.is_some());
    }

    #[test]
    fn test_empty_run_is_success() {
        let report = RunReport::from_entries("webapp", Utc::now(), Vec::new());
        assert!(report.is_success());
    }
}
