//! Sync-run bookkeeping types: one row per daily pipeline execution.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Terminal-state machine for a pipeline run:
/// `running → {completed, completed_with_errors, failed}`, no further
/// transitions. The tracker alone decides the terminal status; lower layers
/// surface errors upward instead of swallowing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Running,
    Completed,
    CompletedWithErrors,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::CompletedWithErrors => "completed_with_errors",
            Self::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "completed_with_errors" => Some(Self::CompletedWithErrors),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Rows written per dataset during one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetCounts {
    pub sessions: u64,
    pub pageviews: u64,
    pub video_events: u64,
    pub cta_clicks: u64,
}

/// Final outcome handed to the tracker exactly once at completion.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: SyncStatus,
    pub counts: DatasetCounts,
    pub errors_count: u64,
    pub error_details: Option<String>,
    /// Distinct country names geo resolution could not map this run.
    pub geo_unresolved: u64,
}

/// One `sync_runs` row. Created once per pipeline execution, updated exactly
/// once at completion, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRun {
    pub id: String,
    pub sync_date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: SyncStatus,
    pub counts: DatasetCounts,
    pub errors_count: u64,
    pub error_details: Option<String>,
    pub geo_unresolved: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_are_stable() {
        assert_eq!(SyncStatus::Running.as_str(), "running");
        assert_eq!(
            SyncStatus::CompletedWithErrors.as_str(),
            "completed_with_errors"
        );
        assert!(!SyncStatus::Running.is_terminal());
        assert!(SyncStatus::Failed.is_terminal());
    }
}
