use chrono::NaiveDate;
use thiserror::Error;

/// Pipeline error taxonomy. The orchestrator matches on these to decide the
/// run's terminal status; everything below it propagates with `?`.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The day's source partition does not exist. Fatal to this run only —
    /// previously loaded days are untouched.
    #[error("missing warehouse partition for {0}")]
    MissingPartition(NaiveDate),

    /// The partition exists but a row could not be decoded.
    #[error("malformed partition {partition}: {reason}")]
    MalformedPartition { partition: String, reason: String },

    /// A dataset's load aborted (remaining batches skipped). Other datasets
    /// may still have succeeded independently.
    #[error("load failed for {dataset}: {source}")]
    Load {
        dataset: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("sync run bookkeeping failed: {0}")]
    Tracker(#[source] anyhow::Error),
}
