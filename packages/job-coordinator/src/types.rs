//! Client-side job tracking records.
//!
//! These mirror server-side job state across page navigation; they are
//! ephemeral, never persisted, and destroyed on dismissal or
//! coordinator teardown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which kind of server job a tracking record mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobKind {
    Import,
    Video,
}

/// A normalized view of one server status response, kind-agnostic so
/// the coordinator can diff any job the same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    /// The server's status string (e.g. "TRANSCRIBING", "PROCESSING").
    pub status: String,

    /// Overall progress 0..=100 when the job kind reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,

    pub terminal: bool,
    pub failed: bool,

    /// The raw server payload, for UI detail rendering.
    pub detail: serde_json::Value,
}

/// Consecutive fetch failures after which a job's status is considered
/// stale.
pub const STALE_AFTER_FAILURES: u32 = 3;

/// One tracked background job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundJob {
    pub id: String,
    pub kind: JobKind,
    pub started_at: DateTime<Utc>,

    /// Last snapshot the poller saw; retained across fetch failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_status: Option<JobSnapshot>,

    pub is_complete: bool,

    /// Ids of the entities this job affects (recipe ids, post ids);
    /// drives cache invalidation on completion.
    pub subject_ids: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    pub consecutive_failures: u32,
}

impl BackgroundJob {
    pub fn new(id: impl Into<String>, kind: JobKind, subject_ids: Vec<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            started_at: Utc::now(),
            last_status: None,
            is_complete: false,
            subject_ids,
            label: None,
            consecutive_failures: 0,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The last known status is stale: several polls in a row failed.
    /// The job stays tracked; the UI should show a degraded indicator.
    pub fn is_stale(&self) -> bool {
        self.consecutive_failures >= STALE_AFTER_FAILURES
    }

    /// The tracked job ended in failure.
    pub fn is_failed(&self) -> bool {
        self.last_status.as_ref().map(|s| s.failed).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_is_incomplete_and_fresh() {
        let job = BackgroundJob::new("j1", JobKind::Video, vec![]);
        assert!(!job.is_complete);
        assert!(!job.is_stale());
        assert!(job.last_status.is_none());
    }

    #[test]
    fn stale_after_three_consecutive_failures() {
        let mut job = BackgroundJob::new("j1", JobKind::Import, vec![]);
        job.consecutive_failures = 2;
        assert!(!job.is_stale());
        job.consecutive_failures = 3;
        assert!(job.is_stale());
    }
}
