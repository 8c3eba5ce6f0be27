//! Status-fetching seam and the HTTP implementation.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::types::{JobKind, JobSnapshot};

#[derive(Debug, Error)]
pub enum StatusFetchError {
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("server answered {status} for job {id}")]
    Status { id: String, status: u16 },

    #[error("unexpected payload: {0}")]
    Payload(String),
}

/// Fetches one job's status from the server.
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    async fn fetch(&self, kind: JobKind, id: &str) -> Result<JobSnapshot, StatusFetchError>;
}

/// Polls the REST API for job status.
pub struct HttpStatusFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStatusFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn status_url(&self, kind: JobKind, id: &str) -> String {
        match kind {
            JobKind::Video => format!("{}/youtube/jobs/{}", self.base_url, id),
            JobKind::Import => format!("{}/instagram/import-jobs/{}", self.base_url, id),
        }
    }
}

#[async_trait]
impl StatusFetcher for HttpStatusFetcher {
    async fn fetch(&self, kind: JobKind, id: &str) -> Result<JobSnapshot, StatusFetchError> {
        let response = self
            .client
            .get(self.status_url(kind, id))
            .send()
            .await
            .map_err(|e| StatusFetchError::Transport(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StatusFetchError::Status {
                id: id.to_string(),
                status: status.as_u16(),
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| StatusFetchError::Transport(Box::new(e)))?;

        snapshot_from_payload(kind, payload)
    }
}

/// Normalize either job kind's payload into a [`JobSnapshot`].
pub fn snapshot_from_payload(
    kind: JobKind,
    payload: Value,
) -> Result<JobSnapshot, StatusFetchError> {
    let status = payload
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| StatusFetchError::Payload("missing status field".to_string()))?
        .to_string();

    let terminal = matches!(status.as_str(), "COMPLETED" | "FAILED");
    let failed = status == "FAILED";

    let progress = match kind {
        JobKind::Video => payload
            .get("progress")
            .and_then(Value::as_u64)
            .map(|p| p.min(100) as u8),
        JobKind::Import => {
            let total = payload.get("totalPosts").and_then(Value::as_u64);
            let processed = payload.get("processedPosts").and_then(Value::as_u64);
            match (processed, total) {
                (Some(p), Some(t)) if t > 0 => Some((p * 100 / t).min(100) as u8),
                _ => None,
            }
        }
    };

    Ok(JobSnapshot {
        status,
        progress,
        terminal,
        failed,
        detail: payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn video_payload_maps_progress_directly() {
        let snapshot = snapshot_from_payload(
            JobKind::Video,
            json!({ "status": "TRANSCRIBING", "progress": 37 }),
        )
        .unwrap();
        assert_eq!(snapshot.status, "TRANSCRIBING");
        assert_eq!(snapshot.progress, Some(37));
        assert!(!snapshot.terminal);
        assert!(!snapshot.failed);
    }

    #[test]
    fn import_payload_derives_progress_from_counters() {
        let snapshot = snapshot_from_payload(
            JobKind::Import,
            json!({ "status": "PROCESSING", "totalPosts": 4, "processedPosts": 3 }),
        )
        .unwrap();
        assert_eq!(snapshot.progress, Some(75));
    }

    #[test]
    fn terminal_states_are_flagged() {
        let done =
            snapshot_from_payload(JobKind::Video, json!({ "status": "COMPLETED" })).unwrap();
        assert!(done.terminal);
        assert!(!done.failed);

        let failed = snapshot_from_payload(JobKind::Video, json!({ "status": "FAILED" })).unwrap();
        assert!(failed.terminal);
        assert!(failed.failed);
    }

    #[test]
    fn missing_status_is_a_payload_error() {
        let err = snapshot_from_payload(JobKind::Video, json!({ "progress": 10 })).unwrap_err();
        assert!(matches!(err, StatusFetchError::Payload(_)));
    }
}
