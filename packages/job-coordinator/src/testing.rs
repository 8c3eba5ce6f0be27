//! Mock implementations for coordinator tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::Notify;

use crate::coordinator::CompletionHook;
use crate::fetcher::{StatusFetcher, StatusFetchError};
use crate::types::{BackgroundJob, JobKind, JobSnapshot};

/// One scripted poll outcome.
#[derive(Debug, Clone)]
pub enum ScriptedPoll {
    Ok(JobSnapshot),
    TransportError,
}

impl ScriptedPoll {
    /// A running snapshot with the given status string.
    pub fn running(status: &str) -> Self {
        Self::Ok(JobSnapshot {
            status: status.to_string(),
            progress: None,
            terminal: false,
            failed: false,
            detail: serde_json::Value::Null,
        })
    }

    pub fn completed() -> Self {
        Self::Ok(JobSnapshot {
            status: "COMPLETED".to_string(),
            progress: Some(100),
            terminal: true,
            failed: false,
            detail: serde_json::Value::Null,
        })
    }

    pub fn failed() -> Self {
        Self::Ok(JobSnapshot {
            status: "FAILED".to_string(),
            progress: None,
            terminal: true,
            failed: true,
            detail: serde_json::Value::Null,
        })
    }
}

/// A fetcher replaying scripted outcomes per job id.
///
/// The last outcome repeats once the script runs out; an optional gate
/// holds every fetch until notified so tests can act mid-poll.
#[derive(Default)]
pub struct MockStatusFetcher {
    scripts: RwLock<HashMap<String, Mutex<Vec<ScriptedPoll>>>>,
    gate: RwLock<Option<Arc<Notify>>>,
    fetch_count: AtomicUsize,
}

impl MockStatusFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the outcomes for a job id, replayed in order.
    pub fn with_script(self, id: impl Into<String>, outcomes: Vec<ScriptedPoll>) -> Self {
        let mut reversed = outcomes;
        reversed.reverse(); // pop() serves them in submission order
        self.scripts
            .write()
            .unwrap()
            .insert(id.into(), Mutex::new(reversed));
        self
    }

    /// Hold every fetch until the returned handle is notified.
    pub fn gate(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.write().unwrap() = Some(notify.clone());
        notify
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusFetcher for MockStatusFetcher {
    async fn fetch(&self, _kind: JobKind, id: &str) -> Result<JobSnapshot, StatusFetchError> {
        let gate = self.gate.read().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        let scripts = self.scripts.read().unwrap();
        let outcome = match scripts.get(id) {
            Some(script) => {
                let mut script = script.lock().unwrap();
                if script.len() > 1 {
                    script.pop().unwrap()
                } else {
                    script.last().cloned().unwrap_or(ScriptedPoll::TransportError)
                }
            }
            None => ScriptedPoll::TransportError,
        };

        match outcome {
            ScriptedPoll::Ok(snapshot) => Ok(snapshot),
            ScriptedPoll::TransportError => Err(StatusFetchError::Transport(
                "scripted transport failure".into(),
            )),
        }
    }
}

/// Records which jobs the coordinator reported, for exactly-once
/// assertions.
#[derive(Default)]
pub struct RecordingHook {
    completions: RwLock<Vec<BackgroundJob>>,
    updates: RwLock<Vec<BackgroundJob>>,
}

impl RecordingHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completions(&self) -> Vec<BackgroundJob> {
        self.completions.read().unwrap().clone()
    }

    pub fn completion_count(&self, id: &str) -> usize {
        self.completions
            .read()
            .unwrap()
            .iter()
            .filter(|j| j.id == id)
            .count()
    }

    pub fn update_count(&self, id: &str) -> usize {
        self.updates.read().unwrap().iter().filter(|j| j.id == id).count()
    }
}

#[async_trait]
impl CompletionHook for RecordingHook {
    async fn on_complete(&self, job: &BackgroundJob) {
        self.completions.write().unwrap().push(job.clone());
    }

    async fn on_update(&self, job: &BackgroundJob) {
        self.updates.write().unwrap().push(job.clone());
    }
}
