//! The background-job coordinator.
//!
//! One explicitly constructed instance per client session, passed by
//! handle to whatever needs to register or observe jobs. A single
//! scheduler task polls every incomplete job concurrently each tick and
//! applies all mutations under the registry lock, so ticks never
//! overlap and mutations never interleave mid-tick. The scheduler is
//! inert while nothing is incomplete and restarts on the next
//! `register`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::fetcher::StatusFetcher;
use crate::types::{BackgroundJob, JobKind, JobSnapshot};

/// Invoked by the scheduler when tracked jobs change.
///
/// `on_complete` fires exactly once per job, at the tick that first
/// observes a terminal status — the integration point for cache
/// invalidation and UI badges.
#[async_trait]
pub trait CompletionHook: Send + Sync {
    async fn on_complete(&self, job: &BackgroundJob);

    /// A snapshot changed but the job is still running.
    async fn on_update(&self, _job: &BackgroundJob) {}
}

/// A hook that does nothing.
pub struct NoopHook;

#[async_trait]
impl CompletionHook for NoopHook {
    async fn on_complete(&self, _job: &BackgroundJob) {}
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Delay between the end of one tick and the start of the next.
    pub poll_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
        }
    }
}

struct Inner {
    registry: Mutex<HashMap<String, BackgroundJob>>,
    scheduler: Mutex<Option<JoinHandle<()>>>,
    fetcher: Arc<dyn StatusFetcher>,
    hook: Arc<dyn CompletionHook>,
    config: CoordinatorConfig,
    shutdown: CancellationToken,
}

/// Client-side registry of in-flight jobs of every kind.
pub struct JobCoordinator {
    inner: Arc<Inner>,
}

impl JobCoordinator {
    pub fn new(fetcher: Arc<dyn StatusFetcher>, hook: Arc<dyn CompletionHook>) -> Self {
        Self::with_config(fetcher, hook, CoordinatorConfig::default())
    }

    pub fn with_config(
        fetcher: Arc<dyn StatusFetcher>,
        hook: Arc<dyn CompletionHook>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: Mutex::new(HashMap::new()),
                scheduler: Mutex::new(None),
                fetcher,
                hook,
                config,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Track a job. Idempotent by id: re-registering an already-tracked
    /// job (e.g. rediscovered via a deep link) is a no-op returning
    /// `false`. Wakes the scheduler when it is inert.
    pub fn register(&self, id: impl Into<String>, kind: JobKind, subject_ids: Vec<String>) -> bool {
        self.insert(BackgroundJob::new(id, kind, subject_ids))
    }

    /// Track a job with a display label.
    pub fn register_labeled(
        &self,
        id: impl Into<String>,
        kind: JobKind,
        subject_ids: Vec<String>,
        label: impl Into<String>,
    ) -> bool {
        self.insert(BackgroundJob::new(id, kind, subject_ids).with_label(label))
    }

    fn insert(&self, job: BackgroundJob) -> bool {
        {
            let mut registry = self.inner.registry.lock().unwrap();
            if registry.contains_key(&job.id) {
                debug!(job_id = %job.id, "already tracked; register is a no-op");
                return false;
            }
            info!(job_id = %job.id, kind = ?job.kind, "tracking background job");
            registry.insert(job.id.clone(), job);
        }
        self.ensure_scheduler();
        true
    }

    /// Stop tracking a job, regardless of completion state. Has no
    /// effect on the underlying server-side job.
    pub fn dismiss(&self, id: &str) -> bool {
        let removed = self.inner.registry.lock().unwrap().remove(id).is_some();
        if removed {
            info!(job_id = %id, "dismissed background job");
        }
        removed
    }

    /// All tracked jobs, newest first.
    pub fn list(&self) -> Vec<BackgroundJob> {
        let mut jobs: Vec<BackgroundJob> = self
            .inner
            .registry
            .lock()
            .unwrap()
            .values()
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        jobs
    }

    pub fn get(&self, id: &str) -> Option<BackgroundJob> {
        self.inner.registry.lock().unwrap().get(id).cloned()
    }

    /// Whether any tracked job is still incomplete.
    pub fn has_active(&self) -> bool {
        self.inner
            .registry
            .lock()
            .unwrap()
            .values()
            .any(|j| !j.is_complete)
    }

    /// Stop the scheduler and drop the registry.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        if let Some(handle) = self.inner.scheduler.lock().unwrap().take() {
            handle.abort();
        }
        self.inner.registry.lock().unwrap().clear();
    }

    /// Spawn the polling task if it is not running.
    fn ensure_scheduler(&self) {
        let mut slot = self.inner.scheduler.lock().unwrap();
        let running = slot.as_ref().map(|h| !h.is_finished()).unwrap_or(false);
        if running || self.inner.shutdown.is_cancelled() {
            return;
        }

        // The task holds only a weak handle so dropping the coordinator
        // tears the loop down.
        let weak = Arc::downgrade(&self.inner);
        *slot = Some(tokio::spawn(async move {
            scheduler_loop(weak).await;
        }));
    }
}

impl Drop for JobCoordinator {
    fn drop(&mut self) {
        self.inner.shutdown.cancel();
        if let Ok(mut slot) = self.inner.scheduler.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

async fn scheduler_loop(inner: Weak<Inner>) {
    loop {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        if inner.shutdown.is_cancelled() {
            return;
        }

        // Snapshot incomplete jobs without holding the lock across I/O.
        let targets: Vec<(String, JobKind)> = inner
            .registry
            .lock()
            .unwrap()
            .values()
            .filter(|j| !j.is_complete)
            .map(|j| (j.id.clone(), j.kind))
            .collect();

        if targets.is_empty() {
            // Exit only while holding the scheduler slot, re-checking the
            // registry under it: a concurrent register either sees this
            // task still running or finds an empty slot and respawns.
            let mut slot = inner.scheduler.lock().unwrap();
            let has_incomplete = inner
                .registry
                .lock()
                .unwrap()
                .values()
                .any(|j| !j.is_complete);
            if has_incomplete {
                drop(slot);
                continue;
            }
            debug!("no incomplete jobs; scheduler going inert");
            *slot = None;
            return;
        }

        // One concurrent status fetch per incomplete job, joined before
        // any mutation is applied.
        let fetches = targets.into_iter().map(|(id, kind)| {
            let fetcher = inner.fetcher.clone();
            async move {
                let outcome = fetcher.fetch(kind, &id).await;
                (id, outcome)
            }
        });
        let results = futures::future::join_all(fetches).await;

        let mut completed: Vec<BackgroundJob> = Vec::new();
        let mut updated: Vec<BackgroundJob> = Vec::new();
        {
            let mut registry = inner.registry.lock().unwrap();
            for (id, outcome) in results {
                // Dismissed mid-poll: the response is simply dropped.
                let Some(job) = registry.get_mut(&id) else {
                    continue;
                };

                match outcome {
                    Ok(snapshot) => {
                        job.consecutive_failures = 0;
                        apply_snapshot(job, snapshot, &mut completed, &mut updated);
                    }
                    Err(e) => {
                        // Previous snapshot retained; the job is never
                        // evicted by poll failures.
                        job.consecutive_failures += 1;
                        warn!(
                            job_id = %id,
                            failures = job.consecutive_failures,
                            error = %e,
                            "status fetch failed; keeping last snapshot"
                        );
                    }
                }
            }
        }

        for job in &updated {
            inner.hook.on_update(job).await;
        }
        for job in &completed {
            inner.hook.on_complete(job).await;
        }

        let interval = inner.config.poll_interval;
        let shutdown = inner.shutdown.clone();
        // Release the strong handle while sleeping so teardown is not
        // blocked on the poll interval.
        drop(inner);

        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

/// Diff a fresh snapshot against the job. Only a real change (or the
/// terminal edge) produces a notification; a job advancing several
/// stages between ticks is one ordinary update.
fn apply_snapshot(
    job: &mut BackgroundJob,
    snapshot: JobSnapshot,
    completed: &mut Vec<BackgroundJob>,
    updated: &mut Vec<BackgroundJob>,
) {
    let changed = job.last_status.as_ref() != Some(&snapshot);
    let newly_terminal = snapshot.terminal && !job.is_complete;

    job.last_status = Some(snapshot);

    if newly_terminal {
        job.is_complete = true;
        completed.push(job.clone());
    } else if changed {
        updated.push(job.clone());
    }
}
