//! Background Job Coordinator
//!
//! Client-side tracking for server jobs of every kind: a registry of
//! in-flight jobs, a single non-overlapping polling loop, idempotent
//! registration, and exactly-once completion hooks for cache
//! invalidation.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use job_coordinator::{HttpStatusFetcher, JobCoordinator, JobKind, NoopHook};
//!
//! let coordinator = JobCoordinator::new(
//!     Arc::new(HttpStatusFetcher::new("http://localhost:8080")),
//!     Arc::new(NoopHook),
//! );
//!
//! coordinator.register("a1b2", JobKind::Video, vec![]);
//! assert!(coordinator.has_active());
//! // ... the scheduler polls until the job is terminal ...
//! coordinator.shutdown();
//! ```

pub mod coordinator;
pub mod fetcher;
pub mod testing;
pub mod types;

pub use coordinator::{CompletionHook, CoordinatorConfig, JobCoordinator, NoopHook};
pub use fetcher::{snapshot_from_payload, HttpStatusFetcher, StatusFetchError, StatusFetcher};
pub use types::{BackgroundJob, JobKind, JobSnapshot, STALE_AFTER_FAILURES};
