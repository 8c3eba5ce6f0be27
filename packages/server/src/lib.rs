//! Ladle API server core.
//!
//! The extraction and job-orchestration subsystem behind the recipe
//! import app: one-shot URL extraction, the multi-stage video
//! extraction pipeline, and bulk social-post imports. Job records live
//! in in-memory stores behind traits; workers are the only status
//! writers.

pub mod config;
pub mod import;
pub mod jobs;
pub mod server;

pub use config::Config;
