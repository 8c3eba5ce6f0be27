//! HTTP server: state, router, routes.

pub mod app;
pub mod error;
pub mod routes;

pub use app::{build_app, AppState};
