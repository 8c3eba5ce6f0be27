//! Page fetcher implementations.

mod http;

pub use http::HttpFetcher;
