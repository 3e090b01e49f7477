//! Client code for stash.
//!
//! This crate provides the outbound HTTP client the proxy uses to reach the
//! upstream API when a request misses the cache.

pub mod upstream;

pub use upstream::{ClientError, Upstream, UpstreamClient, UpstreamConfig, UpstreamResponse, upstream_url};
