//! Core types and shared functionality for stash.
//!
//! This crate provides:
//! - Response cache with file-backed and Redis backends
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{BackendKind, CacheBackend, CacheEntry, CacheHandle, Payload};
pub use config::AppConfig;
pub use error::Error;
