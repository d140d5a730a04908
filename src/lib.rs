//! Benchload - parallel TPC-C style benchmark data loader
//!
//! Benchload generates synthetic warehouse order-line data and loads it into
//! a relational sink, or emits it as delimited text, using a fixed pool of
//! worker threads that claim warehouse units from a shared job queue.
//!
//! # Architecture
//!
//! - **Spec-mandated randomness**: non-uniform draws over shared per-process
//!   C values, derivable per worker thread
//! - **Work partitioning**: atomic claim-next-unit queue, exhaustion-stable
//! - **Write strategies**: insert, update, delete, insert-or-update and
//!   upsert policies with batched transaction commits
//! - **Worker pool**: fixed OS-thread pool with per-worker failure
//!   accounting and join-all aggregation

pub mod config;
pub mod coordinator;
pub mod jobs;
pub mod order;
pub mod output;
pub mod random;
pub mod sink;
pub mod stats;
pub mod strategy;
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::Coordinator;
pub use strategy::WriteMode;

/// Result type used throughout benchload
pub type Result<T> = anyhow::Result<T>;
