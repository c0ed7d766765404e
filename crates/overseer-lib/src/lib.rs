//! Core library for the overseer resource recorder
//!
//! This crate provides the core functionality for:
//! - Sampling host and GPU metrics on a fixed interval
//! - Appending samples to per-host Arrow IPC tables
//! - Resolving the job-scoped stats layout
//! - Aggregating a stats tree for the viewer
//! - Node-range expansion and metric grouping

pub mod aggregate;
pub mod collector;
pub mod error;
pub mod models;
pub mod nodelist;
pub mod observability;
pub mod scope;
pub mod store;
pub mod view;

pub use aggregate::{collect, CollectedStats, Labeled};
pub use error::{GpuParseError, NodeListError, SampleError, StoreError};
pub use models::*;
pub use observability::StructuredLogger;
pub use scope::{JobScope, RunContext, StatsLayout};
