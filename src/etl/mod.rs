//! Core ETL (Extract, Transform, Load) abstractions
//!
//! This module provides trait definitions for building data pipelines
//! that extract data from sources, transform it, and load it to destinations,
//! plus a small DAG runner that sequences pipeline tasks.

mod extract;
mod graph;
mod load;
mod runner;
mod transform;

pub use extract::Extractor;
pub use graph::{Edge, TaskGraph};
pub use load::Loader;
pub use runner::{DagRunner, RetryPolicy, RunReport, TaskExecutor, TaskOutcome, TaskState};
pub use transform::Transformer;
