//! Recast Runtime
//!
//! This crate runs transform definitions over large batches. The batch is
//! split into chunks, chunks run on tokio's blocking pool, and the results
//! are stitched back together in input order.
//!
//! # Features
//!
//! - Bounded concurrency across chunks
//! - Record indices and statistics identical to a sequential run
//! - Optional wall-clock timeout per batch
//!
//! # Usage
//!
//! ```rust,ignore
//! use recast_runtime::{BatchJob, Runtime};
//!
//! let runtime = Runtime::from_project(&config.project);
//! let job = BatchJob::new("people", records).with_dry_run(true);
//! let result = runtime.run(job, Arc::new(definition)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod error;
pub mod jobs;

pub use engine::Runtime;
pub use error::{Error, Result};
pub use jobs::{BatchJob, JobOptions};
