//! Recast Core Library
//!
//! This crate provides the transform engine behind Recast:
//! - Transform definitions and project configuration parsing
//! - A static catalog of transform functions
//! - Configuration validation against source and target schemas
//! - Per-record transformation and output validation
//! - Batch execution with record-level isolation
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Definition  │────▶│   Record    │────▶│   Output    │────▶│  Execution  │
//! │   (YAML)    │     │ Transformer │     │  Validator  │     │   Result    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use recast_core::{Config, TransformService};
//!
//! let config = Config::load("./my-project")?;
//! let definition = config.find_definition("people")?;
//! let service = TransformService::from_project(&config.project);
//! let result = service.execute_default(&definition, &records);
//! println!("{} records out", result.execution_stats.output_count);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attributes;
pub mod config;
pub mod definition;
pub mod error;
pub mod executor;
pub mod functions;
pub mod io;
pub mod output;
pub mod schema;
pub mod service;
pub mod transformer;
pub mod validator;

pub use config::{Config, DefinitionFile, LogFormat, ProjectConfig};
pub use definition::{
    FieldMapping, Record, TransformConfig, TransformDefinition, TransformType,
};
pub use error::{Error, FieldError, RecordError, Result};
pub use executor::{
    BatchError, ExecuteOptions, ExecutionResult, ExecutionStats, PreviewResult,
    TransformExecutor,
};
pub use functions::{Function, FunctionCategory, FunctionRegistry};
pub use schema::{FieldSpec, Schema};
pub use service::TransformService;
pub use validator::{ConfigValidator, ValidationReport};
