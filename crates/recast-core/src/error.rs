//! Error types for recast-core
//!
//! Three layers of failure exist in the engine and each has its own type:
//!
//! - [`Error`] for loading and batch-fatal conditions,
//! - [`RecordError`] for failures that drop a single record from a batch,
//! - [`FieldError`] for failures that only null out a single field.

use thiserror::Error;

/// Result type alias for recast-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in recast-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Failed to parse YAML configuration
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// Description of what's invalid
        message: String,
    },

    /// No transform definition matched the requested name or id
    #[error("transform not found: {name}")]
    TransformNotFound {
        /// Name or id that was requested
        name: String,
    },

    /// Inactive definitions must not be executed
    #[error("transform '{name}' is not active")]
    InactiveTransform {
        /// Name of the transform
        name: String,
    },

    /// The transform configuration carries no field mappings at all
    #[error("transform '{name}' has no field_mappings")]
    MissingFieldMappings {
        /// Name of the transform
        name: String,
    },

    /// A line of a JSONL input could not be parsed
    #[error("invalid JSON on line {line}: {source}")]
    InputLine {
        /// 1-based line number
        line: usize,
        /// Underlying parse error
        source: serde_json::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A failure confined to one output field.
///
/// The transformer degrades these to `null` and logs them; they never reach
/// the batch error list.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    /// Function name is not in the registry
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// A parameter had the wrong shape for the function
    #[error("function '{function}': invalid parameter '{param}': {message}")]
    InvalidParam {
        /// Function name
        function: String,
        /// Parameter name
        param: String,
        /// Description of the problem
        message: String,
    },

    /// The function ran but could not produce a value
    #[error("function '{function}' failed: {message}")]
    FunctionFailed {
        /// Function name
        function: String,
        /// Description of the failure
        message: String,
    },

    /// A value could not be coerced to the declared attribute type
    #[error("cannot coerce {value} to {target_type}")]
    Coercion {
        /// Rendered value
        value: String,
        /// Declared target type
        target_type: String,
    },

    /// A declarative validation rule rejected the value
    #[error("rule '{rule}' failed: {message}")]
    RuleViolation {
        /// Rule name
        rule: String,
        /// Description of the violation
        message: String,
    },
}

/// A failure that removes one record from the batch output.
///
/// The executor isolates these as `transform_error` entries and moves on to
/// the next record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    /// Input record is not a JSON object
    #[error("record is not a JSON object (got {0})")]
    NotAnObject(&'static str),

    /// Post-mapping function step names a function that does not exist
    #[error("unknown function '{function}' for target field '{target_field}'")]
    UnknownFunction {
        /// Function name
        function: String,
        /// Target field of the step
        target_field: String,
    },
}
