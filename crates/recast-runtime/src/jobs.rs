//! Batch job definitions

use recast_core::ExecuteOptions;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Job to execute a transform over a batch of records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJob {
    /// Transform name or id
    pub transform: String,

    /// Input records
    pub records: Vec<Value>,

    /// Execution options
    #[serde(default)]
    pub options: JobOptions,

    /// Where the records came from, for logging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Job execution options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobOptions {
    /// Validate outputs against the target schema
    #[serde(default = "default_true")]
    pub validate_output: bool,

    /// Compute outputs but do not return them
    #[serde(default)]
    pub dry_run: bool,
}

fn default_true() -> bool {
    true
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            validate_output: true,
            dry_run: false,
        }
    }
}

impl From<JobOptions> for ExecuteOptions {
    fn from(options: JobOptions) -> Self {
        Self {
            validate_output: options.validate_output,
            dry_run: options.dry_run,
        }
    }
}

impl BatchJob {
    /// Create a new batch job
    pub fn new(transform: impl Into<String>, records: Vec<Value>) -> Self {
        Self {
            transform: transform.into(),
            records,
            options: JobOptions::default(),
            source: None,
        }
    }

    /// Set whether outputs are validated
    pub fn with_validate_output(mut self, validate_output: bool) -> Self {
        self.options.validate_output = validate_output;
        self
    }

    /// Set whether outputs are discarded
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.options.dry_run = dry_run;
        self
    }

    /// Set the record source
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_options_default() {
        let options = JobOptions::default();
        assert!(options.validate_output);
        assert!(!options.dry_run);
        assert_eq!(ExecuteOptions::from(options), ExecuteOptions::default());
    }

    #[test]
    fn test_batch_job_new() {
        let job = BatchJob::new("people", vec![json!({"name": "Ana"})]);
        assert_eq!(job.transform, "people");
        assert_eq!(job.records.len(), 1);
        assert!(job.source.is_none());
    }

    #[test]
    fn test_batch_job_chained_builders() {
        let job = BatchJob::new("people", vec![])
            .with_validate_output(false)
            .with_dry_run(true)
            .with_source("data/input.jsonl");

        assert!(!job.options.validate_output);
        assert!(job.options.dry_run);
        assert_eq!(job.source.as_deref(), Some("data/input.jsonl"));
    }

    #[test]
    fn test_batch_job_deserialize_defaults() {
        let job: BatchJob =
            serde_json::from_value(json!({"transform": "people", "records": [1, 2]})).unwrap();
        assert_eq!(job.options, JobOptions::default());
        assert_eq!(job.records, vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_batch_job_serialization() {
        let job = BatchJob::new("people", vec![json!({"a": 1})]).with_dry_run(true);

        let serialized = serde_json::to_string(&job).unwrap();
        let deserialized: BatchJob = serde_json::from_str(&serialized).unwrap();

        assert_eq!(deserialized.transform, job.transform);
        assert_eq!(deserialized.records, job.records);
        assert_eq!(deserialized.options, job.options);
        assert!(!serialized.contains("source"));
    }
}
