//! Batch execution
//!
//! [`TransformExecutor`] runs a definition over a batch of records. Records
//! are processed sequentially and in order; a record that fails is reported
//! in `errors` under its index and the batch moves on. Only a problem with
//! the definition itself aborts the batch, and even then the caller gets an
//! [`ExecutionResult`] back rather than an error.
//!
//! [`TransformExecutor::preview`] runs the same per-record transform over a
//! handful of samples for interactive authoring. [`preview`] does the same
//! for a bare configuration that has no attribute transforms.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

use crate::definition::{Record, TransformConfig, TransformDefinition};
use crate::error::{Error, Result};
use crate::output::OutputValidator;
use crate::schema::Schema;
use crate::transformer::{RecordTransformer, TransformedRecord};

/// Default cap on preview samples
pub const DEFAULT_PREVIEW_SAMPLES: usize = 10;

/// Batch execution options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Check each output record against the target schema
    pub validate_output: bool,
    /// Compute outputs but do not return them
    pub dry_run: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            validate_output: true,
            dry_run: false,
        }
    }
}

/// Per-record output validation outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordValidation {
    /// Index of the record in the input batch
    pub record_index: usize,
    /// Whether the output satisfied the target schema
    pub valid: bool,
    /// Violations, empty when valid
    pub errors: Vec<String>,
}

/// An entry in the batch error list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchError {
    /// The record could not be transformed and was dropped
    TransformError {
        /// Index of the record in the input batch
        record_index: usize,
        /// Error message
        error: String,
    },
    /// The record was transformed but failed output validation
    ValidationError {
        /// Index of the record in the input batch
        record_index: usize,
        /// Violations
        errors: Vec<String>,
    },
    /// The batch could not run at all
    ExecutionError {
        /// Error message
        error: String,
    },
}

impl BatchError {
    /// Index of the offending record, if the error is record-level
    pub fn record_index(&self) -> Option<usize> {
        match self {
            Self::TransformError { record_index, .. }
            | Self::ValidationError { record_index, .. } => Some(*record_index),
            Self::ExecutionError { .. } => None,
        }
    }

    /// Shift the record index, for merging results of sub-batches
    pub fn offset(mut self, by: usize) -> Self {
        match &mut self {
            Self::TransformError { record_index, .. }
            | Self::ValidationError { record_index, .. } => *record_index += by,
            Self::ExecutionError { .. } => {}
        }
        self
    }
}

/// Aggregate statistics for a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStats {
    /// Records supplied
    pub input_count: usize,
    /// Records transformed successfully (counted even on dry runs)
    pub output_count: usize,
    /// Entries in the error list
    pub error_count: usize,
    /// Wall-clock time for the whole batch, validation included
    pub execution_time_ms: f64,
    /// `(input_count - error_count) / input_count`, 0 for an empty batch
    pub success_rate: f64,
    /// Set when the batch aborted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionStats {
    /// Compute the success rate from the counts
    pub fn rate(input_count: usize, error_count: usize) -> f64 {
        if input_count == 0 {
            return 0.0;
        }
        input_count.saturating_sub(error_count) as f64 / input_count as f64
    }
}

/// Outcome of a batch execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// True only if no record-level error occurred
    pub success: bool,
    /// Output records in input order; `None` on dry runs
    pub transformed_data: Option<Vec<Record>>,
    /// Per-record validation, when requested
    #[serde(default)]
    pub validation_results: Vec<RecordValidation>,
    /// Aggregate statistics
    pub execution_stats: ExecutionStats,
    /// Record-level errors in input order
    pub errors: Vec<BatchError>,
}

impl ExecutionResult {
    /// Result for a batch that could not run
    pub fn aborted(error: &Error, input_count: usize) -> Self {
        let message = error.to_string();
        Self {
            success: false,
            transformed_data: None,
            validation_results: Vec::new(),
            execution_stats: ExecutionStats {
                input_count,
                error: Some(message.clone()),
                ..Default::default()
            },
            errors: vec![BatchError::ExecutionError { error: message }],
        }
    }
}

/// Runs a transform definition over batches of records
#[derive(Debug, Clone, Copy)]
pub struct TransformExecutor<'a> {
    definition: &'a TransformDefinition,
}

impl<'a> TransformExecutor<'a> {
    /// Create an executor for a definition
    pub fn new(definition: &'a TransformDefinition) -> Self {
        Self { definition }
    }

    /// Execute over a batch. Never fails: batch-fatal problems are folded
    /// into the returned result.
    pub fn execute(&self, records: &[Value], options: ExecuteOptions) -> ExecutionResult {
        match self.try_execute(records, options) {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Transform '{}' aborted: {}", self.definition.name, e);
                ExecutionResult::aborted(&e, records.len())
            }
        }
    }

    /// Check the conditions that would abort a whole batch
    pub fn check(&self) -> Result<()> {
        let definition = self.definition;
        if !definition.is_active {
            return Err(Error::InactiveTransform {
                name: definition.name.clone(),
            });
        }
        if definition.transform_config.field_mappings.is_none() {
            return Err(Error::MissingFieldMappings {
                name: definition.name.clone(),
            });
        }
        Ok(())
    }

    fn try_execute(&self, records: &[Value], options: ExecuteOptions) -> Result<ExecutionResult> {
        self.check()?;
        let definition = self.definition;

        let transformer = RecordTransformer::new(&definition.transform_config)
            .with_attributes(&definition.attribute_transforms);

        let started = Instant::now();
        let mut transformed = Vec::new();
        let mut validation_results = Vec::new();
        let mut errors = Vec::new();
        let mut output_count = 0;

        for (index, input) in records.iter().enumerate() {
            let TransformedRecord {
                record: output,
                required_failures,
            } = match transformer.transform_record(input) {
                Ok(transformed) => transformed,
                Err(e) => {
                    tracing::debug!("Record {} failed: {}", index, e);
                    errors.push(BatchError::TransformError {
                        record_index: index,
                        error: e.to_string(),
                    });
                    continue;
                }
            };
            output_count += 1;

            if options.validate_output {
                let mut violations = required_failures;
                violations.extend(
                    OutputValidator::validate(&output, &definition.target_schema).errors,
                );
                let valid = violations.is_empty();
                if !valid {
                    errors.push(BatchError::ValidationError {
                        record_index: index,
                        errors: violations.clone(),
                    });
                }
                validation_results.push(RecordValidation {
                    record_index: index,
                    valid,
                    errors: violations,
                });
            }

            if !options.dry_run {
                transformed.push(output);
            }
        }

        let execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        let stats = ExecutionStats {
            input_count: records.len(),
            output_count,
            error_count: errors.len(),
            execution_time_ms,
            success_rate: ExecutionStats::rate(records.len(), errors.len()),
            error: None,
        };

        tracing::info!(
            "Transform '{}': {} in, {} out, {} errors in {:.2}ms",
            definition.name,
            stats.input_count,
            stats.output_count,
            stats.error_count,
            stats.execution_time_ms
        );

        Ok(ExecutionResult {
            success: errors.is_empty(),
            transformed_data: (!options.dry_run).then_some(transformed),
            validation_results,
            execution_stats: stats,
            errors,
        })
    }
}

/// One previewed sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewSample {
    /// The sample as supplied
    pub input: Value,
    /// Transformed output, when the transform succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Record>,
    /// Whether the transform succeeded
    pub success: bool,
    /// Transform error, when it failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Source schema violations of the input
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_errors: Vec<String>,
    /// Failed required attributes and target schema violations of the output
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<String>,
}

/// Preview counts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviewSummary {
    /// Samples processed
    pub total_samples: usize,
    /// Samples that transformed
    pub successful: usize,
    /// Samples that failed
    pub failed: usize,
}

/// Outcome of a preview run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewResult {
    /// True when every processed sample transformed
    pub success: bool,
    /// Per-sample outcomes in input order
    pub preview_results: Vec<PreviewSample>,
    /// Counts
    pub summary: PreviewSummary,
}

/// Transform every sample one by one, without batch aggregation.
///
/// The sample cap is the caller's job: slice `samples` to at most
/// [`DEFAULT_PREVIEW_SAMPLES`] (or the project's `preview.max_samples`)
/// before calling.
pub fn preview(
    config: &TransformConfig,
    source_schema: &Schema,
    target_schema: &Schema,
    samples: &[Value],
) -> PreviewResult {
    run_preview(
        RecordTransformer::new(config),
        source_schema,
        target_schema,
        samples,
    )
}

impl TransformExecutor<'_> {
    /// Preview the full definition, attribute transforms included, so each
    /// sample comes out exactly as [`execute`](Self::execute) would produce
    /// it. The same sample cap precondition as [`preview`] applies.
    pub fn preview(&self, samples: &[Value]) -> PreviewResult {
        let definition = self.definition;
        run_preview(
            RecordTransformer::new(&definition.transform_config)
                .with_attributes(&definition.attribute_transforms),
            &definition.source_schema,
            &definition.target_schema,
            samples,
        )
    }
}

fn run_preview(
    transformer: RecordTransformer<'_>,
    source_schema: &Schema,
    target_schema: &Schema,
    samples: &[Value],
) -> PreviewResult {
    let mut summary = PreviewSummary::default();

    let preview_results: Vec<PreviewSample> = samples
        .iter()
        .map(|input| {
            summary.total_samples += 1;
            let input_errors = match input {
                Value::Object(sample) => OutputValidator::validate(sample, source_schema).errors,
                _ => Vec::new(),
            };
            match transformer.transform_record(input) {
                Ok(TransformedRecord {
                    record,
                    required_failures,
                }) => {
                    summary.successful += 1;
                    let mut validation_errors = required_failures;
                    validation_errors
                        .extend(OutputValidator::validate(&record, target_schema).errors);
                    PreviewSample {
                        input: input.clone(),
                        output: Some(record),
                        success: true,
                        error: None,
                        input_errors,
                        validation_errors,
                    }
                }
                Err(e) => {
                    summary.failed += 1;
                    PreviewSample {
                        input: input.clone(),
                        output: None,
                        success: false,
                        error: Some(e.to_string()),
                        input_errors,
                        validation_errors: Vec::new(),
                    }
                }
            }
        })
        .collect();

    PreviewResult {
        success: summary.failed == 0,
        preview_results,
        summary,
    }
}
