//! Chunked batch execution engine

use anyhow::Context;
use futures::stream::{self, StreamExt};
use recast_core::{
    ExecuteOptions, ExecutionResult, ExecutionStats, ProjectConfig, TransformDefinition,
    TransformExecutor,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::jobs::BatchJob;

/// Runtime engine for executing batches
#[derive(Debug, Clone)]
pub struct Runtime {
    workers: usize,
    chunk_size: usize,
    timeout: Option<Duration>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(1, 500)
    }
}

impl Runtime {
    /// Create a runtime; zero values are raised to one
    pub fn new(workers: usize, chunk_size: usize) -> Self {
        Self {
            workers: workers.max(1),
            chunk_size: chunk_size.max(1),
            timeout: None,
        }
    }

    /// Create a runtime from a project's execution settings
    pub fn from_project(project: &ProjectConfig) -> Self {
        let execution = &project.execution;
        let runtime = Self::new(execution.workers, execution.chunk_size);
        match execution.timeout_secs {
            Some(secs) => runtime.with_timeout(Duration::from_secs(secs)),
            None => runtime,
        }
    }

    /// Abort batches that run longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Concurrent chunk limit
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Records per chunk
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Run a job against the definition it names
    pub async fn run(
        &self,
        job: BatchJob,
        definition: Arc<TransformDefinition>,
    ) -> Result<ExecutionResult> {
        anyhow::ensure!(
            job.transform == definition.name || job.transform == definition.id,
            "job targets transform '{}' but definition is '{}'",
            job.transform,
            definition.name
        );
        if let Some(source) = &job.source {
            tracing::info!("Running '{}' over {}", definition.name, source);
        }
        self.execute(definition, job.records, job.options.into())
            .await
    }

    /// Execute a definition over a batch.
    ///
    /// The result is the one a single sequential execution would produce,
    /// apart from `execution_time_ms`.
    pub async fn execute(
        &self,
        definition: Arc<TransformDefinition>,
        records: Vec<Value>,
        options: ExecuteOptions,
    ) -> Result<ExecutionResult> {
        let name = definition.name.clone();
        let run = self.execute_chunks(definition, records, options);
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .with_context(|| format!("transform '{}' timed out after {:?}", name, limit))?,
            None => run.await,
        }
    }

    async fn execute_chunks(
        &self,
        definition: Arc<TransformDefinition>,
        records: Vec<Value>,
        options: ExecuteOptions,
    ) -> Result<ExecutionResult> {
        let input_count = records.len();
        if let Err(e) = TransformExecutor::new(&definition).check() {
            tracing::error!("Transform '{}' aborted: {}", definition.name, e);
            return Ok(ExecutionResult::aborted(&e, input_count));
        }

        let started = Instant::now();
        let chunks = split(records, self.chunk_size);
        tracing::info!(
            "Executing '{}': {} records in {} chunks on {} workers",
            definition.name,
            input_count,
            chunks.len(),
            self.workers
        );

        let results = stream::iter(chunks)
            .map(|(offset, chunk)| {
                let definition = Arc::clone(&definition);
                async move {
                    let result = tokio::task::spawn_blocking(move || {
                        TransformExecutor::new(&definition).execute(&chunk, options)
                    })
                    .await
                    .with_context(|| format!("chunk starting at record {} failed", offset))?;
                    Ok::<_, anyhow::Error>((offset, result))
                }
            })
            .buffered(self.workers)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        let mut merged = merge(results, input_count, options);
        merged.execution_stats.execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        tracing::info!(
            "Transform '{}': {} in, {} out, {} errors in {:.2}ms",
            definition.name,
            merged.execution_stats.input_count,
            merged.execution_stats.output_count,
            merged.execution_stats.error_count,
            merged.execution_stats.execution_time_ms
        );
        Ok(merged)
    }
}

/// Split records into `(offset, chunk)` pairs
fn split(records: Vec<Value>, chunk_size: usize) -> Vec<(usize, Vec<Value>)> {
    let mut chunks = Vec::new();
    let mut remaining = records.into_iter();
    let mut offset = 0;
    loop {
        let chunk: Vec<Value> = remaining.by_ref().take(chunk_size).collect();
        if chunk.is_empty() {
            break;
        }
        let len = chunk.len();
        chunks.push((offset, chunk));
        offset += len;
    }
    chunks
}

/// Merge chunk results, in chunk order, into one batch result
fn merge(
    chunks: Vec<(usize, ExecutionResult)>,
    input_count: usize,
    options: ExecuteOptions,
) -> ExecutionResult {
    let mut transformed = (!options.dry_run).then(Vec::new);
    let mut validation_results = Vec::new();
    let mut errors = Vec::new();
    let mut output_count = 0;

    for (offset, result) in chunks {
        output_count += result.execution_stats.output_count;
        if let (Some(all), Some(data)) = (transformed.as_mut(), result.transformed_data) {
            all.extend(data);
        }
        validation_results.extend(result.validation_results.into_iter().map(|mut v| {
            v.record_index += offset;
            v
        }));
        errors.extend(result.errors.into_iter().map(|e| e.offset(offset)));
    }

    let error_count = errors.len();
    ExecutionResult {
        success: errors.is_empty(),
        transformed_data: transformed,
        validation_results,
        execution_stats: ExecutionStats {
            input_count,
            output_count,
            error_count,
            execution_time_ms: 0.0,
            success_rate: ExecutionStats::rate(input_count, error_count),
            error: None,
        },
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recast_core::BatchError;
    use rstest::rstest;
    use serde_json::json;

    fn definition() -> Arc<TransformDefinition> {
        let definition = TransformDefinition::from_json(json!({
            "id": "tr_people",
            "name": "people",
            "transform_type": "record",
            "source_schema": {"fields": [{"name": "name"}, {"name": "age"}]},
            "target_schema": {"fields": [
                {"name": "full_name", "required": true},
                {"name": "age_str", "type": "string"}
            ]},
            "transform_config": {
                "field_mappings": {
                    "full_name": "name",
                    "age_str": {"source_field": "age", "function": "to_string"}
                }
            }
        }))
        .unwrap();
        Arc::new(definition)
    }

    /// Every third record is not an object, every fifth lacks a name
    fn records(n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| match i {
                i if i % 3 == 2 => json!(i),
                i if i % 5 == 4 => json!({"age": i}),
                i => json!({"name": format!("person-{}", i), "age": i}),
            })
            .collect()
    }

    fn without_timing(mut result: ExecutionResult) -> ExecutionResult {
        result.execution_stats.execution_time_ms = 0.0;
        result
    }

    #[rstest]
    #[case(1, 500)]
    #[case(2, 3)]
    #[case(4, 1)]
    #[case(3, 7)]
    #[tokio::test]
    async fn test_chunked_matches_sequential(#[case] workers: usize, #[case] chunk_size: usize) {
        let definition = definition();
        let input = records(40);
        let sequential =
            TransformExecutor::new(&definition).execute(&input, ExecuteOptions::default());

        let chunked = Runtime::new(workers, chunk_size)
            .execute(definition, input, ExecuteOptions::default())
            .await
            .unwrap();

        assert_eq!(without_timing(chunked), without_timing(sequential));
    }

    #[tokio::test]
    async fn test_error_indices_are_global() {
        let result = Runtime::new(2, 4)
            .execute(definition(), records(10), ExecuteOptions::default())
            .await
            .unwrap();

        let transform_errors: Vec<_> = result
            .errors
            .iter()
            .filter(|e| matches!(e, BatchError::TransformError { .. }))
            .filter_map(BatchError::record_index)
            .collect();
        assert_eq!(transform_errors, vec![2, 5, 8]);

        let validation_errors: Vec<_> = result
            .errors
            .iter()
            .filter(|e| matches!(e, BatchError::ValidationError { .. }))
            .filter_map(BatchError::record_index)
            .collect();
        assert_eq!(validation_errors, vec![4, 9]);
        assert_eq!(result.execution_stats.output_count, 7);
    }

    #[tokio::test]
    async fn test_dry_run_and_empty_batch() {
        let options = ExecuteOptions {
            validate_output: true,
            dry_run: true,
        };
        let result = Runtime::new(2, 2)
            .execute(definition(), records(6), options)
            .await
            .unwrap();
        assert!(result.transformed_data.is_none());
        assert_eq!(result.execution_stats.output_count, 4);

        let result = Runtime::default()
            .execute(definition(), vec![], ExecuteOptions::default())
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.transformed_data, Some(vec![]));
        assert_eq!(result.execution_stats.success_rate, 0.0);
    }

    #[tokio::test]
    async fn test_inactive_definition_aborts_once() {
        let mut inactive = (*definition()).clone();
        inactive.is_active = false;

        let result = Runtime::new(4, 1)
            .execute(Arc::new(inactive), records(5), ExecuteOptions::default())
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.errors.len(), 1);
        assert!(matches!(result.errors[0], BatchError::ExecutionError { .. }));
        assert_eq!(result.execution_stats.input_count, 5);
        assert!(result.execution_stats.error.is_some());
    }

    #[tokio::test]
    async fn test_run_job() {
        let runtime = Runtime::new(2, 2);
        let job = BatchJob::new("tr_people", vec![json!({"name": "Ana", "age": 30})])
            .with_source("inline");
        let result = runtime.run(job, definition()).await.unwrap();
        let data = result.transformed_data.unwrap();
        assert_eq!(data[0]["full_name"], "Ana");
        assert_eq!(data[0]["age_str"], "30");

        let job = BatchJob::new("orders", vec![]);
        assert!(runtime.run(job, definition()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_aborts_batch() {
        let err = Runtime::new(1, 1)
            .with_timeout(Duration::ZERO)
            .execute(definition(), records(50), ExecuteOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"), "{}", err);
        assert!(err.to_string().contains("people"), "{}", err);
    }

    #[tokio::test]
    async fn test_batch_within_timeout_completes() {
        let result = Runtime::new(2, 5)
            .with_timeout(Duration::from_secs(60))
            .execute(definition(), records(10), ExecuteOptions::default())
            .await
            .unwrap();
        assert_eq!(result.execution_stats.input_count, 10);
    }

    #[test]
    fn test_split_offsets() {
        let chunks = split(records(7), 3);
        let offsets: Vec<_> = chunks.iter().map(|(o, c)| (*o, c.len())).collect();
        assert_eq!(offsets, vec![(0, 3), (3, 3), (6, 1)]);
        assert!(split(vec![], 3).is_empty());
    }

    #[test]
    fn test_from_project() {
        let project: ProjectConfig = serde_json::from_value(json!({
            "name": "t",
            "execution": {"workers": 8, "chunk_size": 100, "timeout_secs": 5}
        }))
        .unwrap();
        let runtime = Runtime::from_project(&project);
        assert_eq!(runtime.workers(), 8);
        assert_eq!(runtime.chunk_size(), 100);
        assert_eq!(runtime.timeout, Some(Duration::from_secs(5)));
    }
}
