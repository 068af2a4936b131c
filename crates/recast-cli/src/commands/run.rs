//! Run a transform over a JSONL file

use anyhow::{Context, Result};
use recast_core::io::{read_jsonl_file, write_jsonl, write_jsonl_file};
use recast_runtime::{BatchJob, Runtime};
use std::sync::Arc;

use super::{DEFAULT_INPUT, load_project};

/// Run the transform
pub async fn run(
    config_path: &str,
    transform: &str,
    input: Option<&str>,
    output: Option<&str>,
    dry_run: bool,
    no_validate: bool,
) -> Result<()> {
    let config = load_project(config_path)?;
    tracing::info!("Project: {}", config.project.name);

    let definition = config
        .find_definition(transform)
        .context("Failed to load transform")?;

    let input_path = config.resolve(input.unwrap_or(DEFAULT_INPUT));
    let records = read_jsonl_file(&input_path)
        .with_context(|| format!("Failed to read {}", input_path.display()))?;

    let validate_output = config.project.execution.validate_output && !no_validate;
    let job = BatchJob::new(transform, records)
        .with_validate_output(validate_output)
        .with_dry_run(dry_run)
        .with_source(input_path.display().to_string());

    let runtime = Runtime::from_project(&config.project);
    let result = runtime
        .run(job, Arc::new(definition))
        .await
        .context("Runtime error")?;

    if let Some(error) = &result.execution_stats.error {
        anyhow::bail!("Transform '{}' aborted: {}", transform, error);
    }

    for error in &result.errors {
        tracing::warn!("{}", serde_json::to_string(error)?);
    }

    if let Some(data) = &result.transformed_data {
        match output {
            Some(path) => {
                let output_path = config.resolve(path);
                write_jsonl_file(&output_path, data)
                    .with_context(|| format!("Failed to write {}", output_path.display()))?;
                tracing::info!("Wrote {} records to {}", data.len(), output_path.display());
            }
            None => write_jsonl(std::io::stdout().lock(), data)?,
        }
    }

    let stats = &result.execution_stats;
    tracing::info!(
        "{} {} in, {} out, {} errors ({:.1}% success) in {:.2}ms",
        if result.success { "✓" } else { "✗" },
        stats.input_count,
        stats.output_count,
        stats.error_count,
        stats.success_rate * 100.0,
        stats.execution_time_ms
    );
    Ok(())
}
