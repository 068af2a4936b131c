//! Preview a transform over sample records

use anyhow::{Context, Result};
use recast_core::TransformService;
use recast_core::io::read_jsonl_file;

use super::{DEFAULT_INPUT, load_project};

/// Run the preview command
pub async fn run(
    config_path: &str,
    transform: &str,
    input: Option<&str>,
    max_samples: Option<usize>,
) -> Result<()> {
    let config = load_project(config_path)?;
    let definition = config
        .find_definition(transform)
        .context("Failed to load transform")?;

    let input_path = config.resolve(input.unwrap_or(DEFAULT_INPUT));
    let mut samples = read_jsonl_file(&input_path)
        .with_context(|| format!("Failed to read {}", input_path.display()))?;

    let service = TransformService::from_project(&config.project);
    let max_samples = max_samples.unwrap_or(service.max_samples());
    samples.truncate(max_samples);
    let result = service.preview_definition(&definition, &samples, Some(max_samples));

    tracing::info!(
        "Previewed {} samples: {} ok, {} failed",
        result.summary.total_samples,
        result.summary.successful,
        result.summary.failed
    );
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
