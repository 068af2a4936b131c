//! Validate transform definitions command

use anyhow::{Context, Result};
use recast_core::TransformService;

use super::load_project;

/// Run the validate command
pub async fn run(config_path: &str, transform: Option<&str>) -> Result<()> {
    let config = load_project(config_path)?;

    tracing::info!("✓ Project: {}", config.project.name);
    tracing::info!("✓ Version: {}", config.project.version);

    let files = match transform {
        Some(name) => {
            let definition = config
                .find_definition(name)
                .context("Failed to load transform")?;
            vec![(name.to_string(), Ok(definition))]
        }
        None => config
            .definition_files()
            .context("Failed to list transforms")?
            .into_iter()
            .map(|file| (file.path.display().to_string(), file.definition))
            .collect(),
    };

    if files.is_empty() {
        tracing::warn!("No transforms found in {}", config.transforms_dir().display());
    }

    let service = TransformService::from_project(&config.project);
    let mut invalid = 0;
    for (source, definition) in &files {
        let definition = match definition {
            Ok(definition) => definition,
            Err(e) => {
                invalid += 1;
                tracing::error!("✗ Could not load {}", source);
                tracing::error!("  {}", e);
                continue;
            }
        };

        let report = service.validate_definition(definition);
        for warning in &report.warnings {
            tracing::warn!("  {}: {}", definition.name, warning);
        }
        if report.valid {
            tracing::info!("✓ Transform '{}' is valid", definition.name);
        } else {
            invalid += 1;
            tracing::error!("✗ Transform '{}' is invalid", definition.name);
            for error in &report.errors {
                tracing::error!("  {}", error);
            }
        }
    }

    if invalid > 0 {
        anyhow::bail!("{} of {} transforms are invalid", invalid, files.len());
    }

    tracing::info!("✓ Configuration is valid");
    Ok(())
}
