//! Show project status command

use anyhow::{Context, Result};

use super::load_project;

/// Run the status command
pub async fn run(config_path: &str) -> Result<()> {
    let config = load_project(config_path)?;
    let files = config
        .definition_files()
        .context("Failed to list transforms")?;

    let project = &config.project;
    println!("Project:   {} ({})", project.name, project.version);
    println!("Location:  {}", config.base_path.display());
    println!(
        "Execution: {} workers, chunks of {}, validate_output={}",
        project.execution.workers, project.execution.chunk_size, project.execution.validate_output
    );
    println!("Transforms ({}):", files.len());
    for file in &files {
        match &file.definition {
            Ok(definition) => println!(
                "  {:<24} {:<16} {:<8} {}",
                definition.name,
                definition.id,
                definition.transform_type,
                if definition.is_active { "active" } else { "inactive" }
            ),
            Err(_) => println!("  {:<24} unreadable", file.path.display().to_string()),
        }
    }
    Ok(())
}
