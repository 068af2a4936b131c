//! Initialize a new Recast project

use anyhow::Result;
use recast_core::config::PROJECT_FILE;
use std::fs;
use std::path::Path;

const EXAMPLE_TRANSFORM: &str = r#"# Example transform
id: tr_example
name: example
description: Normalise contact records

transform_type: record

source_schema:
  fields:
    - name: name
      type: string
    - name: email
      type: string
    - name: age
      type: float

target_schema:
  fields:
    - name: full_name
      type: string
      required: true
    - name: email
      type: string
      required: true
    - name: age
      type: integer

transform_config:
  field_mappings:
    full_name:
      source_field: name
      function: trim
    email:
      source_field: email
      function: lower_case
    age:
      source_field: age
      function: to_integer

  # Applied in order, after every mapping
  functions:
    - function: regex_replace
      target_field: full_name
      source_fields: [full_name]
      params:
        pattern: '\s+'
        replacement: " "
"#;

const SAMPLE_DATA: &str = r#"{"name": "  Alice   Johnson ", "email": "ALICE@EXAMPLE.COM", "age": 34}
{"name": "Bob Smith", "email": "Bob@Example.com", "age": 27.6}
{"name": "Carol Williams", "email": "carol@example.com"}
"#;

/// Run the init command
pub async fn run(path: &str, name: Option<&str>) -> Result<()> {
    let project_dir = Path::new(path);

    // Create directory if it doesn't exist
    if !project_dir.exists() {
        fs::create_dir_all(project_dir)?;
    }

    let abs_path = project_dir.canonicalize()?;

    // Derive project name from directory name if not provided
    let project_name = match name {
        Some(n) => n.to_string(),
        None => abs_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Could not determine project name from path"))?,
    };

    if project_dir.join(PROJECT_FILE).exists() {
        anyhow::bail!(
            "Directory '{}' already contains a {}",
            project_dir.display(),
            PROJECT_FILE
        );
    }

    tracing::info!("Creating new Recast project: {}", project_name);

    fs::create_dir_all(project_dir.join("transforms"))?;
    fs::create_dir_all(project_dir.join("data"))?;

    let config = format!(
        r#"# Recast Project Configuration
name: {project_name}
version: "0.1.0"

execution:
  validate_output: true
  workers: 1
  chunk_size: 500

preview:
  max_samples: 10

logging:
  format: text
"#
    );
    fs::write(project_dir.join(PROJECT_FILE), config)?;
    fs::write(project_dir.join("transforms/example.yaml"), EXAMPLE_TRANSFORM)?;
    fs::write(project_dir.join("data/input.jsonl"), SAMPLE_DATA)?;

    let gitignore = r#"# Output files
data/output*.jsonl

# IDE
.idea/
.vscode/
*.swp
"#;
    fs::write(project_dir.join(".gitignore"), gitignore)?;

    tracing::info!(
        "✓ Created project '{}' at {}",
        project_name,
        abs_path.display()
    );
    tracing::info!("");
    tracing::info!("Next steps:");
    if path != "." {
        tracing::info!("  cd {}", project_dir.display());
    }
    tracing::info!("  recast validate                        # Check definitions");
    tracing::info!("  recast preview --transform example     # Try it on the sample data");
    tracing::info!("  recast run --transform example         # Transform data/input.jsonl");

    Ok(())
}
