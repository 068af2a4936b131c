//! Integration tests for the project-to-output pipeline
//!
//! Tests use temporary directories with real file fixtures to verify:
//! - Project config and definition loading
//! - Validation of loaded definitions
//! - Batch execution from JSONL input to JSONL output
//! - Record-level isolation across a mixed batch

use recast_core::config::PROJECT_FILE;
use recast_core::io::{read_jsonl_file, write_jsonl_file};
use recast_core::{BatchError, Config, ExecuteOptions, TransformExecutor, TransformService};
use rstest::rstest;
use serde_json::{Value, json};
use tempfile::TempDir;

const CUSTOMERS: &str = r#"
id: tr_customers
name: customers
description: Normalise customer exports
transform_type: record
source_schema:
  fields:
    - name: name
      type: string
    - name: email
      type: string
    - name: balance
      type: float
    - name: signup
      type: date
target_schema:
  fields:
    - name: full_name
      type: string
      required: true
    - name: email
      type: string
      required: true
    - name: balance
      type: float
    - name: signup_month
      type: string
transform_config:
  field_mappings:
    full_name:
      source_field: name
      function: trim
    email:
      source_field: email
      function: lower_case
    balance:
      source_field: balance
      default_value: 0
      function: round
      params:
        decimals: 2
    signup_month:
      source_field: signup
      function: format_date
      params:
        format: "%Y-%m"
  functions:
    - function: upper_case
      target_field: full_name
      source_fields: [full_name]
attribute_transforms:
  - field_name: email
    transform_function: trim
    is_required: true
    validation_rules:
      - rule: pattern
        value: "^[^@]+@[^@]+$"
"#;

/// Helper to create a temporary project directory with one definition
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("transforms")).unwrap();
    std::fs::create_dir_all(dir.path().join("data")).unwrap();
    std::fs::write(
        dir.path().join(PROJECT_FILE),
        "name: integration-test\nexecution:\n  workers: 2\n  chunk_size: 2\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("transforms/customers.yaml"), CUSTOMERS).unwrap();
    dir
}

fn input() -> Vec<Value> {
    vec![
        json!({"name": "  ana  ", "email": "ANA@EXAMPLE.COM", "balance": 10.456, "signup": "2024-03-15"}),
        json!({"name": "bo", "email": "not-an-email", "balance": 3}),
        json!("garbage"),
        json!({"name": "cy", "email": "Cy@Example.com", "signup": "15/03/2024"}),
    ]
}

#[test]
fn test_loaded_definition_validates() {
    let dir = setup_project();
    let config = Config::load(dir.path()).unwrap();
    assert_eq!(config.project.name, "integration-test");
    assert_eq!(config.project.execution.chunk_size, 2);

    let definition = config.find_definition("customers").unwrap();
    let report = TransformService::from_project(&config.project).validate_definition(&definition);
    assert!(report.valid, "{:?}", report.errors);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
}

#[test]
fn test_jsonl_pipeline() {
    let dir = setup_project();
    let config = Config::load(dir.path()).unwrap();
    let definition = config.find_definition("tr_customers").unwrap();

    let input_path = dir.path().join("data/input.jsonl");
    write_jsonl_file(&input_path, &input()).unwrap();
    let records = read_jsonl_file(&input_path).unwrap();

    let result = TransformExecutor::new(&definition).execute(&records, ExecuteOptions::default());

    assert!(!result.success);
    assert_eq!(result.execution_stats.input_count, 4);
    assert_eq!(result.execution_stats.output_count, 3);
    assert_eq!(result.execution_stats.error_count, 2);
    assert_eq!(result.execution_stats.success_rate, 0.5);

    let failed: Vec<_> = result.errors.iter().map(BatchError::record_index).collect();
    assert_eq!(failed, vec![Some(1), Some(2)]);
    assert!(matches!(result.errors[1], BatchError::TransformError { .. }));

    // A failed required attribute nulls the field and surfaces as a validation error
    match &result.errors[0] {
        BatchError::ValidationError { errors, .. } => {
            assert!(errors[0].starts_with("Required attribute failed: email"));
            assert!(errors.contains(&"Missing required field: email".to_string()));
        }
        other => panic!("Expected validation error, got {:?}", other),
    }

    let data = result.transformed_data.unwrap();
    assert_eq!(
        Value::Object(data[0].clone()),
        json!({
            "full_name": "ANA",
            "email": "ana@example.com",
            "balance": 10.46,
            "signup_month": "2024-03"
        })
    );
    assert_eq!(data[1]["full_name"], "BO");
    assert_eq!(data[1]["email"], Value::Null);
    // Unparseable dates degrade to null; the record still succeeds.
    assert_eq!(data[2]["full_name"], "CY");
    assert_eq!(data[2]["signup_month"], Value::Null);

    let output_path = dir.path().join("out/customers.jsonl");
    write_jsonl_file(&output_path, &data).unwrap();
    assert_eq!(read_jsonl_file(&output_path).unwrap().len(), 3);
}

#[test]
fn test_execution_is_idempotent() {
    let dir = setup_project();
    let definition = Config::load(dir.path())
        .unwrap()
        .find_definition("customers")
        .unwrap();
    let executor = TransformExecutor::new(&definition);

    let first = executor.execute(&input(), ExecuteOptions::default());
    let second = executor.execute(&input(), ExecuteOptions::default());
    assert_eq!(first.transformed_data, second.transformed_data);
    assert_eq!(first.errors, second.errors);
    assert_eq!(first.validation_results, second.validation_results);
}

#[rstest]
#[case(true, false, Some(3), 3)]
#[case(false, false, Some(3), 0)]
#[case(true, true, None, 3)]
fn test_execution_options(
    #[case] validate_output: bool,
    #[case] dry_run: bool,
    #[case] returned: Option<usize>,
    #[case] validated: usize,
) {
    let dir = setup_project();
    let definition = Config::load(dir.path())
        .unwrap()
        .find_definition("customers")
        .unwrap();

    let result = TransformService::new().execute(&definition, &input(), validate_output, dry_run);
    assert_eq!(result.transformed_data.as_ref().map(Vec::len), returned);
    assert_eq!(result.validation_results.len(), validated);
    assert_eq!(result.execution_stats.output_count, 3);
}
