//! Engine facade
//!
//! [`TransformService`] is the single entry point hosts use: validation at
//! save time, batch execution, preview while authoring, and the function
//! catalog. Defaults for the optional arguments come from the project's
//! `recast.yaml`.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::ProjectConfig;
use crate::definition::{TransformConfig, TransformDefinition};
use crate::executor::{
    DEFAULT_PREVIEW_SAMPLES, ExecuteOptions, ExecutionResult, PreviewResult, TransformExecutor,
    preview,
};
use crate::functions::{FunctionCategory, FunctionInfo, FunctionRegistry};
use crate::schema::Schema;
use crate::validator::{ConfigValidator, ValidationReport};

/// Facade over the validator, executor and function registry
#[derive(Debug, Clone, Copy)]
pub struct TransformService {
    validate_output: bool,
    max_samples: usize,
}

impl Default for TransformService {
    fn default() -> Self {
        Self {
            validate_output: true,
            max_samples: DEFAULT_PREVIEW_SAMPLES,
        }
    }
}

impl TransformService {
    /// Service with built-in defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Service using a project's execution and preview settings
    pub fn from_project(project: &ProjectConfig) -> Self {
        Self {
            validate_output: project.execution.validate_output,
            max_samples: project.preview.max_samples,
        }
    }

    /// Whether [`execute_default`](Self::execute_default) validates outputs
    pub fn validate_output(&self) -> bool {
        self.validate_output
    }

    /// Preview cap used when none is given
    pub fn max_samples(&self) -> usize {
        self.max_samples
    }

    /// Validate a configuration against its schemas
    pub fn validate_config(
        &self,
        transform_type: &str,
        config: &TransformConfig,
        source_schema: &Schema,
        target_schema: &Schema,
    ) -> ValidationReport {
        ConfigValidator::validate(transform_type, config, source_schema, target_schema)
    }

    /// Validate a whole definition, attribute transforms included
    pub fn validate_definition(&self, definition: &TransformDefinition) -> ValidationReport {
        ConfigValidator::validate_definition(definition)
    }

    /// Execute a definition over a batch
    pub fn execute(
        &self,
        definition: &TransformDefinition,
        records: &[Value],
        validate_output: bool,
        dry_run: bool,
    ) -> ExecutionResult {
        TransformExecutor::new(definition).execute(
            records,
            ExecuteOptions {
                validate_output,
                dry_run,
            },
        )
    }

    /// Execute with the configured output validation, keeping outputs
    pub fn execute_default(
        &self,
        definition: &TransformDefinition,
        records: &[Value],
    ) -> ExecutionResult {
        self.execute(definition, records, self.validate_output, false)
    }

    /// Preview a configuration over sample records.
    ///
    /// `max_samples` (default: the project's `preview.max_samples`) is a
    /// precondition on the caller, who slices the samples before calling.
    /// Oversized input is logged and still processed in full.
    pub fn preview(
        &self,
        config: &TransformConfig,
        source_schema: &Schema,
        target_schema: &Schema,
        samples: &[Value],
        max_samples: Option<usize>,
    ) -> PreviewResult {
        self.check_sample_count(samples, max_samples);
        preview(config, source_schema, target_schema, samples)
    }

    /// Preview a whole definition, attribute transforms included, so each
    /// sample matches what [`execute`](Self::execute) produces
    pub fn preview_definition(
        &self,
        definition: &TransformDefinition,
        samples: &[Value],
        max_samples: Option<usize>,
    ) -> PreviewResult {
        self.check_sample_count(samples, max_samples);
        TransformExecutor::new(definition).preview(samples)
    }

    fn check_sample_count(&self, samples: &[Value], max_samples: Option<usize>) {
        let max = max_samples.unwrap_or(self.max_samples);
        if samples.len() > max {
            tracing::warn!(
                "Preview got {} samples, more than the cap of {}",
                samples.len(),
                max
            );
        }
    }

    /// List the function catalog, optionally for one category
    pub fn list_functions(
        &self,
        category: Option<FunctionCategory>,
    ) -> BTreeMap<&'static str, FunctionInfo> {
        FunctionRegistry::list(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn definition() -> TransformDefinition {
        TransformDefinition::from_yaml(
            r#"
id: tr_people
name: people
transform_type: record
source_schema:
  fields:
    - name: name
    - name: age
target_schema:
  fields:
    - name: full_name
      required: true
    - name: age_str
      type: string
transform_config:
  field_mappings:
    full_name:
      source_field: name
      function: upper_case
    age_str:
      source_field: age
      function: to_string
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_service_execute() {
        let service = TransformService::new();
        let result = service.execute(&definition(), &[json!({"name": "ana", "age": 30})], true, false);
        assert!(result.success);
        let data = result.transformed_data.unwrap();
        assert_eq!(data[0]["full_name"], "ANA");
        assert_eq!(data[0]["age_str"], "30");
    }

    #[test]
    fn test_service_uses_project_settings() {
        let project: ProjectConfig = serde_yaml::from_str(
            "name: t\nexecution:\n  validate_output: false\npreview:\n  max_samples: 2\n",
        )
        .unwrap();
        let service = TransformService::from_project(&project);
        assert!(!service.validate_output());

        let result = service.execute_default(&definition(), &[json!({"age": 1})]);
        assert!(result.success);
        assert!(result.validation_results.is_empty());

        assert_eq!(service.max_samples(), 2);
    }

    #[test]
    fn test_service_preview_leaves_cap_to_caller() {
        let def = definition();
        let samples = [json!({"name": "a"}), json!({"name": "b"}), json!({"name": "c"})];
        let service = TransformService::new();

        let result = service.preview(
            &def.transform_config,
            &def.source_schema,
            &def.target_schema,
            &samples,
            Some(2),
        );
        assert_eq!(result.summary.total_samples, 3);

        let result = service.preview_definition(&def, &samples[..2], None);
        assert_eq!(result.summary.total_samples, 2);
        assert_eq!(result.preview_results[1].output.as_ref().unwrap()["full_name"], "B");
    }

    #[test]
    fn test_service_validate_config() {
        let def = definition();
        let report = TransformService::new().validate_config(
            "record",
            &def.transform_config,
            &def.source_schema,
            &def.target_schema,
        );
        assert!(report.valid);
        assert!(TransformService::new().validate_definition(&def).valid);
    }

    #[test]
    fn test_service_list_functions() {
        let service = TransformService::new();
        assert_eq!(service.list_functions(None).len(), 14);
        let numeric = service.list_functions(Some(FunctionCategory::Numeric));
        assert!(numeric.contains_key("round"));
        assert!(!numeric.contains_key("trim"));
    }
}
