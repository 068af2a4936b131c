//! Transform configuration validation
//!
//! Validation never fails fast: every rule runs and every problem is
//! reported, so a caller can show the author the full list at once.
//! Errors make a configuration invalid; warnings never do.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::attributes::{AttributeTransform, ValidationRule};
use crate::definition::{FieldMapping, TransformConfig, TransformDefinition, TransformType};
use crate::functions::FunctionRegistry;
use crate::schema::Schema;

/// Outcome of validating a configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// True iff `errors` is empty
    pub valid: bool,
    /// Problems that make the configuration unusable
    pub errors: Vec<String>,
    /// Non-fatal observations
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn finish(mut self) -> Self {
        self.valid = self.errors.is_empty();
        self
    }
}

/// Validates transform configurations against their schemas
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a configuration given its raw transform type name
    pub fn validate(
        transform_type: &str,
        config: &TransformConfig,
        source_schema: &Schema,
        target_schema: &Schema,
    ) -> ValidationReport {
        let mut report = ValidationReport::default();

        let parsed_type = transform_type.parse::<TransformType>().ok();
        if parsed_type.is_none() {
            report.errors.push(format!(
                "Invalid transform type: {}. Must be one of: {}",
                transform_type,
                TransformType::ALL.map(TransformType::as_str).join(", ")
            ));
        }

        // An unknown type still needs the keys every type needs.
        let required_keys = parsed_type
            .map(TransformType::required_keys)
            .unwrap_or(&["field_mappings"]);
        for key in required_keys {
            if !config.has_key(key) {
                report.errors.push(format!(
                    "Missing required config key for {} transform: {}",
                    transform_type, key
                ));
            }
        }

        check_schema("Source", source_schema, &mut report);
        check_schema("Target", target_schema, &mut report);

        let mut used_sources = HashSet::new();
        for (target, mapping) in config.mappings() {
            if !target_schema.contains(target) {
                report.errors.push(format!(
                    "Field mapping target '{}' not found in target schema",
                    target
                ));
            }

            if let Some(source) = mapping.source_field() {
                used_sources.insert(source);
                if !source_schema.contains(source) {
                    report.errors.push(format!(
                        "Field mapping source '{}' for target '{}' not found in source schema",
                        source, target
                    ));
                }
            }

            if let FieldMapping::Computed(computed) = mapping {
                if let Some(function) = &computed.function {
                    if !FunctionRegistry::contains(function) {
                        report.warnings.push(format!(
                            "Field mapping '{}' references unknown function '{}'; the field will be null",
                            target, function
                        ));
                    }
                }
            }
        }

        for step in &config.functions {
            if !FunctionRegistry::contains(&step.function) {
                report
                    .errors
                    .push(format!("Unknown function: {}", step.function));
            }
            if step.source_fields.len() != 1 {
                report.warnings.push(format!(
                    "Function step '{}' for '{}' expects exactly one source field, got {}",
                    step.function,
                    step.target_field,
                    step.source_fields.len()
                ));
            }
        }

        for field in &source_schema.fields {
            if !used_sources.contains(field.name.as_str()) {
                report.warnings.push(format!(
                    "Source field '{}' is not used in any mapping",
                    field.name
                ));
            }
        }

        report.finish()
    }

    /// Validate a whole definition, including its attribute transforms
    pub fn validate_definition(definition: &TransformDefinition) -> ValidationReport {
        let mut report = Self::validate(
            &definition.transform_type,
            &definition.transform_config,
            &definition.source_schema,
            &definition.target_schema,
        );
        for attribute in &definition.attribute_transforms {
            check_attribute(attribute, &definition.target_schema, &mut report);
        }
        report.finish()
    }
}

fn check_schema(label: &str, schema: &Schema, report: &mut ValidationReport) {
    if schema.fields.is_empty() {
        report
            .errors
            .push(format!("{} schema must define at least one field", label));
    }
    for name in schema.duplicate_names() {
        report.errors.push(format!(
            "Duplicate field '{}' in {} schema",
            name,
            label.to_lowercase()
        ));
    }
}

fn check_attribute(attribute: &AttributeTransform, target: &Schema, report: &mut ValidationReport) {
    if !FunctionRegistry::contains(&attribute.transform_function) {
        report.errors.push(format!(
            "Attribute transform for '{}' references unknown function: {}",
            attribute.field_name, attribute.transform_function
        ));
    }
    if !target.contains(&attribute.field_name) {
        report.warnings.push(format!(
            "Attribute transform field '{}' not found in target schema",
            attribute.field_name
        ));
    }
    for rule in &attribute.validation_rules {
        if let ValidationRule::Pattern { value } = rule {
            if let Err(e) = regex::Regex::new(value) {
                report.errors.push(format!(
                    "Attribute transform for '{}' has invalid pattern '{}': {}",
                    attribute.field_name, value, e
                ));
            }
        }
    }
}
