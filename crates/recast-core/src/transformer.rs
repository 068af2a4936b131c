//! Record transformer
//!
//! Turns one input record into one output record. Failures come in two
//! sizes and the signatures keep them apart:
//!
//! - field mappings, function execution and attribute transforms return
//!   `Result<Value, FieldError>`; the transformer logs the error and writes
//!   `null` to the field,
//! - an unknown function in the step list or a non-object input returns
//!   [`RecordError`] from [`RecordTransformer::transform`] and the caller
//!   drops the record.
//!
//! A required attribute that yields no valid value is still a field-level
//! failure: the field is nulled and the failure is listed in
//! [`TransformedRecord::required_failures`] so the executor can report it
//! alongside output validation.

use serde_json::Value;

use crate::attributes::AttributeTransform;
use crate::definition::{FieldMapping, FunctionStep, Record, TransformConfig};
use crate::error::{FieldError, RecordError};
use crate::functions::Function;
use crate::schema::value_kind;

/// A transformed record and the required attributes it failed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformedRecord {
    /// The output record
    pub record: Record,
    /// One message per required attribute left without a valid value
    pub required_failures: Vec<String>,
}

/// Applies a transform configuration to individual records
#[derive(Debug, Clone, Copy)]
pub struct RecordTransformer<'a> {
    config: &'a TransformConfig,
    attributes: &'a [AttributeTransform],
}

impl<'a> RecordTransformer<'a> {
    /// Create a transformer for a configuration
    pub fn new(config: &'a TransformConfig) -> Self {
        Self {
            config,
            attributes: &[],
        }
    }

    /// Apply these attribute transforms after the function steps
    pub fn with_attributes(mut self, attributes: &'a [AttributeTransform]) -> Self {
        self.attributes = attributes;
        self
    }

    /// Transform one record
    pub fn transform(&self, input: &Value) -> Result<Record, RecordError> {
        self.transform_record(input).map(|t| t.record)
    }

    /// Transform one record, keeping the required attribute failures
    pub fn transform_record(&self, input: &Value) -> Result<TransformedRecord, RecordError> {
        let record = input
            .as_object()
            .ok_or_else(|| RecordError::NotAnObject(value_kind(input)))?;

        let mut output = Record::new();

        for (target, mapping) in self.config.mappings() {
            match resolve_mapping(record, mapping) {
                Ok(Some(value)) => {
                    output.insert(target.clone(), value);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Field mapping '{}' failed: {}", target, e);
                    output.insert(target.clone(), Value::Null);
                }
            }
        }

        for step in &self.config.functions {
            let function =
                Function::from_name(&step.function).ok_or_else(|| RecordError::UnknownFunction {
                    function: step.function.clone(),
                    target_field: step.target_field.clone(),
                })?;
            let value = run_step(function, step, &output).unwrap_or_else(|e| {
                tracing::warn!("Function step for '{}' failed: {}", step.target_field, e);
                Value::Null
            });
            output.insert(step.target_field.clone(), value);
        }

        let mut required_failures = Vec::new();
        for attribute in self.attributes {
            if let Err(reason) = apply_attribute(attribute, &mut output) {
                required_failures.push(format!(
                    "Required attribute failed: {}: {}",
                    attribute.field_name, reason
                ));
            }
        }

        Ok(TransformedRecord {
            record: output,
            required_failures,
        })
    }
}

/// Resolve a single mapping. `Ok(None)` means the target is omitted.
fn resolve_mapping(record: &Record, mapping: &FieldMapping) -> Result<Option<Value>, FieldError> {
    match mapping {
        FieldMapping::Direct(source) => Ok(record.get(source).cloned()),
        FieldMapping::Computed(computed) => {
            let mut value = computed
                .source_field
                .as_ref()
                .and_then(|source| record.get(source))
                .cloned()
                .unwrap_or(Value::Null);

            if value.is_null() {
                if let Some(default) = &computed.default_value {
                    value = default.clone();
                }
            }

            if let Some(name) = &computed.function {
                if !value.is_null() {
                    let function = Function::from_name(name)
                        .ok_or_else(|| FieldError::UnknownFunction(name.clone()))?;
                    value = function.apply(&value, &computed.params)?;
                }
            }

            Ok(Some(value))
        }
    }
}

fn run_step(function: Function, step: &FunctionStep, output: &Record) -> Result<Value, FieldError> {
    let [source] = step.source_fields.as_slice() else {
        return Err(FieldError::FunctionFailed {
            function: step.function.clone(),
            message: format!(
                "expects exactly one source field, got {}",
                step.source_fields.len()
            ),
        });
    };
    let value = output.get(source).cloned().unwrap_or(Value::Null);
    function.apply(&value, &step.params)
}

/// Apply one attribute transform in place. `Err` carries the reason a
/// required attribute has no valid value; the field is nulled either way.
fn apply_attribute(attribute: &AttributeTransform, output: &mut Record) -> Result<(), String> {
    let field = &attribute.field_name;

    let Some(current) = output.get(field) else {
        if attribute.is_required {
            tracing::warn!("Required attribute '{}' is missing", field);
            output.insert(field.clone(), Value::Null);
            return Err("field is missing".to_string());
        }
        return Ok(());
    };

    match attribute.apply(current) {
        Ok(Value::Null) if attribute.is_required => {
            tracing::warn!("Required attribute '{}' is null", field);
            output.insert(field.clone(), Value::Null);
            Err("value is null".to_string())
        }
        Ok(value) => {
            output.insert(field.clone(), value);
            Ok(())
        }
        Err(e) => {
            tracing::warn!("Attribute transform for '{}' failed: {}", field, e);
            output.insert(field.clone(), Value::Null);
            if attribute.is_required {
                return Err(e.to_string());
            }
            Ok(())
        }
    }
}
