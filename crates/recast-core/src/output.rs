//! Output validation against the target schema

use serde::{Deserialize, Serialize};

use crate::definition::Record;
use crate::schema::{FieldType, Schema, value_kind};

/// Result of validating one output record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputValidation {
    /// True iff `errors` is empty
    pub valid: bool,
    /// One message per violation
    pub errors: Vec<String>,
}

/// Checks transformed records against a target schema
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputValidator;

impl OutputValidator {
    /// Check required fields and declared types.
    ///
    /// Null values are only checked for presence, never for type. Unknown
    /// type names accept anything.
    pub fn validate(record: &Record, schema: &Schema) -> OutputValidation {
        let mut errors = Vec::new();

        for field in &schema.fields {
            let value = record.get(&field.name).filter(|v| !v.is_null());

            let Some(value) = value else {
                if field.required {
                    errors.push(format!("Missing required field: {}", field.name));
                }
                continue;
            };

            if let Some(declared) = &field.field_type {
                if !FieldType::parse(declared).matches(value) {
                    errors.push(format!(
                        "Field '{}' expected type {}, got {}",
                        field.name,
                        declared,
                        value_kind(value)
                    ));
                }
            }
        }

        OutputValidation {
            valid: errors.is_empty(),
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;
    use serde_json::{Value, json};

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn schema() -> Schema {
        Schema::new([
            FieldSpec::new("id").with_type("integer").required(),
            FieldSpec::new("email").with_type("string").required(),
            FieldSpec::new("score").with_type("float"),
            FieldSpec::new("joined").with_type("datetime"),
            FieldSpec::new("tags").with_type("set"),
        ])
    }

    #[test]
    fn test_valid_record() {
        let result = OutputValidator::validate(
            &record(json!({"id": 1, "email": "a@b.c", "score": 2, "joined": "2024-01-01", "tags": 5})),
            &schema(),
        );
        assert!(result.valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_missing_and_null_required_fields() {
        let result = OutputValidator::validate(&record(json!({"email": null})), &schema());
        assert!(!result.valid);
        assert_eq!(
            result.errors,
            vec!["Missing required field: id", "Missing required field: email"]
        );
    }

    #[test]
    fn test_type_violations_accumulate() {
        let result = OutputValidator::validate(
            &record(json!({"id": "1", "email": 7, "score": "high", "joined": null})),
            &schema(),
        );
        assert_eq!(
            result.errors,
            vec![
                "Field 'id' expected type integer, got string",
                "Field 'email' expected type string, got integer",
                "Field 'score' expected type float, got string",
            ]
        );
    }

    #[test]
    fn test_fields_outside_schema_are_ignored() {
        let result = OutputValidator::validate(
            &record(json!({"id": 1, "email": "x", "extra": [1, 2]})),
            &schema(),
        );
        assert!(result.valid);
    }
}
