//! Attribute transforms
//!
//! An attribute transform is a per-field contract applied after the field
//! mappings and function steps: check the incoming value against its
//! `source_type`, run a registry function, coerce the result to
//! `target_type`, then check a list of declarative validation rules.
//!
//! ```yaml
//! attribute_transforms:
//!   - field_name: email
//!     source_type: string
//!     target_type: string
//!     transform_function: lower_case
//!     validation_rules:
//!       - rule: pattern
//!         value: "^[^@]+@[^@]+$"
//!     is_required: true
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::definition::Params;
use crate::error::FieldError;
use crate::functions::Function;
use crate::schema::{FieldType, value_kind};

/// Per-field coercion and validation contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeTransform {
    /// Output field this attribute applies to
    pub field_name: String,

    /// Expected type of the incoming value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,

    /// Type the result is coerced to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,

    /// Registry function applied to the value
    pub transform_function: String,

    /// Function parameters
    #[serde(default, skip_serializing_if = "Params::is_empty")]
    pub transform_params: Params,

    /// Rules checked against the final value, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_rules: Vec<ValidationRule>,

    /// A missing or invalid value fails the whole record
    #[serde(default)]
    pub is_required: bool,
}

/// Declarative check on a transformed value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ValidationRule {
    /// Value must not be null
    Required,
    /// String length (in chars) or array length lower bound
    MinLength {
        /// Minimum length
        value: usize,
    },
    /// String length (in chars) or array length upper bound
    MaxLength {
        /// Maximum length
        value: usize,
    },
    /// Numeric lower bound
    Min {
        /// Minimum value
        value: f64,
    },
    /// Numeric upper bound
    Max {
        /// Maximum value
        value: f64,
    },
    /// String must match a regex
    Pattern {
        /// Regex pattern
        value: String,
    },
    /// Value must equal one of the listed values
    OneOf {
        /// Allowed values
        values: Vec<Value>,
    },
}

impl ValidationRule {
    /// Rule name as written in configuration
    pub fn name(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::MinLength { .. } => "min_length",
            Self::MaxLength { .. } => "max_length",
            Self::Min { .. } => "min",
            Self::Max { .. } => "max",
            Self::Pattern { .. } => "pattern",
            Self::OneOf { .. } => "one_of",
        }
    }

    /// Check a value against this rule.
    ///
    /// Null only fails `required`; every other rule accepts null, and
    /// values of the wrong kind for a rule (a number under `min_length`)
    /// pass.
    pub fn check(&self, value: &Value) -> Result<(), FieldError> {
        let violation = |message: String| FieldError::RuleViolation {
            rule: self.name().to_string(),
            message,
        };

        if value.is_null() {
            return match self {
                Self::Required => Err(violation("value is null".to_string())),
                _ => Ok(()),
            };
        }

        match self {
            Self::Required => Ok(()),
            Self::MinLength { value: min } => match length(value) {
                Some(len) if len < *min => Err(violation(format!(
                    "length {} is below {}",
                    len, min
                ))),
                _ => Ok(()),
            },
            Self::MaxLength { value: max } => match length(value) {
                Some(len) if len > *max => Err(violation(format!(
                    "length {} is above {}",
                    len, max
                ))),
                _ => Ok(()),
            },
            Self::Min { value: min } => match value.as_f64() {
                Some(n) if n < *min => Err(violation(format!("{} is below {}", n, min))),
                _ => Ok(()),
            },
            Self::Max { value: max } => match value.as_f64() {
                Some(n) if n > *max => Err(violation(format!("{} is above {}", n, max))),
                _ => Ok(()),
            },
            Self::Pattern { value: pattern } => {
                let Value::String(s) = value else {
                    return Ok(());
                };
                let re = regex::Regex::new(pattern)
                    .map_err(|e| violation(format!("invalid pattern: {}", e)))?;
                if re.is_match(s) {
                    Ok(())
                } else {
                    Err(violation(format!("'{}' does not match '{}'", s, pattern)))
                }
            }
            Self::OneOf { values } => {
                if values.contains(value) {
                    Ok(())
                } else {
                    Err(violation(format!("{} is not an allowed value", value)))
                }
            }
        }
    }
}

fn length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(a) => Some(a.len()),
        _ => None,
    }
}

impl AttributeTransform {
    /// Run the attribute pipeline on a present value
    pub fn apply(&self, value: &Value) -> Result<Value, FieldError> {
        if let Some(source_type) = &self.source_type {
            if !value.is_null() && !FieldType::parse(source_type).matches(value) {
                return Err(FieldError::Coercion {
                    value: value.to_string(),
                    target_type: format!("source type {}", source_type),
                });
            }
        }

        let function = Function::from_name(&self.transform_function)
            .ok_or_else(|| FieldError::UnknownFunction(self.transform_function.clone()))?;
        let transformed = function.apply(value, &self.transform_params)?;

        let coerced = match &self.target_type {
            Some(target_type) => coerce(&transformed, target_type)?,
            None => transformed,
        };

        for rule in &self.validation_rules {
            rule.check(&coerced)?;
        }
        Ok(coerced)
    }
}

/// Coerce a value to a declared type.
///
/// Null stays null. Unknown type names leave the value unchanged.
pub fn coerce(value: &Value, target_type: &str) -> Result<Value, FieldError> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    // Integers satisfy `float` but are still widened.
    let field_type = FieldType::parse(target_type);
    if field_type.matches(value) && field_type != FieldType::Float {
        return Ok(value.clone());
    }

    let failed = || FieldError::Coercion {
        value: format!("{} {}", value_kind(value), value),
        target_type: target_type.to_string(),
    };
    let convert = |function: Function| function.apply(value, &Params::new()).map_err(|_| failed());

    match field_type {
        FieldType::String => convert(Function::ToString),
        FieldType::Integer => convert(Function::ToInteger),
        FieldType::Float => convert(Function::ToFloat),
        FieldType::Boolean => match value {
            Value::Number(n) => Ok(Value::Bool(n.as_f64().is_some_and(|f| f != 0.0))),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(Value::Bool(true)),
                "false" | "no" | "0" => Ok(Value::Bool(false)),
                _ => Err(failed()),
            },
            _ => Err(failed()),
        },
        FieldType::Date | FieldType::Decimal => Err(failed()),
        FieldType::Other(_) => Ok(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn attribute(yaml: &str) -> AttributeTransform {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_parse_attribute_transform() {
        let attr = attribute(
            r#"
field_name: email
source_type: string
target_type: string
transform_function: lower_case
validation_rules:
  - rule: required
  - rule: max_length
    value: 64
  - rule: one_of
    values: [a, b]
is_required: true
"#,
        );
        assert_eq!(attr.field_name, "email");
        assert!(attr.is_required);
        assert_eq!(
            attr.validation_rules,
            vec![
                ValidationRule::Required,
                ValidationRule::MaxLength { value: 64 },
                ValidationRule::OneOf {
                    values: vec![json!("a"), json!("b")]
                },
            ]
        );
    }

    #[test]
    fn test_apply_runs_function_coercion_and_rules() {
        let attr = attribute(
            r#"
field_name: qty
target_type: integer
transform_function: multiply
transform_params: { factor: 2 }
validation_rules:
  - rule: max
    value: 10
"#,
        );
        assert_eq!(attr.apply(&json!(4)).unwrap(), json!(8));

        let err = attr.apply(&json!(6)).unwrap_err();
        assert!(matches!(err, FieldError::RuleViolation { ref rule, .. } if rule == "max"));
    }

    #[test]
    fn test_apply_coerces_string_to_integer() {
        let attr = attribute(
            r#"
field_name: age
target_type: integer
transform_function: trim
"#,
        );
        assert_eq!(attr.apply(&json!(" 41 ")).unwrap(), json!(41));
    }

    #[test]
    fn test_apply_rejects_source_type_mismatch() {
        let attr = attribute(
            r#"
field_name: age
source_type: integer
transform_function: abs
"#,
        );
        assert!(matches!(
            attr.apply(&json!("x")),
            Err(FieldError::Coercion { .. })
        ));
    }

    #[test]
    fn test_apply_unknown_function() {
        let attr = attribute("field_name: a\ntransform_function: nope\n");
        assert_eq!(
            attr.apply(&json!(1)),
            Err(FieldError::UnknownFunction("nope".to_string()))
        );
    }

    #[rstest]
    #[case(ValidationRule::Required, json!(null), false)]
    #[case(ValidationRule::Required, json!(""), true)]
    #[case(ValidationRule::MinLength { value: 3 }, json!("ab"), false)]
    #[case(ValidationRule::MinLength { value: 3 }, json!("abc"), true)]
    #[case(ValidationRule::MinLength { value: 3 }, json!(null), true)]
    #[case(ValidationRule::MaxLength { value: 2 }, json!([1, 2, 3]), false)]
    #[case(ValidationRule::Min { value: 0.0 }, json!(-1), false)]
    #[case(ValidationRule::Max { value: 5.0 }, json!(5), true)]
    #[case(ValidationRule::Max { value: 5.0 }, json!("99"), true)]
    #[case(ValidationRule::Pattern { value: "^[A-Z]{2}$".to_string() }, json!("PT"), true)]
    #[case(ValidationRule::Pattern { value: "^[A-Z]{2}$".to_string() }, json!("PRT"), false)]
    #[case(ValidationRule::OneOf { values: vec![json!(1), json!(2)] }, json!(2), true)]
    #[case(ValidationRule::OneOf { values: vec![json!(1), json!(2)] }, json!(3), false)]
    fn test_rules(#[case] rule: ValidationRule, #[case] value: Value, #[case] ok: bool) {
        assert_eq!(rule.check(&value).is_ok(), ok);
    }

    #[rstest]
    #[case(json!("12"), "integer", json!(12))]
    #[case(json!(3), "float", json!(3.0))]
    #[case(json!(3), "string", json!("3"))]
    #[case(json!("yes"), "boolean", json!(true))]
    #[case(json!(0), "boolean", json!(false))]
    #[case(json!("19.99"), "decimal", json!("19.99"))]
    #[case(json!({"a": 1}), "json", json!({"a": 1}))]
    #[case(json!(null), "integer", json!(null))]
    fn test_coerce(#[case] value: Value, #[case] target: &str, #[case] expected: Value) {
        assert_eq!(coerce(&value, target).unwrap(), expected);
    }

    #[rstest]
    #[case(json!("abc"), "integer")]
    #[case(json!("maybe"), "boolean")]
    #[case(json!(20240101), "date")]
    #[case(json!([1]), "decimal")]
    fn test_coerce_failures(#[case] value: Value, #[case] target: &str) {
        assert!(matches!(
            coerce(&value, target),
            Err(FieldError::Coercion { .. })
        ));
    }
}
