//! Source and target schemas
//!
//! A schema is a flat list of named fields with an optional declared type
//! and a `required` flag. Schemas are used for referential checks at
//! configuration time and for type checks on transformed output.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A field declared in a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name (unique within its schema)
    pub name: String,

    /// Declared type, e.g. `string`, `integer`, `decimal`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,

    /// Whether the field must be present and non-null
    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    /// An untyped, optional field
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: None,
            required: false,
        }
    }

    /// Set the declared type
    pub fn with_type(mut self, field_type: impl Into<String>) -> Self {
        self.field_type = Some(field_type.into());
        self
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// A schema: `{ fields: [...] }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Declared fields, in order
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl Schema {
    /// Build a schema from field specs
    pub fn new(fields: impl IntoIterator<Item = FieldSpec>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether the schema declares a field with this name
    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Field names that are declared more than once, in first-repeat order
    pub fn duplicate_names(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        let mut duplicates = Vec::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) && !duplicates.contains(&field.name.as_str()) {
                duplicates.push(field.name.as_str());
            }
        }
        duplicates
    }
}

/// Declared field type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// JSON string
    String,
    /// JSON integer
    Integer,
    /// JSON integer or float
    Float,
    /// JSON boolean
    Boolean,
    /// Date or datetime carried as a string
    Date,
    /// Number, or a string holding a finite decimal number
    Decimal,
    /// Anything else; accepts every value
    Other(String),
}

impl FieldType {
    /// Parse a declared type name. `datetime` and `date` share a predicate.
    pub fn parse(name: &str) -> Self {
        match name {
            "string" => Self::String,
            "integer" => Self::Integer,
            "float" => Self::Float,
            "boolean" => Self::Boolean,
            "date" | "datetime" => Self::Date,
            "decimal" => Self::Decimal,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether a non-null value satisfies this type
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String | Self::Date => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Float => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Decimal => match value {
                Value::Number(_) => true,
                Value::String(s) => is_decimal_str(s),
                _ => false,
            },
            Self::Other(_) => true,
        }
    }
}

fn is_decimal_str(s: &str) -> bool {
    s.trim().parse::<f64>().is_ok_and(f64::is_finite)
}

/// Short name of a JSON value's kind, for error messages
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn test_parse_schema_yaml() {
        let yaml = r#"
fields:
  - name: id
    type: integer
    required: true
  - name: email
"#;
        let schema: Schema = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(schema.fields.len(), 2);
        assert!(schema.fields[0].required);
        assert_eq!(schema.fields[0].field_type.as_deref(), Some("integer"));
        assert!(!schema.fields[1].required);
        assert!(schema.contains("email"));
        assert!(!schema.contains("name"));
    }

    #[test]
    fn test_parse_empty_schema() {
        let schema: Schema = serde_json::from_value(json!({})).unwrap();
        assert!(schema.fields.is_empty());
    }

    #[test]
    fn test_duplicate_names() {
        let schema = Schema::new([
            FieldSpec::new("a"),
            FieldSpec::new("b"),
            FieldSpec::new("a"),
            FieldSpec::new("a"),
        ]);
        assert_eq!(schema.duplicate_names(), vec!["a"]);
    }

    #[rstest]
    #[case("string", json!("x"), true)]
    #[case("string", json!(1), false)]
    #[case("integer", json!(1), true)]
    #[case("integer", json!(1.5), false)]
    #[case("float", json!(1), true)]
    #[case("float", json!(1.5), true)]
    #[case("float", json!("1.5"), false)]
    #[case("boolean", json!(false), true)]
    #[case("boolean", json!(0), false)]
    #[case("datetime", json!("2024-01-01T00:00:00Z"), true)]
    #[case("date", json!(20240101), false)]
    #[case("decimal", json!(1.25), true)]
    #[case("decimal", json!("19.99"), true)]
    #[case("decimal", json!("abc"), false)]
    #[case("uuid", json!(12), true)]
    fn test_type_predicates(#[case] ty: &str, #[case] value: Value, #[case] expected: bool) {
        assert_eq!(FieldType::parse(ty).matches(&value), expected);
    }
}
