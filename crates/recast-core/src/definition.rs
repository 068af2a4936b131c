//! Transform definitions
//!
//! A definition pairs a source and target schema with the configuration that
//! maps one onto the other. Definitions are usually authored as YAML:
//!
//! ```yaml
//! id: tr_customers
//! name: customers
//! transform_type: record
//! source_schema:
//!   fields:
//!     - name: name
//!     - name: age
//! target_schema:
//!   fields:
//!     - { name: full_name, required: true }
//!     - { name: age_str, type: string }
//! transform_config:
//!   field_mappings:
//!     full_name: name
//!     age_str:
//!       source_field: age
//!       function: to_string
//!   functions:
//!     - function: upper_case
//!       target_field: full_name
//!       source_fields: [full_name]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::attributes::AttributeTransform;
use crate::error::Result;
use crate::schema::Schema;

/// A record flowing through the engine
pub type Record = serde_json::Map<String, Value>;

/// Named arguments passed to a transform function
pub type Params = serde_json::Map<String, Value>;

/// Kind of transform; decides which configuration keys are mandatory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformType {
    /// Field-level transform
    Field,
    /// Record-level transform
    Record,
    /// Batch transform, requires `batch_size`
    Batch,
    /// Stream transform, requires `stream_config`
    Stream,
}

impl TransformType {
    /// All transform types
    pub const ALL: [TransformType; 4] = [Self::Field, Self::Record, Self::Batch, Self::Stream];

    /// Lowercase name as used in configuration
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Field => "field",
            Self::Record => "record",
            Self::Batch => "batch",
            Self::Stream => "stream",
        }
    }

    /// Configuration keys that must be present for this type
    pub fn required_keys(self) -> &'static [&'static str] {
        match self {
            Self::Field | Self::Record => &["field_mappings"],
            Self::Batch => &["field_mappings", "batch_size"],
            Self::Stream => &["field_mappings", "stream_config"],
        }
    }
}

impl fmt::Display for TransformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransformType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown transform type '{}'", s))
    }
}

/// How one target field gets its value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldMapping {
    /// Copy a source field as-is: `target: source`
    Direct(String),

    /// Computed value with optional default and function
    Computed(ComputedMapping),
}

impl FieldMapping {
    /// Source field this mapping reads, if any
    pub fn source_field(&self) -> Option<&str> {
        match self {
            Self::Direct(source) => Some(source),
            Self::Computed(computed) => computed.source_field.as_deref(),
        }
    }
}

/// Object form of a field mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComputedMapping {
    /// Source field to read; when absent the value starts as null
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_field: Option<String>,

    /// Substituted when the source value is null or missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,

    /// Function applied to the (possibly defaulted) value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,

    /// Function parameters
    #[serde(default, skip_serializing_if = "Params::is_empty")]
    pub params: Params,
}

/// A post-mapping function step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionStep {
    /// Function name
    pub function: String,

    /// Output field the result is written to
    pub target_field: String,

    /// Output fields read as input
    #[serde(default)]
    pub source_fields: Vec<String>,

    /// Function parameters
    #[serde(default, skip_serializing_if = "Params::is_empty")]
    pub params: Params,
}

/// The `transform_config` block of a definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Target field -> mapping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_mappings: Option<BTreeMap<String, FieldMapping>>,

    /// Steps applied in order after all field mappings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<FunctionStep>,

    /// Batch size for `batch` transforms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u64>,

    /// Stream settings for `stream` transforms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_config: Option<Value>,
}

impl TransformConfig {
    /// Whether a top-level configuration key is set
    pub fn has_key(&self, key: &str) -> bool {
        match key {
            "field_mappings" => self.field_mappings.is_some(),
            "functions" => !self.functions.is_empty(),
            "batch_size" => self.batch_size.is_some(),
            "stream_config" => self.stream_config.is_some(),
            _ => false,
        }
    }

    /// Field mappings, empty when none are configured
    pub fn mappings(&self) -> impl Iterator<Item = (&String, &FieldMapping)> {
        self.field_mappings.iter().flatten()
    }
}

/// A complete, named transform definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformDefinition {
    /// Opaque identifier
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Owning organization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,

    /// Transform kind as written; unknown names survive parsing so that
    /// validation can report them
    pub transform_type: String,

    /// Schema of input records
    pub source_schema: Schema,

    /// Schema of output records
    pub target_schema: Schema,

    /// Mapping configuration
    pub transform_config: TransformConfig,

    /// Per-field post-processing, applied after the function steps
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attribute_transforms: Vec<AttributeTransform>,

    /// Inactive definitions are never executed
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl TransformDefinition {
    /// Parse a definition from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse a definition from a JSON value
    pub fn from_json(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// The transform kind, if `transform_type` names a known one
    pub fn kind(&self) -> Option<TransformType> {
        self.transform_type.parse().ok()
    }
}
