//! Built-in transform functions
//!
//! Every function is a pure scalar operation: one JSON value in, one JSON
//! value out, parameterized by a `params` object. Functions are identified
//! by name in configuration, but dispatch goes through the closed
//! [`Function`] enum so the set is fixed at compile time.
//!
//! # Categories
//!
//! - `string` - `upper_case`, `lower_case`, `trim`, `replace`, `regex_replace`
//! - `numeric` - `round`, `abs`, `multiply`
//! - `date` - `format_date`
//! - `conversion` - `to_string`, `to_integer`, `to_float`
//! - `conditional` - `default_if_null`, `conditional`
//!
//! Type mismatches pass the value through unchanged. A [`FieldError`] is
//! only returned when the function genuinely cannot produce a value
//! (unparseable date, bad regex, non-numeric factor).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::definition::Params;
use crate::error::FieldError;

/// Function category, used to group the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionCategory {
    /// Text manipulation
    String,
    /// Arithmetic on numbers
    Numeric,
    /// Date parsing and formatting
    Date,
    /// Type conversion
    Conversion,
    /// Null handling and branching
    Conditional,
}

impl FunctionCategory {
    /// All categories in catalog order
    pub const ALL: [FunctionCategory; 5] = [
        Self::String,
        Self::Numeric,
        Self::Date,
        Self::Conversion,
        Self::Conditional,
    ];

    /// Lowercase name as used in configuration
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Numeric => "numeric",
            Self::Date => "date",
            Self::Conversion => "conversion",
            Self::Conditional => "conditional",
        }
    }
}

impl fmt::Display for FunctionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FunctionCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown function category '{}'", s))
    }
}

/// A built-in function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    /// Uppercase a string
    UpperCase,
    /// Lowercase a string
    LowerCase,
    /// Strip leading and trailing whitespace
    Trim,
    /// Literal substring replacement
    Replace,
    /// Regex replacement
    RegexReplace,
    /// Round to a number of decimals
    Round,
    /// Absolute value
    Abs,
    /// Multiply by a factor
    Multiply,
    /// Reformat a `%Y-%m-%d` date
    FormatDate,
    /// Render as a string
    ToString,
    /// Convert to an integer, truncating
    ToInteger,
    /// Convert to a float
    ToFloat,
    /// Substitute a default for null
    DefaultIfNull,
    /// Pick between two values on truthiness
    Conditional,
}

/// Catalog entry for a built-in function
#[derive(Debug, Clone, Copy)]
pub struct FunctionDef {
    /// The function itself
    pub function: Function,
    /// Name used in configuration
    pub name: &'static str,
    /// Category
    pub category: FunctionCategory,
    /// Accepted parameter names
    pub params: &'static [&'static str],
    /// One-line description
    pub description: &'static str,
}

/// Serializable metadata returned by [`FunctionRegistry::list`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionInfo {
    /// Category
    pub category: FunctionCategory,
    /// Accepted parameter names
    pub params: Vec<&'static str>,
    /// One-line description
    pub description: &'static str,
}

static FUNCTIONS: [FunctionDef; 14] = [
    FunctionDef {
        function: Function::UpperCase,
        name: "upper_case",
        category: FunctionCategory::String,
        params: &[],
        description: "Convert a string to upper case",
    },
    FunctionDef {
        function: Function::LowerCase,
        name: "lower_case",
        category: FunctionCategory::String,
        params: &[],
        description: "Convert a string to lower case",
    },
    FunctionDef {
        function: Function::Trim,
        name: "trim",
        category: FunctionCategory::String,
        params: &[],
        description: "Remove leading and trailing whitespace",
    },
    FunctionDef {
        function: Function::Replace,
        name: "replace",
        category: FunctionCategory::String,
        params: &["search", "replace"],
        description: "Replace every occurrence of `search` with `replace`",
    },
    FunctionDef {
        function: Function::RegexReplace,
        name: "regex_replace",
        category: FunctionCategory::String,
        params: &["pattern", "replacement"],
        description: "Replace regex matches; `$1` / `${name}` refer to capture groups",
    },
    FunctionDef {
        function: Function::Round,
        name: "round",
        category: FunctionCategory::Numeric,
        params: &["decimals"],
        description: "Round to `decimals` places (half to even)",
    },
    FunctionDef {
        function: Function::Abs,
        name: "abs",
        category: FunctionCategory::Numeric,
        params: &[],
        description: "Absolute value",
    },
    FunctionDef {
        function: Function::Multiply,
        name: "multiply",
        category: FunctionCategory::Numeric,
        params: &["factor"],
        description: "Multiply by `factor`",
    },
    FunctionDef {
        function: Function::FormatDate,
        name: "format_date",
        category: FunctionCategory::Date,
        params: &["format"],
        description: "Parse a YYYY-MM-DD date and reformat it with a strftime `format`",
    },
    FunctionDef {
        function: Function::ToString,
        name: "to_string",
        category: FunctionCategory::Conversion,
        params: &[],
        description: "Render the value as a string",
    },
    FunctionDef {
        function: Function::ToInteger,
        name: "to_integer",
        category: FunctionCategory::Conversion,
        params: &[],
        description: "Convert to float, then truncate to an integer",
    },
    FunctionDef {
        function: Function::ToFloat,
        name: "to_float",
        category: FunctionCategory::Conversion,
        params: &[],
        description: "Convert to a float",
    },
    FunctionDef {
        function: Function::DefaultIfNull,
        name: "default_if_null",
        category: FunctionCategory::Conditional,
        params: &["default"],
        description: "Return `default` when the value is null",
    },
    FunctionDef {
        function: Function::Conditional,
        name: "conditional",
        category: FunctionCategory::Conditional,
        params: &["condition", "true_value", "false_value"],
        description: "Return `true_value` when the value is truthy, else `false_value`",
    },
];

/// Read-only catalog of built-in functions.
///
/// The catalog is static data, so the registry is a zero-sized handle that
/// can be shared across threads freely.
#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionRegistry;

impl FunctionRegistry {
    /// Look up a function by its configuration name
    pub fn get(name: &str) -> Option<&'static FunctionDef> {
        FUNCTIONS.iter().find(|def| def.name == name)
    }

    /// Whether a function with this name exists
    pub fn contains(name: &str) -> bool {
        Self::get(name).is_some()
    }

    /// Iterate the whole catalog in declaration order
    pub fn iter() -> impl Iterator<Item = &'static FunctionDef> {
        FUNCTIONS.iter()
    }

    /// Function metadata keyed by name, optionally restricted to a category
    pub fn list(category: Option<FunctionCategory>) -> BTreeMap<&'static str, FunctionInfo> {
        FUNCTIONS
            .iter()
            .filter(|def| category.is_none_or(|c| def.category == c))
            .map(|def| {
                (
                    def.name,
                    FunctionInfo {
                        category: def.category,
                        params: def.params.to_vec(),
                        description: def.description,
                    },
                )
            })
            .collect()
    }
}

impl Function {
    /// Resolve a configuration name
    pub fn from_name(name: &str) -> Option<Self> {
        FunctionRegistry::get(name).map(|def| def.function)
    }

    /// Configuration name of this function
    pub fn name(self) -> &'static str {
        FUNCTIONS
            .iter()
            .find(|def| def.function == self)
            .map(|def| def.name)
            .unwrap_or("unknown")
    }

    /// Apply the function to a single value
    pub fn apply(self, value: &Value, params: &Params) -> Result<Value, FieldError> {
        let ctx = ParamReader {
            function: self.name(),
            params,
        };

        match self {
            Self::UpperCase => Ok(map_str(value, |s| s.to_uppercase())),
            Self::LowerCase => Ok(map_str(value, |s| s.to_lowercase())),
            Self::Trim => Ok(map_str(value, |s| s.trim().to_string())),
            Self::Replace => {
                let search = ctx.string("search", "")?;
                let replace = ctx.string("replace", "")?;
                Ok(map_str(value, |s| s.replace(&search, &replace)))
            }
            Self::RegexReplace => {
                let Value::String(s) = value else {
                    return Ok(value.clone());
                };
                let pattern = ctx.string("pattern", "")?;
                let replacement = ctx.string("replacement", "")?;
                let re = regex::Regex::new(&pattern).map_err(|e| ctx.invalid("pattern", e))?;
                Ok(Value::String(
                    re.replace_all(s, replacement.as_str()).into_owned(),
                ))
            }
            Self::Round => {
                let Value::Number(n) = value else {
                    return Ok(value.clone());
                };
                let decimals = ctx.integer("decimals", 0)?.clamp(-308, 308) as i32;
                if !n.is_f64() && decimals >= 0 {
                    return Ok(value.clone());
                }
                let rounded = round_to(n.as_f64().unwrap_or_default(), decimals);
                if n.is_f64() {
                    ctx.float_value(rounded)
                } else {
                    ctx.truncate(rounded)
                }
            }
            Self::Abs => {
                let Value::Number(n) = value else {
                    return Ok(value.clone());
                };
                if let Some(i) = n.as_i64() {
                    match i.checked_abs() {
                        Some(abs) => Ok(Value::from(abs)),
                        None => ctx.float_value((i as f64).abs()),
                    }
                } else if n.is_u64() {
                    Ok(value.clone())
                } else {
                    ctx.float_value(n.as_f64().unwrap_or_default().abs())
                }
            }
            Self::Multiply => {
                let Value::Number(n) = value else {
                    return Ok(value.clone());
                };
                let factor = match ctx.params.get("factor") {
                    None | Some(Value::Null) => Number::from(1),
                    Some(Value::Number(f)) => f.clone(),
                    Some(other) => return Err(ctx.invalid("factor", format!("{} is not a number", other))),
                };
                if let (Some(a), Some(b)) = (n.as_i64(), factor.as_i64()) {
                    if let Some(product) = a.checked_mul(b) {
                        return Ok(Value::from(product));
                    }
                }
                let a = n.as_f64().unwrap_or_default();
                let b = factor.as_f64().unwrap_or_default();
                ctx.float_value(a * b)
            }
            Self::FormatDate => {
                if !is_truthy(value) {
                    return Ok(value.clone());
                }
                let Value::String(s) = value else {
                    return Err(ctx.failed(format!("expected a date string, got {}", value)));
                };
                let format = ctx.string("format", "%Y-%m-%d")?;
                let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map_err(|e| ctx.failed(format!("'{}' is not a YYYY-MM-DD date: {}", s, e)))?;
                let mut out = String::new();
                use std::fmt::Write as _;
                write!(out, "{}", date.and_time(NaiveTime::MIN).format(&format))
                    .map_err(|_| ctx.invalid("format", format!("unsupported format '{}'", format)))?;
                Ok(Value::String(out))
            }
            Self::ToString => Ok(match value {
                Value::Null => Value::Null,
                Value::String(_) => value.clone(),
                Value::Number(n) => Value::String(n.to_string()),
                Value::Bool(b) => Value::String(b.to_string()),
                other => Value::String(other.to_string()),
            }),
            Self::ToInteger => match value {
                Value::Null => Ok(Value::Null),
                Value::Number(n) if !n.is_f64() => Ok(value.clone()),
                _ => {
                    let f = ctx.as_float(value)?;
                    ctx.truncate(f)
                }
            },
            Self::ToFloat => match value {
                Value::Null => Ok(Value::Null),
                _ => {
                    let f = ctx.as_float(value)?;
                    ctx.float_value(f)
                }
            },
            Self::DefaultIfNull => Ok(match value {
                Value::Null => ctx.value("default"),
                _ => value.clone(),
            }),
            // `condition` is accepted but never evaluated: the branch follows
            // the truthiness of the value itself.
            Self::Conditional => Ok(if is_truthy(value) {
                ctx.value("true_value")
            } else {
                ctx.value("false_value")
            }),
        }
    }
}

/// Truthiness of a JSON value: null, false, zero, and empty strings,
/// arrays and objects are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn map_str(value: &Value, f: impl FnOnce(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(s)),
        other => other.clone(),
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    if decimals >= 0 {
        let factor = 10f64.powi(decimals);
        (value * factor).round_ties_even() / factor
    } else {
        let factor = 10f64.powi(-decimals);
        (value / factor).round_ties_even() * factor
    }
}

/// Typed access to a function's `params` object
struct ParamReader<'a> {
    function: &'static str,
    params: &'a Params,
}

impl ParamReader<'_> {
    fn value(&self, key: &str) -> Value {
        self.params.get(key).cloned().unwrap_or(Value::Null)
    }

    fn string(&self, key: &str, default: &str) -> Result<String, FieldError> {
        match self.params.get(key) {
            None | Some(Value::Null) => Ok(default.to_string()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(self.invalid(key, format!("{} is not a string", other))),
        }
    }

    fn integer(&self, key: &str, default: i64) -> Result<i64, FieldError> {
        match self.params.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Number(n)) => n
                .as_i64()
                .ok_or_else(|| self.invalid(key, format!("{} is not an integer", n))),
            Some(other) => Err(self.invalid(key, format!("{} is not an integer", other))),
        }
    }

    fn as_float(&self, value: &Value) -> Result<f64, FieldError> {
        match value {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| self.failed(format!("{} is out of range", n))),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| self.failed(format!("'{}' is not a number", s))),
            other => Err(self.failed(format!("cannot convert {} to a number", other))),
        }
    }

    fn float_value(&self, f: f64) -> Result<Value, FieldError> {
        Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| self.failed(format!("{} is not a finite number", f)))
    }

    fn truncate(&self, f: f64) -> Result<Value, FieldError> {
        if !f.is_finite() || f < i64::MIN as f64 || f >= i64::MAX as f64 {
            return Err(self.failed(format!("{} does not fit in an integer", f)));
        }
        Ok(Value::from(f.trunc() as i64))
    }

    fn invalid(&self, param: &str, message: impl ToString) -> FieldError {
        FieldError::InvalidParam {
            function: self.function.to_string(),
            param: param.to_string(),
            message: message.to_string(),
        }
    }

    fn failed(&self, message: impl ToString) -> FieldError {
        FieldError::FunctionFailed {
            function: self.function.to_string(),
            message: message.to_string(),
        }
    }
}
