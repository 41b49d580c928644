//! Declarative schemas for flow inputs and outputs
//!
//! A `Schema` describes the shape of a JSON value (field names, types,
//! numeric ranges, string formats, optionality). Validation walks the whole
//! value and reports every violation, so a caller sees all problems at once.
//! The same schema is rendered as the provider's response schema, which keeps
//! the declared output shape and the check applied to it in one place.

use crate::media::DataUri;
use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;
use thiserror::Error;

/// Which side of a flow a schema guards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaTarget {
    Input,
    Output,
}

impl fmt::Display for SchemaTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaTarget::Input => write!(f, "input"),
            SchemaTarget::Output => write!(f, "output"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StringFormat {
    Url,
    DataUri,
}

impl fmt::Display for StringFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringFormat::Url => write!(f, "URL"),
            StringFormat::DataUri => write!(f, "base64 data URI"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StringRules {
    /// Reject strings made only of whitespace and control characters
    pub non_blank: bool,
    pub format: Option<StringFormat>,
}

#[derive(Debug, Clone)]
pub enum Schema {
    Object(Vec<Field>),
    Array(Box<Schema>),
    String(StringRules),
    Integer { min: Option<i64>, max: Option<i64> },
    Number { min: Option<f64>, max: Option<f64> },
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    pub description: &'static str,
    pub schema: Schema,
    /// Optional fields accept a missing key or `null`
    pub optional: bool,
}

impl Field {
    pub fn required(name: &'static str, schema: Schema, description: &'static str) -> Self {
        Self {
            name,
            description,
            schema,
            optional: false,
        }
    }

    pub fn optional(name: &'static str, schema: Schema, description: &'static str) -> Self {
        Self {
            name,
            description,
            schema,
            optional: true,
        }
    }
}

// ================= Violations =================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ViolationKind {
    Missing,
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    Blank,
    BelowMinimum {
        min: f64,
    },
    AboveMaximum {
        max: f64,
    },
    MalformedFormat {
        format: StringFormat,
        reason: String,
    },
    /// Value disagrees with another part of the input or output
    Mismatch {
        expected: String,
        found: String,
    },
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::Missing => write!(f, "required field is missing"),
            ViolationKind::WrongType { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            ViolationKind::Blank => write!(f, "must not be empty"),
            ViolationKind::BelowMinimum { min } => write!(f, "must be at least {}", min),
            ViolationKind::AboveMaximum { max } => write!(f, "must be at most {}", max),
            ViolationKind::MalformedFormat { format, reason } => {
                write!(f, "not a valid {} ({})", format, reason)
            }
            ViolationKind::Mismatch { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub path: String,
    #[serde(flatten)]
    pub kind: ViolationKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "(root)" } else { &self.path };
        write!(f, "{}: {}", path, self.kind)
    }
}

/// Every violation found while checking one value
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("Invalid {target}: {}", join_violations(.violations))]
pub struct ValidationError {
    pub target: SchemaTarget,
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn single<P: Into<String>>(target: SchemaTarget, path: P, kind: ViolationKind) -> Self {
        Self {
            target,
            violations: vec![Violation {
                path: path.into(),
                kind,
            }],
        }
    }

    /// True when some violation sits at `path`
    pub fn names(&self, path: &str) -> bool {
        self.violations.iter().any(|v| v.path == path)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ================= Schema =================

impl Schema {
    pub fn text() -> Self {
        Schema::String(StringRules::default())
    }

    pub fn non_blank_text() -> Self {
        Schema::String(StringRules {
            non_blank: true,
            format: None,
        })
    }

    pub fn url() -> Self {
        Schema::String(StringRules {
            non_blank: true,
            format: Some(StringFormat::Url),
        })
    }

    pub fn data_uri() -> Self {
        Schema::String(StringRules {
            non_blank: true,
            format: Some(StringFormat::DataUri),
        })
    }

    pub fn integer() -> Self {
        Schema::Integer {
            min: None,
            max: None,
        }
    }

    pub fn integer_in(min: i64, max: i64) -> Self {
        Schema::Integer {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn number_in(min: f64, max: f64) -> Self {
        Schema::Number {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn array_of(items: Schema) -> Self {
        Schema::Array(Box::new(items))
    }

    pub fn object(fields: Vec<Field>) -> Self {
        Schema::Object(fields)
    }

    /// Collect every violation of this schema in `value`
    pub fn validate(&self, value: &Value) -> Vec<Violation> {
        let mut violations = Vec::new();
        self.walk(value, String::new(), &mut violations);
        violations
    }

    pub fn check(&self, target: SchemaTarget, value: &Value) -> std::result::Result<(), ValidationError> {
        let violations = self.validate(value);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { target, violations })
        }
    }

    /// Validate, then deserialize into the typed record
    pub fn narrow<T: DeserializeOwned>(&self, target: SchemaTarget, mut value: Value) -> Result<T> {
        self.check(target, &value)?;
        self.normalize(&mut value);
        Ok(serde_json::from_value(value)?)
    }

    /// Rewrite whole-valued floats in integer positions as integers, so
    /// `3.0` deserializes into integer fields. Runs on checked values only.
    fn normalize(&self, value: &mut Value) {
        match (self, value) {
            (Schema::Object(fields), Value::Object(map)) => {
                for field in fields {
                    if let Some(inner) = map.get_mut(field.name) {
                        field.schema.normalize(inner);
                    }
                }
            }
            (Schema::Array(items), Value::Array(list)) => {
                for item in list {
                    items.normalize(item);
                }
            }
            (Schema::Integer { .. }, value) => {
                if value.as_i64().is_none() {
                    if let Some(n) = value.as_f64() {
                        *value = Value::from(n as i64);
                    }
                }
            }
            _ => {}
        }
    }

    fn walk(&self, value: &Value, path: String, out: &mut Vec<Violation>) {
        match self {
            Schema::Object(fields) => {
                let Some(map) = value.as_object() else {
                    out.push(wrong_type(path, "object", value));
                    return;
                };
                for field in fields {
                    let field_path = if path.is_empty() {
                        field.name.to_string()
                    } else {
                        format!("{}.{}", path, field.name)
                    };
                    match map.get(field.name) {
                        None | Some(Value::Null) if field.optional => {}
                        None => out.push(Violation {
                            path: field_path,
                            kind: ViolationKind::Missing,
                        }),
                        Some(inner) => field.schema.walk(inner, field_path, out),
                    }
                }
            }
            Schema::Array(items) => {
                let Some(list) = value.as_array() else {
                    out.push(wrong_type(path, "array", value));
                    return;
                };
                for (i, item) in list.iter().enumerate() {
                    items.walk(item, format!("{}[{}]", path, i), out);
                }
            }
            Schema::String(rules) => {
                let Some(s) = value.as_str() else {
                    out.push(wrong_type(path, "string", value));
                    return;
                };
                if rules.non_blank && is_blank(s) {
                    out.push(Violation {
                        path,
                        kind: ViolationKind::Blank,
                    });
                    return;
                }
                if let Some(format) = rules.format {
                    if let Err(reason) = check_format(format, s) {
                        out.push(Violation {
                            path,
                            kind: ViolationKind::MalformedFormat { format, reason },
                        });
                    }
                }
            }
            Schema::Integer { min, max } => {
                let n = match value.as_i64() {
                    Some(n) => n as f64,
                    None => match value.as_f64() {
                        Some(n) if n.fract() == 0.0 => {
                            if n < i64::MIN as f64 {
                                out.push(Violation {
                                    path,
                                    kind: ViolationKind::BelowMinimum { min: i64::MIN as f64 },
                                });
                                return;
                            }
                            if n >= i64::MAX as f64 {
                                out.push(Violation {
                                    path,
                                    kind: ViolationKind::AboveMaximum { max: i64::MAX as f64 },
                                });
                                return;
                            }
                            n
                        }
                        _ => {
                            out.push(wrong_type(path, "integer", value));
                            return;
                        }
                    },
                };
                check_range(n, min.map(|m| m as f64), max.map(|m| m as f64), path, out);
            }
            Schema::Number { min, max } => {
                let Some(n) = value.as_f64() else {
                    out.push(wrong_type(path, "number", value));
                    return;
                };
                check_range(n, *min, *max, path, out);
            }
        }
    }

    /// Render as the provider's response schema (OpenAPI subset)
    pub fn to_provider_schema(&self) -> Value {
        match self {
            Schema::Object(fields) => {
                let mut properties = Map::new();
                let mut required = Vec::new();
                for field in fields {
                    let mut property = field.schema.to_provider_schema();
                    if !field.description.is_empty() {
                        property["description"] = json!(field.description);
                    }
                    if field.optional {
                        property["nullable"] = json!(true);
                    } else {
                        required.push(json!(field.name));
                    }
                    properties.insert(field.name.to_string(), property);
                }
                json!({
                    "type": "OBJECT",
                    "properties": properties,
                    "required": required,
                })
            }
            Schema::Array(items) => json!({
                "type": "ARRAY",
                "items": items.to_provider_schema(),
            }),
            Schema::String(_) => json!({ "type": "STRING" }),
            Schema::Integer { min, max } => {
                let mut schema = json!({ "type": "INTEGER" });
                if let Some(min) = min {
                    schema["minimum"] = json!(min);
                }
                if let Some(max) = max {
                    schema["maximum"] = json!(max);
                }
                schema
            }
            Schema::Number { .. } => json!({ "type": "NUMBER" }),
        }
    }
}

/// Empty once whitespace and control characters are removed
fn is_blank(s: &str) -> bool {
    s.chars().all(|c| c.is_whitespace() || c.is_control())
}

fn check_format(format: StringFormat, s: &str) -> std::result::Result<(), String> {
    match format {
        StringFormat::Url => url::Url::parse(s).map(|_| ()).map_err(|e| e.to_string()),
        StringFormat::DataUri => DataUri::parse(s).map(|_| ()),
    }
}

fn check_range(n: f64, min: Option<f64>, max: Option<f64>, path: String, out: &mut Vec<Violation>) {
    if let Some(min) = min {
        if n < min {
            out.push(Violation {
                path,
                kind: ViolationKind::BelowMinimum { min },
            });
            return;
        }
    }
    if let Some(max) = max {
        if n > max {
            out.push(Violation {
                path,
                kind: ViolationKind::AboveMaximum { max },
            });
        }
    }
}

fn wrong_type(path: String, expected: &'static str, value: &Value) -> Violation {
    Violation {
        path,
        kind: ViolationKind::WrongType {
            expected,
            found: type_name(value),
        },
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
