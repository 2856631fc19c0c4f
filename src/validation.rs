//! Declarative validation of flat request bodies.
//!
//! A [`Schema`] lists the accepted keys and a [`Rule`] for each. Declared keys
//! are optional, undeclared keys are rejected, and validation stops at the
//! first failure. Failures serialize as `{ _original, details: [...] }` so the
//! client can see which key failed and why.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};

pub type Fields = Map<String, Value>;

/// Largest integer an `f64` holds exactly (2^53 - 1).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

#[derive(Debug, Clone, Copy)]
pub enum Rule {
    Str { min: usize, email: bool },
    Number { min: f64 },
}

impl Rule {
    pub const fn string() -> Self {
        Rule::Str { min: 0, email: false }
    }

    pub const fn string_min(min: usize) -> Self {
        Rule::Str { min, email: false }
    }

    pub const fn email_min(min: usize) -> Self {
        Rule::Str { min, email: true }
    }

    pub const fn number_min(min: f64) -> Self {
        Rule::Number { min }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub keys: &'static [(&'static str, Rule)],
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationDetail {
    pub message: String,
    pub path: Vec<String>,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub context: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    #[serde(rename = "_original")]
    pub original: Value,
    pub details: Vec<ValidationDetail>,
}

impl ValidationError {
    pub fn message(&self) -> &str {
        self.details
            .first()
            .map(|d| d.message.as_str())
            .unwrap_or("validation failed")
    }

    pub fn kind(&self) -> Option<&'static str> {
        self.details.first().map(|d| d.kind)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for ValidationError {}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Reads a number the way form fields arrive: JSON numbers or numeric text.
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Unwraps a JSON body that must be an object.
pub fn object_fields(body: Value) -> Result<Fields, ValidationError> {
    match body {
        Value::Object(fields) => Ok(fields),
        other => Err(ValidationError {
            details: vec![ValidationDetail {
                message: "\"value\" must be of type object".into(),
                path: Vec::new(),
                kind: "object.base",
                context: json!({ "label": "value", "type": "object", "value": other }),
            }],
            original: other,
        }),
    }
}

impl Schema {
    pub fn validate(&self, fields: &Fields) -> Result<(), ValidationError> {
        let fail = |key: &str, kind: &'static str, message: String, extra: Value| {
            let mut context = json!({ "label": key, "key": key });
            if let (Value::Object(ctx), Value::Object(extra)) = (&mut context, extra) {
                ctx.extend(extra);
            }
            ValidationError {
                original: Value::Object(fields.clone()),
                details: vec![ValidationDetail {
                    message,
                    path: vec![key.to_string()],
                    kind,
                    context,
                }],
            }
        };

        for &(key, rule) in self.keys {
            let Some(value) = fields.get(key) else {
                continue;
            };
            match rule {
                Rule::Str { min, email } => {
                    let Value::String(s) = value else {
                        return Err(fail(
                            key,
                            "string.base",
                            format!("\"{key}\" must be a string"),
                            json!({ "value": value }),
                        ));
                    };
                    if s.is_empty() {
                        return Err(fail(
                            key,
                            "string.empty",
                            format!("\"{key}\" is not allowed to be empty"),
                            json!({ "value": s }),
                        ));
                    }
                    if email && !is_valid_email(s) {
                        return Err(fail(
                            key,
                            "string.email",
                            format!("\"{key}\" must be a valid email"),
                            json!({ "value": s, "invalids": [s] }),
                        ));
                    }
                    if s.chars().count() < min {
                        return Err(fail(
                            key,
                            "string.min",
                            format!("\"{key}\" length must be at least {min} characters long"),
                            json!({ "limit": min, "value": s }),
                        ));
                    }
                }
                Rule::Number { min } => {
                    let Some(n) = as_number(value) else {
                        return Err(fail(
                            key,
                            "number.base",
                            format!("\"{key}\" must be a number"),
                            json!({ "value": value }),
                        ));
                    };
                    if n.abs() > MAX_SAFE_INTEGER {
                        return Err(fail(
                            key,
                            "number.unsafe",
                            format!("\"{key}\" must be a safe number"),
                            json!({ "value": value }),
                        ));
                    }
                    if n < min {
                        return Err(fail(
                            key,
                            "number.min",
                            format!("\"{key}\" must be greater than or equal to {min}"),
                            json!({ "limit": min, "value": n }),
                        ));
                    }
                }
            }
        }

        if let Some(unknown) = fields
            .keys()
            .find(|k| !self.keys.iter().any(|(declared, _)| declared == k))
        {
            return Err(fail(
                unknown.as_str(),
                "object.unknown",
                format!("\"{unknown}\" is not allowed"),
                json!({ "child": unknown, "value": fields[unknown.as_str()] }),
            ));
        }

        Ok(())
    }
}
