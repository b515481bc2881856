use std::fmt;

use serde_json::Value as JsonValue;
use thiserror::Error;

/// Declared type of a leaf, fixed when the leaf is created.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    /// Signed integer.
    Int,
    /// Floating-point number.
    Real,
    /// Boolean flag.
    Bool,
    /// Free text.
    Str,
    /// One string out of a fixed set.
    Choice(Vec<String>),
}

/// A typed leaf value.
///
/// `Choice` leaves hold a [`Value::Str`] that is a member of their set.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Value of an `Int` leaf.
    Int(i64),
    /// Value of a `Real` leaf.
    Real(f64),
    /// Value of a `Bool` leaf.
    Bool(bool),
    /// Value of a `Str` or `Choice` leaf.
    Str(String),
}

/// Why raw text or a typed value did not fit a [`ValueKind`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoerceError {
    /// Raw text did not parse as the expected kind.
    #[error("expected {expected}, found {found:?}")]
    Parse { expected: &'static str, found: String },

    /// Text outside a choice set.
    #[error("{found:?} is not one of: {}", choices.join(", "))]
    NotAChoice { found: String, choices: Vec<String> },

    /// Typed value of the wrong kind, e.g. a boolean for an integer leaf.
    #[error("expected {expected}, found {found} value {value}")]
    Kind {
        expected: &'static str,
        found: &'static str,
        value: String,
    },

    /// Number outside the declared range, or not a number at all.
    #[error("{value} is outside the range [{min}, {max}]")]
    OutOfRange { value: String, min: f64, max: f64 },
}

/// Type tags written in pool files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueTag {
    /// `int`
    Int,
    /// `real`
    Real,
    /// `bool`
    Bool,
    /// `str`
    Str,
    /// `choice`, checked against the leaf's set on load.
    Choice,
}

impl ValueTag {
    /// Tag text as written to pool files.
    pub fn as_str(self) -> &'static str {
        match self {
            ValueTag::Int => "int",
            ValueTag::Real => "real",
            ValueTag::Bool => "bool",
            ValueTag::Str => "str",
            ValueTag::Choice => "choice",
        }
    }

    /// Parse a tag token, `None` if it is not a known tag.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "int" => Some(ValueTag::Int),
            "real" => Some(ValueTag::Real),
            "bool" => Some(ValueTag::Bool),
            "str" => Some(ValueTag::Str),
            "choice" => Some(ValueTag::Choice),
            _ => None,
        }
    }

    /// Parse raw text according to this tag alone.
    ///
    /// Choice membership is not known here; the text is kept as a string and
    /// checked once the target leaf is known.
    pub fn parse_raw(self, raw: &str) -> Result<Value, CoerceError> {
        match self {
            ValueTag::Int => ValueKind::Int.coerce(raw),
            ValueTag::Real => ValueKind::Real.coerce(raw),
            ValueTag::Bool => ValueKind::Bool.coerce(raw),
            ValueTag::Str | ValueTag::Choice => Ok(Value::Str(raw.to_string())),
        }
    }
}

impl fmt::Display for ValueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

impl ValueKind {
    /// Pool-file tag for this kind.
    pub fn tag(&self) -> ValueTag {
        match self {
            ValueKind::Int => ValueTag::Int,
            ValueKind::Real => ValueTag::Real,
            ValueKind::Bool => ValueTag::Bool,
            ValueKind::Str => ValueTag::Str,
            ValueKind::Choice(_) => ValueTag::Choice,
        }
    }

    fn expected(&self) -> &'static str {
        match self {
            ValueKind::Int => "an integer",
            ValueKind::Real => "a real number",
            ValueKind::Bool => "a boolean",
            ValueKind::Str => "a string",
            ValueKind::Choice(_) => "a choice",
        }
    }

    /// Zero value used when a description carries no default.
    pub fn zero(&self) -> Value {
        match self {
            ValueKind::Int => Value::Int(0),
            ValueKind::Real => Value::Real(0.0),
            ValueKind::Bool => Value::Bool(false),
            ValueKind::Str => Value::Str(String::new()),
            ValueKind::Choice(choices) => {
                Value::Str(choices.first().cloned().unwrap_or_default())
            }
        }
    }

    /// Convert raw text into a typed value. Never falls back to a string.
    pub fn coerce(&self, raw: &str) -> Result<Value, CoerceError> {
        let parse_err = || CoerceError::Parse {
            expected: self.expected(),
            found: raw.to_string(),
        };
        match self {
            ValueKind::Int => raw.trim().parse().map(Value::Int).map_err(|_| parse_err()),
            ValueKind::Real => raw
                .trim()
                .parse()
                .map(Value::Real)
                .map_err(|_| parse_err()),
            ValueKind::Bool => parse_bool(raw).map(Value::Bool).ok_or_else(parse_err),
            ValueKind::Str => Ok(Value::Str(raw.to_string())),
            ValueKind::Choice(choices) => {
                if choices.iter().any(|c| c == raw) {
                    Ok(Value::Str(raw.to_string()))
                } else {
                    Err(CoerceError::NotAChoice {
                        found: raw.to_string(),
                        choices: choices.clone(),
                    })
                }
            }
        }
    }

    /// Check an already typed value against this kind.
    ///
    /// Integers widen to reals and strings are coerced as raw text.
    pub fn accept(&self, value: Value) -> Result<Value, CoerceError> {
        match (self, value) {
            (ValueKind::Int, v @ Value::Int(_))
            | (ValueKind::Real, v @ Value::Real(_))
            | (ValueKind::Bool, v @ Value::Bool(_))
            | (ValueKind::Str, v @ Value::Str(_)) => Ok(v),
            (ValueKind::Real, Value::Int(i)) => Ok(Value::Real(i as f64)),
            (kind, Value::Str(s)) => kind.coerce(&s),
            (kind, v) => Err(CoerceError::Kind {
                expected: kind.expected(),
                found: v.type_name(),
                value: v.to_string(),
            }),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Choice(choices) => write!(f, "choice({})", choices.join("|")),
            other => f.write_str(other.tag().as_str()),
        }
    }
}

impl Value {
    /// Short name of the variant, used in messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Real(_) => "real",
            Value::Bool(_) => "bool",
            Value::Str(_) => "str",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers widen.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// JSON rendering of the value.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Int(i) => JsonValue::from(*i),
            Value::Real(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Str(s) => JsonValue::String(s.clone()),
        }
    }

    /// Convert a scalar JSON value, `None` for arrays, objects and null.
    pub fn from_json(value: &JsonValue) -> Option<Value> {
        match value {
            JsonValue::Bool(b) => Some(Value::Bool(*b)),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Some(Value::Int(i)),
                None => n.as_f64().map(Value::Real),
            },
            JsonValue::String(s) => Some(Value::Str(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Real(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}
