use serde::{Deserialize, Serialize};

use crate::date_format::DateFormat;
use crate::enumeration::EnumerationValue;
use crate::error::{ErrorCause, ErrorValue};
use crate::value::{Map, Value};

/// Plain, acyclic mirror of an error. Only properties present on the source
/// error are populated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorLiteral {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub info: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cause: Option<LiteralCause>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralCause {
    Many(Vec<ErrorLiteral>),
    Single(Box<ErrorLiteral>),
}

impl ErrorLiteral {
    /// Number of nested `cause` levels along the first-cause path.
    pub fn cause_depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self;
        while let Some(next) = current.cause.as_ref().and_then(|c| match c {
            LiteralCause::Single(cause) => Some(&**cause),
            LiteralCause::Many(causes) => causes.first(),
        }) {
            depth += 1;
            current = next;
        }
        depth
    }
}

impl From<&ErrorValue> for ErrorLiteral {
    fn from(error: &ErrorValue) -> Self {
        format_error(error, true, true)
    }
}

impl From<ErrorLiteral> for Value {
    fn from(literal: ErrorLiteral) -> Self {
        let mut fields = Map::new();
        if let Some(name) = literal.name {
            fields.insert("name".to_string(), Value::String(name));
        }
        if let Some(message) = literal.message {
            fields.insert("message".to_string(), Value::String(message));
        }
        if let Some(code) = literal.code {
            fields.insert("code".to_string(), Value::String(code));
        }
        if let Some(info) = literal.info {
            fields.insert("info".to_string(), info);
        }
        if let Some(stack) = literal.stack {
            fields.insert("stack".to_string(), Value::String(stack));
        }
        match literal.cause {
            Some(LiteralCause::Single(cause)) => {
                fields.insert("cause".to_string(), Value::from(*cause));
            }
            Some(LiteralCause::Many(causes)) => {
                fields.insert("cause".to_string(), Value::from(causes));
            }
            None => {}
        }
        Value::Object(fields)
    }
}

fn present(text: &Option<String>) -> Option<String> {
    text.as_ref().filter(|s| !s.is_empty()).cloned()
}

/// Formats an error and, when `include_cause` is set, its cause chain. A
/// multi-cause error formats each cause with the same options.
pub fn format_error(error: &ErrorValue, include_stack: bool, include_cause: bool) -> ErrorLiteral {
    let stack = if include_stack { present(&error.stack) } else { None };

    let cause = match &error.cause {
        Some(ErrorCause::Single(cause)) if include_cause => Some(LiteralCause::Single(Box::new(
            format_error(cause, include_stack, include_cause),
        ))),
        Some(ErrorCause::Many(causes)) if include_cause => Some(LiteralCause::Many(
            causes
                .iter()
                .map(|c| format_error(c, include_stack, include_cause))
                .collect(),
        )),
        _ => None,
    };

    ErrorLiteral {
        name: present(&error.name),
        message: present(&error.message),
        code: present(&error.code),
        info: error.info.clone().filter(|info| !info.is_falsy()),
        stack,
        cause,
    }
}

/// Formats a date value; anything that is not a date is returned unchanged.
pub fn format_date(value: Value, format: DateFormat) -> Value {
    match value {
        Value::Date(date) => format.format(&date),
        other => other,
    }
}

/// The enumeration's name when `use_name`, else its ordinal.
pub fn format_enumeration(enumeration: &EnumerationValue, use_name: bool) -> Value {
    if use_name {
        Value::String(enumeration.name.to_string())
    } else {
        Value::Number(enumeration.ordinal as f64)
    }
}

/// Converts a scalar into its portable form. Non-scalars pass through.
pub fn format_primitive(value: Value) -> Value {
    match value {
        Value::Number(n) if n.is_nan() => Value::from("NaN"),
        Value::Number(n) if n.is_infinite() => {
            Value::from(if n > 0.0 { "Infinity" } else { "-Infinity" })
        }
        Value::BigInt(n) => Value::String(format!("{n}n")),
        Value::Symbol(description) => {
            Value::String(description.unwrap_or_else(|| "Symbol".to_string()))
        }
        other => other,
    }
}
