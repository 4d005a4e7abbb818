use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use thiserror::Error;

use crate::value::Value;

pub const DEFAULT_ERROR_NAME: &str = "Error";
pub const PANIC_ERROR_NAME: &str = "Panic";

/// Errors raised by the pipeline itself. These signal programmer error
/// (bad configuration) and are never produced by a wrapped operation's
/// own failure.
#[derive(Debug, Error)]
pub enum ServicifyError {
    #[error("formatter spec at index {index} has neither type_of nor instance_of; must have one or the other")]
    InvalidFormatterSpec { index: usize },

    #[error("cannot compute elapsed time between a millisecond and a nanosecond instant")]
    MixedClockUnits,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}: {value}")]
pub struct IllegalArgumentError {
    pub message: String,
    pub value: String,
}

impl IllegalArgumentError {
    pub fn new(message: impl Into<String>, value: impl fmt::Display) -> Self {
        Self {
            message: message.into(),
            value: value.to_string(),
        }
    }
}

/// An error as data: the structured counterpart of a thrown error, with an
/// optional code, free-form info, captured stack and cause chain.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ErrorValue {
    pub name: Option<String>,
    pub message: Option<String>,
    pub code: Option<String>,
    pub info: Option<Value>,
    pub stack: Option<String>,
    pub cause: Option<ErrorCause>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorCause {
    Single(Box<ErrorValue>),
    Many(Vec<ErrorValue>),
}

impl ErrorValue {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            name: Some(DEFAULT_ERROR_NAME.to_string()),
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn named(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_info(mut self, info: impl Into<Value>) -> Self {
        self.info = Some(info.into());
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Captures the current backtrace into `stack`, regardless of
    /// `RUST_BACKTRACE`.
    pub fn with_backtrace(self) -> Self {
        self.with_stack(Backtrace::force_capture().to_string())
    }

    pub fn with_cause(mut self, cause: ErrorValue) -> Self {
        self.cause = Some(ErrorCause::Single(Box::new(cause)));
        self
    }

    pub fn with_causes(mut self, causes: Vec<ErrorValue>) -> Self {
        self.cause = Some(ErrorCause::Many(causes));
        self
    }

    /// Builds an error value from `error` and its `source()` chain, naming it
    /// after the concrete error type.
    pub fn of<E: std::error::Error + 'static>(error: &E) -> Self {
        let mut value = Self::from_std(error);
        if value.name.as_deref() == Some(DEFAULT_ERROR_NAME) && !is_error_value::<E>() {
            value.name = Some(short_type_name::<E>());
        }
        value
    }

    /// Builds an error value from `error` and its `source()` chain. A link
    /// that already is an [`ErrorValue`] is taken over with its own causes.
    pub fn from_std(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut links = Vec::new();
        let mut next = Some(error);
        while let Some(link) = next {
            if let Some(value) = link.downcast_ref::<ErrorValue>() {
                links.push(value.clone());
                break;
            }
            links.push(ErrorValue::new(link.to_string()));
            next = link.source();
        }
        chain_links(links)
    }

    /// Builds an error value from an operation's returned error. Errors not
    /// already named are named after `E`, unless `E` is `anyhow::Error`.
    pub fn from_failure<E: Into<anyhow::Error> + 'static>(error: E) -> Self {
        let mut value = Self::from(error.into());
        let generic = std::any::TypeId::of::<E>() == std::any::TypeId::of::<anyhow::Error>();
        if value.name.as_deref() == Some(DEFAULT_ERROR_NAME) && !generic && !is_error_value::<E>() {
            value.name = Some(short_type_name::<E>());
        }
        value
    }

    /// Builds an error value from a caught panic payload.
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "operation panicked".to_string()
        };
        ErrorValue::named(PANIC_ERROR_NAME, message)
    }

    /// Iterates this error followed by its first-cause chain.
    pub fn chain(&self) -> impl Iterator<Item = &ErrorValue> {
        std::iter::successors(Some(self), |e| match &e.cause {
            Some(ErrorCause::Single(cause)) => Some(&**cause),
            Some(ErrorCause::Many(causes)) => causes.first(),
            None => None,
        })
    }
}

fn chain_links(mut links: Vec<ErrorValue>) -> ErrorValue {
    let mut current = links.pop().unwrap_or_default();
    while let Some(parent) = links.pop() {
        current = parent.with_cause(current);
    }
    current
}

fn is_error_value<E: 'static>() -> bool {
    std::any::TypeId::of::<E>() == std::any::TypeId::of::<ErrorValue>()
}

/// `my_crate::errors::BadError<T>` -> `BadError`.
fn short_type_name<E>() -> String {
    let full = std::any::type_name::<E>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, &self.message) {
            (Some(name), Some(message)) => write!(f, "{name}: {message}"),
            (None, Some(message)) => f.write_str(message),
            (Some(name), None) => f.write_str(name),
            (None, None) => f.write_str(DEFAULT_ERROR_NAME),
        }
    }
}

impl std::error::Error for ErrorValue {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.cause {
            Some(ErrorCause::Single(cause)) => Some(&**cause),
            Some(ErrorCause::Many(causes)) => causes
                .first()
                .map(|c| c as &(dyn std::error::Error + 'static)),
            None => None,
        }
    }
}

impl From<anyhow::Error> for ErrorValue {
    fn from(error: anyhow::Error) -> Self {
        // Not `downcast`: for context-wrapped errors it would return the inner
        // error and drop the context messages.
        if let Some(value) = error.chain().next().and_then(|e| e.downcast_ref::<ErrorValue>()) {
            return value.clone();
        }

        let mut links = Vec::new();
        for link in error.chain() {
            if let Some(value) = link.downcast_ref::<ErrorValue>() {
                links.push(value.clone());
                break;
            }
            links.push(ErrorValue::new(link.to_string()));
        }

        let mut value = chain_links(links);
        if value.stack.is_none() && error.backtrace().status() == BacktraceStatus::Captured {
            value.stack = Some(error.backtrace().to_string());
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[derive(Debug, Error)]
    #[error("disk on fire")]
    struct DiskError;

    #[derive(Debug, Error)]
    #[error("write failed")]
    struct WriteError {
        #[source]
        source: DiskError,
    }

    #[test]
    fn test_std_chain_becomes_nested_causes() {
        let error = WriteError { source: DiskError };
        let value = ErrorValue::of(&error);

        assert_eq!(value.name.as_deref(), Some("WriteError"));
        let messages: Vec<_> = value
            .chain()
            .map(|e| e.message.clone().unwrap_or_default())
            .collect();
        assert_eq!(messages, vec!["write failed", "disk on fire"]);
    }

    #[test]
    fn test_anyhow_context_chain() {
        let error = anyhow::Error::new(DiskError).context("saving report");
        let value = ErrorValue::from(error);

        assert_eq!(value.message.as_deref(), Some("saving report"));
        assert_eq!(value.chain().count(), 2);
    }

    #[test]
    fn test_anyhow_roundtrips_error_value() {
        let original = ErrorValue::named("BadError", "bad")
            .with_code("E_BAD")
            .with_cause(ErrorValue::new("because"));
        let value = ErrorValue::from(anyhow::Error::new(original.clone()));
        assert_eq!(value, original);
    }

    #[test]
    fn test_error_value_inside_context_keeps_code() {
        let inner = ErrorValue::new("inner").with_code("E_INNER");
        let result: anyhow::Result<()> = Err(anyhow::Error::new(inner));
        let error = result.context("outer").unwrap_err();

        let value = ErrorValue::from(error);
        let nested: Vec<_> = value.chain().collect();
        assert_eq!(nested.len(), 2);
        assert_eq!(nested[1].code.as_deref(), Some("E_INNER"));
    }

    #[test]
    fn test_failure_named_after_error_type() {
        let value = ErrorValue::from_failure(DiskError);
        assert_eq!(value.name.as_deref(), Some("DiskError"));
        assert_eq!(value.message.as_deref(), Some("disk on fire"));

        let value = ErrorValue::from_failure(anyhow::anyhow!("plain"));
        assert_eq!(value.name.as_deref(), Some(DEFAULT_ERROR_NAME));
    }

    #[test]
    fn test_panic_payloads() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("kaboom");
        let value = ErrorValue::from_panic(&*boxed);
        assert_eq!(value.name.as_deref(), Some(PANIC_ERROR_NAME));
        assert_eq!(value.message.as_deref(), Some("kaboom"));
    }

    #[test]
    fn test_source_follows_cause() {
        let value = ErrorValue::new("top").with_causes(vec![
            ErrorValue::new("first"),
            ErrorValue::new("second"),
        ]);
        let source = std::error::Error::source(&value).unwrap();
        assert_eq!(source.to_string(), "Error: first");
    }
}
