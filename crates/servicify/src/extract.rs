use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

use crate::date_format::DateFormat;
use crate::enumeration::EnumerationValue;
use crate::formatters::format_enumeration;
use crate::value::{Map, Value};

pub const DEFAULT_PAUSE_INTERVAL: usize = 10_000;

static LEADING_UNDERSCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new("^_").expect("leading underscore pattern is valid"));

pub type DateFormatter = Arc<dyn Fn(&DateTime<Utc>) -> Value + Send + Sync>;
pub type EnumerationFormatter = Arc<dyn Fn(&EnumerationValue) -> Value + Send + Sync>;

/// How an entity's state is turned into a plain data transfer object.
#[derive(Clone)]
pub struct ExtractOptions {
    /// Pattern whose first match in each key is replaced; `None` keeps keys
    /// as they are.
    pub key_replacement_regex: Option<Regex>,
    pub key_replacement: String,
    pub date_formatter: DateFormatter,
    pub enumeration_formatter: EnumerationFormatter,
    /// Nodes visited between scheduler yields in the async variant.
    pub pause_interval: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            key_replacement_regex: Some(LEADING_UNDERSCORE.clone()),
            key_replacement: String::new(),
            date_formatter: Arc::new(|date| DateFormat::Iso8601.format(date)),
            enumeration_formatter: Arc::new(|e| format_enumeration(e, true)),
            pause_interval: DEFAULT_PAUSE_INTERVAL,
        }
    }
}

impl fmt::Debug for ExtractOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractOptions")
            .field("key_replacement_regex", &self.key_replacement_regex)
            .field("key_replacement", &self.key_replacement)
            .field("pause_interval", &self.pause_interval)
            .finish_non_exhaustive()
    }
}

impl ExtractOptions {
    pub fn with_key_replacement_regex(mut self, regex: Option<Regex>) -> Self {
        self.key_replacement_regex = regex;
        self
    }

    pub fn with_key_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.key_replacement = replacement.into();
        self
    }

    pub fn with_date_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&DateTime<Utc>) -> Value + Send + Sync + 'static,
    {
        self.date_formatter = Arc::new(formatter);
        self
    }

    pub fn with_enumeration_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&EnumerationValue) -> Value + Send + Sync + 'static,
    {
        self.enumeration_formatter = Arc::new(formatter);
        self
    }

    pub fn with_pause_interval(mut self, pause_interval: usize) -> Self {
        self.pause_interval = pause_interval;
        self
    }

    fn rename(&self, key: String) -> String {
        match &self.key_replacement_regex {
            Some(regex) => regex
                .replace(&key, self.key_replacement.as_str())
                .into_owned(),
            None => key,
        }
    }
}

/// Produces a plain copy of `entity`: keys are renamed, dates and
/// enumerations are formatted, and everything else is copied as is.
pub fn extract_state_from_entity(entity: &Value, options: &ExtractOptions) -> Value {
    let mut state = entity.clone();
    let mut stack = vec![&mut state];
    while let Some(node) = stack.pop() {
        extract_node(node, options, &mut stack);
    }
    state
}

/// Same as [`extract_state_from_entity`], yielding to the runtime every
/// `pause_interval` nodes so large entities do not starve other tasks.
pub async fn extract_state_from_entity_async(entity: &Value, options: &ExtractOptions) -> Value {
    let mut state = entity.clone();
    {
        let mut stack = vec![&mut state];
        let mut visited = 0_usize;
        while let Some(node) = stack.pop() {
            extract_node(node, options, &mut stack);
            visited += 1;
            if options.pause_interval > 0 && visited % options.pause_interval == 0 {
                tokio::task::yield_now().await;
            }
        }
    }
    state
}

fn extract_node<'v>(node: &'v mut Value, options: &ExtractOptions, stack: &mut Vec<&'v mut Value>) {
    if node.is_falsy() {
        return;
    }
    let formatted = match &*node {
        Value::Date(date) => Some((options.date_formatter)(date)),
        Value::Enumeration(e) => Some((options.enumeration_formatter)(e)),
        _ => None,
    };
    if let Some(formatted) = formatted {
        *node = formatted;
        return;
    }
    match node {
        Value::Array(items) => stack.extend(items.iter_mut().rev()),
        Value::Object(fields) => {
            let renamed: Map = std::mem::take(fields)
                .into_iter()
                .map(|(key, value)| (options.rename(key), value))
                .collect();
            *fields = renamed;
            stack.extend(fields.values_mut().rev());
        }
        _ => {}
    }
}
