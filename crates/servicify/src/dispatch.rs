use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::date_format::DateFormat;
use crate::enumeration::Enumeration;
use crate::error::ServicifyError;
use crate::formatters::{format_date, format_enumeration, format_error, format_primitive};
use crate::value::{TypeTag, Value};

/// Visited nodes between scheduler yields in the async traversal.
pub const DEFAULT_YIELD_INTERVAL: usize = 10_000;

pub type FormatFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Structural type a value can be an instance of, the operand of an
/// `instance_of` formatter match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InstanceTag {
    Error,
    /// Errors whose `name` equals the given one.
    NamedError(Cow<'static, str>),
    Date,
    Enumeration,
    /// Enumeration instances of one enumeration type.
    EnumerationOf(Cow<'static, str>),
    /// Any composite that is not a sequence.
    Object,
}

impl InstanceTag {
    pub fn enumeration_of<E: Enumeration>() -> Self {
        InstanceTag::EnumerationOf(Cow::Borrowed(E::TYPE_NAME))
    }

    pub fn named_error(name: impl Into<Cow<'static, str>>) -> Self {
        InstanceTag::NamedError(name.into())
    }

    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (InstanceTag::Error, Value::Error(_))
            | (InstanceTag::Date, Value::Date(_))
            | (InstanceTag::Enumeration, Value::Enumeration(_)) => true,
            (InstanceTag::NamedError(name), Value::Error(error)) => {
                error.name.as_deref() == Some(name.as_ref())
            }
            (InstanceTag::EnumerationOf(type_name), Value::Enumeration(e)) => {
                e.type_name == type_name.as_ref()
            }
            (
                InstanceTag::Object,
                Value::Error(_) | Value::Date(_) | Value::Enumeration(_) | Value::Object(_),
            ) => true,
            _ => false,
        }
    }
}

/// A type-matching rule plus the function that formats matched values.
///
/// Exactly one of `type_of` / `instance_of` is expected; a spec with neither
/// is a configuration error reported when the spec list is used. A spec with
/// both applies when either matches.
#[derive(Clone)]
pub struct FormatterSpec {
    pub type_of: Option<TypeTag>,
    pub instance_of: Option<InstanceTag>,
    formatter: FormatFn,
}

impl fmt::Debug for FormatterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatterSpec")
            .field("type_of", &self.type_of)
            .field("instance_of", &self.instance_of)
            .finish_non_exhaustive()
    }
}

impl FormatterSpec {
    pub fn new<F>(type_of: Option<TypeTag>, instance_of: Option<InstanceTag>, formatter: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self {
            type_of,
            instance_of,
            formatter: Arc::new(formatter),
        }
    }

    pub fn type_of<F>(tag: TypeTag, formatter: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self::new(Some(tag), None, formatter)
    }

    pub fn instance_of<F>(tag: InstanceTag, formatter: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self::new(None, Some(tag), formatter)
    }

    pub fn is_valid(&self) -> bool {
        self.type_of.is_some() || self.instance_of.is_some()
    }

    pub fn applies_to(&self, value: &Value) -> bool {
        self.type_of.is_some_and(|tag| tag == value.type_tag())
            || self.instance_of.as_ref().is_some_and(|tag| tag.matches(value))
    }

    pub fn format(&self, value: Value) -> Value {
        (self.formatter)(value)
    }
}

pub fn validate_formatters(specs: &[FormatterSpec]) -> Result<(), ServicifyError> {
    match specs.iter().position(|spec| !spec.is_valid()) {
        Some(index) => Err(ServicifyError::InvalidFormatterSpec { index }),
        None => Ok(()),
    }
}

/// Recursively rewrites `value`, replacing every node matched by a spec
/// with its formatted form. The first applicable spec wins and its result
/// is not descended into. Sequences are never matched themselves, only
/// their elements.
///
/// The tree is rewritten in place using an explicit work stack, so deep
/// inputs cannot exhaust the call stack.
pub fn format_values_in(mut value: Value, specs: &[FormatterSpec]) -> Result<Value, ServicifyError> {
    validate_formatters(specs)?;
    format_tree(&mut value, specs);
    Ok(value)
}

/// Same traversal as [`format_values_in`], yielding to the scheduler every
/// `yield_every` visited nodes (never when zero).
pub async fn format_values_in_async(
    mut value: Value,
    specs: &[FormatterSpec],
    yield_every: usize,
) -> Result<Value, ServicifyError> {
    validate_formatters(specs)?;
    {
        let mut stack = vec![&mut value];
        let mut steps = 0_usize;
        while let Some(node) = stack.pop() {
            visit(node, specs, &mut stack);
            steps += 1;
            if yield_every > 0 && steps % yield_every == 0 {
                tokio::task::yield_now().await;
            }
        }
    }
    Ok(value)
}

pub(crate) fn format_tree(value: &mut Value, specs: &[FormatterSpec]) {
    let mut stack = vec![value];
    while let Some(node) = stack.pop() {
        visit(node, specs, &mut stack);
    }
}

fn select<'s>(specs: &'s [FormatterSpec], value: &Value) -> Option<&'s FormatterSpec> {
    specs.iter().find(|spec| spec.applies_to(value))
}

// Pushes children in reverse so they pop in document order.
fn visit<'v>(node: &'v mut Value, specs: &[FormatterSpec], stack: &mut Vec<&'v mut Value>) {
    if !matches!(node, Value::Array(_)) {
        if let Some(spec) = select(specs, node) {
            let value = std::mem::take(node);
            *node = spec.format(value);
            return;
        }
    }
    match node {
        Value::Array(items) => stack.extend(items.iter_mut().rev()),
        Value::Object(fields) => stack.extend(fields.values_mut().rev()),
        _ => {}
    }
}

/// The default spec list: Error, Date, Enumeration, then one `type_of` spec
/// per primitive tag. Error `info` payloads, including those of causes, are
/// formatted with the full list, so a second pass over the output is a no-op.
pub fn default_formatters(
    include_error_stacks: bool,
    include_error_causes: bool,
    date_format: DateFormat,
    use_enumeration_names: bool,
) -> Vec<FormatterSpec> {
    let mut leaf_specs = vec![
        FormatterSpec::instance_of(InstanceTag::Date, move |value| {
            format_date(value, date_format)
        }),
        FormatterSpec::instance_of(InstanceTag::Enumeration, move |value| match value {
            Value::Enumeration(e) => format_enumeration(&e, use_enumeration_names),
            other => other,
        }),
    ];
    leaf_specs.extend(
        TypeTag::PRIMITIVES
            .into_iter()
            .map(|tag| FormatterSpec::type_of(tag, format_primitive)),
    );

    let error_formatter = ErrorFormatter {
        include_stack: include_error_stacks,
        include_cause: include_error_causes,
        leaf_specs: Arc::new(leaf_specs),
    };

    let mut specs = vec![error_formatter.spec()];
    specs.extend(error_formatter.leaf_specs.iter().cloned());
    specs
}

/// Formats errors into literals. The spec list used on `info` payloads is
/// this formatter's own spec followed by the leaf specs, rebuilt on demand
/// since a spec list cannot hold itself.
#[derive(Clone)]
struct ErrorFormatter {
    include_stack: bool,
    include_cause: bool,
    leaf_specs: Arc<Vec<FormatterSpec>>,
}

impl ErrorFormatter {
    fn spec(&self) -> FormatterSpec {
        let formatter = self.clone();
        FormatterSpec::instance_of(InstanceTag::Error, move |value| formatter.format(value))
    }

    fn format(&self, value: Value) -> Value {
        let error = match value {
            Value::Error(error) => error,
            other => return other,
        };
        let mut literal = Value::from(format_error(&error, self.include_stack, self.include_cause));

        let mut info_specs = None;
        let mut pending = vec![&mut literal];
        while let Some(node) = pending.pop() {
            let Value::Object(fields) = node else {
                continue;
            };
            if let Some(info) = fields.get_mut("info") {
                let specs = info_specs.get_or_insert_with(|| {
                    let mut specs = vec![self.spec()];
                    specs.extend(self.leaf_specs.iter().cloned());
                    specs
                });
                format_tree(info, specs);
            }
            match fields.get_mut("cause") {
                Some(Value::Array(causes)) => pending.extend(causes.iter_mut()),
                Some(cause) => pending.push(cause),
                None => {}
            }
        }
        literal
    }
}
