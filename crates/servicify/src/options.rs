use std::fmt;
use std::sync::Arc;

use crate::date_format::DateFormat;
use crate::dispatch::{default_formatters, FormatterSpec};
use crate::timing::{Clock, SystemClock};

/// Configuration of one outcome wrapper.
///
/// An explicit `formatters` list overrides the default spec list, in which
/// case the four formatting flags are ignored.
#[derive(Clone)]
pub struct ServicifyOptions {
    pub formatters: Option<Vec<FormatterSpec>>,
    pub include_error_stacks: bool,
    pub include_error_causes: bool,
    pub date_format: DateFormat,
    pub use_enumeration_names: bool,
    pub clock: Arc<dyn Clock>,
}

impl Default for ServicifyOptions {
    fn default() -> Self {
        Self {
            formatters: None,
            include_error_stacks: true,
            include_error_causes: true,
            date_format: DateFormat::Iso8601,
            use_enumeration_names: true,
            clock: Arc::new(SystemClock),
        }
    }
}

impl fmt::Debug for ServicifyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServicifyOptions")
            .field("formatters", &self.formatters)
            .field("include_error_stacks", &self.include_error_stacks)
            .field("include_error_causes", &self.include_error_causes)
            .field("date_format", &self.date_format)
            .field("use_enumeration_names", &self.use_enumeration_names)
            .finish_non_exhaustive()
    }
}

impl ServicifyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_formatters(mut self, formatters: Vec<FormatterSpec>) -> Self {
        self.formatters = Some(formatters);
        self
    }

    pub fn with_include_error_stacks(mut self, include: bool) -> Self {
        self.include_error_stacks = include;
        self
    }

    pub fn with_include_error_causes(mut self, include: bool) -> Self {
        self.include_error_causes = include;
        self
    }

    pub fn with_date_format(mut self, date_format: DateFormat) -> Self {
        self.date_format = date_format;
        self
    }

    pub fn with_use_enumeration_names(mut self, use_names: bool) -> Self {
        self.use_enumeration_names = use_names;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// The spec list in effect: the explicit one, else the defaults built
    /// from the formatting flags.
    pub fn resolve_formatters(&self) -> Vec<FormatterSpec> {
        match &self.formatters {
            Some(formatters) => formatters.clone(),
            None => default_formatters(
                self.include_error_stacks,
                self.include_error_causes,
                self.date_format,
                self.use_enumeration_names,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TypeTag, Value};

    #[test]
    fn test_defaults() {
        let options = ServicifyOptions::default();
        assert!(options.include_error_stacks);
        assert!(options.include_error_causes);
        assert!(options.use_enumeration_names);
        assert_eq!(options.date_format, DateFormat::Iso8601);
        assert_eq!(options.resolve_formatters().len(), 10);
    }

    #[test]
    fn test_explicit_formatters_override_flags() {
        let options = ServicifyOptions::default()
            .with_date_format(DateFormat::UnixSeconds)
            .with_formatters(vec![FormatterSpec::type_of(TypeTag::String, |_| {
                Value::Null
            })]);
        let specs = options.resolve_formatters();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].type_of, Some(TypeTag::String));
    }
}
