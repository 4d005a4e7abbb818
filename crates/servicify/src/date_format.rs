use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IllegalArgumentError;
use crate::value::Value;
use crate::Enumeration;

const DEFAULT_PATTERN: &str = "%a %b %d %Y %H:%M:%S GMT%z";

const NAIVE_DATE_TIME_PATTERNS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
];

const NAIVE_DATE_PATTERNS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// How dates found while formatting an outcome are rendered. One policy is
/// chosen per configuration and applied to every date encountered.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Enumeration,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DateFormat {
    /// `2020-01-01T00:00:00.000Z`
    #[default]
    #[serde(rename = "ISO_8601")]
    Iso8601,
    /// Integer milliseconds since the Unix epoch.
    UnixMilliseconds,
    /// Fractional seconds since the Unix epoch.
    UnixSeconds,
    Locale,
    LocaleDate,
    LocaleTime,
    /// `Wed Jan 01 2020 00:00:00 GMT+0000`
    Default,
}

impl DateFormat {
    pub fn format(&self, date: &DateTime<Utc>) -> Value {
        match self {
            DateFormat::Iso8601 => Value::String(date.to_rfc3339_opts(SecondsFormat::Millis, true)),
            DateFormat::UnixMilliseconds => Value::Number(date.timestamp_millis() as f64),
            DateFormat::UnixSeconds => Value::Number(date.timestamp_millis() as f64 / 1000.0),
            DateFormat::Locale => local(date, "%c"),
            DateFormat::LocaleDate => local(date, "%x"),
            DateFormat::LocaleTime => local(date, "%X"),
            DateFormat::Default => Value::String(date.format(DEFAULT_PATTERN).to_string()),
        }
    }

    /// Parses a date from text. The Unix policies also accept their own
    /// numeric form; every policy accepts RFC 3339, RFC 2822, the `DEFAULT`
    /// form and plain (UTC) dates and date-times.
    pub fn parse(&self, text: &str) -> Result<DateTime<Utc>, IllegalArgumentError> {
        let text = text.trim();

        if let Ok(n) = text.parse::<f64>() {
            let millis = match self {
                DateFormat::UnixMilliseconds => Some(n),
                DateFormat::UnixSeconds => Some(n * 1000.0),
                _ => None,
            };
            if let Some(date) = millis.and_then(from_millis) {
                return Ok(date);
            }
        }

        parse_text(text)
            .ok_or_else(|| IllegalArgumentError::new("date value cannot be parsed", text))
    }

    /// Like [`DateFormat::parse`], but also takes numbers: seconds for
    /// `UNIX_SECONDS`, milliseconds otherwise.
    pub fn parse_value(&self, value: &Value) -> Result<DateTime<Utc>, IllegalArgumentError> {
        match value {
            Value::Date(date) => Ok(*date),
            Value::String(text) => self.parse(text),
            Value::Number(n) => {
                let millis = match self {
                    DateFormat::UnixSeconds => n * 1000.0,
                    _ => *n,
                };
                from_millis(millis)
                    .ok_or_else(|| IllegalArgumentError::new("date value cannot be parsed", n))
            }
            other => Err(IllegalArgumentError::new(
                "date value cannot be parsed",
                other.type_tag().as_str(),
            )),
        }
    }
}

fn local(date: &DateTime<Utc>, pattern: &str) -> Value {
    Value::String(date.with_timezone(&Local).format(pattern).to_string())
}

fn from_millis(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() {
        return None;
    }
    Utc.timestamp_millis_opt(millis.round() as i64).single()
}

fn parse_text(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(text) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_str(text, DEFAULT_PATTERN) {
        return Some(date.with_timezone(&Utc));
    }
    for pattern in NAIVE_DATE_TIME_PATTERNS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, pattern) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for pattern in NAIVE_DATE_PATTERNS {
        if let Ok(date) = NaiveDate::parse_from_str(text, pattern) {
            return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Enumeration as _;

    fn new_year() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_enumeration_names() {
        let names: Vec<_> = DateFormat::values().iter().map(|f| f.name()).collect();
        assert_eq!(
            names,
            vec![
                "ISO_8601",
                "UNIX_MILLISECONDS",
                "UNIX_SECONDS",
                "LOCALE",
                "LOCALE_DATE",
                "LOCALE_TIME",
                "DEFAULT"
            ]
        );
        assert_eq!(
            serde_json::to_string(&DateFormat::Iso8601).unwrap(),
            "\"ISO_8601\""
        );
        assert_eq!(
            serde_json::from_str::<DateFormat>("\"UNIX_SECONDS\"").unwrap(),
            DateFormat::UnixSeconds
        );
    }

    #[test]
    fn test_format_policies() {
        let date = new_year() + chrono::Duration::milliseconds(1500);
        assert_eq!(
            DateFormat::Iso8601.format(&date),
            Value::from("2020-01-01T00:00:01.500Z")
        );
        assert_eq!(
            DateFormat::UnixMilliseconds.format(&date),
            Value::Number(1_577_836_801_500.0)
        );
        assert_eq!(
            DateFormat::UnixSeconds.format(&date),
            Value::Number(1_577_836_801.5)
        );
        assert_eq!(
            DateFormat::Default.format(&new_year()),
            Value::from("Wed Jan 01 2020 00:00:00 GMT+0000")
        );
        assert!(DateFormat::Locale.format(&date).as_str().is_some());
        assert!(DateFormat::LocaleDate.format(&date).as_str().is_some());
        assert!(DateFormat::LocaleTime.format(&date).as_str().is_some());
    }

    #[test]
    fn test_parse_accepts_common_forms() {
        let expected = new_year();
        for text in [
            "2020-01-01T00:00:00.000Z",
            "2020-01-01T01:00:00+01:00",
            "Wed, 01 Jan 2020 00:00:00 +0000",
            "Wed Jan 01 2020 00:00:00 GMT+0000",
            "2020-01-01T00:00:00",
            "2020-01-01",
            "2020/1/1",
        ] {
            assert_eq!(DateFormat::Iso8601.parse(text), Ok(expected), "{text}");
        }
    }

    #[test]
    fn test_parse_numeric_forms() {
        assert_eq!(
            DateFormat::UnixMilliseconds.parse("1577836800000"),
            Ok(new_year())
        );
        assert_eq!(DateFormat::UnixSeconds.parse("1577836800"), Ok(new_year()));
        assert_eq!(
            DateFormat::Iso8601.parse_value(&Value::from(1_577_836_800_000_i64)),
            Ok(new_year())
        );
        assert!(DateFormat::Iso8601.parse("1577836800000").is_err());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = DateFormat::Iso8601.parse("not a date").unwrap_err();
        assert_eq!(err.message, "date value cannot be parsed");
        assert_eq!(err.value, "not a date");
        assert!(DateFormat::Iso8601.parse_value(&Value::from(true)).is_err());
    }
}
