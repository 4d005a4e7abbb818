use jsonschema::{Draft, JSONSchema};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::date_format::DateFormat;
use crate::options::ServicifyOptions;
use crate::Enumeration;

static OPTIONS_SCHEMA: Lazy<JSONSchema> = Lazy::new(|| {
    let schema_str = include_str!("../../../contracts/config/servicify-options.v1.json");
    let schema_json: JsonValue = serde_json::from_str(schema_str)
        .expect("contracts/config/servicify-options.v1.json must be valid JSON");
    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&schema_json)
        .expect("servicify options schema must compile")
});

pub const ENV_INCLUDE_ERROR_STACKS: &str = "SERVICIFY_INCLUDE_ERROR_STACKS";
pub const ENV_INCLUDE_ERROR_CAUSES: &str = "SERVICIFY_INCLUDE_ERROR_CAUSES";
pub const ENV_DATE_FORMAT: &str = "SERVICIFY_DATE_FORMAT";
pub const ENV_USE_ENUMERATION_NAMES: &str = "SERVICIFY_USE_ENUMERATION_NAMES";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    ConfigFileNotFound { path: String },

    #[error("Config validation failed")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("JSON parsing failed: {message}")]
    JsonParsingFailed { message: String },

    #[error("IO error: {message}")]
    IoError { message: String },

    #[error("Invalid value for {variable}: {value}")]
    InvalidEnvironmentValue { variable: String, value: String },
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub json_pointer: String,
    pub message: String,
    pub schema_path: String,
}

/// The serializable subset of [`ServicifyOptions`]: the four formatting
/// flags, as they appear in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServicifySettings {
    pub include_error_stacks: bool,
    pub include_error_causes: bool,
    pub date_format: DateFormat,
    pub use_enumeration_names: bool,
}

impl Default for ServicifySettings {
    fn default() -> Self {
        Self {
            include_error_stacks: true,
            include_error_causes: true,
            date_format: DateFormat::Iso8601,
            use_enumeration_names: true,
        }
    }
}

impl ServicifySettings {
    #[instrument(skip(content))]
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let value: JsonValue =
            serde_json::from_str(content).map_err(|e| ConfigError::JsonParsingFailed {
                message: e.to_string(),
            })?;

        validate_settings(&value)?;

        let settings: Self =
            serde_json::from_value(value).map_err(|e| ConfigError::JsonParsingFailed {
                message: e.to_string(),
            })?;
        debug!(?settings, "Loaded servicify settings");
        Ok(settings)
    }

    #[instrument]
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigFileNotFound {
                path: path.to_string_lossy().to_string(),
            });
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            message: format!("Failed to read config file: {}", e),
        })?;

        Self::from_json_str(&content)
    }

    /// Defaults overridden by whichever `SERVICIFY_*` variables are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overlay(|name| std::env::var(name).ok())
    }

    /// Loads `path` when it exists (defaults otherwise), then applies the
    /// `SERVICIFY_*` environment variables on top.
    #[instrument]
    pub fn from_env_or_file(path: &Path) -> Result<Self, ConfigError> {
        let base = if path.exists() {
            Self::from_json_file(path)?
        } else {
            debug!("Config file not found, starting from defaults");
            Self::default()
        };
        base.overlay(|name| std::env::var(name).ok())
    }

    /// Applies overrides read through `lookup`, which maps a variable name
    /// to its value. Unset variables leave the current setting alone.
    pub fn overlay<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_INCLUDE_ERROR_STACKS) {
            self.include_error_stacks = parse_flag(ENV_INCLUDE_ERROR_STACKS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_INCLUDE_ERROR_CAUSES) {
            self.include_error_causes = parse_flag(ENV_INCLUDE_ERROR_CAUSES, &raw)?;
        }
        if let Some(raw) = lookup(ENV_DATE_FORMAT) {
            self.date_format = DateFormat::of_name(raw.trim().to_ascii_uppercase().as_str())
                .ok_or_else(|| invalid(ENV_DATE_FORMAT, &raw))?;
        }
        if let Some(raw) = lookup(ENV_USE_ENUMERATION_NAMES) {
            self.use_enumeration_names = parse_flag(ENV_USE_ENUMERATION_NAMES, &raw)?;
        }
        Ok(self)
    }

    pub fn into_options(self) -> ServicifyOptions {
        ServicifyOptions::default()
            .with_include_error_stacks(self.include_error_stacks)
            .with_include_error_causes(self.include_error_causes)
            .with_date_format(self.date_format)
            .with_use_enumeration_names(self.use_enumeration_names)
    }
}

impl From<ServicifySettings> for ServicifyOptions {
    fn from(settings: ServicifySettings) -> Self {
        settings.into_options()
    }
}

fn parse_flag(variable: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid(variable, raw)),
    }
}

fn invalid(variable: &str, raw: &str) -> ConfigError {
    ConfigError::InvalidEnvironmentValue {
        variable: variable.to_string(),
        value: raw.to_string(),
    }
}

fn validate_settings(value: &JsonValue) -> Result<(), ConfigError> {
    if let Err(errors) = OPTIONS_SCHEMA.validate(value) {
        let validation_errors: Vec<ValidationError> = errors
            .map(|error| ValidationError {
                json_pointer: error.instance_path.to_string(),
                message: error.to_string(),
                schema_path: error.schema_path.to_string(),
            })
            .collect();

        return Err(ConfigError::ValidationFailed {
            errors: validation_errors,
        });
    }

    Ok(())
}
