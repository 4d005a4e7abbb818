use crate::envelope::ServiceMethodResponse;
use anyhow::{anyhow, Context, Result};
use jsonschema::{Draft, JSONSchema};
use once_cell::sync::OnceCell;
use serde_json::Value as JsonValue;

const SERVICE_RESPONSE_SCHEMA: &str =
    include_str!("../../../contracts/envelopes/service-response.json");

static SHARED_VALIDATOR: OnceCell<EnvelopeValidator> = OnceCell::new();

/// One place where a serialized response breaks the envelope contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeViolation {
    pub instance_path: String,
    pub message: String,
}

/// Checks serialized responses against the published envelope contract.
pub struct EnvelopeValidator {
    schema: JSONSchema,
}

impl EnvelopeValidator {
    pub fn new() -> Result<Self> {
        let contract: JsonValue = serde_json::from_str(SERVICE_RESPONSE_SCHEMA)
            .context("envelope contract is not valid JSON")?;
        let schema = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&contract)
            .map_err(|e| anyhow!("Failed to compile envelope schema: {}", e))?;
        Ok(Self { schema })
    }

    /// The validator behind [`ServiceMethodResponse::validate`], compiled on
    /// first use.
    pub fn shared() -> Result<&'static Self> {
        SHARED_VALIDATOR.get_or_try_init(Self::new)
    }

    /// Every contract violation in `response_json`; empty when it conforms.
    pub fn violations(&self, response_json: &JsonValue) -> Vec<EnvelopeViolation> {
        match self.schema.validate(response_json) {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .map(|error| EnvelopeViolation {
                    instance_path: error.instance_path.to_string(),
                    message: error.to_string(),
                })
                .collect(),
        }
    }

    pub fn validate_json(&self, response_json: &JsonValue) -> Result<()> {
        let violations = self.violations(response_json);
        if violations.is_empty() {
            return Ok(());
        }
        let details: Vec<String> = violations
            .iter()
            .map(|v| format!("{} at {}", v.message, v.instance_path))
            .collect();
        Err(anyhow!("Envelope validation failed: {}", details.join(", ")))
    }

    pub fn validate(&self, response: &ServiceMethodResponse) -> Result<()> {
        let response_json =
            serde_json::to_value(response).context("response is not serializable")?;
        self.validate_json(&response_json)
    }
}

impl ServiceMethodResponse {
    pub fn validate(&self) -> Result<()> {
        EnvelopeValidator::shared()?.validate(self)
    }

    pub fn validate_with(&self, validator: &EnvelopeValidator) -> Result<()> {
        validator.validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorValue, PortableTiming, Value};
    use serde_json::json;

    fn timing() -> PortableTiming {
        PortableTiming {
            elapsed_millis: 1,
            elapsed_nanos: Some("1000001".to_string()),
        }
    }

    #[test]
    fn test_validator_creation() {
        assert!(EnvelopeValidator::new().is_ok());
    }

    #[test]
    fn test_success_envelope_validation() {
        let response = ServiceMethodResponse::success(Value::from("ok"), timing());
        assert!(response.validate().is_ok());
    }

    #[test]
    fn test_empty_success_envelope_validation() {
        let response = ServiceMethodResponse::success(Value::Undefined, timing());
        assert!(response.validate().is_ok());
    }

    #[test]
    fn test_failure_envelope_validation() {
        let error = Value::from(crate::format_error(&ErrorValue::new("boom"), false, true));
        let response = ServiceMethodResponse::failure(error, timing());
        assert!(response.validate().is_ok());
    }

    #[test]
    fn test_rejects_both_data_and_error() {
        let validator = EnvelopeValidator::new().unwrap();
        let result = validator.validate_json(&json!({
            "data": 1,
            "error": { "message": "boom" },
            "meta": { "status": "FAILURE", "elapsedMillis": 0 }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_status_mismatch() {
        let validator = EnvelopeValidator::new().unwrap();
        let result = validator.validate_json(&json!({
            "data": 1,
            "meta": { "status": "FAILURE", "elapsedMillis": 0 }
        }));
        let message = result.unwrap_err().to_string();
        assert!(message.starts_with("Envelope validation failed"));
    }

    #[test]
    fn test_violations_point_at_offending_field() {
        let validator = EnvelopeValidator::shared().unwrap();
        let violations = validator.violations(&json!({
            "data": 1,
            "meta": { "status": "SUCCESS", "elapsedMillis": -4 }
        }));
        assert!(!violations.is_empty());
        assert!(violations
            .iter()
            .any(|v| v.instance_path == "/meta/elapsedMillis"));
    }
}
