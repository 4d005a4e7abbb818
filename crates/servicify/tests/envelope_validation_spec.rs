use chrono::Utc;
use servicify::*;
use serde_json::json;

#[tokio::test]
async fn given_wrapped_success_when_validating_then_envelope_matches_contract() {
    let response = servicify_outcome_of(
        || async {
            Ok::<_, anyhow::Error>(Value::object([
                ("at", Value::from(Utc::now())),
                ("status", Value::from(ResponseStatus::Partial)),
            ]))
        },
        &ServicifyOptions::default(),
    )
    .await
    .unwrap()
    .with_trace_id(Some("trace".to_string()));

    let validator = EnvelopeValidator::new().expect("Should create validator");
    response
        .validate_with(&validator)
        .expect("Success envelope should validate");
}

#[tokio::test]
async fn given_wrapped_failure_with_causes_when_validating_then_envelope_matches_contract() {
    let response = servicify_outcome_of(
        || async {
            Err::<(), _>(
                ErrorValue::new("outer")
                    .with_causes(vec![ErrorValue::new("a"), ErrorValue::new("b")]),
            )
        },
        &ServicifyOptions::default(),
    )
    .await
    .unwrap();

    assert!(response.validate().is_ok());
}

#[test]
fn given_envelope_without_meta_when_validating_then_rejected() {
    let validator = EnvelopeValidator::new().unwrap();
    assert!(validator.validate_json(&json!({ "data": 1 })).is_err());
}

#[test]
fn given_negative_elapsed_time_when_validating_then_rejected() {
    let validator = EnvelopeValidator::new().unwrap();
    let result = validator.validate_json(&json!({
        "data": 1,
        "meta": { "status": "SUCCESS", "elapsedMillis": -1 }
    }));
    assert!(result.is_err());
}

#[test]
fn given_serialized_envelope_when_deserializing_then_outcome_is_recovered() {
    let json = json!({
        "error": { "name": "Error", "message": "boom" },
        "meta": { "status": "FAILURE", "elapsedMillis": 3, "elapsedNanos": "3000000" }
    });

    let response: ServiceMethodResponse = serde_json::from_value(json.clone()).unwrap();

    assert!(response.is_failure());
    assert_eq!(response.timing().elapsed_nanos.as_deref(), Some("3000000"));
    assert_eq!(serde_json::to_value(&response).unwrap(), json);
}
