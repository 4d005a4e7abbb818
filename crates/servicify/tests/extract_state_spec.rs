use chrono::{TimeZone, Utc};
use regex::Regex;
use servicify::*;
use serde_json::json;

#[derive(Debug, Clone, Copy, Enumeration)]
enum Tier {
    Free,
    Pro,
}

fn account() -> Value {
    Value::object([
        ("_id", Value::from("acct-1")),
        ("_tier", Value::from(Tier::Pro)),
        (
            "_openedAt",
            Value::from(Utc.with_ymd_and_hms(2019, 6, 1, 12, 0, 0).unwrap()),
        ),
        ("_balance", Value::from(0)),
        (
            "_owners",
            Value::from(vec![Value::object([("_name", "ada"), ("_role", "admin")])]),
        ),
    ])
}

#[test]
fn given_entity_with_private_keys_when_extracting_then_plain_dto() {
    let dto = extract_state_from_entity(&account(), &ExtractOptions::default());

    assert_eq!(
        serde_json::to_value(&dto).unwrap(),
        json!({
            "id": "acct-1",
            "tier": "PRO",
            "openedAt": "2019-06-01T12:00:00.000Z",
            "balance": 0,
            "owners": [{ "name": "ada", "role": "admin" }]
        })
    );
}

#[test]
fn given_custom_formatters_when_extracting_then_they_are_used() {
    let options = ExtractOptions::default()
        .with_key_replacement_regex(Some(Regex::new("^_(.)").unwrap()))
        .with_key_replacement("$1")
        .with_date_formatter(|d| Value::from(d.timestamp()))
        .with_enumeration_formatter(|e| Value::from(e.ordinal));

    let dto = extract_state_from_entity(&account(), &options);

    assert_eq!(dto.get("tier"), Some(&Value::from(1)));
    assert_eq!(dto.get("openedAt"), Some(&Value::from(1_559_390_400_i64)));
    assert_eq!(Tier::Free.ordinal(), 0);
}

#[test]
fn given_entity_when_extracting_then_input_is_left_untouched() {
    let entity = account();
    let _ = extract_state_from_entity(&entity, &ExtractOptions::default());
    assert_eq!(entity, account());
}

#[tokio::test]
async fn given_large_entity_when_extracting_async_then_result_matches_sync() {
    let rows: Value = (0..3_000)
        .map(|i| Value::object([("_row", Value::from(i)), ("_tier", Value::from(Tier::Free))]))
        .collect();
    let options = ExtractOptions::default().with_pause_interval(500);

    let sync = extract_state_from_entity(&rows, &options);
    let async_dto = extract_state_from_entity_async(&rows, &options).await;

    assert_eq!(sync, async_dto);
    assert_eq!(
        sync.as_array().and_then(|rows| rows[10].get("tier")),
        Some(&Value::from("FREE"))
    );
}
