//! Integration tests for tesla-common library.

use tesla_common::{
    TelemetryValue, VehicleListResponse, VehicleState, VehicleStatus, WakeResponse,
};

const VEHICLE_DATA: &str = r#"{
  "response": {
    "id": 123456,
    "display_name": "SlowPoke",
    "state": "online",
    "charge_state": {
      "battery_level": 67,
      "battery_range": 238.89,
      "battery_heater_on": false,
      "fast_charger_brand": "<invalid>",
      "not_enough_power_to_heat": null
    },
    "drive_state": {
      "shift_state": null,
      "speed": null
    },
    "vehicle_state": {
      "car_version": "2023.6.9 8b27e21d9137"
    }
  }
}"#;

#[test]
fn test_vehicle_data_tree() {
    let tree = TelemetryValue::from_slice(VEHICLE_DATA.as_bytes()).expect("parse failed");

    let response = tree.get("response").expect("missing response");
    assert!(matches!(response, TelemetryValue::Object(_)));
    assert_eq!(
        response.get("state").and_then(TelemetryValue::as_str),
        Some("online")
    );
    assert_eq!(
        tree.lookup(&["response", "charge_state", "battery_level"]),
        Some(&TelemetryValue::Integer(67))
    );
    assert_eq!(
        tree.lookup(&["response", "charge_state", "battery_range"]),
        Some(&TelemetryValue::Float(238.89))
    );
    assert_eq!(
        tree.lookup(&["response", "charge_state", "battery_heater_on"]),
        Some(&TelemetryValue::Boolean(false))
    );
    assert_eq!(
        tree.lookup(&["response", "charge_state", "not_enough_power_to_heat"]),
        Some(&TelemetryValue::Null)
    );
    assert_eq!(
        tree.lookup(&["response", "drive_state", "shift_state"]),
        Some(&TelemetryValue::Null)
    );
}

#[test]
fn test_vehicle_list_roundtrip_from_api_shape() {
    let body = r#"{
        "count": 1,
        "response": [{
            "access_type": "OWNER",
            "api_version": 54,
            "id": 3744405482650726,
            "state": "offline",
            "display_name": "SlowPoke"
        }]
    }"#;

    let list: VehicleListResponse = serde_json::from_str(body).unwrap();
    assert_eq!(
        list.single_vehicle(),
        Some(VehicleStatus {
            id: 3744405482650726,
            state: VehicleState::Offline,
        })
    );
}

#[test]
fn test_wake_response_shape() {
    let body = r#"{"response": {"display_name": "SlowPoke", "state": "asleep", "id": 1}}"#;
    let wake: WakeResponse = serde_json::from_str(body).unwrap();
    let ack = wake.response.unwrap();
    assert_eq!(ack.display_name.as_deref(), Some("SlowPoke"));
    assert_eq!(ack.state.as_deref(), Some("asleep"));

    let empty: WakeResponse = serde_json::from_str("{}").unwrap();
    assert!(empty.response.is_none());
}

#[test]
fn test_all_vehicle_states() {
    let states = [
        (VehicleState::Online, "online"),
        (VehicleState::Asleep, "asleep"),
        (VehicleState::Offline, "offline"),
        (VehicleState::Unknown, "unknown"),
    ];

    for (state, expected_str) in states {
        assert_eq!(state.as_str(), expected_str);
        assert_eq!(format!("{}", state), expected_str);
        assert_eq!(VehicleState::from(expected_str), state);
    }
}
