// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::path::{Path, PathBuf};
use std::time::Duration;

use rocket::config::LogLevel;
use rocket::http::{ContentType, Header, Status};
use rocket::local::asynchronous::Client;
use serde_json::{json, Value};
use tempfile::tempdir;
use thermostat_gateway::api::{build_rocket, ApiState, ConfigStore};
use thermostat_gateway::config::{Config, OccupancyConfig};
use thermostat_gateway::error::GatewayError;
use thermostat_gateway::modbus::MockThermostat;
use thermostat_gateway::occupancy::OccupancyMonitor;
use thermostat_gateway::serializer::Serializer;

const KEY: &str = "test-key";

fn auth() -> Header<'static> {
    Header::new("Authorization", format!("Bearer {}", KEY))
}

fn test_config() -> Config {
    let mut config = Config::sample();
    config.serial_number = "TH-TEST".to_string();
    config.api.auth_key = KEY.to_string();
    config
}

async fn client(
    mock: &MockThermostat,
    monitor: Option<OccupancyMonitor>,
    config_path: &Path,
) -> Client {
    let figment = rocket::Config::figment().merge(("log_level", LogLevel::Off));
    let (queue, _worker) = Serializer::spawn(Box::new(mock.clone()));
    let state = ApiState {
        queue,
        store: ConfigStore::new(config_path, test_config()),
        monitor,
        auth_key: KEY.to_string(),
    };

    Client::tracked(build_rocket(figment, state))
        .await
        .expect("valid rocket instance")
}

fn scratch_path() -> (tempfile::TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    (dir, path)
}

#[rocket::async_test]
async fn test_missing_or_wrong_key_is_rejected() {
    let (_dir, path) = scratch_path();
    let mock = MockThermostat::simulated();
    let client = client(&mock, None, &path).await;

    let response = client.get("/read").dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);
    assert_eq!(
        response.headers().get_one("Access-Control-Allow-Origin"),
        Some("*")
    );
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body, json!({"error": "Unauthorized"}));

    let response = client
        .get("/info")
        .header(Header::new("Authorization", "Bearer wrong"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    let response = client
        .get("/info")
        .header(Header::new("Authorization", KEY))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    // Nothing reached the thermostat
    assert!(mock.journal().is_empty());
}

#[rocket::async_test]
async fn test_read_returns_status_block() {
    let (_dir, path) = scratch_path();
    let mock = MockThermostat::simulated();
    let client = client(&mock, None, &path).await;

    let response = client.get("/read").header(auth()).dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let body: Vec<u16> = response.into_json().await.unwrap();
    assert_eq!(body, vec![1, 215, 21, 2, 0, 1, 0, 0, 0, 0, 0, 0]);
}

#[rocket::async_test]
async fn test_read_failure_is_500() {
    let (_dir, path) = scratch_path();
    let mock = MockThermostat::simulated();
    mock.fail_next(GatewayError::Timeout(Duration::from_secs(5)));
    let client = client(&mock, None, &path).await;

    let response = client.get("/read").header(auth()).dispatch().await;
    assert_eq!(response.status(), Status::InternalServerError);

    let body: Value = response.into_json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("timed out"));
}

#[rocket::async_test]
async fn test_set_writes_register() {
    let (_dir, path) = scratch_path();
    let mock = MockThermostat::simulated();
    let client = client(&mock, None, &path).await;

    let response = client
        .post("/set/3")
        .header(auth())
        .header(ContentType::JSON)
        .body(r#"{"value": 25}"#)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body, json!({"message": "Value set successfully"}));
    assert_eq!(mock.register(3), Some(25));
}

#[rocket::async_test]
async fn test_set_rejects_bad_input_before_queueing() {
    let (_dir, path) = scratch_path();
    let mock = MockThermostat::simulated();
    let client = client(&mock, None, &path).await;

    let cases = [
        ("/set/abc", r#"{"value": 1}"#),
        ("/set/-1", r#"{"value": 1}"#),
        ("/set/70000", r#"{"value": 1}"#),
        ("/set/3", r#"{"value": 70000}"#),
        ("/set/3", r#"{"value": -5}"#),
        ("/set/3", r#"{"value": "hot"}"#),
        ("/set/3", r#"{"val"#),
    ];

    for (uri, body) in cases {
        let response = client
            .post(uri)
            .header(auth())
            .header(ContentType::JSON)
            .body(body)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest, "{} {}", uri, body);

        let body: Value = response.into_json().await.unwrap();
        assert!(body["error"].is_string());
    }

    assert!(mock.journal().is_empty());
}

#[rocket::async_test]
async fn test_set_exception_is_500() {
    let (_dir, path) = scratch_path();
    let mock = MockThermostat::simulated();
    let client = client(&mock, None, &path).await;

    // Outside the simulated register map
    let response = client
        .post("/set/100")
        .header(auth())
        .header(ContentType::JSON)
        .body(r#"{"value": 1}"#)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::InternalServerError);
}

#[rocket::async_test]
async fn test_info_reports_occupancy() {
    let (_dir, path) = scratch_path();
    let mock = MockThermostat::simulated();
    let monitor = OccupancyMonitor::new(&OccupancyConfig::default());
    let client = client(&mock, Some(monitor), &path).await;

    let response = client.get("/info").header(auth()).dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let body: Value = response.into_json().await.unwrap();
    assert_eq!(
        body,
        json!({"serial_number": "TH-TEST", "is_occupied": "no"})
    );
    assert!(mock.journal().is_empty());
}

#[rocket::async_test]
async fn test_info_without_monitor() {
    let (_dir, path) = scratch_path();
    let mock = MockThermostat::simulated();
    let client = client(&mock, None, &path).await;

    let response = client.get("/info").header(auth()).dispatch().await;
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body, json!({"serial_number": "TH-TEST"}));
}

#[rocket::async_test]
async fn test_unoccupied_updates_and_persists() {
    let (_dir, path) = scratch_path();
    let mock = MockThermostat::simulated();
    let monitor = OccupancyMonitor::new(&OccupancyConfig::default());
    let client = client(&mock, Some(monitor.clone()), &path).await;

    let response = client
        .post("/unoccupied")
        .header(auth())
        .header(ContentType::JSON)
        .body(r#"{"fanState": 3, "setpoint": 18}"#)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body, json!({"message": "updated config"}));

    let live = monitor.override_values().await;
    assert_eq!((live.setpoint, live.fan_state), (18, 3));

    let persisted = Config::from_file(&path).unwrap();
    assert_eq!(persisted.serial_number, "TH-TEST");
    assert_eq!(persisted.occupancy.setpoint, 18);
    assert_eq!(persisted.occupancy.fan_state, 3);

    // Never touches the thermostat
    assert!(mock.journal().is_empty());
}

#[rocket::async_test]
async fn test_unoccupied_rejects_bad_body() {
    let (_dir, path) = scratch_path();
    let mock = MockThermostat::simulated();
    let monitor = OccupancyMonitor::new(&OccupancyConfig::default());
    let client = client(&mock, Some(monitor.clone()), &path).await;

    for body in [
        r#"{"fanState": 1}"#,
        r#"{"fanState": 1, "setpoint": 65536}"#,
        r#"not json"#,
    ] {
        let response = client
            .post("/unoccupied")
            .header(auth())
            .header(ContentType::JSON)
            .body(body)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest, "{}", body);
    }

    assert_eq!(monitor.override_values().await.setpoint, 23);
    assert!(!path.exists());
}

#[rocket::async_test]
async fn test_unoccupied_persist_failure_is_500() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing").join("config.yaml");
    let mock = MockThermostat::simulated();
    let client = client(&mock, None, &path).await;

    let response = client
        .post("/unoccupied")
        .header(auth())
        .header(ContentType::JSON)
        .body(r#"{"fanState": 1, "setpoint": 20}"#)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::InternalServerError);
}

#[rocket::async_test]
async fn test_preflight_needs_no_key() {
    let (_dir, path) = scratch_path();
    let mock = MockThermostat::simulated();
    let client = client(&mock, None, &path).await;

    let response = client.options("/set/3").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(
        response.headers().get_one("Access-Control-Allow-Headers"),
        Some("Authorization, Content-Type")
    );
}

#[rocket::async_test]
async fn test_unknown_route_is_json_404() {
    let (_dir, path) = scratch_path();
    let mock = MockThermostat::simulated();
    let client = client(&mock, None, &path).await;

    let response = client.get("/nope").header(auth()).dispatch().await;
    assert_eq!(response.status(), Status::NotFound);

    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body, json!({"error": "Not Found"}));
}
