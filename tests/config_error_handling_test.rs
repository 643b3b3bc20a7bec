// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use std::fs;
use std::path::Path;
use std::sync::Once;
use tempfile::tempdir;
use thermostat_gateway::config::Config;

static INIT: Once = Once::new();

// Setup logger for tests
fn setup() {
    INIT.call_once(|| {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .init();
    });
}

fn assert_sample_is_usable(config_path: &Path) -> Result<()> {
    let sample_path = config_path.with_extension("sample.yaml");
    assert!(sample_path.exists(), "Sample config file was not created");

    let sample_config = Config::from_file(&sample_path)?;
    assert_eq!(sample_config.api.port, 8000);
    assert!(!sample_config.serial_number.is_empty());
    Ok(())
}

#[test]
fn test_missing_file_creates_sample_file() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    assert!(Config::from_file(&config_path).is_err());
    assert!(!config_path.exists());
    assert_sample_is_usable(&config_path)
}

#[test]
fn test_missing_serial_number_is_fatal() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    fs::write(
        &config_path,
        r#"
api:
  port: 8000
occupancy:
  setpoint: 22
"#,
    )?;

    let result = Config::from_file(&config_path);
    assert!(result.is_err(), "Config without serial number should be rejected");
    assert_sample_is_usable(&config_path)
}

#[test]
fn test_schema_violation_creates_sample_file() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    // Valid YAML, but the port is out of range and the parity unknown
    fs::write(
        &config_path,
        r#"
serial_number: "TH-1"
api:
  port: 99999
modbus:
  parity: "X"
"#,
    )?;

    assert!(Config::from_file(&config_path).is_err());
    assert_sample_is_usable(&config_path)
}

#[test]
fn test_type_mismatch_creates_sample_file() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    fs::write(
        &config_path,
        r#"
serial_number: "TH-1"
modbus:
  baud_rate: "fast"
occupancy:
  enabled: "yes"
"#,
    )?;

    assert!(Config::from_file(&config_path).is_err());
    assert_sample_is_usable(&config_path)
}

#[test]
fn test_unknown_section_is_rejected() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    fs::write(
        &config_path,
        r#"
serial_number: "TH-1"
visualization:
  port: 8080
"#,
    )?;

    assert!(Config::from_file(&config_path).is_err());
    Ok(())
}

#[test]
fn test_specific_rules_catch_blank_auth_key() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    // Passes the schema (non-empty) but is only whitespace
    fs::write(
        &config_path,
        r#"
serial_number: "TH-1"
api:
  auth_key: "   "
"#,
    )?;

    assert!(Config::from_file(&config_path).is_err());
    assert_sample_is_usable(&config_path)
}
