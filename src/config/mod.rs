// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the thermostat gateway
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration is backed by a YAML file and
//! validated against a JSON schema before it is deserialized.
//!
//! ## Configuration Structure
//!
//! - `serial_number`: Identifier reported by `GET /info` (required)
//! - `api`: Settings for the HTTP API server
//! - `modbus`: Serial link to the thermostat
//! - `occupancy`: Occupancy sensor and vacant-room override values
//!
//! ## Usage
//!
//! ```no_run
//! use thermostat_gateway::config::Config;
//! use std::path::Path;
//!
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some(8081),                         // API port
//!     Some("0.0.0.0".to_string()),        // API address
//!     Some("/dev/ttyUSB0".to_string()),   // Serial port
//!     None,                               // Slave id
//!     None,                               // Occupancy enabled
//! );
//!
//! println!("Server port: {}", config.api.port);
//! ```

pub mod api;
pub mod modbus;
pub mod occupancy;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

pub use api::ApiConfig;
pub use modbus::{ModbusConfig, Parity, TransportKind};
pub use occupancy::{InputKind, OccupancyConfig};
pub use utils::{is_valid_ip_address, output_config_schema};

/// Serial number written into generated sample files
const SAMPLE_SERIAL_NUMBER: &str = "TH-000000";

/// Root configuration structure for the gateway.
///
/// The configuration is deserialized from and serialized to YAML using
/// serde. Each section falls back to its defaults when it is missing from
/// the file; only `serial_number` has to be provided.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Serial number of the gateway, reported by `GET /info`.
    #[serde(default)]
    pub serial_number: String,

    /// HTTP API server settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Serial link to the thermostat.
    #[serde(default)]
    pub modbus: ModbusConfig,

    /// Occupancy sensor and override values.
    #[serde(default)]
    pub occupancy: OccupancyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial_number: String::new(),
            api: ApiConfig::default(),
            modbus: ModbusConfig::default(),
            occupancy: OccupancyConfig::default(),
        }
    }
}

impl Config {
    /// A complete configuration that passes validation, used for sample files
    pub fn sample() -> Self {
        Self {
            serial_number: SAMPLE_SERIAL_NUMBER.to_string(),
            ..Self::default()
        }
    }

    /// Helper method to create a sample config file when loading fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Original path: {:?}, Sample path: {:?}", path, sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::sample()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is an error as well: the serial number cannot be
    /// defaulted, so a sample file is written next to the expected path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            error!("Configuration file not found at {:?}", path);
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration file {} does not exist", path.display());
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        // First step: convert YAML to a generic Value
        let yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;

        // Convert to JSON Value for validation
        let json_value = serde_json::to_value(&yaml_value).with_context(|| {
            format!("Failed to convert YAML to JSON for validation: {:?}", path)
        })?;

        let schema: serde_json::Value =
            serde_json::from_str(utils::CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config = match serde_yml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        if let Err(err) = utils::validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only values explicitly provided on the command line override the
    /// loaded configuration.
    ///
    /// # Parameters
    ///
    /// * `api_port` - TCP port for the API server
    /// * `api_address` - Network address for the API server to bind to
    /// * `serial_port` - Serial device path of the Modbus link
    /// * `slave_id` - Modbus address of the thermostat
    /// * `occupancy_enabled` - Enable or disable the occupancy monitor
    pub fn apply_args(
        &mut self,
        api_port: Option<u16>,
        api_address: Option<String>,
        serial_port: Option<String>,
        slave_id: Option<u8>,
        occupancy_enabled: Option<bool>,
    ) {
        if let Some(port) = api_port {
            debug!("Overriding API port from command line: {}", port);
            self.api.port = port;
        }

        if let Some(address) = api_address {
            debug!("Overriding API address from command line: {}", address);
            self.api.address = address;
        }

        if let Some(port) = serial_port {
            debug!("Overriding serial port from command line: {}", port);
            self.modbus.port = port;
        }

        if let Some(slave_id) = slave_id {
            debug!("Overriding slave id from command line: {}", slave_id);
            self.modbus.slave_id = slave_id;
        }

        if let Some(enabled) = occupancy_enabled {
            debug!("Overriding occupancy monitor from command line: {}", enabled);
            self.occupancy.enabled = enabled;
        }
    }
}
