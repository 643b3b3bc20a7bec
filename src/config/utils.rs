// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use base64::Engine;
use log::debug;

use super::Config;

/// JSON schema the YAML configuration is validated against
pub const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./thermostat_gateway --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Validates the configuration against rules that aren't covered by the JSON schema.
///
/// # Validation Rules
///
/// - **Identity**: the serial number and the API key must not be blank
/// - **SSL Configuration**: a certificate requires a key (and vice versa), both base64
/// - **Port Range**: the API port is within 1-65534
/// - **Serial line**: data bits within 5-8, stop bits 1 or 2, non-zero baud rate
///   and timeout, slave id within the unicast range 1-247
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    if config.serial_number.trim().is_empty() {
        anyhow::bail!("serial_number is required");
    }

    if config.api.auth_key.trim().is_empty() {
        anyhow::bail!("api.auth_key must not be empty");
    }

    if let Some(cert) = &config.api.cert {
        if config.api.key.is_none() {
            anyhow::bail!("SSL certificate provided without a key");
        }

        let _ = base64::engine::general_purpose::STANDARD
            .decode(cert)
            .context("SSL certificate is not valid base64")?;
    }

    if let Some(key) = &config.api.key {
        if config.api.cert.is_none() {
            anyhow::bail!("SSL key provided without a certificate");
        }

        let _ = base64::engine::general_purpose::STANDARD
            .decode(key)
            .context("SSL key is not valid base64")?;
    }

    if config.api.port < 1 || config.api.port > 65534 {
        anyhow::bail!("Invalid port number: {}", config.api.port);
    }

    if !is_valid_ip_address(&config.api.address) {
        // Hostnames are accepted by Rocket, so only note it
        debug!("Potentially invalid address format: {}", config.api.address);
    }

    let modbus = &config.modbus;
    if !(5..=8).contains(&modbus.data_bits) {
        anyhow::bail!("Invalid data bits: {}", modbus.data_bits);
    }
    if !(1..=2).contains(&modbus.stop_bits) {
        anyhow::bail!("Invalid stop bits: {}", modbus.stop_bits);
    }
    if modbus.baud_rate == 0 {
        anyhow::bail!("Baud rate must be greater than zero");
    }
    if modbus.timeout_secs == 0 {
        anyhow::bail!("Modbus timeout must be greater than zero");
    }
    if !(1..=247).contains(&modbus.slave_id) {
        anyhow::bail!("Invalid slave id: {}", modbus.slave_id);
    }
    if modbus.max_connect_attempts == Some(0) {
        anyhow::bail!("max_connect_attempts must be at least 1 when set");
    }

    if config.occupancy.poll_interval_ms == 0 {
        anyhow::bail!("occupancy.poll_interval_ms must be greater than zero");
    }

    Ok(())
}
