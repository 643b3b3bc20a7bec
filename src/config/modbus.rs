// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus RTU link configuration
//!
//! This module defines the serial parameters used to reach the thermostat
//! and the startup connection policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which transport carries the register exchanges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Modbus RTU over a serial port
    Rtu,
    /// In-memory simulated thermostat
    Mock,
}

/// Serial parity, written as in the usual `8N1` notation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    #[serde(rename = "N")]
    None,
    #[serde(rename = "E")]
    Even,
    #[serde(rename = "O")]
    Odd,
}

/// Configuration for the Modbus RTU link to the thermostat.
///
/// # Example
///
/// ```
/// use thermostat_gateway::config::ModbusConfig;
///
/// let modbus_config = ModbusConfig {
///     port: "/dev/ttyUSB0".to_string(),
///     baud_rate: 19200,
///     ..Default::default()
/// };
/// assert_eq!(modbus_config.slave_id, 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModbusConfig {
    /// Transport implementation, `rtu` for real hardware
    pub transport: TransportKind,

    /// Serial device path
    pub port: String,

    /// Line speed in baud. Default is 9600.
    pub baud_rate: u32,

    /// Data bits per character (5-8). Default is 8.
    pub data_bits: u8,

    /// Parity (`N`, `E` or `O`). Default is `N`.
    pub parity: Parity,

    /// Stop bits (1 or 2). Default is 1.
    pub stop_bits: u8,

    /// Modbus address of the thermostat on the bus. Default is 1.
    pub slave_id: u8,

    /// Timeout applied to every single exchange, in seconds. Default is 5.
    pub timeout_secs: u64,

    /// Delay between two connection attempts at startup, in milliseconds.
    ///
    /// The retry delay is fixed: there is no backoff growth. Default is 1000.
    pub connect_retry_ms: u64,

    /// Give up connecting after this many attempts.
    ///
    /// When absent the gateway keeps trying forever, which suits an embedded
    /// deployment where the thermostat eventually shows up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connect_attempts: Option<u32>,
}

impl ModbusConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_retry_delay(&self) -> Duration {
        Duration::from_millis(self.connect_retry_ms)
    }
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Rtu,
            port: "/dev/ACM0".to_string(),
            baud_rate: 9600,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
            slave_id: 1,
            timeout_secs: 5,
            connect_retry_ms: 1000,
            max_connect_attempts: None,
        }
    }
}
