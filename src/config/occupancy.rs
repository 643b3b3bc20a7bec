// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Occupancy sensor configuration
//!
//! Settings for the digital input that reports room presence and the
//! thermostat values applied while the room is vacant.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Source of the occupancy level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    /// Linux sysfs GPIO (`/sys/class/gpio/gpio<pin>/value`)
    Sysfs,
    /// Programmable in-memory level
    Mock,
}

/// Configuration for the occupancy monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OccupancyConfig {
    /// Enable or disable the occupancy monitor.
    ///
    /// When disabled the gateway only relays HTTP register access and
    /// `/info` does not report occupancy. Default is `true`.
    pub enabled: bool,

    /// Where the sensor level is read from. Default is `sysfs`.
    pub input: InputKind,

    /// GPIO line number of the sensor (BCM numbering). Default is 27.
    pub pin: u32,

    /// Sampling period in milliseconds. Default is 100.
    pub poll_interval_ms: u64,

    /// Setpoint written to the thermostat while the room is vacant. Default is 23.
    pub setpoint: u16,

    /// Fan state written to the thermostat while the room is vacant. Default is 1.
    pub fan_state: u16,

    /// Treat a captured setpoint or fan state of zero as "nothing captured".
    ///
    /// The thermostat never reports zero for either register in practice, so
    /// a zero reading is taken as a failed capture and skipped on restore.
    /// Set to `false` if zero is a legitimate value for the installed model.
    pub zero_is_unset: bool,
}

impl OccupancyConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for OccupancyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            input: InputKind::Sysfs,
            pin: 27,
            poll_interval_ms: 100,
            setpoint: 23,
            fan_state: 1,
            zero_is_unset: true,
        }
    }
}
