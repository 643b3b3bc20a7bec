// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Presence sensor input
//!
//! The sensor is a single digital line: low means the room is vacant, high
//! means someone is present. Debouncing is expected from the sensor itself.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::{InputKind, OccupancyConfig};

/// A digital input sampled by the occupancy poller
#[async_trait]
pub trait InputPin: Send + Sync {
    /// Current level of the line, `true` when high
    async fn is_high(&self) -> Result<bool>;

    /// Human readable description for log lines
    fn describe(&self) -> String;
}

/// Line exported through the Linux sysfs GPIO interface
#[derive(Debug, Clone)]
pub struct SysfsInputPin {
    value_path: PathBuf,
}

impl SysfsInputPin {
    pub fn new(pin: u32) -> Self {
        Self::with_path(format!("/sys/class/gpio/gpio{}/value", pin))
    }

    /// Read the level from an arbitrary value file
    pub fn with_path(value_path: impl Into<PathBuf>) -> Self {
        Self {
            value_path: value_path.into(),
        }
    }
}

#[async_trait]
impl InputPin for SysfsInputPin {
    async fn is_high(&self) -> Result<bool> {
        let raw = tokio::fs::read_to_string(&self.value_path)
            .await
            .with_context(|| format!("Failed to read {}", self.value_path.display()))?;

        match raw.trim() {
            "0" => Ok(false),
            "1" => Ok(true),
            other => anyhow::bail!(
                "Unexpected GPIO level '{}' in {}",
                other,
                self.value_path.display()
            ),
        }
    }

    fn describe(&self) -> String {
        self.value_path.display().to_string()
    }
}

/// Programmable line for tests and bench use.
///
/// Clones share the same level.
#[derive(Debug, Clone, Default)]
pub struct MockInputPin {
    level: Arc<AtomicBool>,
}

impl MockInputPin {
    /// A line starting low (room vacant)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_high(&self, high: bool) {
        self.level.store(high, Ordering::SeqCst);
    }
}

#[async_trait]
impl InputPin for MockInputPin {
    async fn is_high(&self) -> Result<bool> {
        Ok(self.level.load(Ordering::SeqCst))
    }

    fn describe(&self) -> String {
        "mock input".to_string()
    }
}

/// Build the input selected by the configuration
pub fn open_input(config: &OccupancyConfig) -> Box<dyn InputPin> {
    match config.input {
        InputKind::Sysfs => Box::new(SysfsInputPin::new(config.pin)),
        InputKind::Mock => {
            log::warn!("Occupancy input is simulated, the room will always look vacant");
            Box::new(MockInputPin::new())
        }
    }
}
