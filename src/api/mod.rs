// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HTTP API
//!
//! | Route | Effect |
//! |-------|--------|
//! | `GET /read` | registers 1 to 12 as a JSON array |
//! | `POST /set/<address>` | write `{"value": n}` to a register |
//! | `GET /info` | serial number and presence |
//! | `POST /unoccupied` | change and persist the vacancy override |
//!
//! Every route requires `Authorization: Bearer <auth_key>`.

pub mod auth;
pub mod handlers;
pub mod server;

use std::path::{Path, PathBuf};

use anyhow::Result;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::occupancy::UnoccupiedOverride;

pub use server::{build_rocket, ApiState};

/// The running configuration and the file it is persisted to
pub struct ConfigStore {
    path: PathBuf,
    config: Mutex<Config>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            path: path.into(),
            config: Mutex::new(config),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn serial_number(&self) -> String {
        self.config.lock().await.serial_number.clone()
    }

    pub async fn snapshot(&self) -> Config {
        self.config.lock().await.clone()
    }

    /// Record a new vacancy override and write the whole configuration back
    pub async fn persist_override(&self, values: UnoccupiedOverride) -> Result<()> {
        let mut config = self.config.lock().await;
        config.occupancy.setpoint = values.setpoint;
        config.occupancy.fan_state = values.fan_state;
        config.save_to_file(&self.path)
    }
}
