// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Module
//!
//! Starts and stops the long running parts of the gateway: the transaction
//! queue worker that owns the thermostat link, the occupancy poller and the
//! HTTP API.
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use thermostat_gateway::{config::Config, daemon::launch_daemon::Daemon};
//!
//! async fn run() -> anyhow::Result<()> {
//!     let path = Path::new("config.yaml");
//!     let config = Config::from_file(path)?;
//!
//!     let mut daemon = Daemon::new();
//!     daemon.launch(&config, path).await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!
//!     // Poller and server stop first, then queued tasks run to completion
//!     daemon.shutdown().await;
//!     daemon.join().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod launch_daemon;
