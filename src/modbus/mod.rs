// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus communication module
//!
//! For avoiding confusion with the Modbus master/slave terminology, the
//! gateway is the *client* and the thermostat is the *server*.
//!
//! ## Key Components
//!
//! - [`RegisterTransport`]: the only way to touch the link. Exactly one
//!   value implementing it exists per process and it is owned by the
//!   transaction queue worker.
//! - [`RtuTransport`]: Modbus RTU over a serial port.
//! - [`MockThermostat`]: in-memory thermostat for development and tests.
//! - [`registers`]: register map shared by the API and the occupancy monitor.

pub mod mock;
pub mod registers;
pub mod rtu;

use async_trait::async_trait;

use crate::config::{ModbusConfig, TransportKind};
use crate::error::Result;

pub use mock::{MockThermostat, Operation};
pub use rtu::RtuTransport;

/// Register access primitives of the thermostat link.
///
/// Every call is a single request/response exchange. Implementations never
/// retry; callers decide what to do with a failure.
#[async_trait]
pub trait RegisterTransport: Send {
    /// Read `count` consecutive holding registers starting at `start`
    async fn read_registers(&mut self, start: u16, count: u16) -> Result<Vec<u16>>;

    /// Write a single holding register
    async fn write_register(&mut self, address: u16, value: u16) -> Result<()>;

    /// Release the link
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Open the transport selected by the configuration.
///
/// For `rtu` this blocks until the serial port opens, following the retry
/// policy of [`RtuTransport::connect`].
pub async fn connect_transport(
    config: &ModbusConfig,
) -> anyhow::Result<Box<dyn RegisterTransport>> {
    match config.transport {
        TransportKind::Rtu => Ok(Box::new(RtuTransport::connect(config).await?)),
        TransportKind::Mock => {
            log::warn!("Using the simulated thermostat, no serial link will be opened");
            Ok(Box::new(MockThermostat::simulated()))
        }
    }
}
