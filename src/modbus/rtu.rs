// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus RTU transport over a serial port

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::time;
use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;
use tokio_serial::{DataBits, SerialPortBuilderExt, SerialStream, StopBits};

use super::registers::check_response_len;
use super::RegisterTransport;
use crate::config::{ModbusConfig, Parity};
use crate::error::{GatewayError, Result};

/// Modbus RTU client bound to one slave on one serial port
pub struct RtuTransport {
    ctx: Option<Context>,
    port: String,
    timeout: Duration,
}

impl RtuTransport {
    /// Open the serial port once, without retrying
    pub fn open(config: &ModbusConfig) -> Result<Self> {
        let stream = open_serial(config)?;
        let ctx = rtu::attach_slave(stream, Slave(config.slave_id));

        Ok(Self {
            ctx: Some(ctx),
            port: config.port.clone(),
            timeout: config.timeout(),
        })
    }

    /// Open the serial port, retrying until it succeeds.
    ///
    /// Attempts are spaced by the fixed `connect_retry_ms` delay. Without
    /// `max_connect_attempts` this never gives up, so startup blocks until
    /// the thermostat is reachable.
    pub async fn connect(config: &ModbusConfig) -> anyhow::Result<Self> {
        let delay = config.connect_retry_delay();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            info!("Trying to connect to {} (attempt {})", config.port, attempt);

            match Self::open(config) {
                Ok(transport) => {
                    info!(
                        "Connected to slave {} on {} ({} baud)",
                        config.slave_id, config.port, config.baud_rate
                    );
                    return Ok(transport);
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", config.port, e);
                    if config
                        .max_connect_attempts
                        .is_some_and(|max| attempt >= max)
                    {
                        anyhow::bail!(
                            "Giving up on {} after {} attempts: {}",
                            config.port,
                            attempt,
                            e
                        );
                    }
                }
            }

            time::sleep(delay).await;
        }
    }

    fn context(&mut self) -> Result<&mut Context> {
        self.ctx.as_mut().ok_or(GatewayError::Disconnected)
    }

    /// Bound a single exchange by the configured I/O timeout
    async fn exchange<T, F>(timeout: Duration, request: F) -> Result<T>
    where
        F: Future<Output = tokio_modbus::Result<T>>,
    {
        match time::timeout(timeout, request).await {
            Err(_) => Err(GatewayError::Timeout(timeout)),
            Ok(Err(e)) => Err(GatewayError::Protocol(e.to_string())),
            Ok(Ok(Err(exception))) => Err(GatewayError::Exception(exception)),
            Ok(Ok(Ok(value))) => Ok(value),
        }
    }
}

fn open_serial(config: &ModbusConfig) -> Result<SerialStream> {
    let data_bits = match config.data_bits {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        _ => DataBits::Eight,
    };
    let stop_bits = match config.stop_bits {
        2 => StopBits::Two,
        _ => StopBits::One,
    };
    let parity = match config.parity {
        Parity::None => tokio_serial::Parity::None,
        Parity::Even => tokio_serial::Parity::Even,
        Parity::Odd => tokio_serial::Parity::Odd,
    };

    tokio_serial::new(config.port.as_str(), config.baud_rate)
        .data_bits(data_bits)
        .stop_bits(stop_bits)
        .parity(parity)
        .timeout(config.timeout())
        .open_native_async()
        .map_err(|e| GatewayError::Link(e.into()))
}

#[async_trait]
impl RegisterTransport for RtuTransport {
    async fn read_registers(&mut self, start: u16, count: u16) -> Result<Vec<u16>> {
        let timeout = self.timeout;
        let ctx = self.context()?;
        let values = Self::exchange(timeout, ctx.read_holding_registers(start, count)).await?;
        let values = check_response_len(values, count)?;

        debug!("Read {} registers from {}: {:?}", count, start, values);
        Ok(values)
    }

    async fn write_register(&mut self, address: u16, value: u16) -> Result<()> {
        let timeout = self.timeout;
        let ctx = self.context()?;
        Self::exchange(timeout, ctx.write_single_register(address, value)).await?;

        debug!("Wrote {} to register {}", value, address);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut ctx) = self.ctx.take() {
            info!("Closing Modbus link on {}", self.port);
            ctx.disconnect()
                .await
                .map_err(|e| GatewayError::Protocol(e.to_string()))?;
        }
        Ok(())
    }
}
