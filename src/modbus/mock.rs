// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Simulated thermostat
//!
//! Stands in for the serial link when no hardware is attached. The register
//! image is kept in wire order (big-endian bytes) and decoded through the
//! same register contract as a real response, so a read of an address range
//! the image does not cover fails like a real slave would.
//!
//! Clones share the same image, operation journal and failure plan: tests
//! hand one clone to the transaction queue and inspect another.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tokio_modbus::ExceptionCode;

use super::registers::{decode_registers, FAN_STATE_REGISTER, SETPOINT_REGISTER};
use super::RegisterTransport;
use crate::error::{GatewayError, Result};

/// Number of holding registers the simulated thermostat exposes (0-31)
pub const MOCK_REGISTER_COUNT: u16 = 32;

/// One exchange as seen by the simulated thermostat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read { start: u16, count: u16 },
    Write { address: u16, value: u16 },
}

#[derive(Debug)]
struct MockState {
    image: Vec<u8>,
    journal: Vec<Operation>,
    failures: VecDeque<GatewayError>,
    latency: Duration,
    closed: bool,
}

/// In-memory Modbus slave
#[derive(Debug, Clone)]
pub struct MockThermostat {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockThermostat {
    fn default() -> Self {
        Self::new()
    }
}

impl MockThermostat {
    /// A thermostat with every register at zero
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                image: vec![0; usize::from(MOCK_REGISTER_COUNT) * 2],
                journal: Vec::new(),
                failures: VecDeque::new(),
                latency: Duration::ZERO,
                closed: false,
            })),
        }
    }

    /// A thermostat with plausible values in the status block
    pub fn simulated() -> Self {
        let mock = Self::new();
        mock.set_register(1, 1);
        mock.set_register(2, 215);
        mock.set_register(SETPOINT_REGISTER, 21);
        mock.set_register(FAN_STATE_REGISTER, 2);
        mock.set_register(5, 0);
        mock.set_register(6, 1);
        mock
    }

    /// Delay every exchange, emulating line time
    pub fn with_latency(self, latency: Duration) -> Self {
        self.lock().latency = latency;
        self
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the journal from the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Set a register directly, bypassing the journal
    pub fn set_register(&self, address: u16, value: u16) {
        let offset = usize::from(address) * 2;
        let mut state = self.lock();
        if offset + 2 <= state.image.len() {
            state.image[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
        }
    }

    /// Current value of a register, bypassing the journal
    pub fn register(&self, address: u16) -> Option<u16> {
        let offset = usize::from(address) * 2;
        let state = self.lock();
        state
            .image
            .get(offset..offset + 2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
    }

    /// Make the next exchange fail with `error` instead of touching the image
    pub fn fail_next(&self, error: GatewayError) {
        self.lock().failures.push_back(error);
    }

    /// Every exchange received so far, in arrival order
    pub fn journal(&self) -> Vec<Operation> {
        self.lock().journal.clone()
    }

    /// Write exchanges received so far
    pub fn writes(&self) -> Vec<(u16, u16)> {
        self.lock()
            .journal
            .iter()
            .filter_map(|op| match *op {
                Operation::Write { address, value } => Some((address, value)),
                Operation::Read { .. } => None,
            })
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Record the exchange, wait for the line time and pop a planned failure
    async fn begin(&self, operation: Operation) -> Result<()> {
        let latency = {
            let mut state = self.lock();
            if state.closed {
                return Err(GatewayError::Disconnected);
            }
            state.journal.push(operation);
            state.latency
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        match self.lock().failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RegisterTransport for MockThermostat {
    async fn read_registers(&mut self, start: u16, count: u16) -> Result<Vec<u16>> {
        self.begin(Operation::Read { start, count }).await?;

        let state = self.lock();
        let begin = usize::from(start) * 2;
        let end = begin + usize::from(count) * 2;
        if count == 0 || end > state.image.len() {
            return Err(GatewayError::Exception(ExceptionCode::IllegalDataAddress));
        }

        let values = decode_registers(&state.image[begin..end], count)?;
        debug!("MOCK: read {} registers from {}: {:?}", count, start, values);
        Ok(values)
    }

    async fn write_register(&mut self, address: u16, value: u16) -> Result<()> {
        self.begin(Operation::Write { address, value }).await?;

        if address >= MOCK_REGISTER_COUNT {
            return Err(GatewayError::Exception(ExceptionCode::IllegalDataAddress));
        }

        self.set_register(address, value);
        debug!("MOCK: wrote {} to register {}", value, address);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.lock().closed = true;
        Ok(())
    }
}
