// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Units of work executed by the transaction queue worker

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::error::Result;
use crate::modbus::registers::check_span;
use crate::modbus::RegisterTransport;

/// A unit of register I/O.
///
/// A task carries its own inputs and produces its own outcome. It only sees
/// the transport while the worker runs it, so two tasks can never talk to
/// the thermostat at the same time.
#[async_trait]
pub trait Task: Send + 'static {
    type Output: Send + 'static;

    /// Short label used in log lines
    fn describe(&self) -> String;

    /// Perform the exchanges of this task
    async fn execute(self, transport: &mut dyn RegisterTransport) -> Result<Self::Output>;
}

/// Read consecutive holding registers
#[derive(Debug, Clone, Copy)]
pub struct ReadRegisters {
    start: u16,
    count: u16,
}

impl ReadRegisters {
    pub fn new(start: u16, count: u16) -> Result<Self> {
        check_span(start, count)?;
        Ok(Self { start, count })
    }
}

#[async_trait]
impl Task for ReadRegisters {
    type Output = Vec<u16>;

    fn describe(&self) -> String {
        format!("read {} registers from {}", self.count, self.start)
    }

    async fn execute(self, transport: &mut dyn RegisterTransport) -> Result<Vec<u16>> {
        transport.read_registers(self.start, self.count).await
    }
}

/// Write one holding register
#[derive(Debug, Clone, Copy)]
pub struct WriteRegister {
    pub address: u16,
    pub value: u16,
}

#[async_trait]
impl Task for WriteRegister {
    type Output = ();

    fn describe(&self) -> String {
        format!("write {} to register {}", self.value, self.address)
    }

    async fn execute(self, transport: &mut dyn RegisterTransport) -> Result<()> {
        transport.write_register(self.address, self.value).await
    }
}

/// Type-erased queue entry
#[async_trait]
pub(crate) trait Job: Send {
    async fn run(self: Box<Self>, transport: &mut dyn RegisterTransport);
}

/// A task with its completion signal, if the submitter waits for one
pub(crate) struct Envelope<T: Task> {
    pub(crate) task: T,
    pub(crate) reply: Option<oneshot::Sender<Result<T::Output>>>,
}

#[async_trait]
impl<T: Task> Job for Envelope<T> {
    async fn run(self: Box<Self>, transport: &mut dyn RegisterTransport) {
        let Envelope { task, reply } = *self;
        let label = task.describe();
        let outcome = task.execute(transport).await;

        match reply {
            Some(reply) => {
                if reply.send(outcome).is_err() {
                    log::debug!("Submitter of '{}' stopped waiting for the result", label);
                }
            }
            None => match outcome {
                Ok(_) => log::debug!("Completed '{}'", label),
                Err(e) => log::warn!("'{}' failed: {}", label, e),
            },
        }
    }
}
