// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Transaction queue
//!
//! The thermostat link is half-duplex: one request, one response, then the
//! next request. Register I/O from the HTTP handlers and from the occupancy
//! monitor is therefore funnelled through a bounded FIFO consumed by a single
//! worker, which is the only owner of the [`RegisterTransport`].
//!
//! ## Guarantees
//!
//! * At most one task touches the link at any time.
//! * Tasks run exactly once, in submission order. There is no priority and
//!   no cancellation; the only timeout is the transport's per-exchange one.
//! * When [`QUEUE_CAPACITY`] tasks are pending, submitting suspends the caller
//!   until the worker frees a slot. Nothing is ever rejected for being late.
//! * A failing task never stops the worker.
//!
//! ## Usage
//!
//! ```no_run
//! use thermostat_gateway::modbus::MockThermostat;
//! use thermostat_gateway::serializer::{ReadRegisters, Serializer, WriteRegister};
//!
//! async fn run() -> thermostat_gateway::error::Result<()> {
//!     let (queue, _worker) = Serializer::spawn(Box::new(MockThermostat::simulated()));
//!
//!     // Wait for the outcome
//!     let status = queue.submit_and_wait(ReadRegisters::new(1, 12)?).await?;
//!     println!("{:?}", status);
//!
//!     // Or let the worker log it
//!     queue.submit(WriteRegister { address: 3, value: 22 }).await?;
//!     Ok(())
//! }
//! ```

pub mod task;

use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{GatewayError, Result};
use crate::modbus::RegisterTransport;

use task::{Envelope, Job};
pub use task::{ReadRegisters, Task, WriteRegister};

/// Maximum number of pending tasks before submitters are suspended
pub const QUEUE_CAPACITY: usize = 1000;

enum Message {
    Run(Box<dyn Job>),
    Shutdown,
}

/// Submission handle of the transaction queue.
///
/// Cheap to clone; every clone feeds the same worker.
#[derive(Clone)]
pub struct Serializer {
    sender: mpsc::Sender<Message>,
    capacity: usize,
}

impl Serializer {
    /// Start the worker with the default capacity
    pub fn spawn(transport: Box<dyn RegisterTransport>) -> (Self, JoinHandle<()>) {
        Self::with_capacity(transport, QUEUE_CAPACITY)
    }

    /// Start the worker with a custom capacity
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(
        transport: Box<dyn RegisterTransport>,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        assert!(capacity > 0, "transaction queue capacity must be at least 1");
        let (sender, receiver) = mpsc::channel(capacity);
        let worker = tokio::spawn(run_worker(transport, receiver));

        (Self { sender, capacity }, worker)
    }

    /// Queue a task without waiting for it to run.
    ///
    /// Returns once the task is queued, which may take a while when the queue
    /// is full. A failure of the task itself is only logged.
    pub async fn submit<T: Task>(&self, task: T) -> Result<()> {
        self.enqueue(Box::new(Envelope { task, reply: None })).await
    }

    /// Queue a task and wait for its outcome
    pub async fn submit_and_wait<T: Task>(&self, task: T) -> Result<T::Output> {
        let (reply, outcome) = oneshot::channel();
        self.enqueue(Box::new(Envelope {
            task,
            reply: Some(reply),
        }))
        .await?;

        outcome.await.map_err(|_| GatewayError::QueueClosed)?
    }

    async fn enqueue(&self, job: Box<dyn Job>) -> Result<()> {
        self.sender
            .send(Message::Run(job))
            .await
            .map_err(|_| GatewayError::QueueClosed)
    }

    /// Number of tasks waiting to run, not counting the one running
    pub fn pending(&self) -> usize {
        self.capacity - self.sender.capacity()
    }

    /// Ask the worker to stop once every task queued so far has run.
    ///
    /// The worker then closes the transport. Later submissions fail with
    /// [`GatewayError::QueueClosed`].
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(Message::Shutdown)
            .await
            .map_err(|_| GatewayError::QueueClosed)
    }
}

async fn run_worker(
    mut transport: Box<dyn RegisterTransport>,
    mut receiver: mpsc::Receiver<Message>,
) {
    debug!("Transaction queue worker started");

    while let Some(message) = receiver.recv().await {
        match message {
            Message::Run(job) => job.run(transport.as_mut()).await,
            Message::Shutdown => {
                info!("Transaction queue drained, stopping worker");
                break;
            }
        }
    }

    receiver.close();
    if let Err(e) = transport.close().await {
        warn!("Failed to close the thermostat link: {}", e);
    }
    debug!("Transaction queue worker stopped");
}
