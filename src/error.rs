// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Error types for the register I/O path
//!
//! Configuration loading and daemon startup use `anyhow`; everything that
//! travels through the transaction queue uses [`GatewayError`] so callers can
//! tell link failures from input validation failures.

use std::time::Duration;

use thiserror::Error;
use tokio_modbus::ExceptionCode;

/// Errors raised by the transport, the transaction queue and the register
/// contract.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The exchange did not complete within the configured I/O timeout
    #[error("timed out after {0:?} waiting for the thermostat")]
    Timeout(Duration),

    /// The slave answered with a Modbus exception
    #[error("thermostat rejected the request: {0}")]
    Exception(ExceptionCode),

    /// The slave answered with fewer registers than requested
    #[error("short response: expected {expected} bytes, got {actual}")]
    ShortResponse { expected: usize, actual: usize },

    /// The response could not be parsed as a valid Modbus frame
    #[error("malformed response: {0}")]
    Protocol(String),

    /// Serial failure reported by the link
    #[error("link error: {0}")]
    Link(#[from] std::io::Error),

    /// The link has been closed
    #[error("thermostat link is not connected")]
    Disconnected,

    /// Input rejected before it reached the queue
    #[error("{0}")]
    Validation(String),

    /// The transaction queue worker is gone
    #[error("transaction queue is closed")]
    QueueClosed,
}

impl GatewayError {
    /// Whether the error comes from the link rather than from caller input
    pub fn is_io(&self) -> bool {
        !matches!(self, GatewayError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
