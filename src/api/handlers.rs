// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Route handlers
//!
//! Register reads and writes go through the transaction queue and wait for
//! their outcome. `/info` and `/unoccupied` only touch shared state and never
//! enter the queue.

use log::{error, warn};
use rocket::http::Status;
use rocket::serde::json::{self, Json};
use rocket::{get, post, State};
use serde::{Deserialize, Serialize};

use super::auth::Authorized;
use super::ConfigStore;
use crate::error::GatewayError;
use crate::modbus::registers::{parse_address, register_value, STATUS_BLOCK_LEN, STATUS_BLOCK_START};
use crate::occupancy::{OccupancyMonitor, UnoccupiedOverride};
use crate::serializer::{ReadRegisters, Serializer, WriteRegister};

/// Error body returned by every failing route
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Confirmation body
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

pub type ApiError = (Status, Json<ErrorResponse>);

pub(crate) fn api_error(status: Status, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

/// Validation failures are the client's fault, everything else is ours
fn gateway_error(e: GatewayError) -> ApiError {
    if e.is_io() {
        warn!("Thermostat request failed: {}", e);
        api_error(Status::InternalServerError, e)
    } else {
        api_error(Status::BadRequest, e)
    }
}

fn message(text: &str) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.to_string(),
    })
}

/// Read the status block
#[get("/read")]
pub async fn read_status(
    _auth: Authorized,
    queue: &State<Serializer>,
) -> Result<Json<Vec<u16>>, ApiError> {
    let task = ReadRegisters::new(STATUS_BLOCK_START, STATUS_BLOCK_LEN).map_err(gateway_error)?;
    let values = queue.submit_and_wait(task).await.map_err(gateway_error)?;
    Ok(Json(values))
}

#[derive(Debug, Deserialize)]
pub struct SetRequest {
    pub value: i64,
}

/// Write one register
#[post("/set/<address>", data = "<request>")]
pub async fn set_register(
    _auth: Authorized,
    address: &str,
    request: Result<Json<SetRequest>, json::Error<'_>>,
    queue: &State<Serializer>,
) -> Result<Json<MessageResponse>, ApiError> {
    let address = parse_address(address).map_err(gateway_error)?;
    let request = request.map_err(|e| api_error(Status::BadRequest, e))?;
    let value = register_value("value", request.value).map_err(gateway_error)?;

    queue
        .submit_and_wait(WriteRegister { address, value })
        .await
        .map_err(gateway_error)?;

    Ok(message("Value set successfully"))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InfoResponse {
    pub serial_number: String,
    /// `"yes"` or `"no"`, absent when occupancy monitoring is disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_occupied: Option<String>,
}

/// Device identity and presence
#[get("/info")]
pub async fn info(
    _auth: Authorized,
    store: &State<ConfigStore>,
    monitor: &State<Option<OccupancyMonitor>>,
) -> Json<InfoResponse> {
    let is_occupied = match monitor.inner() {
        Some(monitor) => {
            let answer = if monitor.is_occupied().await { "yes" } else { "no" };
            Some(answer.to_string())
        }
        None => None,
    };

    Json(InfoResponse {
        serial_number: store.serial_number().await,
        is_occupied,
    })
}

#[derive(Debug, Deserialize)]
pub struct UnoccupiedRequest {
    #[serde(rename = "fanState")]
    pub fan_state: i64,
    pub setpoint: i64,
}

/// Change and persist the values applied while the room is vacant
#[post("/unoccupied", data = "<request>")]
pub async fn set_unoccupied(
    _auth: Authorized,
    request: Result<Json<UnoccupiedRequest>, json::Error<'_>>,
    store: &State<ConfigStore>,
    monitor: &State<Option<OccupancyMonitor>>,
) -> Result<Json<MessageResponse>, ApiError> {
    let request = request.map_err(|e| api_error(Status::BadRequest, e))?;
    let values = UnoccupiedOverride {
        setpoint: register_value("setpoint", request.setpoint).map_err(gateway_error)?,
        fan_state: register_value("fanState", request.fan_state).map_err(gateway_error)?,
    };

    if let Some(monitor) = monitor.inner() {
        monitor.set_override(values).await;
    }

    store.persist_override(values).await.map_err(|e| {
        error!("Failed to persist unoccupied override: {:#}", e);
        api_error(Status::InternalServerError, format!("{:#}", e))
    })?;

    Ok(message("updated config"))
}
