// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register tasks run on occupancy transitions

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::sync::{Mutex, RwLock};

use crate::error::{GatewayError, Result};
use crate::modbus::registers::{FAN_STATE_REGISTER, SETPOINT_REGISTER};
use crate::modbus::RegisterTransport;
use crate::serializer::Task;

/// Thermostat values captured when the room became vacant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SavedThermostatState {
    pub setpoint: u16,
    pub fan_state: u16,
    /// Whether the values may be written back on return
    pub valid: bool,
}

impl SavedThermostatState {
    /// State read from the thermostat.
    ///
    /// With `zero_is_unset`, a zero in either field marks the capture as
    /// unusable.
    pub fn captured(setpoint: u16, fan_state: u16, zero_is_unset: bool) -> Self {
        Self {
            setpoint,
            fan_state,
            valid: !(zero_is_unset && (setpoint == 0 || fan_state == 0)),
        }
    }
}

/// Values written to the thermostat while the room is vacant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnoccupiedOverride {
    pub setpoint: u16,
    pub fan_state: u16,
}

pub type SharedSavedState = Arc<Mutex<SavedThermostatState>>;
pub type SharedOverride = Arc<RwLock<UnoccupiedOverride>>;

/// Write the setpoint then the fan state.
///
/// Both writes are attempted; the first failure is returned.
async fn write_pair(
    transport: &mut dyn RegisterTransport,
    setpoint: u16,
    fan_state: u16,
) -> Result<()> {
    let first = transport.write_register(SETPOINT_REGISTER, setpoint).await;
    let second = transport.write_register(FAN_STATE_REGISTER, fan_state).await;

    match (first, second) {
        (Err(e), Err(other)) => {
            warn!("Fan state write failed as well: {}", other);
            Err(e)
        }
        (first, second) => first.and(second),
    }
}

/// Capture the current setpoint and fan state, then apply the override
pub struct Vacate {
    pub saved: SharedSavedState,
    pub override_values: SharedOverride,
    pub zero_is_unset: bool,
}

#[async_trait]
impl Task for Vacate {
    type Output = ();

    fn describe(&self) -> String {
        "apply unoccupied override".to_string()
    }

    async fn execute(self, transport: &mut dyn RegisterTransport) -> Result<()> {
        // Both registers in one exchange so the pair is consistent
        let capture = transport
            .read_registers(SETPOINT_REGISTER, 2)
            .await
            .and_then(|values| match values.as_slice() {
                [setpoint, fan_state, ..] => Ok((*setpoint, *fan_state)),
                _ => Err(GatewayError::ShortResponse {
                    expected: 4,
                    actual: values.len() * 2,
                }),
            });

        match capture {
            Ok((setpoint, fan_state)) => {
                let state = SavedThermostatState::captured(setpoint, fan_state, self.zero_is_unset);
                if !state.valid {
                    info!(
                        "Captured setpoint {} / fan state {} will not be restored",
                        setpoint, fan_state
                    );
                }
                *self.saved.lock().await = state;
                debug!("Saved thermostat state {:?}", state);
            }
            Err(e) => warn!("Could not capture thermostat state before vacancy: {}", e),
        }

        let target = *self.override_values.read().await;
        info!(
            "Room vacant, writing setpoint {} and fan state {}",
            target.setpoint, target.fan_state
        );
        write_pair(transport, target.setpoint, target.fan_state).await
    }
}

/// Write back the captured state, if any, then consume it
pub struct Reoccupy {
    pub saved: SharedSavedState,
}

#[async_trait]
impl Task for Reoccupy {
    /// `true` when saved values were written back
    type Output = bool;

    fn describe(&self) -> String {
        "restore occupied state".to_string()
    }

    async fn execute(self, transport: &mut dyn RegisterTransport) -> Result<bool> {
        let saved = *self.saved.lock().await;
        if !saved.valid {
            debug!("No usable saved state, leaving the thermostat untouched");
            return Ok(false);
        }

        info!(
            "Room occupied, restoring setpoint {} and fan state {}",
            saved.setpoint, saved.fan_state
        );
        let outcome = write_pair(transport, saved.setpoint, saved.fan_state).await;
        self.saved.lock().await.valid = false;

        outcome.map(|_| true)
    }
}
