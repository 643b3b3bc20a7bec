// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Occupancy monitoring
//!
//! A poller samples the presence sensor at a fixed period and drives a two
//! state machine. Leaving the room saves the thermostat setpoint and fan
//! state and applies the unoccupied override; coming back writes the saved
//! values back. Both actions go through the transaction queue as
//! fire-and-forget tasks, so the poller never touches the link itself.

pub mod pin;
pub mod tasks;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::{debug, info, warn};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::OccupancyConfig;
use crate::serializer::Serializer;

pub use pin::{open_input, InputPin, MockInputPin, SysfsInputPin};
pub use tasks::{
    Reoccupy, SavedThermostatState, SharedOverride, SharedSavedState, UnoccupiedOverride, Vacate,
};

/// Presence state of the room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccupancyState {
    Occupied,
    Unoccupied,
}

impl OccupancyState {
    /// State reported by a sensor level: high means present
    pub fn from_level(high: bool) -> Self {
        if high {
            OccupancyState::Occupied
        } else {
            OccupancyState::Unoccupied
        }
    }

    pub fn is_occupied(self) -> bool {
        self == OccupancyState::Occupied
    }
}

/// Occupancy state machine and its shared state.
///
/// Cheap to clone; clones observe the same state. The HTTP API keeps one to
/// answer `/info` and to update the override without going through the
/// transaction queue.
#[derive(Clone)]
pub struct OccupancyMonitor {
    state: Arc<RwLock<OccupancyState>>,
    saved: SharedSavedState,
    override_values: SharedOverride,
    zero_is_unset: bool,
    poll_interval: Duration,
    running: Arc<AtomicBool>,
}

impl OccupancyMonitor {
    /// Monitor starting in the `Unoccupied` state with an empty cache
    pub fn new(config: &OccupancyConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(OccupancyState::Unoccupied)),
            saved: Arc::new(Mutex::new(SavedThermostatState::default())),
            override_values: Arc::new(RwLock::new(UnoccupiedOverride {
                setpoint: config.setpoint,
                fan_state: config.fan_state,
            })),
            zero_is_unset: config.zero_is_unset,
            poll_interval: config.poll_interval(),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn state(&self) -> OccupancyState {
        *self.state.read().await
    }

    pub async fn is_occupied(&self) -> bool {
        self.state().await.is_occupied()
    }

    /// Values applied on the next vacancy
    pub async fn override_values(&self) -> UnoccupiedOverride {
        *self.override_values.read().await
    }

    /// Replace the values applied on the next vacancy
    pub async fn set_override(&self, values: UnoccupiedOverride) {
        *self.override_values.write().await = values;
        info!(
            "Unoccupied override set to setpoint {} and fan state {}",
            values.setpoint, values.fan_state
        );
    }

    /// Snapshot of the saved thermostat state
    pub async fn saved_state(&self) -> SavedThermostatState {
        *self.saved.lock().await
    }

    /// Sample the input once and react to a state change.
    ///
    /// Returns the new state when a transition happened. The transition task
    /// is queued, not awaited; queueing may wait when the queue is full.
    pub async fn sample(
        &self,
        input: &dyn InputPin,
        queue: &Serializer,
    ) -> Result<Option<OccupancyState>> {
        let target = OccupancyState::from_level(input.is_high().await?);

        {
            let mut state = self.state.write().await;
            if *state == target {
                return Ok(None);
            }
            *state = target;
        }

        info!("Occupancy changed to {:?}", target);
        match target {
            OccupancyState::Unoccupied => {
                queue
                    .submit(Vacate {
                        saved: self.saved.clone(),
                        override_values: self.override_values.clone(),
                        zero_is_unset: self.zero_is_unset,
                    })
                    .await?
            }
            OccupancyState::Occupied => {
                queue
                    .submit(Reoccupy {
                        saved: self.saved.clone(),
                    })
                    .await?
            }
        }

        Ok(Some(target))
    }

    /// Start the poller.
    ///
    /// Runs until [`stop`](Self::stop) is called or the queue closes.
    pub fn start(&self, input: Box<dyn InputPin>, queue: Serializer) -> JoinHandle<Result<()>> {
        info!(
            "Starting occupancy monitor on {} every {:?}",
            input.describe(),
            self.poll_interval
        );
        self.running.store(true, Ordering::SeqCst);

        let monitor = self.clone();
        tokio::spawn(async move {
            // Only the first of a run of identical input failures is a warning
            let mut input_failing = false;

            while monitor.running.load(Ordering::SeqCst) {
                match monitor.sample(input.as_ref(), &queue).await {
                    Ok(_) => input_failing = false,
                    Err(e) if e.downcast_ref::<crate::error::GatewayError>().is_some() => {
                        warn!("Occupancy monitor stopping: {}", e);
                        return Err(e);
                    }
                    Err(e) if input_failing => debug!("Occupancy input still failing: {}", e),
                    Err(e) => {
                        warn!("Failed to read occupancy input: {}", e);
                        input_failing = true;
                    }
                }
                time::sleep(monitor.poll_interval).await;
            }

            debug!("Occupancy monitor stopped");
            Ok(())
        })
    }

    /// Ask the poller to stop after its current sample
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modbus::MockThermostat;

    #[tokio::test]
    async fn test_initial_state_is_unoccupied() {
        let monitor = OccupancyMonitor::new(&OccupancyConfig::default());
        assert_eq!(monitor.state().await, OccupancyState::Unoccupied);
        assert!(!monitor.saved_state().await.valid);
    }

    #[tokio::test]
    async fn test_no_transition_without_level_change() {
        let monitor = OccupancyMonitor::new(&OccupancyConfig::default());
        let mock = MockThermostat::simulated();
        let (queue, _worker) = Serializer::spawn(Box::new(mock.clone()));
        let input = MockInputPin::new();

        assert_eq!(monitor.sample(&input, &queue).await.unwrap(), None);
        assert!(mock.journal().is_empty());
    }

    #[tokio::test]
    async fn test_override_update() {
        let monitor = OccupancyMonitor::new(&OccupancyConfig::default());
        assert_eq!(
            monitor.override_values().await,
            UnoccupiedOverride {
                setpoint: 23,
                fan_state: 1
            }
        );

        monitor
            .set_override(UnoccupiedOverride {
                setpoint: 18,
                fan_state: 3,
            })
            .await;
        assert_eq!(monitor.override_values().await.setpoint, 18);
    }
}
