// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::time::Duration;

use thermostat_gateway::config::OccupancyConfig;
use thermostat_gateway::error::GatewayError;
use thermostat_gateway::modbus::{MockThermostat, Operation};
use thermostat_gateway::occupancy::{
    MockInputPin, OccupancyMonitor, OccupancyState, SavedThermostatState, UnoccupiedOverride,
};
use thermostat_gateway::serializer::{ReadRegisters, Serializer};

/// Thermostat at setpoint 21 / fan state 2, override 23 / 1
fn setup() -> (MockThermostat, Serializer, OccupancyMonitor, MockInputPin) {
    let mock = MockThermostat::simulated();
    let (queue, _worker) = Serializer::spawn(Box::new(mock.clone()));
    let monitor = OccupancyMonitor::new(&OccupancyConfig::default());
    (mock, queue, monitor, MockInputPin::new())
}

/// Wait until every task queued so far has run
async fn settle(queue: &Serializer) {
    queue
        .submit_and_wait(ReadRegisters::new(1, 1).unwrap())
        .await
        .unwrap();
}

/// Operations recorded after the `settle` reads are removed
fn exchanges(mock: &MockThermostat) -> Vec<Operation> {
    mock.journal()
        .into_iter()
        .filter(|op| *op != Operation::Read { start: 1, count: 1 })
        .collect()
}

async fn enter(monitor: &OccupancyMonitor, input: &MockInputPin, queue: &Serializer) {
    input.set_high(true);
    assert_eq!(
        monitor.sample(input, queue).await.unwrap(),
        Some(OccupancyState::Occupied)
    );
    settle(queue).await;
}

async fn leave(monitor: &OccupancyMonitor, input: &MockInputPin, queue: &Serializer) {
    input.set_high(false);
    assert_eq!(
        monitor.sample(input, queue).await.unwrap(),
        Some(OccupancyState::Unoccupied)
    );
    settle(queue).await;
}

#[tokio::test]
async fn test_vacancy_saves_state_and_applies_override() {
    let (mock, queue, monitor, input) = setup();

    enter(&monitor, &input, &queue).await;
    assert!(monitor.is_occupied().await);
    // Empty cache, nothing restored
    assert!(exchanges(&mock).is_empty());

    leave(&monitor, &input, &queue).await;

    assert_eq!(
        exchanges(&mock),
        vec![
            Operation::Read { start: 3, count: 2 },
            Operation::Write {
                address: 3,
                value: 23
            },
            Operation::Write {
                address: 4,
                value: 1
            },
        ]
    );
    assert_eq!(
        monitor.saved_state().await,
        SavedThermostatState {
            setpoint: 21,
            fan_state: 2,
            valid: true
        }
    );
    assert_eq!(mock.register(3), Some(23));
    assert_eq!(mock.register(4), Some(1));
}

#[tokio::test]
async fn test_return_restores_saved_state() {
    let (mock, queue, monitor, input) = setup();

    enter(&monitor, &input, &queue).await;
    leave(&monitor, &input, &queue).await;
    enter(&monitor, &input, &queue).await;

    let ops = exchanges(&mock);
    assert_eq!(
        &ops[ops.len() - 2..],
        &[
            Operation::Write {
                address: 3,
                value: 21
            },
            Operation::Write {
                address: 4,
                value: 2
            },
        ]
    );
    assert_eq!(mock.register(3), Some(21));
    assert_eq!(mock.register(4), Some(2));

    // The cache is consumed
    assert!(!monitor.saved_state().await.valid);
}

#[tokio::test]
async fn test_capture_failure_still_applies_override() {
    let (mock, queue, monitor, input) = setup();

    enter(&monitor, &input, &queue).await;
    mock.fail_next(GatewayError::Timeout(Duration::from_secs(5)));
    leave(&monitor, &input, &queue).await;

    // The failed read is followed by both override writes
    assert_eq!(
        exchanges(&mock),
        vec![
            Operation::Read { start: 3, count: 2 },
            Operation::Write {
                address: 3,
                value: 23
            },
            Operation::Write {
                address: 4,
                value: 1
            },
        ]
    );
    assert_eq!(monitor.saved_state().await, SavedThermostatState::default());

    // Nothing to restore on return
    let before = mock.journal().len();
    enter(&monitor, &input, &queue).await;
    assert!(mock.writes().len() == 2);
    assert_eq!(mock.journal().len(), before + 1);
}

#[tokio::test]
async fn test_zero_capture_is_not_restored() {
    let (mock, queue, monitor, input) = setup();
    mock.set_register(3, 0);
    mock.set_register(4, 0);

    enter(&monitor, &input, &queue).await;
    leave(&monitor, &input, &queue).await;
    assert!(!monitor.saved_state().await.valid);

    let writes_before = mock.writes().len();
    enter(&monitor, &input, &queue).await;
    assert_eq!(mock.writes().len(), writes_before);
}

#[tokio::test]
async fn test_zero_capture_restored_when_zero_is_a_value() {
    let mock = MockThermostat::simulated();
    mock.set_register(4, 0);
    let (queue, _worker) = Serializer::spawn(Box::new(mock.clone()));
    let monitor = OccupancyMonitor::new(&OccupancyConfig {
        zero_is_unset: false,
        ..OccupancyConfig::default()
    });
    let input = MockInputPin::new();

    enter(&monitor, &input, &queue).await;
    leave(&monitor, &input, &queue).await;
    enter(&monitor, &input, &queue).await;

    assert_eq!(mock.register(3), Some(21));
    assert_eq!(mock.register(4), Some(0));
}

#[tokio::test]
async fn test_override_change_applies_on_next_vacancy() {
    let (mock, queue, monitor, input) = setup();

    enter(&monitor, &input, &queue).await;
    monitor
        .set_override(UnoccupiedOverride {
            setpoint: 17,
            fan_state: 3,
        })
        .await;
    leave(&monitor, &input, &queue).await;

    assert_eq!(mock.register(3), Some(17));
    assert_eq!(mock.register(4), Some(3));
}

#[tokio::test]
async fn test_poller_follows_input() {
    let mock = MockThermostat::simulated();
    let (queue, _worker) = Serializer::spawn(Box::new(mock.clone()));
    let monitor = OccupancyMonitor::new(&OccupancyConfig {
        poll_interval_ms: 5,
        ..OccupancyConfig::default()
    });
    let input = MockInputPin::new();

    let poller = monitor.start(Box::new(input.clone()), queue.clone());
    assert!(monitor.is_running());

    input.set_high(true);
    wait_for(&monitor, OccupancyState::Occupied).await;
    input.set_high(false);
    wait_for(&monitor, OccupancyState::Unoccupied).await;

    // The override is queued right after the state flips
    tokio::time::timeout(Duration::from_secs(2), async {
        while mock.register(3) != Some(23) {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("override was not applied");
    assert_eq!(monitor.saved_state().await.setpoint, 21);

    monitor.stop();
    tokio::time::timeout(Duration::from_secs(1), poller)
        .await
        .expect("poller should stop")
        .unwrap()
        .unwrap();
}

async fn wait_for(monitor: &OccupancyMonitor, state: OccupancyState) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while monitor.state().await != state {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("occupancy state did not change");
}
