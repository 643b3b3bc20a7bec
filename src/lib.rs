// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Thermostat gateway library
//!
//! HTTP access to a Modbus-RTU thermostat, with an occupancy sensor that
//! swaps the thermostat to economy values while the room is vacant.

pub mod api;
pub mod config;
pub mod daemon;
pub mod error;
pub mod modbus;
pub mod occupancy;
pub mod serializer;
