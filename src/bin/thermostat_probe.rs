// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Bench tool talking to the thermostat directly, without the gateway

use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use thermostat_gateway::config::{ModbusConfig, Parity, TransportKind};
use thermostat_gateway::modbus::registers::{
    check_span, encode_registers, FAN_STATE_REGISTER, SETPOINT_REGISTER, STATUS_BLOCK_LEN,
    STATUS_BLOCK_START,
};
use thermostat_gateway::modbus::{connect_transport, RegisterTransport};

/// Read (and optionally write) thermostat registers over Modbus RTU
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Serial device
    #[clap(long, default_value = "/dev/ACM0")]
    port: String,

    /// Baud rate
    #[clap(long, default_value = "9600")]
    baud_rate: u32,

    /// Parity: N, E or O
    #[clap(long, default_value = "N")]
    parity: String,

    /// Modbus slave id
    #[clap(long, default_value = "1")]
    slave_id: u8,

    /// First register to read
    #[clap(long, default_value_t = STATUS_BLOCK_START)]
    start: u16,

    /// Number of registers to read
    #[clap(long, default_value_t = STATUS_BLOCK_LEN)]
    quantity: u16,

    /// Write `ADDRESS=VALUE` before reading
    #[clap(long)]
    write: Option<String>,

    /// Read again every N seconds until interrupted
    #[clap(long)]
    watch: Option<u64>,

    /// Talk to the in-memory simulator instead of the serial port
    #[clap(long)]
    mock: bool,
}

fn parse_parity(raw: &str) -> Result<Parity> {
    match raw.to_ascii_uppercase().as_str() {
        "N" => Ok(Parity::None),
        "E" => Ok(Parity::Even),
        "O" => Ok(Parity::Odd),
        other => anyhow::bail!("Unknown parity '{}', expected N, E or O", other),
    }
}

fn parse_write(raw: &str) -> Result<(u16, u16)> {
    let (address, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Expected ADDRESS=VALUE, got '{}'", raw))?;
    Ok((address.trim().parse()?, value.trim().parse()?))
}

async fn dump(transport: &mut dyn RegisterTransport, start: u16, quantity: u16) -> Result<()> {
    let values = transport.read_registers(start, quantity).await?;

    println!("[{}]", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!("Raw response bytes: {:02x?}", encode_registers(&values));
    for (register, value) in (start..=u16::MAX).zip(values.iter()) {
        match register {
            SETPOINT_REGISTER => println!("Register {}: Setpoint = {}", register, value),
            FAN_STATE_REGISTER => println!("Register {}: Fan state = {}", register, value),
            _ => println!("Register {}: Value = {}", register, value),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let args = Args::parse();
    check_span(args.start, args.quantity)?;

    let config = ModbusConfig {
        transport: if args.mock {
            TransportKind::Mock
        } else {
            TransportKind::Rtu
        },
        port: args.port.clone(),
        baud_rate: args.baud_rate,
        parity: parse_parity(&args.parity)?,
        slave_id: args.slave_id,
        max_connect_attempts: Some(1),
        ..ModbusConfig::default()
    };

    println!("Connecting to slave {} on {}", config.slave_id, config.port);
    let mut transport = connect_transport(&config).await?;

    if let Some(write) = &args.write {
        let (address, value) = parse_write(write)?;
        println!("Writing {} to register {}", value, address);
        transport.write_register(address, value).await?;
    }

    println!(
        "Reading {} holding registers starting at address {}",
        args.quantity, args.start
    );

    let result = match args.watch {
        None => dump(transport.as_mut(), args.start, args.quantity).await,
        Some(period) => loop {
            if let Err(e) = dump(transport.as_mut(), args.start, args.quantity).await {
                eprintln!("Read failed: {}", e);
            }
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(period.max(1))) => {}
                _ = tokio::signal::ctrl_c() => break Ok(()),
            }
        },
    };

    transport.close().await?;
    result
}
