// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the thermostat gateway
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::{error, info};
use thermostat_gateway::config::{output_config_schema, Config};
use thermostat_gateway::daemon::launch_daemon::Daemon;

/// HTTP gateway to a Modbus-RTU thermostat with occupancy override
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Print the configuration JSON schema and exit
    #[arg(long)]
    show_config_schema: bool,

    /// API server port, overrides `api.port`
    #[arg(short = 'p', long)]
    api_port: Option<u16>,

    /// API server address, overrides `api.address`
    #[arg(short = 'a', long)]
    api_address: Option<String>,

    /// Serial device of the thermostat, overrides `modbus.port`
    #[arg(long)]
    serial_port: Option<String>,

    /// Modbus slave id of the thermostat, overrides `modbus.slave_id`
    #[arg(long)]
    slave_id: Option<u8>,

    /// Enable or disable the occupancy monitor, overrides `occupancy.enabled`
    #[arg(long)]
    occupancy: Option<bool>,
}

#[rocket::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.show_config_schema {
        output_config_schema()?;
        return Ok(());
    }

    let mut config = Config::from_file(&args.config)?;
    config.apply_args(
        args.api_port,
        args.api_address,
        args.serial_port,
        args.slave_id,
        args.occupancy,
    );

    info!(
        "Thermostat gateway {} for device {}",
        env!("CARGO_PKG_VERSION"),
        config.serial_number
    );

    let mut daemon = Daemon::new();
    daemon.launch(&config, &args.config).await?;

    let outcome: Result<()> = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            info!("Interrupt received");
            signal.map_err(Into::into)
        }
        failure = daemon.wait_for_failure() => {
            if let Err(e) = &failure {
                error!("Stopping the gateway: {:#}", e);
            }
            failure
        }
    };

    daemon.shutdown().await;
    daemon.join().await?;
    outcome
}
