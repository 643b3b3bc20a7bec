// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::path::Path;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Result;
use base64::prelude::*;
use log::{debug, info, warn};
use rocket::{
    config::LogLevel,
    data::{Limits, ToByteUnit},
    figment::Figment,
};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time;

use crate::api::{build_rocket, ApiState, ConfigStore};
use crate::config::Config;
use crate::modbus::connect_transport;
use crate::occupancy::{open_input, OccupancyMonitor};
use crate::serializer::Serializer;

/// Interval between two heartbeat log lines
const HEARTBEAT_PERIOD: Duration = Duration::from_secs(60);

/// The running gateway: link worker, occupancy poller, web server
pub struct Daemon {
    tasks: JoinSet<(&'static str, Result<()>)>,
    heartbeat: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
    queue: Option<Serializer>,
    worker: Option<JoinHandle<()>>,
    monitor: Option<OccupancyMonitor>,
    web_shutdown: Option<rocket::Shutdown>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a new daemon instance
    pub fn new() -> Self {
        Daemon {
            tasks: JoinSet::new(),
            heartbeat: None,
            running: Arc::new(AtomicBool::new(true)),
            queue: None,
            worker: None,
            monitor: None,
            web_shutdown: None,
        }
    }

    /// Open the link and start every service.
    ///
    /// Blocks until the thermostat link is up. `config_path` is where
    /// `POST /unoccupied` persists the configuration.
    pub async fn launch(&mut self, config: &Config, config_path: &Path) -> Result<()> {
        let transport = connect_transport(&config.modbus).await?;
        let (queue, worker) = Serializer::spawn(transport);
        self.queue = Some(queue.clone());
        self.worker = Some(worker);

        if config.occupancy.enabled {
            self.start_occupancy_monitor(config, queue.clone());
        } else {
            info!("Occupancy monitor disabled");
        }

        self.start_web_server(config, config_path, queue).await?;
        self.start_heartbeat();

        Ok(())
    }

    fn start_occupancy_monitor(&mut self, config: &Config, queue: Serializer) {
        let monitor = OccupancyMonitor::new(&config.occupancy);
        let input = open_input(&config.occupancy);
        let task = monitor.start(input, queue);

        self.monitor = Some(monitor);
        self.tasks.spawn(async move {
            let outcome: Result<()> = match task.await {
                Ok(outcome) => outcome,
                Err(e) => Err(e.into()),
            };
            ("occupancy monitor", outcome)
        });
    }

    /// Build the Rocket configuration from the `api` section
    fn web_figment(config: &Config) -> Result<Figment> {
        let mut figment = rocket::Config::figment()
            .merge(("ident", config.api.name.clone()))
            .merge(("limits", Limits::new().limit("json", 64.kibibytes())))
            .merge(("address", config.api.address.clone()))
            .merge(("port", config.api.port))
            .merge(("log_level", LogLevel::Normal))
            // Ctrl-C is handled by the daemon so the queue can drain first
            .merge(("shutdown.ctrlc", false));

        if let (Some(cert), Some(key)) = (&config.api.cert, &config.api.key) {
            debug!("SSL certificates found in configuration, enabling TLS");

            let cert_data = BASE64_STANDARD.decode(cert)?;
            let key_data = BASE64_STANDARD.decode(key)?;

            figment = figment
                .merge(("tls.certs", cert_data))
                .merge(("tls.key", key_data));

            info!("TLS enabled for web server");
        }

        Ok(figment)
    }

    /// Start the Rocket web server
    async fn start_web_server(
        &mut self,
        config: &Config,
        config_path: &Path,
        queue: Serializer,
    ) -> Result<()> {
        info!(
            "Starting web server on {}:{}",
            config.api.address, config.api.port
        );

        let state = ApiState {
            queue,
            store: ConfigStore::new(config_path, config.clone()),
            monitor: self.monitor.clone(),
            auth_key: config.api.auth_key.clone(),
        };
        let rocket = build_rocket(Self::web_figment(config)?, state);

        let ignited = rocket.ignite().await?;
        self.web_shutdown = Some(ignited.shutdown());

        self.tasks.spawn(async move {
            let outcome: Result<()> = ignited.launch().await.map(|_| ()).map_err(Into::into);
            ("web server", outcome)
        });

        Ok(())
    }

    /// Start a heartbeat task that logs system status periodically
    fn start_heartbeat(&mut self) {
        debug!("Starting heartbeat monitor");

        let running = self.running.clone();
        let queue = self.queue.clone();
        let monitor = self.monitor.clone();
        let task = tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                time::sleep(HEARTBEAT_PERIOD).await;

                let pending = queue.as_ref().map_or(0, Serializer::pending);
                match &monitor {
                    Some(monitor) => debug!(
                        "Daemon heartbeat: {} queued tasks, room {:?}",
                        pending,
                        monitor.state().await
                    ),
                    None => debug!("Daemon heartbeat: {} queued tasks", pending),
                }
            }
        });

        self.heartbeat = Some(task);
    }

    /// Wait until a service stops on its own.
    ///
    /// The web server and the occupancy monitor only end early on failure
    /// (e.g. the API port is already taken), so any completion is reported
    /// as an error naming the service. Never resolves when no service runs.
    pub async fn wait_for_failure(&mut self) -> Result<()> {
        match self.tasks.join_next().await {
            Some(Ok((name, Ok(())))) => anyhow::bail!("{} stopped unexpectedly", name),
            Some(Ok((name, Err(e)))) => Err(e.context(format!("{} failed", name))),
            Some(Err(e)) => Err(anyhow::Error::new(e).context("daemon task panicked")),
            None => std::future::pending().await,
        }
    }

    /// Stop the poller and the web server, then let the queue drain
    pub async fn shutdown(&mut self) {
        info!("Shutting down daemon tasks");
        self.running.store(false, Ordering::SeqCst);

        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.abort();
        }
        if let Some(monitor) = &self.monitor {
            monitor.stop();
        }
        if let Some(shutdown) = self.web_shutdown.take() {
            shutdown.notify();
        }
        if let Some(queue) = &self.queue {
            if let Err(e) = queue.shutdown().await {
                warn!("Transaction queue already stopped: {}", e);
            }
        }
    }

    /// Wait for all tasks to complete
    pub async fn join(mut self) -> Result<()> {
        while let Some(task) = self.tasks.join_next().await {
            match task {
                Ok((name, Err(e))) => log::error!("{} failed: {:#}", name, e),
                Err(e) => log::error!("Task panicked: {}", e),
                Ok((_, Ok(()))) => {}
            }
        }

        if let Some(worker) = self.worker {
            if let Err(e) = worker.await {
                log::error!("Transaction queue worker panicked: {}", e);
            }
        }

        info!("Daemon stopped");
        Ok(())
    }
}
