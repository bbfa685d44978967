// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use log::{debug, error, info};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;

use super::poll_loop::PollLoop;
use crate::bus::{create_bus_driver, BusDriver};
use crate::config::Config;
use crate::server::SocketServer;
use crate::state::{DeviceState, StateStore};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Represents the running monitor and its background tasks
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    running: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    store: Arc<StateStore>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a new daemon instance
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Daemon {
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            shutdown_tx,
            store: Arc::new(StateStore::new()),
        }
    }

    /// Shared record published by the poll loop
    pub fn store(&self) -> Arc<StateStore> {
        Arc::clone(&self.store)
    }

    /// Open the configured bus and launch all tasks
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        let bus = create_bus_driver(&config.bus)?;
        self.launch_with_driver(config, bus).await
    }

    /// Launch all tasks over an already opened bus driver
    pub async fn launch_with_driver(
        &mut self,
        config: &Config,
        bus: Box<dyn BusDriver>,
    ) -> Result<()> {
        let server = SocketServer::bind(&config.socket)?;
        self.start_poll_loop(config, bus, server)?;

        // Start heartbeat task for monitoring
        self.start_heartbeat()?;

        Ok(())
    }

    /// Start the poll loop, the only task touching the bus and the socket
    fn start_poll_loop(
        &mut self,
        config: &Config,
        bus: Box<dyn BusDriver>,
        server: SocketServer,
    ) -> Result<()> {
        info!(
            "Starting poll loop on {} (A0h 0x{:02X}, A2h 0x{:02X})",
            config.bus.device, config.bus.static_address, config.bus.dynamic_address
        );

        let poll_loop = PollLoop::new(self.store(), bus, config, Some(server));
        let shutdown = self.shutdown_tx.subscribe();
        let task = tokio::spawn(poll_loop.run(shutdown));

        self.tasks.push(task);
        Ok(())
    }

    /// Start a heartbeat task that logs the monitored state periodically
    fn start_heartbeat(&mut self) -> Result<()> {
        debug!("Starting heartbeat monitor");

        let running = self.running.clone();
        let store = self.store();
        let mut shutdown = self.shutdown_tx.subscribe();
        let task = tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                let record = store.snapshot();
                match record.state {
                    DeviceState::Present => debug!(
                        "Daemon heartbeat: {} (generation {}, {} bus errors)",
                        record.state, record.generation_id, record.consecutive_bus_errors
                    ),
                    _ => debug!(
                        "Daemon heartbeat: {} (generation {})",
                        record.state, record.generation_id
                    ),
                }
                tokio::select! {
                    _ = time::sleep(HEARTBEAT_INTERVAL) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Stop all running tasks
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.running.store(false, Ordering::SeqCst);
        self.shutdown_tx.send_replace(true);
    }

    /// Wait for all tasks to complete
    pub async fn join(self) -> Result<()> {
        for task in self.tasks {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Task failed: {:#}", e),
                Err(e) => error!("Task panicked: {}", e),
            }
        }
        Ok(())
    }
}
