// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Poll loop
//!
//! The single control task of the daemon. Each iteration:
//!
//! 1. services the query socket (accepts pending clients, answers requests)
//! 2. probes module presence on both page addresses
//! 3. acts on the current state:
//!    - INIT: go to ABSENT, detection is left to the next iteration
//!    - ABSENT: on detection read the static page, then publish the
//!      transition and the decoded page in one locked section
//!    - PRESENT: recheck presence on its own cadence, read the diagnostic page
//!    - ERROR: count a recovery attempt and retry the diagnostic page while
//!      attempts remain, past that only wait for the module to go away
//! 4. sleeps for the interval of the resulting state while still answering
//!    clients
//!
//! Bus failures only ever degrade the state. Nothing in an iteration stops
//! the loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::time::{self, Instant};

use crate::bus::{BusDriver, BusError};
use crate::config::{Config, PollingConfig};
use crate::decoder::{
    decode_dynamic, decode_static, DynamicInfo, DYNAMIC_PAGE_LEN, DYNAMIC_PAGE_OFFSET,
    STATIC_PAGE_LEN, STATIC_PAGE_OFFSET,
};
use crate::server::SocketServer;
use crate::state::fsm::{self, Transition};
use crate::state::{DeviceState, StateStore};

/// Poll loop state that is not shared with readers
pub struct PollLoop {
    store: Arc<StateStore>,
    bus: Box<dyn BusDriver>,
    server: Option<SocketServer>,
    polling: PollingConfig,
    static_address: u8,
    dynamic_address: u8,
    last_presence_check: Option<Instant>,
    last_fingerprint: Option<u32>,
}

impl PollLoop {
    /// Build a loop over `bus`. Without a server the loop only polls.
    pub fn new(
        store: Arc<StateStore>,
        bus: Box<dyn BusDriver>,
        config: &Config,
        server: Option<SocketServer>,
    ) -> Self {
        Self {
            store,
            bus,
            server,
            polling: config.polling.clone(),
            static_address: config.bus.static_address,
            dynamic_address: config.bus.dynamic_address,
            last_presence_check: None,
            last_fingerprint: None,
        }
    }

    pub fn store(&self) -> Arc<StateStore> {
        Arc::clone(&self.store)
    }

    /// Run iterations until `shutdown` turns true or its sender is dropped
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!("Poll loop started");
        while !*shutdown.borrow() {
            let interval = self.step().await;
            if !self.idle(interval, &mut shutdown).await {
                break;
            }
        }
        info!("Poll loop stopped");
        Ok(())
    }

    /// Run one iteration and return the sleep before the next one
    pub async fn step(&mut self) -> Duration {
        if let Some(server) = self.server.as_mut() {
            server.service(&self.store).await;
        }

        let present = self.module_present().await;

        match self.store.state() {
            DeviceState::Init => {
                fsm::transition(&self.store, Transition::InitToAbsent);
            }
            DeviceState::Absent => {
                if present {
                    self.on_detected().await;
                }
            }
            DeviceState::Present => self.poll_present(present).await,
            DeviceState::Error => self.recover(present).await,
        }

        self.interval_for(self.store.state())
    }

    fn interval_for(&self, state: DeviceState) -> Duration {
        match state {
            DeviceState::Init | DeviceState::Absent => self.polling.absent_interval(),
            DeviceState::Present => self.polling.present_interval(),
            DeviceState::Error => self.polling.error_interval(),
        }
    }

    /// Sleep for `interval`, answering clients meanwhile.
    ///
    /// Returns `false` when shutdown was requested.
    async fn idle(&mut self, interval: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
        let deadline = Instant::now() + interval;
        loop {
            match self.server.as_mut() {
                Some(server) => tokio::select! {
                    _ = time::sleep_until(deadline) => return true,
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            return false;
                        }
                    }
                    _ = server.wait_for_activity() => server.service(&self.store).await,
                },
                None => tokio::select! {
                    _ = time::sleep_until(deadline) => return true,
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            return false;
                        }
                    }
                },
            }
        }
    }

    /// Both pages must answer
    async fn module_present(&mut self) -> bool {
        self.bus.detect(self.static_address).await && self.bus.detect(self.dynamic_address).await
    }

    async fn on_detected(&mut self) {
        let read = self
            .bus
            .read_block(self.static_address, STATIC_PAGE_OFFSET, STATIC_PAGE_LEN)
            .await;
        let now = Utc::now();

        let raw = match read {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Module detected but static page unreadable: {}", e);
                // Never visible as PRESENT without its static page
                self.store.mutate(|record| {
                    if fsm::apply(record, Transition::AbsentToPresent, now) {
                        fsm::apply(record, Transition::PresentToAbsent, now);
                    }
                });
                return;
            }
        };

        let info = decode_static(&raw);
        let checksum_ok = info.cc_base_valid;
        let description = format!(
            "{} {} rev {}",
            info.vendor_name, info.vendor_pn, info.vendor_rev
        );

        let published = self.store.mutate(|record| {
            if !fsm::apply(record, Transition::AbsentToPresent, now) {
                return None;
            }
            record.store_static(&raw, info, now);
            Some((record.generation_id, record.fingerprint))
        });

        let Some((generation_id, fingerprint)) = published else {
            return;
        };
        self.last_presence_check = Some(Instant::now());

        info!(
            "Static page read for generation {}: {}",
            generation_id, description
        );
        if !checksum_ok {
            warn!("Static page checksum mismatch (generation {})", generation_id);
        }
        if self.last_fingerprint == Some(fingerprint) {
            info!("Same module identity as the previous insertion");
        }
        self.last_fingerprint = Some(fingerprint);
    }

    async fn poll_present(&mut self, present: bool) {
        let check_due = self
            .last_presence_check
            .map_or(true, |at| at.elapsed() >= self.polling.presence_check_interval());
        if check_due {
            if !present {
                info!("Module removed");
                fsm::transition(&self.store, Transition::PresentToAbsent);
                return;
            }
            self.last_presence_check = Some(Instant::now());
        }

        match self.read_dynamic().await {
            Ok((raw, info)) => {
                let now = Utc::now();
                self.store.mutate(|record| record.store_dynamic(&raw, info, now));
            }
            Err(e) => {
                let max_errors = self.polling.max_bus_errors;
                let errors = self.store.mutate(|record| {
                    record.consecutive_bus_errors = record.consecutive_bus_errors.saturating_add(1);
                    if record.consecutive_bus_errors >= max_errors {
                        fsm::apply(record, Transition::PresentToError, Utc::now());
                    }
                    record.consecutive_bus_errors
                });
                warn!("Diagnostic page read failed ({}/{}): {}", errors, max_errors, e);
            }
        }
    }

    async fn recover(&mut self, present: bool) {
        let attempts = self.store.mutate(|record| {
            record.recovery_attempts = record.recovery_attempts.saturating_add(1);
            record.recovery_attempts
        });
        let max_attempts = self.polling.max_recovery_attempts;

        // Past the cap the diagnostic page is left alone, only removal is watched for
        if attempts >= max_attempts {
            if !present {
                info!("Module gone after {} recovery attempts", attempts);
                fsm::transition(&self.store, Transition::ErrorToAbsent);
            }
            return;
        }

        match self.read_dynamic().await {
            Ok((raw, info)) => {
                let now = Utc::now();
                self.store.mutate(|record| {
                    record.store_dynamic(&raw, info, now);
                    fsm::apply(record, Transition::ErrorToPresent, now);
                });
                self.last_presence_check = Some(Instant::now());
            }
            Err(e) => {
                debug!("Recovery attempt {}/{} failed: {}", attempts, max_attempts, e);
            }
        }
    }

    async fn read_dynamic(&mut self) -> Result<(Vec<u8>, DynamicInfo), BusError> {
        let raw = self
            .bus
            .read_block(self.dynamic_address, DYNAMIC_PAGE_OFFSET, DYNAMIC_PAGE_LEN)
            .await?;
        let info = decode_dynamic(&raw);
        Ok((raw, info))
    }
}
