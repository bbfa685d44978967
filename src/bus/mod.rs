// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Bus access layer
//!
//! This module provides the drivers used to talk to the transceiver:
//! - Native: Linux `/dev/i2c-*` character device
//! - Mock: scriptable in-memory module for tests and development
//!
//! The poll loop only sees the [`BusDriver`] trait. A failed read is an
//! ordinary [`BusError`] value that degrades the device state, it never stops
//! the daemon.

pub mod mock;
pub mod native;

use std::io;

use anyhow::Result;
use log::info;
use thiserror::Error;

use crate::config::{BusConfig, BusType};

pub use mock::{sample_dynamic_page, sample_static_page, MockBusDriver, MockModuleHandle};
pub use native::NativeBusDriver;

/// Failure of a single bus transaction.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("failed to open bus device {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to select address 0x{address:02X}: {source}")]
    SelectAddress {
        address: u8,
        #[source]
        source: io::Error,
    },

    #[error("failed to write offset to 0x{address:02X}: {source}")]
    Write {
        address: u8,
        #[source]
        source: io::Error,
    },

    #[error("failed to read from 0x{address:02X}: {source}")]
    Read {
        address: u8,
        #[source]
        source: io::Error,
    },

    #[error("short read from 0x{address:02X}: expected {expected} bytes, got {actual}")]
    ShortRead {
        address: u8,
        expected: usize,
        actual: usize,
    },

    #[error("no device answering at 0x{address:02X}")]
    NoDevice { address: u8 },
}

/// Offset-addressed block access to devices on a two-wire bus.
///
/// Implementations enforce their own bounded latency, callers never add
/// timeouts or retries.
#[async_trait::async_trait]
pub trait BusDriver: Send {
    /// Read `length` bytes starting at `offset` from the device at `address`
    async fn read_block(
        &mut self,
        address: u8,
        offset: u8,
        length: usize,
    ) -> Result<Vec<u8>, BusError>;

    /// Check whether a device answers at `address`
    async fn detect(&mut self, address: u8) -> bool;
}

/// Create the driver selected by the configuration
pub fn create_bus_driver(config: &BusConfig) -> Result<Box<dyn BusDriver>> {
    match config.bus_type {
        BusType::Native => {
            info!("Opening native bus device {}", config.device);
            Ok(Box::new(NativeBusDriver::open(&config.device)?))
        }
        BusType::Mock => {
            info!("Using simulated transceiver on mock bus");
            Ok(Box::new(MockBusDriver::with_sample_module(
                config.static_address,
                config.dynamic_address,
            )))
        }
    }
}
