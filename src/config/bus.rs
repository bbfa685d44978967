// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Two-wire bus configuration
//!
//! This module defines where the transceiver is attached and which driver is
//! used to reach it.

use serde::{Deserialize, Serialize};

/// Default Linux I2C character device
pub const DEFAULT_BUS_DEVICE: &str = "/dev/i2c-1";
/// SFF-8472 address of the A0h identity page
pub const DEFAULT_STATIC_ADDRESS: u8 = 0x50;
/// SFF-8472 address of the A2h diagnostic page
pub const DEFAULT_DYNAMIC_ADDRESS: u8 = 0x51;

/// Bus driver selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusType {
    /// Linux `/dev/i2c-*` character device
    Native,
    /// Simulated module, for development without hardware
    Mock,
}

/// Configuration of the bus access layer.
///
/// # Example
///
/// ```
/// use sfp_monitor::config::{BusConfig, BusType};
///
/// let bus = BusConfig {
///     bus_type: BusType::Native,
///     device: "/dev/i2c-0".to_string(),
///     ..BusConfig::default()
/// };
/// assert_eq!(bus.static_address, 0x50);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Driver used to reach the module: "native" or "mock"
    #[serde(rename = "type")]
    pub bus_type: BusType,

    /// Device path of the bus, e.g. "/dev/i2c-1"
    pub device: String,

    /// 7-bit address answering with the static identity page
    pub static_address: u8,

    /// 7-bit address answering with the diagnostic page
    pub dynamic_address: u8,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            bus_type: BusType::Native,
            device: DEFAULT_BUS_DEVICE.to_string(),
            static_address: DEFAULT_STATIC_ADDRESS,
            dynamic_address: DEFAULT_DYNAMIC_ADDRESS,
        }
    }
}
