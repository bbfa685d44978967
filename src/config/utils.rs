// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::debug;

use super::Config;

const SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Parse the embedded JSON schema
pub fn config_schema() -> Result<serde_json::Value> {
    serde_json::from_str(SCHEMA).context("Failed to parse JSON schema")
}

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./sfp_monitor --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema = config_schema()?;
    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;
    println!("{}", formatted_schema);
    Ok(())
}

/// Validates the configuration against additional rules that aren't covered by the JSON schema.
///
/// # Validation Rules
///
/// - **Intervals**: every poll interval is strictly positive
/// - **Thresholds**: error and recovery thresholds are at least 1
/// - **Connections**: at least one client may connect
/// - **Socket**: the path is absolute and the mode fits in 0o777
/// - **Addresses**: both module addresses are distinct 7-bit addresses
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    let polling = &config.polling;
    for (name, value) in [
        ("absent_interval_ms", polling.absent_interval_ms),
        ("present_interval_ms", polling.present_interval_ms),
        ("error_interval_ms", polling.error_interval_ms),
        (
            "presence_check_interval_ms",
            polling.presence_check_interval_ms,
        ),
    ] {
        if value == 0 {
            anyhow::bail!("Poll interval {} must be greater than zero", name);
        }
    }

    if polling.max_bus_errors == 0 {
        anyhow::bail!("max_bus_errors must be at least 1");
    }
    if polling.max_recovery_attempts == 0 {
        anyhow::bail!("max_recovery_attempts must be at least 1");
    }

    if config.socket.max_connections == 0 {
        anyhow::bail!("max_connections must be at least 1");
    }
    if !config.socket.path.is_absolute() {
        anyhow::bail!(
            "Socket path must be absolute: {}",
            config.socket.path.display()
        );
    }
    if config.socket.permissions > 0o777 {
        anyhow::bail!(
            "Invalid socket permissions: {:o}",
            config.socket.permissions
        );
    }

    let bus = &config.bus;
    for address in [bus.static_address, bus.dynamic_address] {
        if address > 0x7F {
            anyhow::bail!("Bus address 0x{:02X} is not a 7-bit address", address);
        }
    }
    if bus.static_address == bus.dynamic_address {
        anyhow::bail!(
            "Static and dynamic pages cannot share address 0x{:02X}",
            bus.static_address
        );
    }
    if bus.device.trim().is_empty() {
        anyhow::bail!("Bus device path is empty");
    }

    Ok(())
}
