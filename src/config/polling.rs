// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Poll loop configuration
//!
//! Intervals are expressed in milliseconds in the configuration file and
//! exposed as [`Duration`] to the poll loop.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Cadence and error thresholds of the poll loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Sleep between iterations while no module is plugged
    pub absent_interval_ms: u64,

    /// Sleep between iterations while a module is plugged.
    ///
    /// This is also the cadence of diagnostic page reads.
    pub present_interval_ms: u64,

    /// Sleep between recovery attempts
    pub error_interval_ms: u64,

    /// Minimum time between two presence checks while PRESENT
    pub presence_check_interval_ms: u64,

    /// Consecutive failed diagnostic reads before entering ERROR
    pub max_bus_errors: u32,

    /// Recovery attempts before an absent module is declared gone
    pub max_recovery_attempts: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            absent_interval_ms: 500,
            present_interval_ms: 2000,
            error_interval_ms: 5000,
            presence_check_interval_ms: 5000,
            max_bus_errors: 3,
            max_recovery_attempts: 10,
        }
    }
}

impl PollingConfig {
    pub fn absent_interval(&self) -> Duration {
        Duration::from_millis(self.absent_interval_ms)
    }

    pub fn present_interval(&self) -> Duration {
        Duration::from_millis(self.present_interval_ms)
    }

    pub fn error_interval(&self) -> Duration {
        Duration::from_millis(self.error_interval_ms)
    }

    pub fn presence_check_interval(&self) -> Duration {
        Duration::from_millis(self.presence_check_interval_ms)
    }
}
