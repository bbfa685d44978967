// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Process level settings

use serde::{Deserialize, Serialize};

/// Settings of the daemon process itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Detach from the controlling terminal at start-up.
    ///
    /// Disabled by `--foreground`, which is what service managers expect.
    pub daemonize: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self { daemonize: true }
    }
}
