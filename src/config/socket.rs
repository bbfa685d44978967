// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Query socket configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the local query socket.
///
/// The socket is the only access path to the daemon. Access control relies
/// on the file mode applied to the socket and on its parent directory.
///
/// # Fields
///
/// * `path` - Unix domain socket path (default: /run/sfp-daemon/sfp.sock)
/// * `permissions` - mode applied to the socket file (default: 0o660)
/// * `max_connections` - simultaneous clients, extra ones are refused (default: 10)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketConfig {
    /// Filesystem path of the socket. The parent directory is created when missing.
    pub path: PathBuf,

    /// File mode applied to the socket after binding.
    pub permissions: u32,

    /// Maximum number of connected clients.
    ///
    /// A connection accepted while this many clients are connected is
    /// closed immediately.
    pub max_connections: usize,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/run/sfp-daemon/sfp.sock"),
            permissions: 0o660,
            max_connections: 10,
        }
    }
}
