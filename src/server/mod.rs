// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Local query server
//!
//! * [`protocol`]: request parsing and response documents
//! * [`socket_server`]: the Unix domain socket serviced by the poll loop

pub mod protocol;
pub mod socket_server;

pub use protocol::{handle_command, Command, Response, StatusCode};
pub use socket_server::SocketServer;
