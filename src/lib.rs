// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! SFP/SFP+ transceiver monitor
//!
//! Polls a pluggable optical module over I2C, decodes its identity page
//! (A0h) and diagnostic page (A2h), tracks its presence with a small state
//! machine and answers queries on a local Unix socket.

pub mod bus;
pub mod config;
pub mod daemon;
pub mod decoder;
pub mod server;
pub mod state;
