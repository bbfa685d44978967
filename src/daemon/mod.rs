// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Module
//!
//! Runs the transceiver monitor: one poll loop task owning the bus and the
//! query socket, plus a heartbeat task. Readers only ever see the shared
//! record through [`crate::state::StateStore`].
//!
//! ## Components
//!
//! * **Launch Daemon**: starting, monitoring and gracefully shutting down
//!   the background tasks
//! * **Poll Loop**: presence detection, page reads and state transitions
//! * **Detach**: leaving the controlling terminal when running as a daemon
//!
//! ## Usage
//!
//! ```no_run
//! use sfp_monitor::{config::Config, daemon::Daemon};
//!
//! async fn run() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.yaml")?;
//!
//!     let mut daemon = Daemon::new();
//!     daemon.launch(&config).await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!
//!     daemon.shutdown();
//!     daemon.join().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod detach;
pub mod launch_daemon;
pub mod poll_loop;

pub use detach::detach;
pub use launch_daemon::Daemon;
pub use poll_loop::PollLoop;
