// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the SFP/SFP+ transceiver monitor
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use tokio::signal;
use tokio::signal::unix::{signal as unix_signal, SignalKind};

use sfp_monitor::config::{self, Config};
use sfp_monitor::daemon::{detach, Daemon};

/// SFP/SFP+ transceiver monitor with a local query socket
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (YAML format)
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Output the configuration schema as JSON and exit
    #[arg(long)]
    show_config_schema: bool,

    /// I2C bus device (e.g. /dev/i2c-1)
    #[arg(long)]
    device: Option<String>,

    /// Query socket path
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Use a simulated transceiver instead of the I2C bus
    #[arg(long)]
    mock: bool,

    /// Stay attached to the terminal
    #[arg(short = 'f', long)]
    foreground: bool,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

/// `RUST_LOG` (default `info`) unless `-v` or `-q` forces a level
fn logger_builder(env: env_logger::Env, verbose: bool, quiet: bool) -> env_logger::Builder {
    let mut builder = env_logger::Builder::from_env(env.default_filter_or("info"));
    if quiet {
        builder.filter_level(log::LevelFilter::Off);
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder
}

fn main() -> Result<()> {
    let args = Args::parse();

    logger_builder(env_logger::Env::default(), args.verbose, args.quiet).init();

    // Check if --show-config-schema flag is set
    if args.show_config_schema {
        return config::output_config_schema();
    }

    // Validate configuration file if --validate-config is set
    if let Some(validate_path) = args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }

        Config::from_file(&validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    let mut config = Config::from_file(&args.config)?;

    // Apply command line overrides
    config.apply_args(
        args.device.clone(),
        args.socket.clone(),
        args.mock,
        args.foreground,
    );
    config
        .validate()
        .context("Invalid configuration after command line overrides")?;

    // Threads must not exist yet when forking
    if config.daemon.daemonize {
        detach()?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build the tokio runtime")?;

    runtime.block_on(run(config))
}

async fn run(config: Config) -> Result<()> {
    info!("Starting SFP monitor daemon");
    let mut daemon = Daemon::new();
    daemon.launch(&config).await?;

    let mut terminate =
        unix_signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    // Wait for termination signal
    tokio::select! {
        result = signal::ctrl_c() => {
            if let Err(err) = result {
                eprintln!("Error waiting for shutdown signal: {}", err);
            }
            info!("Received interrupt, terminating daemon");
        }
        _ = terminate.recv() => info!("Received SIGTERM, terminating daemon"),
    }

    daemon.shutdown();
    daemon.join().await?;
    info!("SFP monitor stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::LevelFilter;

    fn level(env: env_logger::Env, verbose: bool, quiet: bool) -> LevelFilter {
        logger_builder(env, verbose, quiet).build().filter()
    }

    #[test]
    fn test_log_level_selection() {
        // A variable nobody sets gives the default
        let unset = || env_logger::Env::new().filter("SFP_MONITOR_UNSET_LOG");
        assert_eq!(level(unset(), false, false), LevelFilter::Info);
        assert_eq!(level(unset(), true, false), LevelFilter::Debug);
        assert_eq!(level(unset(), false, true), LevelFilter::Off);

        std::env::set_var("SFP_MONITOR_TEST_LOG", "warn");
        let set = || env_logger::Env::new().filter("SFP_MONITOR_TEST_LOG");
        assert_eq!(level(set(), false, false), LevelFilter::Warn);
        assert_eq!(level(set(), true, false), LevelFilter::Debug);
        assert_eq!(level(set(), false, true), LevelFilter::Off);
    }
}
