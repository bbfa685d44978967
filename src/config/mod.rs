// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the SFP monitor
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings for the daemon. The configuration is backed by a
//! YAML file and validated against a JSON schema for robustness.
//!
//! ## Configuration Structure
//!
//! The configuration is organized as a nested structure with sections:
//! - `bus`: Bus driver, device path and module addresses
//! - `socket`: Query socket path, permissions and connection cap
//! - `polling`: Poll intervals and error thresholds
//! - `daemon`: Process settings
//!
//! Every section is optional. A missing configuration file is not an error:
//! a file holding the defaults is written and the defaults apply.
//!
//! ## Usage
//!
//! ```no_run
//! use sfp_monitor::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some("/dev/i2c-0".to_string()), // Bus device
//!     None,                           // Socket path
//!     false,                          // Mock bus
//!     true,                           // Foreground
//! );
//!
//! println!("Socket: {}", config.socket.path.display());
//! ```

pub mod bus;
pub mod daemon;
pub mod polling;
pub mod socket;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

// Re-export all types for public API
pub use bus::{BusConfig, BusType};
pub use daemon::DaemonConfig;
pub use polling::PollingConfig;
pub use socket::SocketConfig;
pub use utils::output_config_schema;

/// Root configuration structure of the daemon.
///
/// # Default Values
///
/// Each section uses default values when not explicitly specified in the
/// configuration file, so an empty file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Bus access settings.
    #[serde(default)]
    pub bus: BusConfig,

    /// Local query socket settings.
    #[serde(default)]
    pub socket: SocketConfig,

    /// Poll loop cadence and thresholds.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Process settings.
    #[serde(default)]
    pub daemon: DaemonConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Original path: {:?}, Sample path: {:?}", path, sample_path);

        // Create parent directories if they don't exist
        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        // An empty document holds no section at all
        if contents.trim().is_empty() {
            debug!("Configuration file {:?} is empty, using defaults", path);
            return Ok(Self::default());
        }

        // First step: convert YAML to a generic Value
        let yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;

        // Convert to JSON Value for validation
        let json_value = serde_json::to_value(&yaml_value).with_context(|| {
            format!("Failed to convert YAML to JSON for validation: {:?}", path)
        })?;

        let schema = utils::config_schema()?;
        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)
            .context("Failed to build the configuration schema validator")?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config = match serde_yml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        if let Err(err) = utils::validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only values explicitly provided on the command line override the
    /// configuration.
    ///
    /// # Parameters
    ///
    /// * `device` - Bus device path
    /// * `socket_path` - Query socket path
    /// * `mock` - Use the simulated bus instead of the hardware one
    /// * `foreground` - Stay attached to the terminal
    pub fn apply_args(
        &mut self,
        device: Option<String>,
        socket_path: Option<PathBuf>,
        mock: bool,
        foreground: bool,
    ) {
        if let Some(device) = device {
            debug!("Overriding bus device from command line: {}", device);
            self.bus.device = device;
        }

        if let Some(path) = socket_path {
            debug!("Overriding socket path from command line: {:?}", path);
            self.socket.path = path;
        }

        if mock {
            debug!("Using the mock bus driver");
            self.bus.bus_type = BusType::Mock;
        }

        if foreground {
            debug!("Running in foreground");
            self.daemon.daemonize = false;
        }
    }

    /// Run the checks the schema cannot express
    pub fn validate(&self) -> Result<()> {
        utils::validate_specific_rules(self)
    }
}
