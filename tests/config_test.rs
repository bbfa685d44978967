// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use sfp_monitor::config::{self, BusType, Config};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::tempdir;

static INIT: Once = Once::new();

// Setup logger for tests
fn setup() {
    INIT.call_once(|| {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    });
}

/// Write `yaml`, expect loading to fail and a loadable sample to appear
fn assert_rejected_with_sample(yaml: &str) -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, yaml)?;

    let result = Config::from_file(&config_path);
    assert!(result.is_err(), "Config loading should have failed for:\n{}", yaml);

    let sample_path = config_path.with_extension("sample.yaml");
    assert!(
        Path::new(&sample_path).exists(),
        "Sample config file was not created"
    );
    let sample_config = Config::from_file(&sample_path)?;
    assert_eq!(sample_config, Config::default());
    Ok(())
}

#[test]
fn test_config_load_and_save() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    let mut config = Config::default();
    config.bus.device = "/dev/i2c-3".to_string();
    config.bus.bus_type = BusType::Mock;
    config.socket.path = PathBuf::from("/tmp/sfp-test/sfp.sock");
    config.socket.max_connections = 4;
    config.polling.present_interval_ms = 1000;
    config.daemon.daemonize = false;

    config.save_to_file(&config_path)?;
    let loaded_config = Config::from_file(&config_path)?;
    assert_eq!(loaded_config, config);

    // Missing file: defaults are written and returned
    let non_existent_path = temp_dir.path().join("non_existent.yaml");
    let default_config = Config::from_file(&non_existent_path)?;
    assert!(non_existent_path.exists());
    assert_eq!(default_config, Config::default());
    assert_eq!(default_config.bus.device, "/dev/i2c-1");
    assert_eq!(default_config.bus.static_address, 0x50);
    assert_eq!(default_config.bus.dynamic_address, 0x51);
    assert_eq!(
        default_config.socket.path,
        PathBuf::from("/run/sfp-daemon/sfp.sock")
    );
    assert_eq!(default_config.socket.permissions, 0o660);
    assert_eq!(default_config.polling.absent_interval_ms, 500);
    assert_eq!(default_config.polling.present_interval_ms, 2000);
    assert_eq!(default_config.polling.error_interval_ms, 5000);
    assert_eq!(default_config.polling.max_bus_errors, 3);
    assert_eq!(default_config.polling.max_recovery_attempts, 10);
    assert!(default_config.daemon.daemonize);

    Ok(())
}

#[test]
fn test_partial_and_empty_files_use_defaults() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;

    let empty_path = temp_dir.path().join("empty.yaml");
    fs::write(&empty_path, "")?;
    assert_eq!(Config::from_file(&empty_path)?, Config::default());

    let partial_path = temp_dir.path().join("partial.yaml");
    fs::write(
        &partial_path,
        r#"
bus:
  type: mock
polling:
  max_bus_errors: 5
"#,
    )?;
    let config = Config::from_file(&partial_path)?;
    assert_eq!(config.bus.bus_type, BusType::Mock);
    assert_eq!(config.bus.device, "/dev/i2c-1");
    assert_eq!(config.polling.max_bus_errors, 5);
    assert_eq!(config.polling.present_interval_ms, 2000);
    assert_eq!(config.socket, Config::default().socket);

    Ok(())
}

#[test]
fn test_apply_args() {
    let mut config = Config::default();

    // Nothing given, nothing changed
    config.apply_args(None, None, false, false);
    assert_eq!(config, Config::default());

    config.apply_args(
        Some("/dev/i2c-7".to_string()),
        Some(PathBuf::from("/tmp/other.sock")),
        true,
        true,
    );
    assert_eq!(config.bus.device, "/dev/i2c-7");
    assert_eq!(config.socket.path, PathBuf::from("/tmp/other.sock"));
    assert_eq!(config.bus.bus_type, BusType::Mock);
    assert!(!config.daemon.daemonize);
    assert!(config.validate().is_ok());

    config.apply_args(None, Some(PathBuf::from("relative.sock")), false, false);
    assert!(config.validate().is_err());
}

#[test]
fn test_schema_rejections_create_sample_file() -> Result<()> {
    // Unknown section
    assert_rejected_with_sample("logging:\n  level: debug\n")?;
    // Zero interval
    assert_rejected_with_sample("polling:\n  present_interval_ms: 0\n")?;
    // Unknown driver
    assert_rejected_with_sample("bus:\n  type: spi\n")?;
    // Address outside the 7-bit range
    assert_rejected_with_sample("bus:\n  static_address: 200\n")?;
    // Type mismatch
    assert_rejected_with_sample("socket:\n  max_connections: \"many\"\n")?;
    Ok(())
}

#[test]
fn test_specific_rules_create_sample_file() -> Result<()> {
    // Both pages on one address
    assert_rejected_with_sample("bus:\n  static_address: 80\n  dynamic_address: 80\n")?;
    // Socket path must be absolute
    assert_rejected_with_sample("socket:\n  path: sfp.sock\n")?;
    Ok(())
}

#[test]
fn test_config_schema_output() -> Result<()> {
    // Output goes to stdout, only check that it does not fail
    config::output_config_schema()?;

    let schema = config::utils::config_schema()?;
    for section in ["bus", "socket", "polling", "daemon"] {
        assert!(
            schema["properties"][section].is_object(),
            "schema lacks {}",
            section
        );
    }
    Ok(())
}
