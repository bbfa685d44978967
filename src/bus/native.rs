// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Native Linux I2C driver
//!
//! This module talks to the transceiver through a `/dev/i2c-*` character
//! device. Each block read selects the target address with the `I2C_SLAVE`
//! ioctl, writes the one-byte offset, then reads the block. The kernel
//! adapter enforces the transaction timeout.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;

use log::debug;

use super::{BusDriver, BusError};

/// `I2C_SLAVE` request from linux/i2c-dev.h
const I2C_SLAVE: libc::c_ulong = 0x0703;

/// Driver for a Linux I2C character device
pub struct NativeBusDriver {
    device_path: String,
    file: File,
    selected: Option<u8>,
}

impl NativeBusDriver {
    /// Open the bus device, e.g. `/dev/i2c-1`
    pub fn open(device_path: &str) -> Result<Self, BusError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(device_path)
            .map_err(|source| BusError::Open {
                path: device_path.to_string(),
                source,
            })?;
        debug!("Opened I2C device {}", device_path);
        Ok(Self {
            device_path: device_path.to_string(),
            file,
            selected: None,
        })
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    fn select(&mut self, address: u8) -> Result<(), BusError> {
        if self.selected == Some(address) {
            return Ok(());
        }
        // SAFETY: the descriptor is owned by `self.file` and I2C_SLAVE takes
        // the address as an integer argument
        let rc = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                I2C_SLAVE as _,
                libc::c_ulong::from(address),
            )
        };
        if rc < 0 {
            self.selected = None;
            return Err(BusError::SelectAddress {
                address,
                source: io::Error::last_os_error(),
            });
        }
        self.selected = Some(address);
        Ok(())
    }

    fn transfer(&mut self, address: u8, offset: u8, length: usize) -> Result<Vec<u8>, BusError> {
        self.select(address)?;

        let written = self
            .file
            .write(&[offset])
            .map_err(|source| BusError::Write { address, source })?;
        if written != 1 {
            return Err(BusError::Write {
                address,
                source: io::Error::new(io::ErrorKind::WriteZero, "offset byte not written"),
            });
        }

        let mut buffer = vec![0u8; length];
        let read = self
            .file
            .read(&mut buffer)
            .map_err(|source| BusError::Read { address, source })?;
        if read != length {
            return Err(BusError::ShortRead {
                address,
                expected: length,
                actual: read,
            });
        }
        Ok(buffer)
    }
}

#[async_trait::async_trait]
impl BusDriver for NativeBusDriver {
    async fn read_block(
        &mut self,
        address: u8,
        offset: u8,
        length: usize,
    ) -> Result<Vec<u8>, BusError> {
        self.transfer(address, offset, length)
    }

    async fn detect(&mut self, address: u8) -> bool {
        match self.transfer(address, 0, 1) {
            Ok(_) => true,
            Err(e) => {
                debug!("No answer at 0x{:02X} on {}: {}", address, self.device_path, e);
                false
            }
        }
    }
}
