// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Mock bus driver
//!
//! This module provides an in-memory transceiver that can be plugged,
//! unplugged, rewritten and made to fail on demand through a
//! [`MockModuleHandle`]. The handle is cheap to clone and shares its state
//! with the driver, so a test keeps one copy while the poll loop owns the
//! driver.
//!
//! ```
//! use sfp_monitor::bus::{sample_dynamic_page, sample_static_page, MockBusDriver};
//!
//! let driver = MockBusDriver::new(0x50, 0x51);
//! let module = driver.handle();
//! module.insert(&sample_static_page(), &sample_dynamic_page());
//! module.fail_next_reads(0x51, 2);
//! assert!(module.is_present());
//! ```

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;

use super::{BusDriver, BusError};
use crate::decoder::{cc_base_checksum, DYNAMIC_PAGE_OFFSET, STATIC_PAGE_LEN};

const MEMORY_SIZE: usize = 256;

#[derive(Debug)]
struct MockModule {
    static_address: u8,
    dynamic_address: u8,
    present: bool,
    memory: HashMap<u8, [u8; MEMORY_SIZE]>,
    pending_failures: HashMap<u8, u32>,
    reads: HashMap<u8, u32>,
    temperature_drift: bool,
}

/// Shared control handle over a simulated transceiver
#[derive(Debug, Clone)]
pub struct MockModuleHandle {
    inner: Arc<Mutex<MockModule>>,
}

impl MockModuleHandle {
    /// Empty slot answering on the given page addresses once a module is inserted
    pub fn new(static_address: u8, dynamic_address: u8) -> Self {
        let mut memory = HashMap::new();
        memory.insert(static_address, [0u8; MEMORY_SIZE]);
        memory.insert(dynamic_address, [0u8; MEMORY_SIZE]);
        Self {
            inner: Arc::new(Mutex::new(MockModule {
                static_address,
                dynamic_address,
                present: false,
                memory,
                pending_failures: HashMap::new(),
                reads: HashMap::new(),
                temperature_drift: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockModule> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Plug a module holding `static_page` at A0h offset 0 and
    /// `dynamic_window` at A2h offset 96
    pub fn insert(&self, static_page: &[u8], dynamic_window: &[u8]) {
        let mut module = self.lock();
        let (static_address, dynamic_address) = (module.static_address, module.dynamic_address);
        write_into(&mut module, static_address, 0, static_page);
        write_into(
            &mut module,
            dynamic_address,
            usize::from(DYNAMIC_PAGE_OFFSET),
            dynamic_window,
        );
        module.present = true;
        debug!("Mock module inserted");
    }

    /// Unplug the module, its memory is wiped
    pub fn remove(&self) {
        let mut module = self.lock();
        module.present = false;
        for page in module.memory.values_mut() {
            page.fill(0);
        }
        debug!("Mock module removed");
    }

    pub fn is_present(&self) -> bool {
        self.lock().present
    }

    /// Overwrite bytes of the page at `address` starting at `offset`
    pub fn write_memory(&self, address: u8, offset: usize, bytes: &[u8]) {
        let mut module = self.lock();
        write_into(&mut module, address, offset, bytes);
    }

    /// Replace the diagnostic window read from A2h offset 96
    pub fn set_dynamic_window(&self, window: &[u8]) {
        let mut module = self.lock();
        let address = module.dynamic_address;
        write_into(&mut module, address, usize::from(DYNAMIC_PAGE_OFFSET), window);
    }

    /// Make the next `count` block reads at `address` fail
    pub fn fail_next_reads(&self, address: u8, count: u32) {
        self.lock().pending_failures.insert(address, count);
    }

    /// Number of block reads attempted at `address`
    pub fn read_count(&self, address: u8) -> u32 {
        self.lock().reads.get(&address).copied().unwrap_or(0)
    }

    /// Let the temperature wander a little on every diagnostic read
    pub fn enable_temperature_drift(&self) {
        self.lock().temperature_drift = true;
    }
}

fn write_into(module: &mut MockModule, address: u8, offset: usize, bytes: &[u8]) {
    let page = module.memory.entry(address).or_insert([0u8; MEMORY_SIZE]);
    let end = (offset + bytes.len()).min(MEMORY_SIZE);
    if offset < end {
        page[offset..end].copy_from_slice(&bytes[..end - offset]);
    }
}

/// Mock driver backed by a [`MockModuleHandle`]
pub struct MockBusDriver {
    module: MockModuleHandle,
}

impl MockBusDriver {
    /// Driver over an empty slot
    pub fn new(static_address: u8, dynamic_address: u8) -> Self {
        Self {
            module: MockModuleHandle::new(static_address, dynamic_address),
        }
    }

    /// Driver over an existing handle
    pub fn with_module(module: MockModuleHandle) -> Self {
        Self { module }
    }

    /// Driver with a plugged 10GBASE-SR module whose temperature drifts
    pub fn with_sample_module(static_address: u8, dynamic_address: u8) -> Self {
        let driver = Self::new(static_address, dynamic_address);
        driver
            .module
            .insert(&sample_static_page(), &sample_dynamic_page());
        driver.module.enable_temperature_drift();
        driver
    }

    pub fn handle(&self) -> MockModuleHandle {
        self.module.clone()
    }
}

#[async_trait::async_trait]
impl BusDriver for MockBusDriver {
    async fn read_block(
        &mut self,
        address: u8,
        offset: u8,
        length: usize,
    ) -> Result<Vec<u8>, BusError> {
        let mut module = self.module.lock();
        *module.reads.entry(address).or_insert(0) += 1;

        if !module.present || !module.memory.contains_key(&address) {
            return Err(BusError::NoDevice { address });
        }

        if let Some(remaining) = module.pending_failures.get_mut(&address) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(BusError::Read {
                    address,
                    source: io::Error::new(io::ErrorKind::TimedOut, "simulated bus timeout"),
                });
            }
        }

        if module.temperature_drift && address == module.dynamic_address {
            let step = module.reads.get(&address).copied().unwrap_or(0) % 16;
            // 35.0 °C plus up to 1.875 °C in 1/8 °C steps
            let raw = (35u16 << 8) + (step as u16) * 32;
            let at = usize::from(DYNAMIC_PAGE_OFFSET);
            if let Some(page) = module.memory.get_mut(&address) {
                page[at..at + 2].copy_from_slice(&raw.to_be_bytes());
            }
        }

        let start = usize::from(offset);
        let end = start + length;
        if end > MEMORY_SIZE {
            return Err(BusError::ShortRead {
                address,
                expected: length,
                actual: MEMORY_SIZE - start,
            });
        }
        match module.memory.get(&address) {
            Some(page) => Ok(page[start..end].to_vec()),
            None => Err(BusError::NoDevice { address }),
        }
    }

    async fn detect(&mut self, address: u8) -> bool {
        let module = self.module.lock();
        module.present && module.memory.contains_key(&address)
    }
}

/// Identity page of a plausible 850 nm 10GBASE-SR module with a valid checksum
pub fn sample_static_page() -> [u8; STATIC_PAGE_LEN] {
    let mut page = [0u8; STATIC_PAGE_LEN];
    page[0] = 0x03; // SFP/SFP+
    page[1] = 0x04;
    page[2] = 0x07; // LC
    page[3] = 0x10; // 10GBASE-SR
    page[11] = 0x06; // 64B/66B
    page[12] = 0x67; // 10.3 GBd
    page[16] = 8; // OM2 80 m
    page[17] = 3; // OM1 30 m
    page[18] = 40; // OM4 400 m
    page[19] = 30; // OM3 300 m
    page[20..36].copy_from_slice(b"SCTG            ");
    page[37..40].copy_from_slice(&[0x00, 0x90, 0x65]);
    page[40..56].copy_from_slice(b"SFP-10G-SR-MOCK ");
    page[56..60].copy_from_slice(b"A1  ");
    page[60..62].copy_from_slice(&850u16.to_be_bytes());
    page[63] = cc_base_checksum(&page);
    page
}

/// Diagnostic window of a healthy module, starting at A2h byte 96
pub fn sample_dynamic_page() -> [u8; 24] {
    let mut window = [0u8; 24];
    window[0..2].copy_from_slice(&0x2380u16.to_be_bytes()); // 35.5 °C
    window[2..4].copy_from_slice(&33000u16.to_be_bytes()); // 3.3 V
    window[4..6].copy_from_slice(&3000u16.to_be_bytes()); // 6 mA
    window[6..8].copy_from_slice(&5000u16.to_be_bytes()); // 0.5 mW
    window[8..10].copy_from_slice(&4000u16.to_be_bytes()); // 0.4 mW
    window
}
