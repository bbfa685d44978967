// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Shared device state
//!
//! The [`StateStore`] owns the single [`SharedRecord`] describing the monitored
//! module. The poll loop is the only writer and goes through
//! [`StateStore::mutate`]; socket handlers only ever see a full copy taken by
//! [`StateStore::snapshot`]. Both run under the same lock, so a reader can
//! never observe a record torn between two updates.
//!
//! State transitions live in [`fsm`].

pub mod fsm;

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::decoder::{DynamicInfo, StaticInfo, DYNAMIC_PAGE_LEN, STATIC_PAGE_LEN};

pub use fsm::Transition;

/// Number of static page bytes covered by the fingerprint
pub const FINGERPRINT_LEN: usize = 32;

/// Presence/error state of the monitored module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceState {
    #[default]
    Init,
    Absent,
    Present,
    Error,
}

impl DeviceState {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceState::Init => "INIT",
            DeviceState::Absent => "ABSENT",
            DeviceState::Present => "PRESENT",
            DeviceState::Error => "ERROR",
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything known about the module at a given instant.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedRecord {
    pub state: DeviceState,
    /// Incremented on every ABSENT to PRESENT transition, never reset
    pub generation_id: u64,
    /// djb2 hash of the first static bytes, 0 when no static page is held
    pub fingerprint: u32,
    pub first_detected: Option<DateTime<Utc>>,
    pub last_static_read: Option<DateTime<Utc>>,
    pub last_dynamic_read: Option<DateTime<Utc>>,
    pub static_valid: bool,
    pub static_record: StaticInfo,
    pub dynamic_valid: bool,
    pub dynamic_record: DynamicInfo,
    pub raw_static: [u8; STATIC_PAGE_LEN],
    pub raw_dynamic: [u8; DYNAMIC_PAGE_LEN],
    pub consecutive_bus_errors: u32,
    pub recovery_attempts: u32,
}

impl Default for SharedRecord {
    fn default() -> Self {
        Self {
            state: DeviceState::Init,
            generation_id: 0,
            fingerprint: 0,
            first_detected: None,
            last_static_read: None,
            last_dynamic_read: None,
            static_valid: false,
            static_record: StaticInfo::default(),
            dynamic_valid: false,
            dynamic_record: DynamicInfo::default(),
            raw_static: [0; STATIC_PAGE_LEN],
            raw_dynamic: [0; DYNAMIC_PAGE_LEN],
            consecutive_bus_errors: 0,
            recovery_attempts: 0,
        }
    }
}

impl SharedRecord {
    /// Store a freshly read static page and its decoded form.
    pub fn store_static(&mut self, raw: &[u8], info: StaticInfo, now: DateTime<Utc>) {
        self.raw_static = crate::decoder::fixed_block(raw);
        self.fingerprint = fingerprint(&self.raw_static);
        self.static_record = info;
        self.static_valid = true;
        self.last_static_read = Some(now);
    }

    /// Replace the telemetry wholesale after a successful dynamic read.
    pub fn store_dynamic(&mut self, raw: &[u8], info: DynamicInfo, now: DateTime<Utc>) {
        self.raw_dynamic = crate::decoder::fixed_block(raw);
        self.dynamic_record = info;
        self.dynamic_valid = true;
        self.last_dynamic_read = Some(now);
        self.consecutive_bus_errors = 0;
    }

    /// Forget everything learnt from the module that was plugged in.
    pub(crate) fn clear_module_data(&mut self) {
        self.static_valid = false;
        self.dynamic_valid = false;
        self.static_record = StaticInfo::default();
        self.dynamic_record = DynamicInfo::default();
        self.fingerprint = 0;
        self.raw_static = [0; STATIC_PAGE_LEN];
        self.raw_dynamic = [0; DYNAMIC_PAGE_LEN];
        self.reset_counters();
    }

    pub(crate) fn reset_counters(&mut self) {
        self.consecutive_bus_errors = 0;
        self.recovery_attempts = 0;
    }
}

/// Non-cryptographic djb2 hash of the identity bytes of a static page.
pub fn fingerprint(raw: &[u8]) -> u32 {
    raw.iter()
        .take(FINGERPRINT_LEN)
        .fold(5381u32, |hash, b| {
            hash.wrapping_mul(33).wrapping_add(u32::from(*b))
        })
}

/// Lock-guarded owner of the [`SharedRecord`].
#[derive(Debug)]
pub struct StateStore {
    record: Mutex<SharedRecord>,
    started_at: DateTime<Utc>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            record: Mutex::new(SharedRecord::default()),
            started_at: Utc::now(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SharedRecord> {
        // Poisoning is ignored, the record is always replaced field by field
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Point-in-time copy of the whole record
    pub fn snapshot(&self) -> SharedRecord {
        self.lock().clone()
    }

    /// Run `f` with exclusive access to the record.
    ///
    /// Everything done inside `f` becomes visible to readers at once.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut SharedRecord) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }

    /// Current state tag without copying the record
    pub fn state(&self) -> DeviceState {
        self.lock().state
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Seconds elapsed since the store was created
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fingerprint_djb2() {
        assert_eq!(fingerprint(&[]), 5381);
        assert_eq!(fingerprint(&[0]), 5381 * 33);
        // Only the first 32 bytes contribute
        let mut a = [0u8; 64];
        let b = [0u8; 64];
        a[40] = 0xAA;
        assert_eq!(fingerprint(&a), fingerprint(&b));
        a[3] = 0x01;
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_state_strings() {
        assert_eq!(DeviceState::Init.to_string(), "INIT");
        assert_eq!(DeviceState::Error.as_str(), "ERROR");
        assert_eq!(
            serde_json::to_value(DeviceState::Present).unwrap(),
            serde_json::json!("PRESENT")
        );
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let store = StateStore::new();
        let before = store.snapshot();
        store.mutate(|r| r.generation_id = 7);
        assert_eq!(before.generation_id, 0);
        assert_eq!(store.snapshot().generation_id, 7);
    }

    #[test]
    fn test_concurrent_readers_never_see_torn_records() {
        let store = Arc::new(StateStore::new());
        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for generation in 1..=500u64 {
                    store.mutate(|r| {
                        r.generation_id = generation;
                        r.static_record.rate_identifier = (generation % 251) as u8;
                        r.static_valid = true;
                    });
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..500 {
                        let snap = store.snapshot();
                        if snap.static_valid {
                            assert_eq!(
                                u64::from(snap.static_record.rate_identifier),
                                snap.generation_id % 251
                            );
                        }
                    }
                })
            })
            .collect();
        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
