// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Presence/error state machine
//!
//! ```text
//!            INIT
//!              |
//!              v
//!   +-----> ABSENT <------------+
//!   |          |                |
//!   |          v                |
//!   +----- PRESENT <-----+      |
//!              |         |      |
//!              v         |      |
//!            ERROR ------+------+
//! ```
//!
//! A transition requested from the wrong state is rejected: [`apply`] returns
//! `false` and the record is left untouched. Callers probe transitions and
//! ignore rejections.

use chrono::{DateTime, Utc};
use log::{debug, info};

use super::{DeviceState, SharedRecord, StateStore};

/// Legal transitions of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// First iteration, always taken even when a module is already plugged
    InitToAbsent,
    /// Module detected
    AbsentToPresent,
    /// Module removed, or static page unreadable right after detection
    PresentToAbsent,
    /// Too many consecutive dynamic read failures
    PresentToError,
    /// Dynamic read succeeded while recovering
    ErrorToPresent,
    /// Recovery exhausted and module gone
    ErrorToAbsent,
}

impl Transition {
    pub fn from_state(self) -> DeviceState {
        match self {
            Transition::InitToAbsent => DeviceState::Init,
            Transition::AbsentToPresent => DeviceState::Absent,
            Transition::PresentToAbsent | Transition::PresentToError => DeviceState::Present,
            Transition::ErrorToPresent | Transition::ErrorToAbsent => DeviceState::Error,
        }
    }

    pub fn to_state(self) -> DeviceState {
        match self {
            Transition::InitToAbsent
            | Transition::PresentToAbsent
            | Transition::ErrorToAbsent => DeviceState::Absent,
            Transition::AbsentToPresent | Transition::ErrorToPresent => DeviceState::Present,
            Transition::PresentToError => DeviceState::Error,
        }
    }
}

/// Apply `transition` to a record the caller already holds exclusively.
///
/// Returns `false` without touching the record when the current state is not
/// the transition's source state.
pub fn apply(record: &mut SharedRecord, transition: Transition, now: DateTime<Utc>) -> bool {
    if record.state != transition.from_state() {
        debug!(
            "Rejected transition {:?} from state {}",
            transition, record.state
        );
        return false;
    }

    match transition {
        Transition::InitToAbsent => {}
        Transition::AbsentToPresent => {
            record.generation_id += 1;
            record.first_detected = Some(now);
            record.reset_counters();
        }
        Transition::PresentToAbsent | Transition::ErrorToAbsent => {
            record.clear_module_data();
        }
        Transition::PresentToError => {
            record.recovery_attempts = 0;
        }
        Transition::ErrorToPresent => {
            record.reset_counters();
        }
    }

    record.state = transition.to_state();
    info!(
        "SFP state {} -> {} (generation {})",
        transition.from_state(),
        record.state,
        record.generation_id
    );
    true
}

/// Lock the store and apply `transition`.
pub fn transition(store: &StateStore, t: Transition) -> bool {
    store.mutate(|record| apply(record, t, Utc::now()))
}
