// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use sfp_monitor::state::fsm::{transition, Transition};
use sfp_monitor::state::{DeviceState, StateStore};

const ALL: [Transition; 6] = [
    Transition::InitToAbsent,
    Transition::AbsentToPresent,
    Transition::PresentToAbsent,
    Transition::PresentToError,
    Transition::ErrorToPresent,
    Transition::ErrorToAbsent,
];

#[test]
fn test_only_init_to_absent_leaves_init() {
    for t in ALL.iter().skip(1) {
        let store = StateStore::new();
        assert!(!transition(&store, *t));
        assert_eq!(store.state(), DeviceState::Init);
    }
    let store = StateStore::new();
    assert!(transition(&store, Transition::InitToAbsent));
    assert_eq!(store.state(), DeviceState::Absent);
    assert_eq!(store.snapshot().generation_id, 0);
}

#[test]
fn test_generation_counts_insertions() {
    let store = StateStore::new();
    let mut insertions = 0u64;
    let mut previous_generation = 0u64;
    // Deterministic walk over every transition request, legal or not
    let mut state = 17u32;

    for _ in 0..2000 {
        state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        let t = ALL[((state >> 16) as usize) % ALL.len()];
        let before = store.state();
        let accepted = transition(&store, t);

        assert_eq!(accepted, before == t.from_state(), "{:?} from {}", t, before);
        if accepted {
            assert_eq!(store.state(), t.to_state());
            if t == Transition::AbsentToPresent {
                insertions += 1;
            }
        } else {
            assert_eq!(store.state(), before);
        }

        let record = store.snapshot();
        assert_eq!(record.generation_id, insertions);
        assert!(record.generation_id >= previous_generation);
        previous_generation = record.generation_id;

        if record.state == DeviceState::Absent {
            assert!(!record.static_valid);
            assert!(!record.dynamic_valid);
            assert_eq!(record.fingerprint, 0);
        }
    }
    assert!(insertions > 0);
}

#[test]
fn test_first_detected_tracks_latest_insertion() {
    let store = StateStore::new();
    transition(&store, Transition::InitToAbsent);
    assert!(store.snapshot().first_detected.is_none());

    transition(&store, Transition::AbsentToPresent);
    let first = store.snapshot().first_detected;
    assert!(first.is_some());

    // Errors and recoveries do not touch it
    transition(&store, Transition::PresentToError);
    transition(&store, Transition::ErrorToPresent);
    assert_eq!(store.snapshot().first_detected, first);

    transition(&store, Transition::PresentToAbsent);
    transition(&store, Transition::AbsentToPresent);
    let second = store.snapshot().first_detected;
    assert!(second >= first);
    assert_eq!(store.snapshot().generation_id, 2);
}
