// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Decoder tests over complete pages

use approx::assert_relative_eq;
use sfp_monitor::bus::{sample_dynamic_page, sample_static_page};
use sfp_monitor::decoder::{
    cc_base_checksum, decode_dynamic, decode_static, LengthStatus, LinkLength, MediaVariant,
    Quantity, StaticInfo, POWER_FLOOR_DBM,
};

/// Deterministic byte soup for totality checks
fn pseudo_random_bytes(seed: u32, len: usize) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (state >> 16) as u8
        })
        .collect()
}

#[test]
fn test_sample_module_identity() {
    let info = decode_static(&sample_static_page());

    assert_eq!(info.identifier, 0x03);
    assert_eq!(info.identifier_type, "SFP/SFP+");
    assert!(info.ext_identifier_valid);
    assert_eq!(info.connector_type, "LC");
    assert_eq!(info.encoding_type, "64B/66B");
    assert_eq!(info.compliance.flag("eth_10g_base_sr"), Some(true));
    assert_eq!(info.compliance.flag("eth_10g_base_lr"), Some(false));
    assert_eq!(info.compliance.flag("no_such_flag"), None);
    assert_eq!(
        info.compliance.active_flags().collect::<Vec<_>>(),
        vec!["eth_10g_base_sr"]
    );

    assert_eq!(info.nominal_rate_mbd.length, 10300);
    assert_eq!(info.smf_length_km.status, LengthStatus::NotSupported);
    assert_eq!(info.om2_length_m.length, 80);
    assert_eq!(info.om1_length_m.length, 30);
    assert_eq!(info.om4_or_copper_length_m.length, 400);
    assert_eq!(info.om3_length_m.length, 300);

    assert_eq!(info.vendor_name, "SCTG");
    assert_eq!(info.vendor_pn, "SFP-10G-SR-MOCK");
    assert_eq!(info.vendor_rev, "A1");
    assert!(info.vendor_name_valid && info.vendor_pn_valid && info.vendor_rev_valid);
    assert_eq!(info.vendor_oui_u32, 0x009065);
    assert!(info.vendor_oui_valid);

    assert_eq!(info.variant, MediaVariant::Optical);
    assert_eq!(info.wavelength_nm, Some(850));
    assert_eq!(info.cable_compliance, None);
    assert!(info.cc_base_valid);
}

#[test]
fn test_any_single_bit_flip_breaks_the_checksum() {
    let page = sample_static_page();
    assert_eq!(cc_base_checksum(&page), page[63]);

    for byte in 0..64 {
        for bit in 0..8 {
            let mut corrupted = page;
            corrupted[byte] ^= 1 << bit;
            let info = decode_static(&corrupted);
            assert!(
                !info.cc_base_valid,
                "flip of bit {} in byte {} went unnoticed",
                bit,
                byte
            );
        }
    }
}

#[test]
fn test_checksum_mismatch_still_decodes() {
    let mut page = sample_static_page();
    page[63] = page[63].wrapping_add(1);
    let info = decode_static(&page);
    assert!(!info.cc_base_valid);
    assert_eq!(info.cc_base, page[63]);
    assert_eq!(info.cc_base_computed, page[63].wrapping_sub(1));
    assert_eq!(info.vendor_pn, "SFP-10G-SR-MOCK");
}

#[test]
fn test_copper_cable_reinterprets_medium_bytes() {
    let mut page = sample_static_page();
    page[3] = 0;
    page[8] = 0x04; // SFP+ passive cable
    page[18] = 3;
    page[60] = 0x01;
    page[63] = cc_base_checksum(&page);

    let info = decode_static(&page);
    assert_eq!(info.variant, MediaVariant::PassiveCable);
    assert_eq!(info.om4_or_copper_length_m.length, 3);
    assert_eq!(info.om4_or_copper_length_m.status, LengthStatus::Valid);
    assert_eq!(info.wavelength_nm, None);
    assert_eq!(info.cable_compliance, Some(0x01));

    page[8] = 0x08; // active cable
    assert_eq!(decode_static(&page).variant, MediaVariant::ActiveCable);
}

#[test]
fn test_length_sentinels() {
    let mut page = sample_static_page();
    page[14] = 0xFF;
    page[16] = 0xFF;
    page[17] = 0x00;
    let info = decode_static(&page);
    assert_eq!(info.smf_length_km.status, LengthStatus::ExtendedRange);
    assert_eq!(info.smf_length_km.length, 254);
    assert_eq!(info.om2_length_m.status, LengthStatus::ExtendedRange);
    assert_eq!(info.om2_length_m.length, 2540);
    assert_eq!(info.om1_length_m.status, LengthStatus::NotSupported);
    assert_eq!(info.om1_length_m.length, 0);
    assert_eq!(
        info.reach_statuses(),
        [
            LengthStatus::ExtendedRange,
            LengthStatus::ExtendedRange,
            LengthStatus::NotSupported,
            LengthStatus::Valid,
        ]
    );
}

#[test]
fn test_length_bytes_on_optical_and_copper_pages() {
    let optical = sample_static_page();
    let mut copper = sample_static_page();
    copper[3] = 0;
    copper[8] = 0x04;
    copper[60] = 0x01;

    // (byte, field, multiplier and 0xFF value on optical, same on copper)
    let fields: [(usize, fn(&StaticInfo) -> LinkLength, (u32, u32), (u32, u32)); 6] = [
        (14, |i| i.smf_length_km, (1, 254), (1, 254)),
        (15, |i| i.smf_length_m, (100, 25400), (100, 25400)),
        (16, |i| i.om2_length_m, (10, 2540), (10, 2540)),
        (17, |i| i.om1_length_m, (10, 2540), (10, 2540)),
        (18, |i| i.om4_or_copper_length_m, (10, 2540), (1, 254)),
        (19, |i| i.om3_length_m, (10, 2540), (10, 2540)),
    ];

    for (base, copper_page) in [(optical, false), (copper, true)] {
        for (byte, field, optical_unit, copper_unit) in fields {
            let (multiplier, extended) = if copper_page { copper_unit } else { optical_unit };
            let cases = [
                (0x00u8, LengthStatus::NotSupported, 0),
                (0xFF, LengthStatus::ExtendedRange, extended),
                (0x2A, LengthStatus::Valid, 42 * multiplier),
            ];
            for (raw, status, length) in cases {
                let mut page = base;
                page[byte] = raw;
                page[63] = cc_base_checksum(&page);
                let info = decode_static(&page);
                assert_eq!(info.variant.is_copper(), copper_page);
                let decoded = field(&info);
                assert_eq!(
                    (decoded.status, decoded.length),
                    (status, length),
                    "byte {} = {:#04x} on {} page",
                    byte,
                    raw,
                    if copper_page { "copper" } else { "optical" }
                );
            }
        }
    }
}

#[test]
fn test_sample_telemetry() {
    let info = decode_dynamic(&sample_dynamic_page());

    assert!(info.temperature_valid);
    assert_relative_eq!(info.temperature_c, 35.5);
    assert!(info.voltage_valid);
    assert_relative_eq!(info.voltage_v, 3.3, epsilon = 1e-9);
    assert_relative_eq!(info.tx_bias_ma, 6.0, epsilon = 1e-9);
    assert_relative_eq!(info.tx_power_mw, 0.5, epsilon = 1e-9);
    assert_relative_eq!(info.tx_power_dbm, -3.0103, epsilon = 1e-4);
    assert_relative_eq!(info.rx_power_mw, 0.4, epsilon = 1e-9);
    assert_relative_eq!(info.rx_power_dbm, -3.9794, epsilon = 1e-4);
    assert!(info.status.data_ready);
    assert!(!info.status.rx_los);
    assert!(!info.status.tx_fault);
    assert!(!info.alarms.any());
    assert!(!info.warnings.any());
}

#[test]
fn test_telemetry_sentinels_and_flags() {
    let mut window = sample_dynamic_page();
    window[2..4].copy_from_slice(&[0xFF, 0xFF]); // VCC unreadable
    window[8..10].copy_from_slice(&[0x00, 0x00]); // no RX light
    window[14] = 0b0000_0111; // not ready, LOS, TX fault
    window[16] = 0b1000_0000; // temperature high alarm
    window[17] = 0b0100_0000; // RX power low alarm
    window[20] = 0b0000_0001; // TX power low warning

    let info = decode_dynamic(&window);
    assert!(!info.voltage_valid);
    assert!(!info.rx_power_valid);
    assert_relative_eq!(info.rx_power_dbm, POWER_FLOOR_DBM);
    assert!(!info.status.data_ready);
    assert!(info.status.rx_los);
    assert!(info.status.tx_fault);

    assert!(info.alarms.get(Quantity::Temperature).high);
    assert!(!info.alarms.get(Quantity::Temperature).low);
    assert!(info.alarms.get(Quantity::RxPower).low);
    assert!(!info.alarms.get(Quantity::Vcc).high);
    assert!(info.warnings.get(Quantity::TxPower).low);
    assert!(!info.warnings.get(Quantity::Temperature).high);
}

#[test]
fn test_decoding_is_total() {
    for seed in 0..200u32 {
        let len = (seed as usize * 7) % 100;
        let bytes = pseudo_random_bytes(seed, len);

        let info = decode_static(&bytes);
        assert_eq!(info.wavelength_nm.is_some(), info.variant == MediaVariant::Optical);
        assert_eq!(info.cable_compliance.is_some(), info.variant.is_copper());
        assert!(info.vendor_name.len() <= 16);

        let telemetry = decode_dynamic(&bytes);
        assert!(telemetry.tx_power_dbm >= POWER_FLOOR_DBM);
        assert!(telemetry.rx_power_dbm >= POWER_FLOOR_DBM);
        assert!(telemetry.temperature_c >= -128.0 && telemetry.temperature_c < 128.0);
    }
}
