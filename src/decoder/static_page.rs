// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! A0h base ID page decoding
//!
//! The static page describes the module once per insertion. Field offsets
//! follow SFF-8472 table 4-1:
//!
//! | Bytes | Field |
//! |-------|-------|
//! | 0 | Identifier |
//! | 1 | Extended identifier |
//! | 2 | Connector |
//! | 3-10 | Compliance codes |
//! | 11 | Encoding |
//! | 12 | Nominal signalling rate (100 MBd units) |
//! | 13 | Rate identifier |
//! | 14-19 | Link lengths |
//! | 20-35 | Vendor name |
//! | 36 | Extended compliance code |
//! | 37-39 | Vendor OUI |
//! | 40-55 | Vendor part number |
//! | 56-59 | Vendor revision |
//! | 60-61 | Wavelength or cable compliance |
//! | 62 | Fibre Channel speed 2 |
//! | 63 | CC_BASE checksum |

use serde::Serialize;

use super::compliance::ComplianceCodes;
use super::{fixed_block, LengthStatus, LengthUnit, LinkLength};

/// I2C offset of the static block
pub const STATIC_PAGE_OFFSET: u8 = 0;
/// Size of the base ID block covered by CC_BASE
pub const STATIC_PAGE_LEN: usize = 64;

const CC_BASE_OFFSET: usize = 63;
const EXT_IDENTIFIER_SFP: u8 = 0x04;

/// Physical medium family, derived from the SFP+ cable technology bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaVariant {
    #[default]
    Optical,
    PassiveCable,
    ActiveCable,
}

impl MediaVariant {
    pub fn from_compliance(codes: &ComplianceCodes) -> Self {
        if codes.passive_cable() {
            MediaVariant::PassiveCable
        } else if codes.active_cable() {
            MediaVariant::ActiveCable
        } else {
            MediaVariant::Optical
        }
    }

    pub fn is_copper(self) -> bool {
        self != MediaVariant::Optical
    }
}

/// Decoded A0h base ID block.
///
/// Created once per insertion and left untouched until the module is
/// removed or replaced.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StaticInfo {
    pub identifier: u8,
    pub identifier_type: &'static str,
    pub ext_identifier: u8,
    pub ext_identifier_valid: bool,
    pub connector: u8,
    pub connector_type: &'static str,
    pub compliance: ComplianceCodes,
    pub encoding: u8,
    pub encoding_type: &'static str,
    pub nominal_rate_mbd: LinkLength,
    pub rate_identifier: u8,
    pub smf_length_km: LinkLength,
    pub smf_length_m: LinkLength,
    pub om2_length_m: LinkLength,
    pub om1_length_m: LinkLength,
    /// OM4 reach in metres for optical modules, cable length in metres for copper
    pub om4_or_copper_length_m: LinkLength,
    pub om3_length_m: LinkLength,
    pub vendor_name: String,
    pub vendor_name_valid: bool,
    pub ext_compliance_code: u8,
    pub ext_compliance_desc: &'static str,
    pub vendor_oui: [u8; 3],
    pub vendor_oui_u32: u32,
    pub vendor_oui_valid: bool,
    pub vendor_pn: String,
    pub vendor_pn_valid: bool,
    pub vendor_rev: String,
    pub vendor_rev_valid: bool,
    pub variant: MediaVariant,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wavelength_nm: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cable_compliance: Option<u8>,
    pub fc_speed_2: u8,
    pub fc_speed_2_valid: bool,
    /// Checksum byte stored by the module
    pub cc_base: u8,
    /// Checksum computed over bytes 0 to 62
    pub cc_base_computed: u8,
    pub cc_base_valid: bool,
}

/// Modulo-256 sum of the bytes covered by CC_BASE.
pub fn cc_base_checksum(page: &[u8]) -> u8 {
    page.iter()
        .take(CC_BASE_OFFSET)
        .fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Decode an A0h base ID block.
///
/// Inputs shorter than [`STATIC_PAGE_LEN`] are zero-filled and extra bytes are
/// ignored, so every byte sequence yields a record.
pub fn decode_static(raw: &[u8]) -> StaticInfo {
    let page: [u8; STATIC_PAGE_LEN] = fixed_block(raw);

    let compliance = ComplianceCodes::from_page(&page);
    // Byte 18 and bytes 60-61 depend on the medium, resolve it first
    let variant = MediaVariant::from_compliance(&compliance);

    let om4_or_copper_length_m = if variant.is_copper() {
        LengthUnit::UNIT.decode(page[18])
    } else {
        LengthUnit::TEN.decode(page[18])
    };

    let (wavelength_nm, cable_compliance) = match variant {
        MediaVariant::Optical => (Some(u16::from_be_bytes([page[60], page[61]])), None),
        _ => (None, Some(page[60])),
    };

    let (vendor_name, vendor_name_valid) = vendor_string(&page[20..36]);
    let (vendor_pn, vendor_pn_valid) = vendor_string(&page[40..56]);
    let (vendor_rev, vendor_rev_valid) = vendor_string(&page[56..60]);

    let vendor_oui = [page[37], page[38], page[39]];
    let vendor_oui_u32 =
        (u32::from(page[37]) << 16) | (u32::from(page[38]) << 8) | u32::from(page[39]);

    let cc_base_computed = cc_base_checksum(&page);

    StaticInfo {
        identifier: page[0],
        identifier_type: identifier_type(page[0]),
        ext_identifier: page[1],
        ext_identifier_valid: page[1] == EXT_IDENTIFIER_SFP,
        connector: page[2],
        connector_type: connector_type(page[2]),
        compliance,
        encoding: page[11],
        encoding_type: encoding_type(page[11]),
        nominal_rate_mbd: LengthUnit::HUNDRED.decode(page[12]),
        rate_identifier: page[13],
        smf_length_km: LengthUnit::UNIT.decode(page[14]),
        smf_length_m: LengthUnit::HUNDRED.decode(page[15]),
        om2_length_m: LengthUnit::TEN.decode(page[16]),
        om1_length_m: LengthUnit::TEN.decode(page[17]),
        om4_or_copper_length_m,
        om3_length_m: LengthUnit::TEN.decode(page[19]),
        vendor_name,
        vendor_name_valid,
        ext_compliance_code: page[36],
        ext_compliance_desc: ext_compliance_desc(page[36]),
        vendor_oui,
        vendor_oui_u32,
        vendor_oui_valid: vendor_oui_u32 != 0,
        vendor_pn,
        vendor_pn_valid,
        vendor_rev,
        vendor_rev_valid,
        variant,
        wavelength_nm,
        cable_compliance,
        fc_speed_2: page[62],
        fc_speed_2_valid: compliance.flag("see_byte_62").unwrap_or(false),
        cc_base: page[CC_BASE_OFFSET],
        cc_base_computed,
        cc_base_valid: cc_base_computed == page[CC_BASE_OFFSET],
    }
}

impl StaticInfo {
    /// Status of the four primary reach fields, in page order
    pub fn reach_statuses(&self) -> [LengthStatus; 4] {
        [
            self.smf_length_km.status,
            self.om2_length_m.status,
            self.om1_length_m.status,
            self.om4_or_copper_length_m.status,
        ]
    }
}

/// Space-padded ASCII field. Non-printable bytes make the field invalid.
fn vendor_string(bytes: &[u8]) -> (String, bool) {
    let printable = bytes.iter().all(|b| (0x20..=0x7E).contains(b));
    let text: String = bytes
        .iter()
        .map(|&b| if (0x20..=0x7E).contains(&b) { b as char } else { ' ' })
        .collect();
    let trimmed = text.trim().to_string();
    let valid = printable && !trimmed.is_empty();
    (trimmed, valid)
}

fn identifier_type(code: u8) -> &'static str {
    match code {
        0x00 => "Unknown or unspecified",
        0x01 => "GBIC",
        0x02 => "Soldered module",
        0x03 => "SFP/SFP+",
        0x0C => "QSFP",
        0x0D => "QSFP+",
        0x11 => "QSFP28",
        _ => "Unknown",
    }
}

fn connector_type(code: u8) -> &'static str {
    match code {
        0x00 => "Unknown or unspecified",
        0x01 => "SC",
        0x02 => "Fibre Channel Style 1 copper",
        0x03 => "Fibre Channel Style 2 copper",
        0x04 => "BNC/TNC",
        0x05 => "Fibre Channel coax headers",
        0x06 => "FiberJack",
        0x07 => "LC",
        0x08 => "MT-RJ",
        0x09 => "MU",
        0x0A => "SG",
        0x0B => "Optical Pigtail",
        0x0C => "MPO 1x12",
        0x0D => "MPO 2x16",
        0x20 => "HSSDC II",
        0x21 => "Copper pigtail",
        0x22 => "RJ45",
        0x23 => "No separable connector",
        _ => "Unknown",
    }
}

fn encoding_type(code: u8) -> &'static str {
    match code {
        0x00 => "Unspecified",
        0x01 => "8B/10B",
        0x02 => "4B/5B",
        0x03 => "NRZ",
        0x04 => "Manchester",
        0x05 => "SONET Scrambled",
        0x06 => "64B/66B",
        0x07 => "256B/257B",
        0x08 => "PAM4",
        _ => "Reserved",
    }
}

/// SFF-8024 extended specification compliance codes
fn ext_compliance_desc(code: u8) -> &'static str {
    match code {
        0x00 => "Unspecified",
        0x01 => "100G AOC or 25GAUI C2M AOC (BER 5e-5)",
        0x02 => "100GBASE-SR4 or 25GBASE-SR",
        0x03 => "100GBASE-LR4 or 25GBASE-LR",
        0x04 => "100GBASE-ER4 or 25GBASE-ER",
        0x05 => "100GBASE-SR10",
        0x06 => "100G CWDM4",
        0x07 => "100G PSM4",
        0x08 => "100G ACC or 25GAUI C2M ACC (BER 5e-5)",
        0x0B => "100GBASE-CR4, 25GBASE-CR CA-25G-L or 50GBASE-CR2 RS-FEC",
        0x0C => "25GBASE-CR CA-25G-S or 50GBASE-CR2 BASE-R FEC",
        0x0D => "25GBASE-CR CA-25G-N or 50GBASE-CR2 no FEC",
        0x0E => "10Mb Single Pair Ethernet",
        0x10 => "40GBASE-ER4",
        0x11 => "4x10GBASE-SR",
        0x12 => "40G PSM4",
        0x16 => "10GBASE-T SFI",
        0x17 => "100G CLR4",
        0x18 => "100G AOC or 25GAUI C2M AOC (BER 1e-12)",
        0x19 => "100G ACC or 25GAUI C2M ACC (BER 1e-12)",
        0x1C => "10GBASE-T Short Reach",
        0x1D => "5GBASE-T",
        0x1E => "2.5GBASE-T",
        0x1F => "40G SWDM4",
        0x20 => "100G SWDM4",
        0x21 => "100G PAM4 BiDi",
        0x25 => "100GBASE-DR (CAUI-4 no FEC)",
        0x26 => "100G-FR or 100GBASE-FR1 (CAUI-4 no FEC)",
        0x27 => "100G-LR or 100GBASE-LR1 (CAUI-4 no FEC)",
        0x28 => "100GBASE-SR1 (CAUI-4 no FEC)",
        0x30 => "Active Copper Cable (50GAUI/100GAUI-2/200GAUI-4 C2M BER 1e-6)",
        0x31 => "Active Optical Cable (50GAUI/100GAUI-2/200GAUI-4 C2M BER 1e-6)",
        0x40 => "50GBASE-CR, 100GBASE-CR2 or 200GBASE-CR4",
        0x41 => "50GBASE-SR, 100GBASE-SR2 or 200GBASE-SR4",
        0x42 => "50GBASE-FR or 200GBASE-DR4",
        0x43 => "200GBASE-FR4",
        0x45 => "50GBASE-LR",
        0x46 => "200GBASE-LR4",
        0x47 => "400GBASE-DR4 (400GAUI-4 C2M)",
        0x48 => "400GBASE-FR4",
        0x49 => "400GBASE-LR4-6",
        0x4A => "400G-LR4-10",
        0x4B => "256GFC-SW4",
        0x4C => "64GFC",
        0xFF => "Vendor specific",
        _ => "Reserved",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with_checksum(mut page: [u8; STATIC_PAGE_LEN]) -> [u8; STATIC_PAGE_LEN] {
        page[CC_BASE_OFFSET] = cc_base_checksum(&page);
        page
    }

    #[test]
    fn test_empty_input_decodes() {
        let info = decode_static(&[]);
        assert_eq!(info.identifier, 0);
        assert_eq!(info.smf_length_km.status, LengthStatus::NotSupported);
        assert!(!info.vendor_name_valid);
        // All zero bytes sum to the zero checksum
        assert!(info.cc_base_valid);
    }

    #[test]
    fn test_copper_branch_changes_unit() {
        let mut page = [0u8; STATIC_PAGE_LEN];
        page[18] = 5;
        let optical = decode_static(&page_with_checksum(page));
        assert_eq!(optical.variant, MediaVariant::Optical);
        assert_eq!(optical.om4_or_copper_length_m.length, 50);

        page[8] = 0x04;
        page[18] = 0xFF;
        page[60] = 0x01;
        let copper = decode_static(&page_with_checksum(page));
        assert_eq!(copper.variant, MediaVariant::PassiveCable);
        assert_eq!(copper.om4_or_copper_length_m.length, 254);
        assert_eq!(
            copper.om4_or_copper_length_m.status,
            LengthStatus::ExtendedRange
        );
        assert_eq!(copper.cable_compliance, Some(0x01));
        assert_eq!(copper.wavelength_nm, None);
    }

    #[test]
    fn test_vendor_string_trimming() {
        assert_eq!(
            vendor_string(b"FINISAR CORP.   "),
            ("FINISAR CORP.".to_string(), true)
        );
        assert_eq!(vendor_string(b"                "), (String::new(), false));
        let (text, valid) = vendor_string(b"AB\x01D");
        assert_eq!(text, "AB D");
        assert!(!valid);
    }

    #[test]
    fn test_description_tables() {
        assert_eq!(identifier_type(0x03), "SFP/SFP+");
        assert_eq!(connector_type(0x07), "LC");
        assert_eq!(connector_type(0x50), "Unknown");
        assert_eq!(encoding_type(0x06), "64B/66B");
        assert_eq!(ext_compliance_desc(0x02), "100GBASE-SR4 or 25GBASE-SR");
        assert_eq!(ext_compliance_desc(0x60), "Reserved");
    }
}
