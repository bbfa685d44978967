// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! SFF-8472 memory map decoder
//!
//! Pure, stateless transforms turning the raw bytes read from an SFP/SFP+
//! module into typed records:
//!
//! - [`decode_static`]: the 64-byte base ID block at address A0h
//!   (identity, compliance codes, link lengths, vendor strings, checksum)
//! - [`decode_dynamic`]: the diagnostic window at address A2h starting at
//!   byte 96 (temperature, supply voltage, bias current, optical powers,
//!   status bits, alarm and warning flags)
//!
//! Decoding never fails. Short blocks are zero-filled, sentinel values are
//! mapped to a [`LengthStatus`] or a cleared validity flag, and a checksum
//! mismatch is reported through [`StaticInfo::cc_base_valid`] while every
//! other field is still decoded.
//!
//! ## Example
//!
//! ```
//! use sfp_monitor::decoder::{decode_static, LengthStatus};
//!
//! let mut raw = [0u8; 64];
//! raw[0] = 0x03; // SFP/SFP+
//! raw[14] = 0xFF; // single-mode reach beyond 254 km
//! raw[63] = raw[..63].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
//!
//! let info = decode_static(&raw);
//! assert_eq!(info.identifier_type, "SFP/SFP+");
//! assert_eq!(info.smf_length_km.status, LengthStatus::ExtendedRange);
//! assert_eq!(info.smf_length_km.length, 254);
//! assert!(info.cc_base_valid);
//! ```

pub mod compliance;
pub mod dynamic_page;
pub mod static_page;

use serde::Serialize;

pub use compliance::{ComplianceCodes, ComplianceFlag, COMPLIANCE_FLAGS};
pub use dynamic_page::{
    decode_dynamic, Bounds, DynamicInfo, Quantity, StatusFlags, ThresholdFlags,
    DYNAMIC_PAGE_LEN, DYNAMIC_PAGE_OFFSET, POWER_FLOOR_DBM,
};
pub use static_page::{
    cc_base_checksum, decode_static, MediaVariant, StaticInfo, STATIC_PAGE_LEN,
    STATIC_PAGE_OFFSET,
};

/// Interpretation of a one-byte link length or rate field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LengthStatus {
    /// Raw `0x00`: the module does not support this medium
    #[default]
    NotSupported,
    /// Any raw value other than the two sentinels
    Valid,
    /// Raw `0xFF`: the real value exceeds what the byte can encode
    ExtendedRange,
}

/// A decoded length (or rate) together with its sentinel status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LinkLength {
    /// Length in the unit of the field (km, m or MBd)
    pub length: u32,
    pub status: LengthStatus,
}

/// Scaling rule of a one-byte length field.
///
/// `multiplier` converts a raw count into the reported unit and `extended`
/// is the asymptotic value reported for the `0xFF` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthUnit {
    pub multiplier: u32,
    pub extended: u32,
}

impl LengthUnit {
    /// Byte granularity (single-mode km, copper attenuation metres)
    pub const UNIT: LengthUnit = LengthUnit {
        multiplier: 1,
        extended: 254,
    };
    /// Ten metre granularity (multimode reaches)
    pub const TEN: LengthUnit = LengthUnit {
        multiplier: 10,
        extended: 2540,
    };
    /// Hundred unit granularity (single-mode 100 m, nominal rate 100 MBd)
    pub const HUNDRED: LengthUnit = LengthUnit {
        multiplier: 100,
        extended: 25400,
    };

    /// Apply the three-way sentinel rule to a raw byte.
    pub fn decode(self, raw: u8) -> LinkLength {
        match raw {
            0x00 => LinkLength {
                length: 0,
                status: LengthStatus::NotSupported,
            },
            0xFF => LinkLength {
                length: self.extended,
                status: LengthStatus::ExtendedRange,
            },
            v => LinkLength {
                length: u32::from(v) * self.multiplier,
                status: LengthStatus::Valid,
            },
        }
    }
}

/// Generic single bit extraction shared by the compliance and flag tables.
///
/// Offsets past the end of `raw` read as cleared bits.
pub fn bit_set(raw: &[u8], offset: usize, bit: u8) -> bool {
    raw.get(offset).is_some_and(|byte| byte & (1 << bit) != 0)
}

/// Copy `raw` into a fixed-size block, zero-filling missing bytes.
pub(crate) fn fixed_block<const N: usize>(raw: &[u8]) -> [u8; N] {
    let mut block = [0u8; N];
    let len = raw.len().min(N);
    block[..len].copy_from_slice(&raw[..len]);
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_rule_for_every_unit() {
        for unit in [LengthUnit::UNIT, LengthUnit::TEN, LengthUnit::HUNDRED] {
            assert_eq!(unit.decode(0x00).status, LengthStatus::NotSupported);
            assert_eq!(unit.decode(0x00).length, 0);
            assert_eq!(unit.decode(0xFF).status, LengthStatus::ExtendedRange);
            assert_eq!(unit.decode(0xFF).length, unit.extended);
            for raw in 1..=0xFEu8 {
                let decoded = unit.decode(raw);
                assert_eq!(decoded.status, LengthStatus::Valid);
                assert_eq!(decoded.length, u32::from(raw) * unit.multiplier);
            }
        }
    }

    #[test]
    fn test_bit_set_out_of_range() {
        assert!(bit_set(&[0x80], 0, 7));
        assert!(!bit_set(&[0x80], 0, 6));
        assert!(!bit_set(&[0xFF], 3, 0));
    }

    #[test]
    fn test_fixed_block_zero_fills() {
        let block: [u8; 4] = fixed_block(&[1, 2]);
        assert_eq!(block, [1, 2, 0, 0]);
        let block: [u8; 2] = fixed_block(&[1, 2, 3]);
        assert_eq!(block, [1, 2]);
    }
}
