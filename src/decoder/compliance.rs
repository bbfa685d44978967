// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Transceiver compliance codes (A0h bytes 3 to 10)
//!
//! The eight compliance bytes carry 64 independent capability flags. Each flag
//! is described once in [`COMPLIANCE_FLAGS`] as an `(offset, bit, name)` triple
//! and every lookup goes through [`super::bit_set`]. Within each byte the table
//! lists bit 7 first.

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::bit_set;

/// First page offset of the compliance bytes
pub const COMPLIANCE_OFFSET: usize = 3;
/// Number of compliance bytes
pub const COMPLIANCE_LEN: usize = 8;

/// One named compliance capability bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComplianceFlag {
    /// Absolute byte offset within the A0h page
    pub offset: usize,
    /// Bit position, 7 being the most significant
    pub bit: u8,
    pub name: &'static str,
}

const fn flag(offset: usize, bit: u8, name: &'static str) -> ComplianceFlag {
    ComplianceFlag { offset, bit, name }
}

/// Names of the byte groups used when serializing the flags
const GROUPS: [(usize, &str); COMPLIANCE_LEN] = [
    (3, "byte3_ethernet_infiniband"),
    (4, "byte4_escon_sonet"),
    (5, "byte5_sonet"),
    (6, "byte6_ethernet_1g"),
    (7, "byte7_fc_link_length"),
    (8, "byte8_fc_technology"),
    (9, "byte9_fc_transmission_media"),
    (10, "byte10_fc_channel_speed"),
];

/// Every compliance bit of SFF-8472 table 5-3.
pub const COMPLIANCE_FLAGS: [ComplianceFlag; 64] = [
    // 10G Ethernet and InfiniBand
    flag(3, 7, "eth_10g_base_er"),
    flag(3, 6, "eth_10g_base_lrm"),
    flag(3, 5, "eth_10g_base_lr"),
    flag(3, 4, "eth_10g_base_sr"),
    flag(3, 3, "infiniband_1x_sx"),
    flag(3, 2, "infiniband_1x_lx"),
    flag(3, 1, "infiniband_1x_copper_active"),
    flag(3, 0, "infiniband_1x_copper_passive"),
    // ESCON and SONET
    flag(4, 7, "escon_mmf"),
    flag(4, 6, "escon_smf"),
    flag(4, 5, "oc_192_sr"),
    flag(4, 4, "sonet_rs_1"),
    flag(4, 3, "sonet_rs_2"),
    flag(4, 2, "oc_48_lr"),
    flag(4, 1, "oc_48_ir"),
    flag(4, 0, "oc_48_sr"),
    // SONET
    flag(5, 7, "unallocated_5_7"),
    flag(5, 6, "oc_12_sm_lr"),
    flag(5, 5, "oc_12_sm_ir"),
    flag(5, 4, "oc_12_sr"),
    flag(5, 3, "unallocated_5_3"),
    flag(5, 2, "oc_3_sm_lr"),
    flag(5, 1, "oc_3_sm_ir"),
    flag(5, 0, "oc_3_sr"),
    // Ethernet
    flag(6, 7, "eth_base_px"),
    flag(6, 6, "eth_base_bx_10"),
    flag(6, 5, "eth_100_base_fx"),
    flag(6, 4, "eth_100_base_lx"),
    flag(6, 3, "eth_1000_base_t"),
    flag(6, 2, "eth_1000_base_cx"),
    flag(6, 1, "eth_1000_base_lx"),
    flag(6, 0, "eth_1000_base_sx"),
    // Fibre Channel link length and technology
    flag(7, 7, "fc_very_long_distance"),
    flag(7, 6, "fc_short_distance"),
    flag(7, 5, "fc_intermediate_distance"),
    flag(7, 4, "fc_long_distance"),
    flag(7, 3, "fc_medium_distance"),
    flag(7, 2, "shortwave_laser_sa"),
    flag(7, 1, "longwave_laser_lc"),
    flag(7, 0, "electrical_inter_enclosure"),
    // Fibre Channel technology and SFP+ cable technology
    flag(8, 7, "electrical_intra_enclosure"),
    flag(8, 6, "shortwave_laser_sn"),
    flag(8, 5, "shortwave_laser_sl"),
    flag(8, 4, "longwave_laser_ll"),
    flag(8, 3, "active_cable"),
    flag(8, 2, "passive_cable"),
    flag(8, 1, "unallocated_8_1"),
    flag(8, 0, "unallocated_8_0"),
    // Fibre Channel transmission media
    flag(9, 7, "twin_axial_pair"),
    flag(9, 6, "twisted_pair"),
    flag(9, 5, "miniature_coax"),
    flag(9, 4, "video_coax"),
    flag(9, 3, "multimode_m6"),
    flag(9, 2, "multimode_m5"),
    flag(9, 1, "unallocated_9_1"),
    flag(9, 0, "single_mode"),
    // Fibre Channel speed
    flag(10, 7, "cs_1200_mbps"),
    flag(10, 6, "cs_800_mbps"),
    flag(10, 5, "cs_1600_mbps"),
    flag(10, 4, "cs_400_mbps"),
    flag(10, 3, "cs_3200_mbps"),
    flag(10, 2, "cs_200_mbps"),
    flag(10, 1, "see_byte_62"),
    flag(10, 0, "cs_100_mbps"),
];

/// The eight compliance bytes of a decoded A0h page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComplianceCodes {
    /// Bytes 3 to 10 of the page
    pub raw: [u8; COMPLIANCE_LEN],
}

impl ComplianceCodes {
    /// Extract the compliance bytes from a full A0h page
    pub fn from_page(page: &[u8]) -> Self {
        let mut raw = [0u8; COMPLIANCE_LEN];
        for (i, byte) in raw.iter_mut().enumerate() {
            *byte = page.get(COMPLIANCE_OFFSET + i).copied().unwrap_or(0);
        }
        Self { raw }
    }

    pub fn is_set(&self, flag: &ComplianceFlag) -> bool {
        bit_set(&self.raw, flag.offset - COMPLIANCE_OFFSET, flag.bit)
    }

    /// Look a flag up by name
    pub fn flag(&self, name: &str) -> Option<bool> {
        COMPLIANCE_FLAGS
            .iter()
            .find(|f| f.name == name)
            .map(|f| self.is_set(f))
    }

    /// Names of all the flags set on the module
    pub fn active_flags(&self) -> impl Iterator<Item = &'static str> + '_ {
        COMPLIANCE_FLAGS
            .iter()
            .filter(|f| self.is_set(f))
            .map(|f| f.name)
    }

    pub fn passive_cable(&self) -> bool {
        bit_set(&self.raw, 8 - COMPLIANCE_OFFSET, 2)
    }

    pub fn active_cable(&self) -> bool {
        bit_set(&self.raw, 8 - COMPLIANCE_OFFSET, 3)
    }
}

/// Flags of a single byte, serialized as `{name: bool}` in table order.
struct ByteGroup<'a> {
    codes: &'a ComplianceCodes,
    offset: usize,
}

impl Serialize for ByteGroup<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(8))?;
        for f in COMPLIANCE_FLAGS.iter().filter(|f| f.offset == self.offset) {
            map.serialize_entry(f.name, &self.codes.is_set(f))?;
        }
        map.end()
    }
}

impl Serialize for ComplianceCodes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(GROUPS.len() + 1))?;
        map.serialize_entry("raw", &self.raw)?;
        for (offset, group) in GROUPS {
            map.serialize_entry(
                group,
                &ByteGroup {
                    codes: self,
                    offset,
                },
            )?;
        }
        map.end()
    }
}
