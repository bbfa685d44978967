// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! A2h diagnostic page decoding
//!
//! The dynamic block is read from byte 96 of the A2h page. All offsets below
//! are absolute page offsets:
//!
//! | Bytes | Field | Scale |
//! |-------|-------|-------|
//! | 96-97 | Temperature | signed, 1/256 °C |
//! | 98-99 | Supply voltage | 100 µV |
//! | 100-101 | TX bias current | 2 µA |
//! | 102-103 | TX output power | 0.1 µW |
//! | 104-105 | RX input power | 0.1 µW |
//! | 110 | Status/control | bit flags |
//! | 112-113 | Alarm flags | bit flags |
//! | 116-117 | Warning flags | bit flags |
//!
//! Alarm and warning bytes follow SFF-8472 table 9-12.

use serde::Serialize;

use super::{bit_set, fixed_block};

/// I2C offset of the diagnostic window
pub const DYNAMIC_PAGE_OFFSET: u8 = 96;
/// Size of the diagnostic window, up to the last warning byte
pub const DYNAMIC_PAGE_LEN: usize = 24;
/// dBm reported for a zero optical power reading
pub const POWER_FLOOR_DBM: f64 = -40.0;

const TEMPERATURE: usize = 96;
const VCC: usize = 98;
const TX_BIAS: usize = 100;
const TX_POWER: usize = 102;
const RX_POWER: usize = 104;
const STATUS_CONTROL: usize = 110;
const ALARM_FLAGS: usize = 112;
const WARNING_FLAGS: usize = 116;

/// Monitored quantity owning a pair of threshold flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Temperature,
    Vcc,
    TxBias,
    TxPower,
    RxPower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    High,
    Low,
}

/// Threshold bits relative to the first alarm (or warning) byte
const THRESHOLD_BITS: [(usize, u8, Quantity, Bound); 10] = [
    (0, 7, Quantity::Temperature, Bound::High),
    (0, 6, Quantity::Temperature, Bound::Low),
    (0, 5, Quantity::Vcc, Bound::High),
    (0, 4, Quantity::Vcc, Bound::Low),
    (0, 3, Quantity::TxBias, Bound::High),
    (0, 2, Quantity::TxBias, Bound::Low),
    (0, 1, Quantity::TxPower, Bound::High),
    (0, 0, Quantity::TxPower, Bound::Low),
    (1, 7, Quantity::RxPower, Bound::High),
    (1, 6, Quantity::RxPower, Bound::Low),
];

/// High/low threshold crossing for one quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Bounds {
    pub high: bool,
    pub low: bool,
}

/// One alarm or warning flag set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ThresholdFlags {
    pub temperature: Bounds,
    pub vcc: Bounds,
    pub tx_bias: Bounds,
    pub tx_power: Bounds,
    pub rx_power: Bounds,
}

impl ThresholdFlags {
    fn from_bytes(raw: &[u8], base: usize) -> Self {
        let mut flags = ThresholdFlags::default();
        for (offset, bit, quantity, bound) in THRESHOLD_BITS {
            let set = bit_set(raw, base + offset, bit);
            let bounds = flags.get_mut(quantity);
            match bound {
                Bound::High => bounds.high = set,
                Bound::Low => bounds.low = set,
            }
        }
        flags
    }

    pub fn get(&self, quantity: Quantity) -> Bounds {
        match quantity {
            Quantity::Temperature => self.temperature,
            Quantity::Vcc => self.vcc,
            Quantity::TxBias => self.tx_bias,
            Quantity::TxPower => self.tx_power,
            Quantity::RxPower => self.rx_power,
        }
    }

    fn get_mut(&mut self, quantity: Quantity) -> &mut Bounds {
        match quantity {
            Quantity::Temperature => &mut self.temperature,
            Quantity::Vcc => &mut self.vcc,
            Quantity::TxBias => &mut self.tx_bias,
            Quantity::TxPower => &mut self.tx_power,
            Quantity::RxPower => &mut self.rx_power,
        }
    }

    /// True when any flag of the set is raised
    pub fn any(&self) -> bool {
        [
            self.temperature,
            self.vcc,
            self.tx_bias,
            self.tx_power,
            self.rx_power,
        ]
        .iter()
        .any(|b| b.high || b.low)
    }
}

/// Status/control byte 110.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatusFlags {
    /// Inverse of the Data_Ready_Bar bit
    pub data_ready: bool,
    pub rx_los: bool,
    pub tx_fault: bool,
}

/// Decoded diagnostic telemetry.
///
/// Every scalar carries its own validity flag. Values of invalid scalars are
/// still filled in but must be ignored.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DynamicInfo {
    pub temperature_c: f64,
    pub temperature_valid: bool,
    pub voltage_v: f64,
    pub voltage_valid: bool,
    pub tx_bias_ma: f64,
    pub tx_bias_valid: bool,
    pub tx_power_mw: f64,
    pub tx_power_dbm: f64,
    pub tx_power_valid: bool,
    pub rx_power_mw: f64,
    pub rx_power_dbm: f64,
    pub rx_power_valid: bool,
    pub status: StatusFlags,
    pub alarms: ThresholdFlags,
    pub warnings: ThresholdFlags,
}

/// Convert optical power to dBm, clamping zero to [`POWER_FLOOR_DBM`].
pub fn mw_to_dbm(mw: f64) -> f64 {
    if mw > 0.0 {
        (10.0 * mw.log10()).max(POWER_FLOOR_DBM)
    } else {
        POWER_FLOOR_DBM
    }
}

/// Decode the diagnostic window read from [`DYNAMIC_PAGE_OFFSET`].
///
/// `raw[0]` is page byte 96. Missing bytes read as zero, which marks the
/// corresponding scalars invalid.
pub fn decode_dynamic(raw: &[u8]) -> DynamicInfo {
    let window: [u8; DYNAMIC_PAGE_LEN] = fixed_block(raw);
    let word = |offset: usize| {
        let at = offset - usize::from(DYNAMIC_PAGE_OFFSET);
        u16::from_be_bytes([window[at], window[at + 1]])
    };
    let relative = |offset: usize| offset - usize::from(DYNAMIC_PAGE_OFFSET);

    let temperature = word(TEMPERATURE);
    let vcc = word(VCC);
    let bias = word(TX_BIAS);
    let tx_power = word(TX_POWER);
    let rx_power = word(RX_POWER);

    let tx_power_mw = f64::from(tx_power) * 0.0001;
    let rx_power_mw = f64::from(rx_power) * 0.0001;

    let status_byte = relative(STATUS_CONTROL);

    DynamicInfo {
        temperature_c: f64::from(temperature as i16) / 256.0,
        temperature_valid: scalar_valid(temperature),
        voltage_v: f64::from(vcc) * 0.0001,
        voltage_valid: scalar_valid(vcc),
        tx_bias_ma: f64::from(bias) * 0.002,
        tx_bias_valid: scalar_valid(bias),
        tx_power_mw,
        tx_power_dbm: mw_to_dbm(tx_power_mw),
        tx_power_valid: scalar_valid(tx_power),
        rx_power_mw,
        rx_power_dbm: mw_to_dbm(rx_power_mw),
        rx_power_valid: scalar_valid(rx_power),
        status: StatusFlags {
            data_ready: !bit_set(&window, status_byte, 0),
            rx_los: bit_set(&window, status_byte, 1),
            tx_fault: bit_set(&window, status_byte, 2),
        },
        alarms: ThresholdFlags::from_bytes(&window, relative(ALARM_FLAGS)),
        warnings: ThresholdFlags::from_bytes(&window, relative(WARNING_FLAGS)),
    }
}

/// `0x0000` and `0xFFFF` mean unpopulated or unreadable
fn scalar_valid(raw: u16) -> bool {
    raw != 0x0000 && raw != 0xFFFF
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_negative_temperature() {
        let mut window = [0u8; DYNAMIC_PAGE_LEN];
        // -10.5 °C = 0xF580
        window[0] = 0xF5;
        window[1] = 0x80;
        let info = decode_dynamic(&window);
        assert_relative_eq!(info.temperature_c, -10.5);
        assert!(info.temperature_valid);
    }

    #[test]
    fn test_power_floor() {
        assert_relative_eq!(mw_to_dbm(0.0), POWER_FLOOR_DBM);
        assert_relative_eq!(mw_to_dbm(1.0), 0.0);
        assert_relative_eq!(mw_to_dbm(0.0001), -40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_threshold_flags_table() {
        let mut window = [0u8; DYNAMIC_PAGE_LEN];
        window[16] = 0b1000_0001; // byte 112: temp high, tx power low
        window[17] = 0b0100_0000; // byte 113: rx power low
        window[20] = 0b0010_0000; // byte 116: vcc high warning
        let info = decode_dynamic(&window);
        assert!(info.alarms.temperature.high);
        assert!(info.alarms.tx_power.low);
        assert!(info.alarms.rx_power.low);
        assert!(!info.alarms.rx_power.high);
        assert!(info.warnings.vcc.high);
        assert!(!info.warnings.temperature.high);
        assert_eq!(info.warnings.get(Quantity::Vcc), Bounds { high: true, low: false });
        assert!(info.alarms.any());
    }
}
