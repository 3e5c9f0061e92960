//! Precision touchpad feature reports.
//!
//! ```text
//! 0x06 capabilities:   max_touches(1) | pad_type(1)
//! 0x07 certification:  256-byte opaque blob
//! 0x08 input mode:     mode(1), 0 = mouse, 3 = precision touchpad
//! 0x09 selective:      bit 0 = surface, bit 1 = button
//! ```
//!
//! All feature reports are written with their report id in byte 0.

use crate::config::{
    REPORT_ID_FEATURE_PTPHQA, REPORT_ID_FEATURE_PTP_CAPABILITIES,
    REPORT_ID_FEATURE_PTP_CONFIGURATION, REPORT_ID_FEATURE_PTP_SELECTIVE, TRACKPAD_MAX_FINGERS,
};

/// Host-selected reporting switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SelectiveReport {
    pub selective_reporting: u8,
}

impl SelectiveReport {
    pub const SURFACE: u8 = 0x01;
    pub const BUTTON: u8 = 0x02;
    pub const SIZE: usize = 2;

    pub fn surface(&self) -> bool {
        self.selective_reporting & Self::SURFACE != 0
    }

    pub fn button(&self) -> bool {
        self.selective_reporting & Self::BUTTON != 0
    }

    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE || data[0] != REPORT_ID_FEATURE_PTP_SELECTIVE {
            return None;
        }
        Some(Self {
            selective_reporting: data[1],
        })
    }

    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < Self::SIZE {
            return 0;
        }
        buf[0] = REPORT_ID_FEATURE_PTP_SELECTIVE;
        buf[1] = self.selective_reporting;
        Self::SIZE
    }
}

impl Default for SelectiveReport {
    fn default() -> Self {
        Self {
            selective_reporting: Self::SURFACE | Self::BUTTON,
        }
    }
}

/// Input mode requested by the host.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputModeReport {
    pub mode: u8,
}

impl InputModeReport {
    pub const MOUSE: u8 = 0;
    pub const PRECISION_TOUCHPAD: u8 = 3;
    pub const SIZE: usize = 2;

    /// Only mode 3 selects multi-touch reporting; any other value means mouse.
    pub fn is_precision_touchpad(&self) -> bool {
        self.mode == Self::PRECISION_TOUCHPAD
    }

    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE || data[0] != REPORT_ID_FEATURE_PTP_CONFIGURATION {
            return None;
        }
        Some(Self { mode: data[1] })
    }

    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < Self::SIZE {
            return 0;
        }
        buf[0] = REPORT_ID_FEATURE_PTP_CONFIGURATION;
        buf[1] = self.mode;
        Self::SIZE
    }
}

/// Device capabilities, read-only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CapabilitiesReport {
    pub max_touches: u8,
    pub pad_type: u8,
}

impl CapabilitiesReport {
    pub const PAD_TYPE_DEPRESSIBLE: u8 = 0x00;
    pub const PAD_TYPE_PRESSURE: u8 = 0x01;
    pub const PAD_TYPE_NON_CLICKABLE: u8 = 0x02;
    pub const SIZE: usize = 3;

    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE || data[0] != REPORT_ID_FEATURE_PTP_CAPABILITIES {
            return None;
        }
        Some(Self {
            max_touches: data[1],
            pad_type: data[2],
        })
    }

    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < Self::SIZE {
            return 0;
        }
        buf[0] = REPORT_ID_FEATURE_PTP_CAPABILITIES;
        buf[1] = self.max_touches;
        buf[2] = self.pad_type;
        Self::SIZE
    }
}

impl Default for CapabilitiesReport {
    fn default() -> Self {
        Self {
            max_touches: TRACKPAD_MAX_FINGERS as u8,
            pad_type: Self::PAD_TYPE_NON_CLICKABLE,
        }
    }
}

/// Length of the certification blob.
pub const PTPHQA_BLOB_LEN: usize = 256;

/// Certification status blob, returned verbatim.
pub const PTPHQA_BLOB: [u8; PTPHQA_BLOB_LEN] = [
    0xFC, 0x28, 0xFE, 0x84, 0x40, 0xCB, 0x9A, 0x87, 0x0D, 0xBE, 0x57, 0x3C,
    0xB6, 0x70, 0x09, 0x88, 0x07, 0x97, 0x2D, 0x2B, 0xE3, 0x38, 0x34, 0xB6,
    0x6C, 0xED, 0xB0, 0xF7, 0xE5, 0x9C, 0xF6, 0xC2, 0x2E, 0x84, 0x1B, 0xE8,
    0xB4, 0x51, 0x78, 0x43, 0x1F, 0x28, 0x4B, 0x7C, 0x2D, 0x53, 0xAF, 0xFC,
    0x47, 0x70, 0x1B, 0x59, 0x6F, 0x74, 0x43, 0xC4, 0xF3, 0x47, 0x18, 0x53,
    0x1A, 0xA2, 0xA1, 0x71, 0xC7, 0x95, 0x0E, 0x31, 0x55, 0x21, 0xD3, 0xB5,
    0x1E, 0xE9, 0x0C, 0xBA, 0xEC, 0xB8, 0x89, 0x19, 0x3E, 0xB3, 0xAF, 0x75,
    0x81, 0x9D, 0x53, 0xB9, 0x41, 0x57, 0xF4, 0x6D, 0x39, 0x25, 0x29, 0x7C,
    0x87, 0xD9, 0xB4, 0x98, 0x45, 0x7D, 0xA7, 0x26, 0x9C, 0x65, 0x3B, 0x85,
    0x68, 0x89, 0xD7, 0x3B, 0xBD, 0xFF, 0x14, 0x67, 0xF2, 0x2B, 0xF0, 0x2A,
    0x41, 0x54, 0xF0, 0xFD, 0x2C, 0x66, 0x7C, 0xF8, 0xC0, 0x8F, 0x33, 0x13,
    0x03, 0xF1, 0xD3, 0xC1, 0x0B, 0x89, 0xD9, 0x1B, 0x62, 0xCD, 0x51, 0xB7,
    0x80, 0xB8, 0xAF, 0x3A, 0x10, 0xC1, 0x8A, 0x5B, 0xE8, 0x8A, 0x56, 0xF0,
    0x8C, 0xAA, 0xFA, 0x35, 0xE9, 0x42, 0xC4, 0xD8, 0x55, 0xC3, 0x38, 0xCC,
    0x2B, 0x53, 0x5C, 0x69, 0x52, 0xD5, 0xC8, 0x73, 0x02, 0x38, 0x7C, 0x73,
    0xB6, 0x41, 0xE7, 0xFF, 0x05, 0xD8, 0x2B, 0x79, 0x9A, 0xE2, 0x34, 0x60,
    0x8F, 0xA3, 0x32, 0x1F, 0x09, 0x78, 0x62, 0xBC, 0x80, 0xE3, 0x0F, 0xBD,
    0x65, 0x20, 0x08, 0x13, 0xC1, 0xE2, 0xEE, 0x53, 0x2D, 0x86, 0x7E, 0xA7,
    0x5A, 0xC5, 0xD3, 0x7D, 0x98, 0xBE, 0x31, 0x48, 0x1F, 0xFB, 0xDA, 0xAF,
    0xA2, 0xA8, 0x6A, 0x89, 0xD6, 0xBF, 0xF2, 0xD3, 0x32, 0x2A, 0x9A, 0xE4,
    0xCF, 0x17, 0xB7, 0xB8, 0xF4, 0xE1, 0x33, 0x08, 0x24, 0x8B, 0xC4, 0x43,
    0xA5, 0xE5, 0x24, 0xC2,
];

/// Certification feature report (read-only).
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CertificationReport;

impl CertificationReport {
    pub const SIZE: usize = 1 + PTPHQA_BLOB_LEN;

    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < Self::SIZE {
            return 0;
        }
        buf[0] = REPORT_ID_FEATURE_PTPHQA;
        buf[1..Self::SIZE].copy_from_slice(&PTPHQA_BLOB);
        Self::SIZE
    }
}
