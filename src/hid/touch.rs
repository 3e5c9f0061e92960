//! Precision touchpad (multi-touch) input report.
//!
//! Layout (`1 + 6 * F + 4` bytes, F = [`TRACKPAD_MAX_FINGERS`]):
//! ```text
//! Byte 0:       Report ID (0x05)
//! Per finger:   confidence_tip (bit 0 = confidence, bit 1 = tip switch)
//!               contact_id
//!               x (u16 LE)
//!               y (u16 LE)
//! Then:         scan_time (u16 LE, 100 us units)
//!               contact_count
//!               buttons (bits 0-2)
//! ```

use super::descriptor::append;
use crate::config::{
    REPORT_ID_TRACKPAD, TRACKPAD_LOGICAL_X, TRACKPAD_LOGICAL_Y, TRACKPAD_MAX_FINGERS,
    TRACKPAD_PHYSICAL_X, TRACKPAD_PHYSICAL_Y,
};

/// Bytes per finger block.
pub const FINGER_SIZE: usize = 6;

/// Touch report size in bytes.
pub const TOUCH_REPORT_SIZE: usize = 1 + FINGER_SIZE * TRACKPAD_MAX_FINGERS + 4;

/// One finger block of a touch report.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Finger {
    /// Bit 0 = confidence, bit 1 = tip switch; upper bits are ignored.
    pub confidence_tip: u8,
    pub contact_id: u8,
    pub x: u16,
    pub y: u16,
}

impl Finger {
    pub const CONFIDENCE: u8 = 0x01;
    pub const TIP: u8 = 0x02;

    /// Placeholder for fingers with nothing to report.
    pub const EMPTY: Finger = Finger {
        confidence_tip: 0,
        contact_id: 0,
        x: 0,
        y: 0,
    };

    pub const fn new(contact_id: u8, confidence: bool, tip: bool, x: u16, y: u16) -> Self {
        let mut confidence_tip = 0;
        if confidence {
            confidence_tip |= Self::CONFIDENCE;
        }
        if tip {
            confidence_tip |= Self::TIP;
        }
        Self {
            confidence_tip,
            contact_id,
            x,
            y,
        }
    }

    pub fn is_touching(&self) -> bool {
        self.confidence_tip & Self::TIP != 0
    }

    fn write(&self, buf: &mut [u8]) {
        buf[0] = self.confidence_tip & 0x03;
        buf[1] = self.contact_id;
        buf[2..4].copy_from_slice(&self.x.to_le_bytes());
        buf[4..6].copy_from_slice(&self.y.to_le_bytes());
    }

    fn read(buf: &[u8]) -> Self {
        Self {
            confidence_tip: buf[0] & 0x03,
            contact_id: buf[1],
            x: u16::from_le_bytes([buf[2], buf[3]]),
            y: u16::from_le_bytes([buf[4], buf[5]]),
        }
    }
}

/// Batched multi-touch report.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchReport {
    pub fingers: [Finger; TRACKPAD_MAX_FINGERS],
    pub scan_time: u16,
    pub contact_count: u8,
    pub buttons: u8,
}

impl TouchReport {
    /// Report with every finger empty, zero contacts and no buttons.
    pub const fn empty() -> Self {
        Self {
            fingers: [Finger::EMPTY; TRACKPAD_MAX_FINGERS],
            scan_time: 0,
            contact_count: 0,
            buttons: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.contact_count == 0
            && self.buttons == 0
            && self.fingers.iter().all(|f| *f == Finger::EMPTY)
    }

    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < TOUCH_REPORT_SIZE || data[0] != REPORT_ID_TRACKPAD {
            return None;
        }
        let mut report = Self::empty();
        for (i, finger) in report.fingers.iter_mut().enumerate() {
            let at = 1 + i * FINGER_SIZE;
            *finger = Finger::read(&data[at..at + FINGER_SIZE]);
        }
        let tail = 1 + FINGER_SIZE * TRACKPAD_MAX_FINGERS;
        report.scan_time = u16::from_le_bytes([data[tail], data[tail + 1]]);
        report.contact_count = data[tail + 2];
        report.buttons = data[tail + 3];
        Some(report)
    }

    /// Serialise into a byte slice. Returns the report size, or 0 if `buf`
    /// is too small.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < TOUCH_REPORT_SIZE {
            return 0;
        }
        buf[0] = REPORT_ID_TRACKPAD;
        for (i, finger) in self.fingers.iter().enumerate() {
            let at = 1 + i * FINGER_SIZE;
            finger.write(&mut buf[at..at + FINGER_SIZE]);
        }
        let tail = 1 + FINGER_SIZE * TRACKPAD_MAX_FINGERS;
        buf[tail..tail + 2].copy_from_slice(&self.scan_time.to_le_bytes());
        buf[tail + 2] = self.contact_count;
        buf[tail + 3] = self.buttons;
        TOUCH_REPORT_SIZE
    }
}

// HID report descriptor
//
// The finger logical collection is repeated once per finger slot, so the
// descriptor is assembled at compile time from three parts.

const fn lo(v: u16) -> u8 {
    (v & 0xFF) as u8
}

const fn hi(v: u16) -> u8 {
    (v >> 8) as u8
}

const TOUCHPAD_HEADER: &[u8] = &[
    0x05, 0x0D, // Usage Page (Digitizers)
    0x09, 0x05, // Usage (Touch Pad)
    0xA1, 0x01, // Collection (Application)
    0x85, REPORT_ID_TRACKPAD, //   Report ID
];

const FINGER_COLLECTION: &[u8] = &[
    0x05, 0x0D, //   Usage Page (Digitizers)
    0x09, 0x22, //   Usage (Finger)
    0xA1, 0x02, //   Collection (Logical)
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x01, //     Logical Maximum (1)
    0x09, 0x47, //     Usage (Confidence)
    0x09, 0x42, //     Usage (Tip Switch)
    0x95, 0x02, //     Report Count (2)
    0x75, 0x01, //     Report Size (1)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    0x95, 0x06, //     Report Count (6)
    0x81, 0x03, //     Input (Constant) - padding
    0x95, 0x01, //     Report Count (1)
    0x75, 0x03, //     Report Size (3)
    0x25, TRACKPAD_MAX_FINGERS as u8, //     Logical Maximum
    0x09, 0x51, //     Usage (Contact Identifier)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    0x75, 0x01, //     Report Size (1)
    0x95, 0x05, //     Report Count (5)
    0x81, 0x03, //     Input (Constant) - padding
    0x05, 0x01, //     Usage Page (Generic Desktop)
    0x15, 0x00, //     Logical Minimum (0)
    0x26, lo(TRACKPAD_LOGICAL_X), hi(TRACKPAD_LOGICAL_X), //     Logical Maximum (X)
    0x75, 0x10, //     Report Size (16)
    0x55, 0x0E, //     Unit Exponent (-2)
    0x65, 0x11, //     Unit (cm, SI Linear)
    0x09, 0x30, //     Usage (X)
    0x35, 0x00, //     Physical Minimum (0)
    0x46, lo(TRACKPAD_PHYSICAL_X), hi(TRACKPAD_PHYSICAL_X), //     Physical Maximum (X)
    0x95, 0x01, //     Report Count (1)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    0x26, lo(TRACKPAD_LOGICAL_Y), hi(TRACKPAD_LOGICAL_Y), //     Logical Maximum (Y)
    0x46, lo(TRACKPAD_PHYSICAL_Y), hi(TRACKPAD_PHYSICAL_Y), //     Physical Maximum (Y)
    0x09, 0x31, //     Usage (Y)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    0xC0, //   End Collection (Logical)
];

const TOUCHPAD_TRAILER: &[u8] = &[
    //   - Scan time -
    0x05, 0x0D, //   Usage Page (Digitizers)
    0x55, 0x0C, //   Unit Exponent (-4)
    0x66, 0x01, 0x10, //   Unit (Seconds)
    0x47, 0xFF, 0xFF, 0x00, 0x00, //   Physical Maximum (65535)
    0x27, 0xFF, 0xFF, 0x00, 0x00, //   Logical Maximum (65535)
    0x75, 0x10, //   Report Size (16)
    0x95, 0x01, //   Report Count (1)
    0x09, 0x56, //   Usage (Scan Time)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    //   - Contact count -
    0x55, 0x00, //   Unit Exponent (0)
    0x65, 0x00, //   Unit (None)
    0x45, 0x00, //   Physical Maximum (0)
    0x09, 0x54, //   Usage (Contact Count)
    0x25, TRACKPAD_MAX_FINGERS as u8, //   Logical Maximum
    0x95, 0x01, //   Report Count (1)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    //   - Buttons (3 bits + 5 padding) -
    0x05, 0x09, //   Usage Page (Buttons)
    0x09, 0x01, //   Usage (Button 1)
    0x09, 0x02, //   Usage (Button 2)
    0x09, 0x03, //   Usage (Button 3)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x03, //   Report Count (3)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    0x95, 0x05, //   Report Count (5)
    0x81, 0x03, //   Input (Constant) - padding
    //
    //   - Device capabilities feature -
    0x05, 0x0D, //   Usage Page (Digitizers)
    0x85, crate::config::REPORT_ID_FEATURE_PTP_CAPABILITIES, //   Report ID
    0x09, 0x55, //   Usage (Contact Count Maximum)
    0x75, 0x08, //   Report Size (8)
    0x95, 0x01, //   Report Count (1)
    0x25, TRACKPAD_MAX_FINGERS as u8, //   Logical Maximum
    0xB1, 0x02, //   Feature (Data, Variable, Absolute)
    0x25, 0x7F, //   Logical Maximum (127)
    0x09, 0x59, //   Usage (Pad Type)
    0xB1, 0x02, //   Feature (Data, Variable, Absolute)
    //
    //   - Certification blob feature -
    0x06, 0x00, 0xFF, //   Usage Page (Vendor Defined 0xFF00)
    0x85, crate::config::REPORT_ID_FEATURE_PTPHQA, //   Report ID
    0x09, 0xC5, //   Usage (0xC5)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x75, 0x08, //   Report Size (8)
    0x96, 0x00, 0x01, //   Report Count (256)
    0xB1, 0x02, //   Feature (Data, Variable, Absolute)
    0xC0, // End Collection (Application)
    //
    //   - Configuration collection -
    0x05, 0x0D, // Usage Page (Digitizers)
    0x09, 0x0E, // Usage (Device Configuration)
    0xA1, 0x01, // Collection (Application)
    0x85, crate::config::REPORT_ID_FEATURE_PTP_CONFIGURATION, //   Report ID
    0x09, 0x22, //   Usage (Finger)
    0xA1, 0x02, //   Collection (Logical)
    0x09, 0x52, //     Usage (Device Mode)
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x0A, //     Logical Maximum (10)
    0x75, 0x08, //     Report Size (8)
    0x95, 0x01, //     Report Count (1)
    0xB1, 0x02, //     Feature (Data, Variable, Absolute)
    0xC0, //   End Collection
    0x09, 0x22, //   Usage (Finger)
    0xA1, 0x00, //   Collection (Physical)
    0x85, crate::config::REPORT_ID_FEATURE_PTP_SELECTIVE, //     Report ID
    0x09, 0x57, //     Usage (Surface Switch)
    0x09, 0x58, //     Usage (Button Switch)
    0x75, 0x01, //     Report Size (1)
    0x95, 0x02, //     Report Count (2)
    0x25, 0x01, //     Logical Maximum (1)
    0xB1, 0x02, //     Feature (Data, Variable, Absolute)
    0x95, 0x06, //     Report Count (6)
    0xB1, 0x03, //     Feature (Constant) - padding
    0xC0, //   End Collection
    0xC0, // End Collection
];

/// Length of [`TRACKPAD_REPORT_DESCRIPTOR`].
pub const TRACKPAD_REPORT_DESCRIPTOR_LEN: usize = TOUCHPAD_HEADER.len()
    + FINGER_COLLECTION.len() * TRACKPAD_MAX_FINGERS
    + TOUCHPAD_TRAILER.len();

/// Precision touchpad descriptor: input report 5 plus feature reports 6-9.
pub const TRACKPAD_REPORT_DESCRIPTOR: [u8; TRACKPAD_REPORT_DESCRIPTOR_LEN] = build_descriptor();

const fn build_descriptor() -> [u8; TRACKPAD_REPORT_DESCRIPTOR_LEN] {
    let (mut out, mut at) = append([0u8; TRACKPAD_REPORT_DESCRIPTOR_LEN], 0, TOUCHPAD_HEADER);
    let mut finger = 0;
    while finger < TRACKPAD_MAX_FINGERS {
        (out, at) = append(out, at, FINGER_COLLECTION);
        finger += 1;
    }
    append(out, at, TOUCHPAD_TRAILER).0
}
