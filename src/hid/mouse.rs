//! HID mouse report.
//!
//! Layout (5 bytes):
//! ```text
//! Byte 0: Report ID (0x03)
//! Byte 1: Button bitfield (bits 0-4 = buttons 1-5)
//! Byte 2: X displacement (signed, -127..127)
//! Byte 3: Y displacement (signed, -127..127)
//! Byte 4: Scroll wheel  (signed, -127..127)
//! ```

use crate::config::{MOUSE_NUM_BUTTONS, REPORT_ID_MOUSE};

/// Mouse report size in bytes.
pub const MOUSE_REPORT_SIZE: usize = 5;

/// Report-protocol mouse report.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MouseReport {
    /// Button bitfield.
    pub buttons: u8,
    /// Relative X movement (signed).
    pub x: i8,
    /// Relative Y movement (signed).
    pub y: i8,
    /// Scroll wheel delta (signed).
    pub wheel: i8,
}

impl MouseReport {
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < MOUSE_REPORT_SIZE || data[0] != REPORT_ID_MOUSE {
            return None;
        }
        Some(Self {
            buttons: data[1],
            x: data[2] as i8,
            y: data[3] as i8,
            wheel: data[4] as i8,
        })
    }

    /// Serialise into a byte slice for transmission.
    /// Returns the number of bytes written (always 5), or 0 if `buf` is too small.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < MOUSE_REPORT_SIZE {
            return 0;
        }
        buf[0] = REPORT_ID_MOUSE;
        buf[1] = self.buttons;
        buf[2] = self.x as u8;
        buf[3] = self.y as u8;
        buf[4] = self.wheel as u8;
        MOUSE_REPORT_SIZE
    }

    /// Returns `true` when no buttons are pressed and there is no movement.
    pub fn is_idle(&self) -> bool {
        self.buttons == 0 && self.x == 0 && self.y == 0 && self.wheel == 0
    }
}

/// Mouse with report id 3, five buttons, X/Y and wheel.
pub const MOUSE_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x02, // Usage (Mouse)
    0xA1, 0x01, // Collection (Application)
    0x85, REPORT_ID_MOUSE, //   Report ID
    0x09, 0x01, //   Usage (Pointer)
    0xA1, 0x00, //   Collection (Physical)
    //
    //   - Buttons (5 bits + 3 padding) -
    0x05, 0x09, //     Usage Page (Buttons)
    0x19, 0x01, //     Usage Minimum (Button 1)
    0x29, MOUSE_NUM_BUTTONS as u8, //     Usage Maximum
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x01, //     Logical Maximum (1)
    0x75, 0x01, //     Report Size (1)
    0x95, MOUSE_NUM_BUTTONS as u8, //     Report Count
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    0x75, 0x03, //     Report Size (3)
    0x95, 0x01, //     Report Count (1)
    0x81, 0x03, //     Input (Constant, Variable, Absolute)
    //
    //   - X, Y, wheel -
    0x05, 0x01, //     Usage Page (Generic Desktop)
    0x09, 0x30, //     Usage (X)
    0x09, 0x31, //     Usage (Y)
    0x09, 0x38, //     Usage (Wheel)
    0x15, 0x81, //     Logical Minimum (-127)
    0x25, 0x7F, //     Logical Maximum (127)
    0x75, 0x08, //     Report Size (8)
    0x95, 0x03, //     Report Count (3)
    0x81, 0x06, //     Input (Data, Variable, Relative)
    //
    0xC0, //   End Collection (Physical)
    0xC0, // End Collection (Application)
];
