//! Keyboard input reports.
//!
//! Report protocol layout (`3 + N` bytes):
//! ```text
//! Byte 0:     Report ID (0x01)
//! Byte 1:     Modifier keys (bitfield)
//!             Bit 0 = Left Ctrl,  Bit 1 = Left Shift,
//!             Bit 2 = Left Alt,   Bit 3 = Left GUI,
//!             Bit 4 = Right Ctrl, Bit 5 = Right Shift,
//!             Bit 6 = Right Alt,  Bit 7 = Right GUI
//! Byte 2:     Reserved (0x00)
//! Byte 3..:   Key data - NKRO bitmap ((MAX_USAGE + 1) / 8 bytes)
//!             or HKRO usage slots (one byte each)
//! ```
//!
//! Boot protocol layout (8 bytes, no report id):
//! ```text
//! Byte 0:     Modifier keys
//! Byte 1:     Reserved (0x00)
//! Byte 2-7:   Up to 6 key codes, or 0x01 in every slot on rollover
//! ```

use crate::config::{
    BOOT_KEY_LEN, HID_ERROR_ROLLOVER, HKRO_MAX_SLOTS, NKRO_EXTENDED_MAX_USAGE, NKRO_MAX_KEY_BYTES,
    NKRO_MAX_USAGE, REPORT_ID_KEYBOARD,
};
use heapless::Vec;

/// Capacity of the key-data area, large enough for either variant.
pub const KEY_DATA_CAPACITY: usize = HKRO_MAX_SLOTS;

const _: () = assert!(NKRO_MAX_KEY_BYTES <= KEY_DATA_CAPACITY);

/// Report id + modifiers + reserved.
pub const KEYBOARD_HEADER_SIZE: usize = 3;

/// Boot keyboard report size in bytes.
pub const BOOT_REPORT_SIZE: usize = 2 + BOOT_KEY_LEN;

/// Report-protocol keyboard report.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardReport {
    /// Modifier key bitfield (effective mask).
    pub modifier: u8,
    /// Reserved byte (always 0x00).
    pub reserved: u8,
    /// Bitmap bytes (NKRO) or usage slots (HKRO).
    pub keys: Vec<u8, KEY_DATA_CAPACITY>,
}

impl KeyboardReport {
    /// Total bytes on the wire, including the report id.
    pub fn len(&self) -> usize {
        KEYBOARD_HEADER_SIZE + self.keys.len()
    }

    /// Parse a report-protocol keyboard report with `key_len` bytes of key data.
    pub fn from_bytes(data: &[u8], key_len: usize) -> Option<Self> {
        if key_len > KEY_DATA_CAPACITY || data.len() < KEYBOARD_HEADER_SIZE + key_len {
            return None;
        }
        if data[0] != REPORT_ID_KEYBOARD {
            return None;
        }
        let keys = Vec::from_slice(&data[KEYBOARD_HEADER_SIZE..KEYBOARD_HEADER_SIZE + key_len])
            .ok()?;
        Some(Self {
            modifier: data[1],
            reserved: data[2],
            keys,
        })
    }

    /// Serialise into a byte slice for transmission.
    /// Returns the number of bytes written, or 0 if `buf` is too small.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        let len = self.len();
        if buf.len() < len {
            return 0;
        }
        buf[0] = REPORT_ID_KEYBOARD;
        buf[1] = self.modifier;
        buf[2] = self.reserved;
        buf[KEYBOARD_HEADER_SIZE..len].copy_from_slice(&self.keys);
        len
    }

    /// Returns `true` if no modifier or key is reported.
    pub fn is_empty(&self) -> bool {
        self.modifier == 0 && self.keys.iter().all(|&k| k == 0)
    }
}

/// Legacy 6-key boot-protocol keyboard report.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootKeyboardReport {
    pub modifier: u8,
    pub reserved: u8,
    pub keycodes: [u8; BOOT_KEY_LEN],
}

impl BootKeyboardReport {
    /// Report signalling that more keys are held than the boot format can carry.
    pub const fn rollover(modifier: u8) -> Self {
        Self {
            modifier,
            reserved: 0,
            keycodes: [HID_ERROR_ROLLOVER; BOOT_KEY_LEN],
        }
    }

    pub fn is_rollover(&self) -> bool {
        self.keycodes.iter().all(|&k| k == HID_ERROR_ROLLOVER)
    }

    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < BOOT_REPORT_SIZE {
            return None;
        }
        let mut keycodes = [0u8; BOOT_KEY_LEN];
        keycodes.copy_from_slice(&data[2..BOOT_REPORT_SIZE]);
        Some(Self {
            modifier: data[0],
            reserved: data[1],
            keycodes,
        })
    }

    /// Serialise into a byte slice. Returns 8, or 0 if `buf` is too small.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < BOOT_REPORT_SIZE {
            return 0;
        }
        buf[0] = self.modifier;
        buf[1] = self.reserved;
        buf[2..BOOT_REPORT_SIZE].copy_from_slice(&self.keycodes);
        BOOT_REPORT_SIZE
    }
}

// HID report descriptors

const NKRO_DESCRIPTOR_LEN: usize = 45;

/// Keyboard with report id 1, 8 modifier bits, a reserved byte and an NKRO
/// bitmap covering usages `0x00..=max_usage`.
const fn nkro_descriptor(max_usage: u8) -> [u8; NKRO_DESCRIPTOR_LEN] {
    [
        0x05, 0x01, // Usage Page (Generic Desktop)
        0x09, 0x06, // Usage (Keyboard)
        0xA1, 0x01, // Collection (Application)
        0x85, REPORT_ID_KEYBOARD, //   Report ID
        //
        //   - Modifier keys (8 bits) -
        0x05, 0x07, //   Usage Page (Keyboard/Keypad)
        0x19, 0xE0, //   Usage Minimum (Left Control)
        0x29, 0xE7, //   Usage Maximum (Right GUI)
        0x15, 0x00, //   Logical Minimum (0)
        0x25, 0x01, //   Logical Maximum (1)
        0x75, 0x01, //   Report Size (1)
        0x95, 0x08, //   Report Count (8)
        0x81, 0x02, //   Input (Data, Variable, Absolute)
        //
        //   - Reserved byte -
        0x75, 0x08, //   Report Size (8)
        0x95, 0x01, //   Report Count (1)
        0x81, 0x03, //   Input (Constant, Variable, Absolute)
        //
        //   - Key bitmap -
        0x15, 0x00, //   Logical Minimum (0)
        0x25, 0x01, //   Logical Maximum (1)
        0x19, 0x00, //   Usage Minimum (0)
        0x29, max_usage, //   Usage Maximum
        0x75, 0x01, //   Report Size (1)
        0x95, max_usage + 1, //   Report Count
        0x81, 0x02, //   Input (Data, Variable, Absolute)
        //
        0xC0, // End Collection
    ]
}

const NKRO_DESCRIPTOR: [u8; NKRO_DESCRIPTOR_LEN] = nkro_descriptor(NKRO_MAX_USAGE);
const NKRO_EXTENDED_DESCRIPTOR: [u8; NKRO_DESCRIPTOR_LEN] =
    nkro_descriptor(NKRO_EXTENDED_MAX_USAGE);

/// NKRO keyboard, usages 0x00..=0x67 (13 bitmap bytes).
pub const KEYBOARD_NKRO_REPORT_DESCRIPTOR: &[u8] = &NKRO_DESCRIPTOR;

/// NKRO keyboard, usages 0x00..=0x97 (19 bitmap bytes).
pub const KEYBOARD_NKRO_EXTENDED_REPORT_DESCRIPTOR: &[u8] = &NKRO_EXTENDED_DESCRIPTOR;

/// Keyboard with report id 1 and six one-byte usage slots.
pub const KEYBOARD_HKRO_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    0x85, REPORT_ID_KEYBOARD, //   Report ID
    0x05, 0x07, //   Usage Page (Keyboard/Keypad)
    0x19, 0xE0, //   Usage Minimum (Left Control)
    0x29, 0xE7, //   Usage Maximum (Right GUI)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    0x75, 0x08, //   Report Size (8)
    0x95, 0x01, //   Report Count (1)
    0x81, 0x03, //   Input (Constant, Variable, Absolute)
    //
    //   - Key slots -
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0xFF, //   Usage Maximum (255)
    0x75, 0x08, //   Report Size (8)
    0x95, BOOT_KEY_LEN as u8, //   Report Count
    0x81, 0x00, //   Input (Data, Array, Absolute)
    //
    0xC0, // End Collection
];
