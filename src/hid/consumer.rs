//! Consumer Control HID report - media keys, volume, etc.
//!
//! Consumer Control is a separate HID usage page (0x0C) that handles
//! volume, transport (play/pause/next) and application-launch keys.
//!
//! Layout (`1 + K * W` bytes):
//! ```text
//! Byte 0:   Report ID (0x02)
//! Byte 1..: K usage slots, W = 1 (basic) or 2 (full, little-endian) bytes each
//! ```

use crate::config::{
    UsageWidth, CONSUMER_DEFAULT_SLOTS, CONSUMER_MAX_SLOTS, REPORT_ID_CONSUMER, USAGE_PAGE_CONSUMER,
};
use heapless::Vec;

/// Common consumer control usage codes (Usage Page 0x0C).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum ConsumerUsage {
    Sleep = 0x0032,
    NextTrack = 0x00B5,
    PrevTrack = 0x00B6,
    Stop = 0x00B7,
    PlayPause = 0x00CD,
    Mute = 0x00E2,
    VolumeUp = 0x00E9,
    VolumeDown = 0x00EA,
    LaunchEmail = 0x018A,
    LaunchCalculator = 0x0192,
    BrowserHome = 0x0223,
    BrowserBack = 0x0224,
}

impl ConsumerUsage {
    /// Page-qualified form (`0x000C_uuuu`) for [`Engine::press_usage`].
    ///
    /// [`Engine::press_usage`]: crate::engine::Engine::press_usage
    pub const fn encoded(self) -> u32 {
        (USAGE_PAGE_CONSUMER as u32) << 16 | self as u32
    }
}

impl From<ConsumerUsage> for u16 {
    fn from(usage: ConsumerUsage) -> Self {
        usage as u16
    }
}

/// Consumer Control HID report.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConsumerReport {
    /// Bytes per slot on the wire.
    pub width: UsageWidth,
    /// Usage slots, 0 = empty.
    pub keys: Vec<u16, CONSUMER_MAX_SLOTS>,
}

impl ConsumerReport {
    /// Total bytes on the wire, including the report id.
    pub fn len(&self) -> usize {
        1 + self.keys.len() * self.width.bytes()
    }

    /// Parse a consumer report carrying `slots` usages of the given width.
    pub fn from_bytes(data: &[u8], width: UsageWidth, slots: usize) -> Option<Self> {
        if slots > CONSUMER_MAX_SLOTS || data.len() < 1 + slots * width.bytes() {
            return None;
        }
        if data[0] != REPORT_ID_CONSUMER {
            return None;
        }
        let mut keys = Vec::new();
        for i in 0..slots {
            let usage = match width {
                UsageWidth::Basic => data[1 + i] as u16,
                UsageWidth::Full => u16::from_le_bytes([data[1 + 2 * i], data[2 + 2 * i]]),
            };
            keys.push(usage).ok()?;
        }
        Some(Self { width, keys })
    }

    /// Serialize to HID report bytes. Returns 0 if `buf` is too small.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        let len = self.len();
        if buf.len() < len {
            return 0;
        }
        buf[0] = REPORT_ID_CONSUMER;
        for (i, &usage) in self.keys.iter().enumerate() {
            match self.width {
                UsageWidth::Basic => buf[1 + i] = usage as u8,
                UsageWidth::Full => {
                    buf[1 + 2 * i..3 + 2 * i].copy_from_slice(&usage.to_le_bytes());
                }
            }
        }
        len
    }

    /// Check if any key is pressed.
    pub fn is_empty(&self) -> bool {
        self.keys.iter().all(|&k| k == 0)
    }
}

/// Consumer Control descriptor: report id 2, six 16-bit usage slots
/// (usages 0x000..=0xFFF).
pub const CONSUMER_FULL_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x0C, // Usage Page (Consumer)
    0x09, 0x01, // Usage (Consumer Control)
    0xA1, 0x01, // Collection (Application)
    0x85, REPORT_ID_CONSUMER, //   Report ID
    0x05, 0x0C, //   Usage Page (Consumer)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x0F, //   Logical Maximum (4095)
    0x19, 0x00, //   Usage Minimum (0)
    0x2A, 0xFF, 0x0F, //   Usage Maximum (4095)
    0x75, 0x10, //   Report Size (16)
    0x95, CONSUMER_DEFAULT_SLOTS as u8, //   Report Count
    0x81, 0x00, //   Input (Data, Array, Absolute)
    0xC0, // End Collection
];

/// Consumer Control descriptor: report id 2, six 8-bit usage slots.
pub const CONSUMER_BASIC_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x0C, // Usage Page (Consumer)
    0x09, 0x01, // Usage (Consumer Control)
    0xA1, 0x01, // Collection (Application)
    0x85, REPORT_ID_CONSUMER, //   Report ID
    0x05, 0x0C, //   Usage Page (Consumer)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0xFF, //   Usage Maximum (255)
    0x75, 0x08, //   Report Size (8)
    0x95, CONSUMER_DEFAULT_SLOTS as u8, //   Report Count
    0x81, 0x00, //   Input (Data, Array, Absolute)
    0xC0, // End Collection
];
