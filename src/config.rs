//! Report-engine constants and runtime configuration.
//!
//! Wire-level constants (report ids, usage ranges, capacities) live here as
//! compile-time values so they can be tuned in one place. Choices that
//! select between report variants are carried by [`EngineConfig`] and fixed
//! when the [`Engine`](crate::engine::Engine) is constructed.

// Report ids

pub const REPORT_ID_KEYBOARD: u8 = 0x01;
pub const REPORT_ID_CONSUMER: u8 = 0x02;
pub const REPORT_ID_MOUSE: u8 = 0x03;
pub const REPORT_ID_TRACKPAD: u8 = 0x05;
pub const REPORT_ID_FEATURE_PTP_CAPABILITIES: u8 = 0x06;
pub const REPORT_ID_FEATURE_PTPHQA: u8 = 0x07;
pub const REPORT_ID_FEATURE_PTP_CONFIGURATION: u8 = 0x08;
pub const REPORT_ID_FEATURE_PTP_SELECTIVE: u8 = 0x09;

// Usage pages

/// Keyboard/Keypad usage page.
pub const USAGE_PAGE_KEYBOARD: u16 = 0x07;
/// Consumer usage page.
pub const USAGE_PAGE_CONSUMER: u16 = 0x0C;

// Keyboard

/// Highest usage covered by the standard NKRO bitmap (Keypad `=`).
pub const NKRO_MAX_USAGE: u8 = 0x67;
/// Highest usage covered by the extended NKRO bitmap (Keyboard LANG8).
pub const NKRO_EXTENDED_MAX_USAGE: u8 = 0x97;
/// Bitmap bytes needed for the extended range; sizes the key-data buffer.
pub const NKRO_MAX_KEY_BYTES: usize = (NKRO_EXTENDED_MAX_USAGE as usize + 1) / 8;

/// First usage of the modifier sub-range (Left Control).
pub const USAGE_LEFT_CONTROL: u16 = 0xE0;
/// Last usage of the modifier sub-range (Right GUI).
pub const USAGE_RIGHT_GUI: u16 = 0xE7;

/// Key slots in the legacy boot report.
pub const BOOT_KEY_LEN: usize = 6;
/// Sentinel written to every boot slot when too many keys are held.
pub const HID_ERROR_ROLLOVER: u8 = 0x01;

/// Upper bound for configurable HKRO slot counts.
pub const HKRO_MAX_SLOTS: usize = 32;
/// Default HKRO slot count.
pub const HKRO_DEFAULT_SLOTS: usize = 6;

// Consumer

/// Upper bound for configurable consumer slot counts.
pub const CONSUMER_MAX_SLOTS: usize = 16;
/// Default consumer slot count.
pub const CONSUMER_DEFAULT_SLOTS: usize = 6;

// Mouse

pub const MOUSE_NUM_BUTTONS: usize = 5;

// Trackpad

/// Maximum simultaneous fingers reported in one touch report.
pub const TRACKPAD_MAX_FINGERS: usize = 5;
/// Period of the aggregation tick (ms).
pub const TRACKPAD_TICK_MS: u64 = 10;
/// Logical coordinate maxima reported by the sensor.
pub const TRACKPAD_LOGICAL_X: u16 = 4095;
pub const TRACKPAD_LOGICAL_Y: u16 = 4095;
/// Physical extents in 0.01 cm units.
pub const TRACKPAD_PHYSICAL_X: u16 = 1000;
pub const TRACKPAD_PHYSICAL_Y: u16 = 750;
/// Capacity of the trackpad event queue.
pub const TRACKPAD_EVENT_QUEUE: usize = 16;

// USB (embedded binary)

/// USB VID/PID - use the "pid.codes" open-source test VID.
/// Replace with your own allocated VID/PID for production.
pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x0002;

pub const USB_MANUFACTURER: &str = "kbreport";
pub const USB_PRODUCT: &str = "kbreport Keyboard";
pub const USB_SERIAL_NUMBER: &str = "000001";

/// USB HID polling interval (ms).
pub const USB_HID_POLL_MS: u8 = 1;

/// Key switch debounce time (ms).
pub const KEY_DEBOUNCE_MS: u64 = 5;

// Runtime selection

/// Keyboard report variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyboardReportType {
    /// Bitmap indexed by usage, no practical rollover limit.
    Nkro {
        /// Cover usages up to LANG8 instead of Keypad `=`.
        extended: bool,
    },
    /// Fixed number of one-byte usage slots.
    Hkro { slots: usize },
}

impl KeyboardReportType {
    /// Highest usage the NKRO bitmap can hold.
    pub const fn nkro_max_usage(extended: bool) -> u8 {
        if extended {
            NKRO_EXTENDED_MAX_USAGE
        } else {
            NKRO_MAX_USAGE
        }
    }
}

/// Consumer usage width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsageWidth {
    /// One byte per slot, usages 0x00..=0xFF.
    Basic,
    /// Two bytes per slot (little-endian).
    Full,
}

impl UsageWidth {
    pub const fn bytes(self) -> usize {
        match self {
            UsageWidth::Basic => 1,
            UsageWidth::Full => 2,
        }
    }
}

/// When accumulated finger samples are turned into a touch report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlushPolicy {
    /// Flush once every finger of the scan has reported. A cycle that stays
    /// incomplete for `stale_ticks` ticks is flushed as-is (0 = never).
    WaitForAll { stale_ticks: u8 },
    /// Flush on every tick, reporting only the most recently updated finger.
    PerTick,
}

/// How the sensor's per-scan contact count is tracked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ContactCountPolicy {
    /// A zero-contact scan keeps the last non-zero count.
    Sticky,
    /// Take the sensor's count verbatim, including zero.
    FollowScan,
}

/// Construction-time engine configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineConfig {
    pub keyboard: KeyboardReportType,
    pub consumer_width: UsageWidth,
    pub consumer_slots: usize,
    pub flush_policy: FlushPolicy,
    pub contact_policy: ContactCountPolicy,
    /// Invert the wheel axis of pointer-mode samples.
    pub reverse_scroll: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            keyboard: KeyboardReportType::Nkro { extended: false },
            consumer_width: UsageWidth::Full,
            consumer_slots: CONSUMER_DEFAULT_SLOTS,
            flush_policy: FlushPolicy::WaitForAll { stale_ticks: 4 },
            contact_policy: ContactCountPolicy::Sticky,
            reverse_scroll: false,
        }
    }
}

impl EngineConfig {
    pub fn with_keyboard(mut self, keyboard: KeyboardReportType) -> Self {
        self.keyboard = match keyboard {
            KeyboardReportType::Hkro { slots } => KeyboardReportType::Hkro {
                slots: slots.clamp(1, HKRO_MAX_SLOTS),
            },
            nkro => nkro,
        };
        self
    }

    pub fn with_consumer(mut self, width: UsageWidth, slots: usize) -> Self {
        self.consumer_width = width;
        self.consumer_slots = slots.clamp(1, CONSUMER_MAX_SLOTS);
        self
    }

    pub fn with_flush_policy(mut self, policy: FlushPolicy) -> Self {
        self.flush_policy = policy;
        self
    }

    pub fn with_contact_policy(mut self, policy: ContactCountPolicy) -> Self {
        self.contact_policy = policy;
        self
    }

    pub fn with_reverse_scroll(mut self, reverse: bool) -> Self {
        self.reverse_scroll = reverse;
        self
    }
}
