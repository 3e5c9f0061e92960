//! HID report layouts.
//!
//! Every report the engine produces is a plain value with a byte-exact
//! `serialize` writer and a `from_bytes` reader. [`HidReport`] is the unit
//! handed to a [`ReportSink`](crate::engine::ReportSink).

pub mod consumer;
pub mod descriptor;
pub mod feature;
pub mod keyboard;
pub mod mouse;
pub mod touch;


pub use consumer::ConsumerReport;
pub use keyboard::{BootKeyboardReport, KeyboardReport};
pub use mouse::MouseReport;
pub use touch::{Finger, TouchReport};

use crate::config::{
    EngineConfig, KeyboardReportType, REPORT_ID_CONSUMER, REPORT_ID_KEYBOARD, REPORT_ID_MOUSE,
    REPORT_ID_TRACKPAD,
};

/// Largest input report on the wire (keyboard with 32 HKRO slots).
pub const MAX_REPORT_SIZE: usize = keyboard::KEYBOARD_HEADER_SIZE + keyboard::KEY_DATA_CAPACITY;

const _: () = assert!(touch::TOUCH_REPORT_SIZE <= MAX_REPORT_SIZE);

/// Any input report the engine can emit.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidReport {
    Keyboard(KeyboardReport),
    Boot(BootKeyboardReport),
    Consumer(ConsumerReport),
    Mouse(MouseReport),
    Touch(TouchReport),
}

impl HidReport {
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        match self {
            HidReport::Keyboard(k) => k.serialize(buf),
            HidReport::Boot(b) => b.serialize(buf),
            HidReport::Consumer(c) => c.serialize(buf),
            HidReport::Mouse(m) => m.serialize(buf),
            HidReport::Touch(t) => t.serialize(buf),
        }
    }

    /// Report id written in byte 0, `None` for the boot report.
    pub fn report_id(&self) -> Option<u8> {
        match self {
            HidReport::Keyboard(_) => Some(REPORT_ID_KEYBOARD),
            HidReport::Boot(_) => None,
            HidReport::Consumer(_) => Some(REPORT_ID_CONSUMER),
            HidReport::Mouse(_) => Some(REPORT_ID_MOUSE),
            HidReport::Touch(_) => Some(REPORT_ID_TRACKPAD),
        }
    }

    pub fn is_keyboard(&self) -> bool {
        matches!(self, HidReport::Keyboard(_) | HidReport::Boot(_))
    }

    pub fn is_consumer(&self) -> bool {
        matches!(self, HidReport::Consumer(_))
    }

    pub fn is_mouse(&self) -> bool {
        matches!(self, HidReport::Mouse(_))
    }

    pub fn is_touch(&self) -> bool {
        matches!(self, HidReport::Touch(_))
    }
}

/// Classify a report-protocol input report by its leading report id.
///
/// Key-data and slot lengths are taken from `config`, so the bytes must
/// come from an engine built with the same configuration.
pub fn classify_report(data: &[u8], config: &EngineConfig) -> Option<HidReport> {
    match *data.first()? {
        REPORT_ID_KEYBOARD => {
            let key_len = match config.keyboard {
                KeyboardReportType::Nkro { extended } => {
                    (KeyboardReportType::nkro_max_usage(extended) as usize + 1) / 8
                }
                KeyboardReportType::Hkro { slots } => slots,
            };
            KeyboardReport::from_bytes(data, key_len).map(HidReport::Keyboard)
        }
        REPORT_ID_CONSUMER => {
            ConsumerReport::from_bytes(data, config.consumer_width, config.consumer_slots)
                .map(HidReport::Consumer)
        }
        REPORT_ID_MOUSE => MouseReport::from_bytes(data).map(HidReport::Mouse),
        REPORT_ID_TRACKPAD => TouchReport::from_bytes(data).map(HidReport::Touch),
        _ => None,
    }
}
