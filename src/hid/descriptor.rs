//! Report descriptor selection and composition.
//!
//! Each report layout module carries its own descriptor fragment. This
//! module picks the fragment matching an [`EngineConfig`] and glues
//! fragments into the single composite descriptor used by one HID
//! interface.

use super::consumer::{CONSUMER_BASIC_REPORT_DESCRIPTOR, CONSUMER_FULL_REPORT_DESCRIPTOR};
use super::keyboard::{
    KEYBOARD_HKRO_REPORT_DESCRIPTOR, KEYBOARD_NKRO_EXTENDED_REPORT_DESCRIPTOR,
    KEYBOARD_NKRO_REPORT_DESCRIPTOR,
};
use super::mouse::MOUSE_REPORT_DESCRIPTOR;
use crate::config::{
    EngineConfig, KeyboardReportType, UsageWidth, BOOT_KEY_LEN, CONSUMER_DEFAULT_SLOTS,
};
use crate::error::{Error, Result};

/// Copy `part` into `out` starting at `at`. Returns the filled buffer and
/// the next write offset.
pub(crate) const fn append<const N: usize>(
    mut out: [u8; N],
    mut at: usize,
    part: &[u8],
) -> ([u8; N], usize) {
    let mut i = 0;
    while i < part.len() {
        out[at] = part[i];
        at += 1;
        i += 1;
    }
    (out, at)
}

const fn concat<const N: usize>(parts: &[&[u8]]) -> [u8; N] {
    let mut out = [0u8; N];
    let mut at = 0;
    let mut p = 0;
    while p < parts.len() {
        let (filled, next) = append(out, at, parts[p]);
        out = filled;
        at = next;
        p += 1;
    }
    assert!(at == N);
    out
}

/// Keyboard fragment for the configured report variant.
///
/// The HKRO fragment declares [`BOOT_KEY_LEN`] slots; any other slot count
/// is rejected with [`Error::UnsupportedConfig`].
pub fn keyboard_descriptor(config: &EngineConfig) -> Result<&'static [u8]> {
    match config.keyboard {
        KeyboardReportType::Nkro { extended: false } => Ok(KEYBOARD_NKRO_REPORT_DESCRIPTOR),
        KeyboardReportType::Nkro { extended: true } => Ok(KEYBOARD_NKRO_EXTENDED_REPORT_DESCRIPTOR),
        KeyboardReportType::Hkro { slots } if slots == BOOT_KEY_LEN => {
            Ok(KEYBOARD_HKRO_REPORT_DESCRIPTOR)
        }
        KeyboardReportType::Hkro { slots } => {
            warn!("no HKRO descriptor for {} slots", slots);
            Err(Error::UnsupportedConfig)
        }
    }
}

/// Consumer fragment for the configured usage width.
///
/// Both fragments declare [`CONSUMER_DEFAULT_SLOTS`] slots; any other slot
/// count is rejected with [`Error::UnsupportedConfig`].
pub fn consumer_descriptor(config: &EngineConfig) -> Result<&'static [u8]> {
    if config.consumer_slots != CONSUMER_DEFAULT_SLOTS {
        warn!("no consumer descriptor for {} slots", config.consumer_slots);
        return Err(Error::UnsupportedConfig);
    }
    Ok(match config.consumer_width {
        UsageWidth::Basic => CONSUMER_BASIC_REPORT_DESCRIPTOR,
        UsageWidth::Full => CONSUMER_FULL_REPORT_DESCRIPTOR,
    })
}

const COMPOSITE_LEN: usize = KEYBOARD_NKRO_REPORT_DESCRIPTOR.len()
    + CONSUMER_FULL_REPORT_DESCRIPTOR.len()
    + MOUSE_REPORT_DESCRIPTOR.len();

/// NKRO keyboard, full-width consumer and mouse behind one interface,
/// distinguished by report id.
pub const COMPOSITE_REPORT_DESCRIPTOR: [u8; COMPOSITE_LEN] = concat(&[
    KEYBOARD_NKRO_REPORT_DESCRIPTOR,
    CONSUMER_FULL_REPORT_DESCRIPTOR,
    MOUSE_REPORT_DESCRIPTOR,
]);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{REPORT_ID_CONSUMER, REPORT_ID_KEYBOARD, REPORT_ID_MOUSE};

    fn report_ids(desc: &[u8]) -> std::vec::Vec<u8> {
        desc.windows(2)
            .filter(|w| w[0] == 0x85)
            .map(|w| w[1])
            .collect()
    }

    #[test]
    fn composite_descriptor_declares_each_report_id_once() {
        assert_eq!(
            report_ids(&COMPOSITE_REPORT_DESCRIPTOR),
            [REPORT_ID_KEYBOARD, REPORT_ID_CONSUMER, REPORT_ID_MOUSE]
        );
        assert_eq!(COMPOSITE_REPORT_DESCRIPTOR.last(), Some(&0xC0));
    }

    #[test]
    fn fragments_follow_config() {
        let cfg = EngineConfig::default()
            .with_keyboard(KeyboardReportType::Hkro { slots: 6 })
            .with_consumer(UsageWidth::Basic, 6);
        assert_eq!(keyboard_descriptor(&cfg), Ok(KEYBOARD_HKRO_REPORT_DESCRIPTOR));
        assert_eq!(consumer_descriptor(&cfg), Ok(CONSUMER_BASIC_REPORT_DESCRIPTOR));

        let cfg = EngineConfig::default();
        assert_eq!(keyboard_descriptor(&cfg), Ok(KEYBOARD_NKRO_REPORT_DESCRIPTOR));
        assert_eq!(consumer_descriptor(&cfg), Ok(CONSUMER_FULL_REPORT_DESCRIPTOR));
    }

    #[test]
    fn extended_nkro_bitmap_covers_lang8() {
        let cfg =
            EngineConfig::default().with_keyboard(KeyboardReportType::Nkro { extended: true });
        let desc = keyboard_descriptor(&cfg).unwrap();
        assert_eq!(desc, KEYBOARD_NKRO_EXTENDED_REPORT_DESCRIPTOR);
        // Usage Maximum and Report Count of the bitmap.
        assert!(desc.windows(2).any(|w| w == [0x29, 0x97]));
        assert!(desc.windows(2).any(|w| w == [0x95, 0x98]));

        let plain = KEYBOARD_NKRO_REPORT_DESCRIPTOR;
        assert!(plain.windows(2).any(|w| w == [0x29, 0x67]));
        assert!(plain.windows(2).any(|w| w == [0x95, 0x68]));
    }

    #[test]
    fn slot_counts_without_descriptor_are_rejected() {
        let cfg = EngineConfig::default().with_keyboard(KeyboardReportType::Hkro { slots: 4 });
        assert_eq!(keyboard_descriptor(&cfg), Err(Error::UnsupportedConfig));

        let cfg = EngineConfig::default().with_consumer(UsageWidth::Full, 3);
        assert_eq!(consumer_descriptor(&cfg), Err(Error::UnsupportedConfig));
    }
}
