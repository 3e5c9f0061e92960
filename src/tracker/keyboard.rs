//! Keyboard key tracking.
//!
//! Two storage strategies share the [`KeyTracker`] interface:
//!
//! - [`NkroKeys`]: one bit per usage, any number of simultaneous keys.
//! - [`HkroKeys`]: a fixed number of usage slots, first empty slot wins,
//!   presses beyond capacity are dropped.
//!
//! [`KeyboardTracker`] selects one of them at construction. Both keep a
//! `keys_held` counter so the boot view can detect rollover.

use crate::config::{KeyboardReportType, BOOT_KEY_LEN, HKRO_MAX_SLOTS, NKRO_MAX_KEY_BYTES};
use crate::error::{Error, Result};
use crate::hid::keyboard::KEY_DATA_CAPACITY;
use heapless::Vec;

/// Common interface of the keyboard key stores.
///
/// Mutations return `Ok(true)` when the reported key data changed.
pub trait KeyTracker {
    fn press(&mut self, usage: u16) -> Result<bool>;
    fn release(&mut self, usage: u16) -> Result<bool>;
    fn is_pressed(&self, usage: u16) -> bool;
    /// Release every key. Returns whether anything was held.
    fn clear(&mut self) -> bool;
    /// Number of logically held keys.
    fn keys_held(&self) -> usize;
    /// Key-data bytes of the report-protocol report.
    fn key_data(&self) -> Vec<u8, KEY_DATA_CAPACITY>;
    /// Up to six held usages for the boot report, zero padded.
    fn boot_keys(&self) -> [u8; BOOT_KEY_LEN];
}

// NKRO

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NkroKeys {
    bitmap: [u8; NKRO_MAX_KEY_BYTES],
    max_usage: u8,
    keys_held: usize,
}

impl NkroKeys {
    pub fn new(extended: bool) -> Self {
        Self {
            bitmap: [0; NKRO_MAX_KEY_BYTES],
            max_usage: KeyboardReportType::nkro_max_usage(extended),
            keys_held: 0,
        }
    }

    pub fn max_usage(&self) -> u8 {
        self.max_usage
    }

    fn bytes(&self) -> usize {
        (self.max_usage as usize + 1) / 8
    }

    fn check_usage(&self, usage: u16) -> Result<usize> {
        if usage == 0 || usage > self.max_usage as u16 {
            warn!("usage {} outside NKRO range", usage);
            return Err(Error::OutOfRange);
        }
        Ok(usage as usize)
    }

    fn test(&self, usage: usize) -> bool {
        self.bitmap[usage / 8] & (1 << (usage % 8)) != 0
    }
}

impl KeyTracker for NkroKeys {
    fn press(&mut self, usage: u16) -> Result<bool> {
        let usage = self.check_usage(usage)?;
        if self.test(usage) {
            return Ok(false);
        }
        self.bitmap[usage / 8] |= 1 << (usage % 8);
        self.keys_held += 1;
        Ok(true)
    }

    fn release(&mut self, usage: u16) -> Result<bool> {
        let usage = self.check_usage(usage)?;
        if !self.test(usage) {
            return Ok(false);
        }
        self.bitmap[usage / 8] &= !(1 << (usage % 8));
        self.keys_held -= 1;
        Ok(true)
    }

    fn is_pressed(&self, usage: u16) -> bool {
        usage != 0 && usage <= self.max_usage as u16 && self.test(usage as usize)
    }

    fn clear(&mut self) -> bool {
        let held = self.keys_held > 0;
        self.bitmap = [0; NKRO_MAX_KEY_BYTES];
        self.keys_held = 0;
        held
    }

    fn keys_held(&self) -> usize {
        self.keys_held
    }

    fn key_data(&self) -> Vec<u8, KEY_DATA_CAPACITY> {
        let mut data = Vec::new();
        // NKRO_MAX_KEY_BYTES <= KEY_DATA_CAPACITY, checked in hid::keyboard
        let _ = data.extend_from_slice(&self.bitmap[..self.bytes()]);
        data
    }

    fn boot_keys(&self) -> [u8; BOOT_KEY_LEN] {
        let mut keys = [0u8; BOOT_KEY_LEN];
        let held = (1..=self.max_usage as usize).filter(|&u| self.test(u));
        for (slot, usage) in keys.iter_mut().zip(held) {
            *slot = usage as u8;
        }
        keys
    }
}

// HKRO

/// Overflow presses remembered beyond the slots, for rollover counting.
pub const HKRO_MAX_DROPPED: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HkroKeys {
    slots: Vec<u8, HKRO_MAX_SLOTS>,
    /// Held usages that found no free slot.
    dropped: Vec<u8, HKRO_MAX_DROPPED>,
}

impl HkroKeys {
    /// `slots` is clamped to `1..=HKRO_MAX_SLOTS`.
    pub fn new(slots: usize) -> Self {
        let mut storage = Vec::new();
        let _ = storage.resize(slots.clamp(1, HKRO_MAX_SLOTS), 0);
        Self {
            slots: storage,
            dropped: Vec::new(),
        }
    }

    pub fn slots(&self) -> &[u8] {
        &self.slots
    }

    /// Held usages that are not in the report.
    pub fn dropped(&self) -> &[u8] {
        &self.dropped
    }

    fn occupied(&self) -> usize {
        self.slots.iter().filter(|&&k| k != 0).count()
    }

    fn check_usage(usage: u16) -> Result<u8> {
        match u8::try_from(usage) {
            Ok(u) if u != 0 => Ok(u),
            _ => {
                warn!("usage {} outside HKRO range", usage);
                Err(Error::OutOfRange)
            }
        }
    }
}

impl KeyTracker for HkroKeys {
    fn press(&mut self, usage: u16) -> Result<bool> {
        let usage = Self::check_usage(usage)?;
        if self.slots.contains(&usage) || self.dropped.contains(&usage) {
            return Ok(false);
        }
        match self.slots.iter_mut().find(|k| **k == 0) {
            Some(slot) => {
                *slot = usage;
                Ok(true)
            }
            None => {
                debug!("no free key slot, usage {} dropped", usage);
                if self.dropped.push(usage).is_err() {
                    warn!("overflow list full, usage {} not counted", usage);
                }
                Ok(false)
            }
        }
    }

    fn release(&mut self, usage: u16) -> Result<bool> {
        let usage = Self::check_usage(usage)?;
        if let Some(slot) = self.slots.iter_mut().find(|k| **k == usage) {
            *slot = 0;
            return Ok(true);
        }
        if let Some(i) = self.dropped.iter().position(|&k| k == usage) {
            self.dropped.swap_remove(i);
        }
        Ok(false)
    }

    fn is_pressed(&self, usage: u16) -> bool {
        usage != 0 && self.slots.iter().any(|&k| k as u16 == usage)
    }

    fn clear(&mut self) -> bool {
        let held = self.keys_held() > 0;
        self.slots.iter_mut().for_each(|k| *k = 0);
        self.dropped.clear();
        held
    }

    fn keys_held(&self) -> usize {
        self.occupied() + self.dropped.len()
    }

    fn key_data(&self) -> Vec<u8, KEY_DATA_CAPACITY> {
        let mut data = Vec::new();
        let _ = data.extend_from_slice(&self.slots);
        data
    }

    fn boot_keys(&self) -> [u8; BOOT_KEY_LEN] {
        let mut keys = [0u8; BOOT_KEY_LEN];
        let held = self.slots.iter().copied().filter(|&k| k != 0);
        for (slot, usage) in keys.iter_mut().zip(held) {
            *slot = usage;
        }
        keys
    }
}

/// Keyboard key store selected from [`KeyboardReportType`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyboardTracker {
    Nkro(NkroKeys),
    Hkro(HkroKeys),
}

impl KeyboardTracker {
    pub fn new(kind: KeyboardReportType) -> Self {
        match kind {
            KeyboardReportType::Nkro { extended } => Self::Nkro(NkroKeys::new(extended)),
            KeyboardReportType::Hkro { slots } => Self::Hkro(HkroKeys::new(slots)),
        }
    }

    fn inner(&self) -> &dyn KeyTracker {
        match self {
            Self::Nkro(k) => k,
            Self::Hkro(k) => k,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn KeyTracker {
        match self {
            Self::Nkro(k) => k,
            Self::Hkro(k) => k,
        }
    }

    /// Whether the boot view has to report rollover.
    pub fn is_rollover(&self) -> bool {
        self.keys_held() > BOOT_KEY_LEN
    }
}

impl KeyTracker for KeyboardTracker {
    fn press(&mut self, usage: u16) -> Result<bool> {
        let changed = self.inner_mut().press(usage)?;
        debug!("key {} pressed, held {}", usage, self.keys_held());
        Ok(changed)
    }

    fn release(&mut self, usage: u16) -> Result<bool> {
        let changed = self.inner_mut().release(usage)?;
        debug!("key {} released, held {}", usage, self.keys_held());
        Ok(changed)
    }

    fn is_pressed(&self, usage: u16) -> bool {
        self.inner().is_pressed(usage)
    }

    fn clear(&mut self) -> bool {
        self.inner_mut().clear()
    }

    fn keys_held(&self) -> usize {
        self.inner().keys_held()
    }

    fn key_data(&self) -> Vec<u8, KEY_DATA_CAPACITY> {
        self.inner().key_data()
    }

    fn boot_keys(&self) -> [u8; BOOT_KEY_LEN] {
        self.inner().boot_keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nkro_press_release_counts_once() {
        let mut keys = NkroKeys::new(false);
        assert_eq!(keys.press(0x04), Ok(true));
        assert_eq!(keys.press(0x04), Ok(false));
        assert_eq!(keys.keys_held(), 1);
        assert!(keys.is_pressed(0x04));

        assert_eq!(keys.release(0x05), Ok(false));
        assert_eq!(keys.release(0x04), Ok(true));
        assert_eq!(keys.keys_held(), 0);
    }

    #[test]
    fn nkro_rejects_usage_past_max() {
        let mut keys = NkroKeys::new(false);
        assert_eq!(keys.press(0x67), Ok(true));
        assert_eq!(keys.press(0x68), Err(Error::OutOfRange));
        assert_eq!(keys.keys_held(), 1);
        assert!(!keys.is_pressed(0x68));

        let mut extended = NkroKeys::new(true);
        assert_eq!(extended.press(0x97), Ok(true));
        assert_eq!(extended.press(0x98), Err(Error::OutOfRange));
        assert_eq!(extended.key_data().len(), 19);
    }

    #[test]
    fn nkro_boot_keys_ascending() {
        let mut keys = NkroKeys::new(false);
        for usage in [0x1D, 0x04, 0x10] {
            keys.press(usage).unwrap();
        }
        assert_eq!(keys.boot_keys(), [0x04, 0x10, 0x1D, 0, 0, 0]);
    }

    #[test]
    fn hkro_fills_first_empty_slot() {
        let mut keys = HkroKeys::new(3);
        keys.press(0x04).unwrap();
        keys.press(0x05).unwrap();
        keys.press(0x06).unwrap();
        keys.release(0x05).unwrap();
        keys.press(0x07).unwrap();
        assert_eq!(keys.slots(), &[0x04, 0x07, 0x06]);
        assert_eq!(keys.boot_keys(), [0x04, 0x07, 0x06, 0, 0, 0]);
    }

    #[test]
    fn hkro_overflow_dropped_but_counted() {
        let mut keys = HkroKeys::new(2);
        assert_eq!(keys.press(0x04), Ok(true));
        assert_eq!(keys.press(0x05), Ok(true));
        assert_eq!(keys.press(0x06), Ok(false));
        assert!(!keys.is_pressed(0x06));
        assert_eq!(keys.keys_held(), 3);

        assert_eq!(keys.release(0x06), Ok(false));
        assert_eq!(keys.keys_held(), 2);
        assert_eq!(keys.release(0x06), Ok(false));
        assert_eq!(keys.keys_held(), 2);
    }

    #[test]
    fn hkro_stray_release_keeps_rollover() {
        let mut keys = KeyboardTracker::new(KeyboardReportType::Hkro { slots: 6 });
        for usage in 0x04..=0x0A {
            keys.press(usage).unwrap();
        }
        assert_eq!(keys.keys_held(), 7);
        assert!(keys.is_rollover());

        assert_eq!(keys.release(0x30), Ok(false));
        assert_eq!(keys.keys_held(), 7);
        assert!(keys.is_rollover());

        assert_eq!(keys.release(0x0A), Ok(false));
        assert_eq!(keys.keys_held(), 6);
        assert!(!keys.is_rollover());
    }

    #[test]
    fn hkro_dropped_usage_pressed_twice_counts_once() {
        let mut keys = HkroKeys::new(1);
        keys.press(0x04).unwrap();
        assert_eq!(keys.press(0x05), Ok(false));
        assert_eq!(keys.press(0x05), Ok(false));
        assert_eq!(keys.dropped(), &[0x05]);
        assert_eq!(keys.keys_held(), 2);
        assert!(keys.clear());
        assert_eq!(keys.keys_held(), 0);
        assert!(keys.dropped().is_empty());
    }

    #[test]
    fn hkro_rejects_wide_usage() {
        let mut keys = HkroKeys::new(6);
        assert_eq!(keys.press(0x100), Err(Error::OutOfRange));
        assert_eq!(keys.press(0), Err(Error::OutOfRange));
        assert_eq!(keys.keys_held(), 0);
    }

    #[test]
    fn tracker_rollover_after_six_keys() {
        let mut keys = KeyboardTracker::new(KeyboardReportType::Nkro { extended: false });
        for usage in 0x04..0x0A {
            keys.press(usage).unwrap();
        }
        assert!(!keys.is_rollover());
        keys.press(0x0A).unwrap();
        assert!(keys.is_rollover());
        keys.release(0x0A).unwrap();
        assert!(!keys.is_rollover());
        assert!(keys.clear());
        assert_eq!(keys.keys_held(), 0);
    }
}
