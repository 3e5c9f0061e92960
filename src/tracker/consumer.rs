//! Consumer-control key tracking: slot semantics, 8- or 16-bit usages.

use crate::config::{UsageWidth, CONSUMER_MAX_SLOTS};
use crate::error::{Error, Result};
use heapless::Vec;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsumerTracker {
    width: UsageWidth,
    slots: Vec<u16, CONSUMER_MAX_SLOTS>,
}

impl ConsumerTracker {
    /// `slots` is clamped to `1..=CONSUMER_MAX_SLOTS`.
    pub fn new(width: UsageWidth, slots: usize) -> Self {
        let mut storage = Vec::new();
        let _ = storage.resize(slots.clamp(1, CONSUMER_MAX_SLOTS), 0);
        Self {
            width,
            slots: storage,
        }
    }

    pub fn width(&self) -> UsageWidth {
        self.width
    }

    pub fn slots(&self) -> &Vec<u16, CONSUMER_MAX_SLOTS> {
        &self.slots
    }

    fn check_usage(&self, usage: u16) -> Result<()> {
        if usage == 0 {
            return Err(Error::OutOfRange);
        }
        if self.width == UsageWidth::Basic && usage > 0xFF {
            warn!("consumer usage {} needs full width", usage);
            return Err(Error::UnsupportedUsage);
        }
        Ok(())
    }

    /// Insert into the first empty slot. A full report drops the press.
    pub fn press(&mut self, usage: u16) -> Result<bool> {
        self.check_usage(usage)?;
        if self.slots.contains(&usage) {
            return Ok(false);
        }
        match self.slots.iter_mut().find(|k| **k == 0) {
            Some(slot) => {
                *slot = usage;
                debug!("consumer {} pressed", usage);
                Ok(true)
            }
            None => {
                debug!("no free consumer slot, usage {} dropped", usage);
                Ok(false)
            }
        }
    }

    pub fn release(&mut self, usage: u16) -> Result<bool> {
        self.check_usage(usage)?;
        match self.slots.iter_mut().find(|k| **k == usage) {
            Some(slot) => {
                *slot = 0;
                debug!("consumer {} released", usage);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn is_pressed(&self, usage: u16) -> bool {
        usage != 0 && self.slots.contains(&usage)
    }

    pub fn clear(&mut self) -> bool {
        let held = self.slots.iter().any(|&k| k != 0);
        self.slots.iter_mut().for_each(|k| *k = 0);
        held
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_width_rejects_wide_usage() {
        let mut consumer = ConsumerTracker::new(UsageWidth::Basic, 6);
        assert_eq!(consumer.press(0x0223), Err(Error::UnsupportedUsage));
        assert_eq!(consumer.press(0xE9), Ok(true));
        assert!(consumer.is_pressed(0xE9));
    }

    #[test]
    fn full_width_slots_and_overflow() {
        let mut consumer = ConsumerTracker::new(UsageWidth::Full, 2);
        assert_eq!(consumer.press(0x0223), Ok(true));
        assert_eq!(consumer.press(0xE9), Ok(true));
        assert_eq!(consumer.press(0xEA), Ok(false));
        assert_eq!(&consumer.slots()[..], &[0x0223, 0xE9]);

        assert_eq!(consumer.release(0x0223), Ok(true));
        assert_eq!(consumer.press(0xEA), Ok(true));
        assert_eq!(&consumer.slots()[..], &[0xEA, 0xE9]);

        assert!(consumer.clear());
        assert!(!consumer.clear());
    }

    #[test]
    fn duplicate_press_keeps_single_slot() {
        let mut consumer = ConsumerTracker::new(UsageWidth::Full, 4);
        consumer.press(0xCD).unwrap();
        assert_eq!(consumer.press(0xCD), Ok(false));
        assert_eq!(consumer.slots().iter().filter(|&&k| k == 0xCD).count(), 1);
        assert_eq!(consumer.release(0xCD), Ok(true));
        assert!(!consumer.is_pressed(0xCD));
    }
}
