//! Reference-counted modifier tracking.
//!
//! Several sources (a held Shift key, a macro, a mod-tap) can assert the
//! same modifier. A modifier bit stays set until every source that
//! registered it has unregistered it. Two overlays sit on top of the
//! explicit state:
//!
//! - *implicit* modifiers are forced on (e.g. `LS(A)` sends Shift),
//! - *masked* modifiers are hidden from the report while set.
//!
//! The reported byte is `(explicit & !masked) | implicit`.

use crate::config::{USAGE_LEFT_CONTROL, USAGE_RIGHT_GUI};
use crate::error::{Error, Result};

/// One of the eight keyboard modifiers, in report bit order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Modifier {
    LeftCtrl = 0,
    LeftShift = 1,
    LeftAlt = 2,
    LeftGui = 3,
    RightCtrl = 4,
    RightShift = 5,
    RightAlt = 6,
    RightGui = 7,
}

impl Modifier {
    pub const ALL: [Modifier; 8] = [
        Modifier::LeftCtrl,
        Modifier::LeftShift,
        Modifier::LeftAlt,
        Modifier::LeftGui,
        Modifier::RightCtrl,
        Modifier::RightShift,
        Modifier::RightAlt,
        Modifier::RightGui,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn bit(self) -> u8 {
        1 << (self as u8)
    }

    /// Map a bit position (0..=7) to its modifier.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Map a Keyboard/Keypad usage in 0xE0..=0xE7 to its modifier.
    pub fn from_usage(usage: u16) -> Option<Self> {
        if (USAGE_LEFT_CONTROL..=USAGE_RIGHT_GUI).contains(&usage) {
            Self::from_index((usage - USAGE_LEFT_CONTROL) as usize)
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModifierState {
    explicit: u8,
    counts: [u32; 8],
    implicit: u8,
    masked: u8,
}

impl ModifierState {
    pub const fn new() -> Self {
        Self {
            explicit: 0,
            counts: [0; 8],
            implicit: 0,
            masked: 0,
        }
    }

    /// Reported modifier byte.
    pub fn effective(&self) -> u8 {
        (self.explicit & !self.masked) | self.implicit
    }

    pub fn explicit(&self) -> u8 {
        self.explicit
    }

    pub fn implicit(&self) -> u8 {
        self.implicit
    }

    pub fn masked(&self) -> u8 {
        self.masked
    }

    pub fn count(&self, modifier: Modifier) -> u32 {
        self.counts[modifier.index()]
    }

    /// Explicit state only; overlays are ignored.
    pub fn is_pressed(&self, modifier: Modifier) -> bool {
        self.explicit & modifier.bit() != 0
    }

    /// Add one holder of `modifier`. Returns whether the reported byte changed.
    pub fn register(&mut self, modifier: Modifier) -> bool {
        let before = self.effective();
        let count = &mut self.counts[modifier.index()];
        *count = count.saturating_add(1);
        self.explicit |= modifier.bit();
        debug!("modifier {} count {}", modifier.index(), *count);
        self.check();
        before != self.effective()
    }

    /// Drop one holder of `modifier`; the bit clears when the last holder
    /// leaves. Fails with [`Error::InvalidState`] if nobody holds it.
    pub fn unregister(&mut self, modifier: Modifier) -> Result<bool> {
        let before = self.effective();
        let count = &mut self.counts[modifier.index()];
        if *count == 0 {
            error!("modifier {} unregistered too often", modifier.index());
            return Err(Error::InvalidState);
        }
        *count -= 1;
        debug!("modifier {} count {}", modifier.index(), *count);
        if *count == 0 {
            self.explicit &= !modifier.bit();
            debug!("modifier {} released", modifier.index());
        }
        self.check();
        Ok(before != self.effective())
    }

    /// Register every modifier whose bit is set in `mask`.
    pub fn register_mask(&mut self, mask: u8) -> bool {
        let before = self.effective();
        for modifier in Self::iter_mask(mask) {
            self.register(modifier);
        }
        before != self.effective()
    }

    /// Unregister every modifier whose bit is set in `mask`.
    ///
    /// All bits are validated first: if any of them has no holder the call
    /// fails with [`Error::InvalidState`] and nothing is released.
    pub fn unregister_mask(&mut self, mask: u8) -> Result<bool> {
        if let Some(m) = Self::iter_mask(mask).find(|m| self.counts[m.index()] == 0) {
            error!("modifier {} unregistered too often", m.index());
            return Err(Error::InvalidState);
        }
        let before = self.effective();
        for modifier in Self::iter_mask(mask) {
            self.unregister(modifier)?;
        }
        Ok(before != self.effective())
    }

    pub fn set_implicit(&mut self, mask: u8) -> bool {
        let before = self.effective();
        self.implicit = mask;
        trace!("implicit modifiers {}", mask);
        before != self.effective()
    }

    pub fn clear_implicit(&mut self) -> bool {
        self.set_implicit(0)
    }

    pub fn set_masked(&mut self, mask: u8) -> bool {
        let before = self.effective();
        self.masked = mask;
        trace!("masked modifiers {}", mask);
        before != self.effective()
    }

    pub fn clear_masked(&mut self) -> bool {
        self.set_masked(0)
    }

    /// Forget every holder and overlay.
    pub fn clear(&mut self) -> bool {
        let before = self.effective();
        *self = Self::new();
        before != 0
    }

    fn iter_mask(mask: u8) -> impl Iterator<Item = Modifier> {
        Modifier::ALL
            .into_iter()
            .filter(move |m| mask & m.bit() != 0)
    }

    fn check(&self) {
        debug_assert!(Modifier::ALL
            .iter()
            .all(|m| (self.counts[m.index()] > 0) == self.is_pressed(*m)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_follows_count() {
        let mut mods = ModifierState::new();
        assert!(mods.register(Modifier::LeftShift));
        assert!(!mods.register(Modifier::LeftShift));
        assert_eq!(mods.count(Modifier::LeftShift), 2);

        assert_eq!(mods.unregister(Modifier::LeftShift), Ok(false));
        assert!(mods.is_pressed(Modifier::LeftShift));
        assert_eq!(mods.unregister(Modifier::LeftShift), Ok(true));
        assert!(!mods.is_pressed(Modifier::LeftShift));
        assert_eq!(mods.effective(), 0);
    }

    #[test]
    fn unregister_without_holder_fails() {
        let mut mods = ModifierState::new();
        assert_eq!(mods.unregister(Modifier::RightAlt), Err(Error::InvalidState));
        assert_eq!(mods, ModifierState::new());
    }

    #[test]
    fn overlay_precedence() {
        let mut mods = ModifierState::new();
        mods.register(Modifier::LeftCtrl);
        mods.register(Modifier::LeftShift);

        assert!(mods.set_masked(Modifier::LeftShift.bit()));
        assert_eq!(mods.effective(), Modifier::LeftCtrl.bit());

        // Implicit wins over masked.
        assert!(mods.set_implicit(Modifier::LeftShift.bit()));
        assert_eq!(mods.effective(), 0x03);

        assert!(!mods.clear_masked());
        assert!(!mods.clear_implicit());
        assert_eq!(mods.effective(), 0x03);
        assert_eq!(mods.explicit(), 0x03);
    }

    #[test]
    fn is_pressed_ignores_overlays() {
        let mut mods = ModifierState::new();
        mods.set_implicit(Modifier::LeftGui.bit());
        assert!(!mods.is_pressed(Modifier::LeftGui));

        mods.register(Modifier::LeftGui);
        mods.set_masked(Modifier::LeftGui.bit());
        assert!(mods.is_pressed(Modifier::LeftGui));
    }

    #[test]
    fn unregister_mask_is_all_or_nothing() {
        let mut mods = ModifierState::new();
        assert!(mods.register_mask(0x05));
        assert_eq!(mods.unregister_mask(0x07), Err(Error::InvalidState));
        assert_eq!(mods.explicit(), 0x05);
        assert_eq!(mods.unregister_mask(0x05), Ok(true));
        assert_eq!(mods.explicit(), 0);
    }

    #[test]
    fn modifier_usage_mapping() {
        assert_eq!(Modifier::from_usage(0xE0), Some(Modifier::LeftCtrl));
        assert_eq!(Modifier::from_usage(0xE7), Some(Modifier::RightGui));
        assert_eq!(Modifier::from_usage(0xE8), None);
        assert_eq!(Modifier::from_usage(0x04), None);
    }
}
