//! Mouse buttons and motion.
//!
//! Buttons are reference counted like modifiers. Motion (x, y, wheel) is
//! transient: every [`MouseState::set_motion`] overwrites it.

use crate::config::MOUSE_NUM_BUTTONS;
use crate::error::{Error, Result};
use crate::hid::MouseReport;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MouseButton {
    Left = 0,
    Right = 1,
    Middle = 2,
    Back = 3,
    Forward = 4,
}

impl MouseButton {
    pub const ALL: [MouseButton; MOUSE_NUM_BUTTONS] = [
        MouseButton::Left,
        MouseButton::Right,
        MouseButton::Middle,
        MouseButton::Back,
        MouseButton::Forward,
    ];

    pub const fn bit(self) -> u8 {
        1 << (self as u8)
    }

    pub fn from_index(index: u8) -> Result<Self> {
        Self::ALL
            .get(index as usize)
            .copied()
            .ok_or(Error::OutOfRange)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MouseState {
    counts: [u32; MOUSE_NUM_BUTTONS],
    held: u8,
    report: MouseReport,
}

impl MouseState {
    pub const fn new() -> Self {
        Self {
            counts: [0; MOUSE_NUM_BUTTONS],
            held: 0,
            report: MouseReport {
                buttons: 0,
                x: 0,
                y: 0,
                wheel: 0,
            },
        }
    }

    pub fn report(&self) -> MouseReport {
        self.report
    }

    /// Buttons held through press/release.
    pub fn held(&self) -> u8 {
        self.held
    }

    pub fn is_pressed(&self, button: MouseButton) -> bool {
        self.held & button.bit() != 0
    }

    /// Press button `index` (0..5). Returns whether the reported byte changed.
    pub fn press(&mut self, index: u8) -> Result<bool> {
        let button = MouseButton::from_index(index)?;
        let count = &mut self.counts[index as usize];
        *count = count.saturating_add(1);
        debug!("mouse button {} count {}", index, *count);
        self.held |= button.bit();
        Ok(self.sync_buttons())
    }

    pub fn release(&mut self, index: u8) -> Result<bool> {
        let button = MouseButton::from_index(index)?;
        let count = &mut self.counts[index as usize];
        if *count == 0 {
            error!("mouse button {} released too often", index);
            return Err(Error::InvalidState);
        }
        *count -= 1;
        debug!("mouse button {} count {}", index, *count);
        if *count == 0 {
            self.held &= !button.bit();
        }
        Ok(self.sync_buttons())
    }

    pub fn press_mask(&mut self, mask: u8) -> Result<bool> {
        if mask >> MOUSE_NUM_BUTTONS != 0 {
            return Err(Error::OutOfRange);
        }
        let mut changed = false;
        for index in Self::iter_mask(mask) {
            changed |= self.press(index)?;
        }
        Ok(changed)
    }

    /// Validates every bit before releasing any.
    pub fn release_mask(&mut self, mask: u8) -> Result<bool> {
        if mask >> MOUSE_NUM_BUTTONS != 0 {
            return Err(Error::OutOfRange);
        }
        if Self::iter_mask(mask).any(|i| self.counts[i as usize] == 0) {
            error!("mouse buttons {} released too often", mask);
            return Err(Error::InvalidState);
        }
        let mut changed = false;
        for index in Self::iter_mask(mask) {
            changed |= self.release(index)?;
        }
        Ok(changed)
    }

    /// Overwrite the reported buttons and motion with a pointer sample.
    /// Reference counts are left alone.
    pub fn set_motion(&mut self, buttons: u8, x: i8, y: i8, wheel: i8) {
        self.report = MouseReport {
            buttons,
            x,
            y,
            wheel,
        };
        trace!("mouse set {} {} {} {}", buttons, x, y, wheel);
    }

    /// Zero buttons, counts and motion.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    fn sync_buttons(&mut self) -> bool {
        let before = self.report.buttons;
        self.report.buttons = self.held;
        before != self.held
    }

    fn iter_mask(mask: u8) -> impl Iterator<Item = u8> {
        (0..MOUSE_NUM_BUTTONS as u8).filter(move |i| mask & (1 << i) != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buttons_are_reference_counted() {
        let mut mouse = MouseState::new();
        assert_eq!(mouse.press(0), Ok(true));
        assert_eq!(mouse.press(0), Ok(false));
        assert_eq!(mouse.release(0), Ok(false));
        assert!(mouse.is_pressed(MouseButton::Left));
        assert_eq!(mouse.release(0), Ok(true));
        assert_eq!(mouse.report().buttons, 0);
        assert_eq!(mouse.release(0), Err(Error::InvalidState));
    }

    #[test]
    fn button_index_out_of_range() {
        let mut mouse = MouseState::new();
        assert_eq!(mouse.press(5), Err(Error::OutOfRange));
        assert_eq!(mouse.press_mask(0x20), Err(Error::OutOfRange));
        assert_eq!(mouse, MouseState::new());
    }

    #[test]
    fn set_motion_overwrites_not_accumulates() {
        let mut mouse = MouseState::new();
        mouse.set_motion(0x01, 5, -3, 1);
        mouse.set_motion(0x00, 2, 0, 0);
        assert_eq!(
            mouse.report(),
            MouseReport {
                buttons: 0,
                x: 2,
                y: 0,
                wheel: 0
            }
        );
        mouse.clear();
        assert!(mouse.report().is_idle());
    }

    #[test]
    fn release_mask_is_all_or_nothing() {
        let mut mouse = MouseState::new();
        mouse.press_mask(0x03).unwrap();
        assert_eq!(mouse.release_mask(0x07), Err(Error::InvalidState));
        assert_eq!(mouse.held(), 0x03);
        assert_eq!(mouse.release_mask(0x03), Ok(true));
    }
}
