//! The report engine: every tracker behind its own lock, plus the
//! trackpad event queue and host-visible feature state.
//!
//! An [`Engine`] is shared by reference between the key path, the sensor
//! callbacks and the trackpad worker. No method blocks; locks are taken
//! one at a time and never nested.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::{Channel, Receiver, Sender};

use crate::config::{
    EngineConfig, REPORT_ID_FEATURE_PTPHQA, REPORT_ID_FEATURE_PTP_CAPABILITIES,
    REPORT_ID_FEATURE_PTP_CONFIGURATION, REPORT_ID_FEATURE_PTP_SELECTIVE, TRACKPAD_EVENT_QUEUE,
    USAGE_PAGE_CONSUMER, USAGE_PAGE_KEYBOARD,
};
use crate::error::{Error, Result};
use crate::hid::feature::{
    CapabilitiesReport, CertificationReport, InputModeReport, SelectiveReport,
};
use crate::hid::{BootKeyboardReport, ConsumerReport, HidReport, KeyboardReport, MouseReport};
use crate::trackpad::TrackpadEvent;
use crate::tracker::{
    ConsumerTracker, KeyTracker, KeyboardTracker, Modifier, ModifierState, MouseButton,
    MouseState,
};

/// Destination for finished reports (USB endpoint, BLE notifier, test
/// recorder).
pub trait ReportSink {
    fn send_report(&mut self, report: HidReport) -> Result<()>;
}

impl<T: ReportSink + ?Sized> ReportSink for &mut T {
    fn send_report(&mut self, report: HidReport) -> Result<()> {
        (**self).send_report(report)
    }
}

impl<M: RawMutex, const N: usize> ReportSink for Sender<'_, M, HidReport, N> {
    fn send_report(&mut self, report: HidReport) -> Result<()> {
        self.try_send(report).map_err(|_| Error::QueueFull)
    }
}

impl<const N: usize> ReportSink for heapless::Vec<HidReport, N> {
    fn send_report(&mut self, report: HidReport) -> Result<()> {
        self.push(report).map_err(|_| Error::QueueFull)
    }
}

/// Host-writable feature state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct FeatureState {
    selective: SelectiveReport,
    input_mode: InputModeReport,
}

pub struct Engine<M: RawMutex> {
    config: EngineConfig,
    modifiers: Mutex<M, RefCell<ModifierState>>,
    keyboard: Mutex<M, RefCell<KeyboardTracker>>,
    consumer: Mutex<M, RefCell<ConsumerTracker>>,
    mouse: Mutex<M, RefCell<MouseState>>,
    features: Mutex<M, RefCell<FeatureState>>,
    trackpad_events: Channel<M, TrackpadEvent, TRACKPAD_EVENT_QUEUE>,
}

fn with<M: RawMutex, T, R>(mutex: &Mutex<M, RefCell<T>>, f: impl FnOnce(&mut T) -> R) -> R {
    mutex.lock(|cell| f(&mut *cell.borrow_mut()))
}

impl<M: RawMutex> Engine<M> {
    pub fn new(config: EngineConfig) -> Self {
        info!("report engine up");
        Self {
            config,
            modifiers: Mutex::new(RefCell::new(ModifierState::new())),
            keyboard: Mutex::new(RefCell::new(KeyboardTracker::new(config.keyboard))),
            consumer: Mutex::new(RefCell::new(ConsumerTracker::new(
                config.consumer_width,
                config.consumer_slots,
            ))),
            mouse: Mutex::new(RefCell::new(MouseState::new())),
            features: Mutex::new(RefCell::new(FeatureState::default())),
            trackpad_events: Channel::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ═══════════════════════════════════════════════════════════════════
    // Dispatch
    // ═══════════════════════════════════════════════════════════════════

    /// Press `usage` on `page`. Keyboard modifiers (0xE0..=0xE7) go to the
    /// modifier tracker and report whether the modifier byte changed.
    pub fn press(&self, page: u16, usage: u16) -> Result<bool> {
        match page {
            USAGE_PAGE_KEYBOARD => match Modifier::from_usage(usage) {
                Some(m) => Ok(self.register_modifier(m)),
                None => with(&self.keyboard, |k| k.press(usage)),
            },
            USAGE_PAGE_CONSUMER => with(&self.consumer, |c| c.press(usage)),
            _ => {
                warn!("unsupported usage page {}", page);
                Err(Error::UnsupportedPage)
            }
        }
    }

    pub fn release(&self, page: u16, usage: u16) -> Result<bool> {
        match page {
            USAGE_PAGE_KEYBOARD => match Modifier::from_usage(usage) {
                Some(m) => self.unregister_modifier(m),
                None => with(&self.keyboard, |k| k.release(usage)),
            },
            USAGE_PAGE_CONSUMER => with(&self.consumer, |c| c.release(usage)),
            _ => {
                warn!("unsupported usage page {}", page);
                Err(Error::UnsupportedPage)
            }
        }
    }

    pub fn is_pressed(&self, page: u16, usage: u16) -> Result<bool> {
        match page {
            USAGE_PAGE_KEYBOARD => Ok(match Modifier::from_usage(usage) {
                Some(m) => self.modifier_pressed(m),
                None => with(&self.keyboard, |k| k.is_pressed(usage)),
            }),
            USAGE_PAGE_CONSUMER => Ok(with(&self.consumer, |c| c.is_pressed(usage))),
            _ => Err(Error::UnsupportedPage),
        }
    }

    /// [`press`](Self::press) with a keymap-encoded `(page << 16) | usage`.
    pub fn press_usage(&self, encoded: u32) -> Result<bool> {
        let (page, usage) = split_usage(encoded);
        self.press(page, usage)
    }

    pub fn release_usage(&self, encoded: u32) -> Result<bool> {
        let (page, usage) = split_usage(encoded);
        self.release(page, usage)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Modifiers
    // ═══════════════════════════════════════════════════════════════════

    pub fn register_modifier(&self, modifier: Modifier) -> bool {
        with(&self.modifiers, |m| m.register(modifier))
    }

    pub fn unregister_modifier(&self, modifier: Modifier) -> Result<bool> {
        with(&self.modifiers, |m| m.unregister(modifier))
    }

    pub fn register_modifiers(&self, mask: u8) -> bool {
        with(&self.modifiers, |m| m.register_mask(mask))
    }

    pub fn unregister_modifiers(&self, mask: u8) -> Result<bool> {
        with(&self.modifiers, |m| m.unregister_mask(mask))
    }

    pub fn set_implicit_modifiers(&self, mask: u8) -> bool {
        with(&self.modifiers, |m| m.set_implicit(mask))
    }

    pub fn clear_implicit_modifiers(&self) -> bool {
        with(&self.modifiers, |m| m.clear_implicit())
    }

    pub fn set_masked_modifiers(&self, mask: u8) -> bool {
        with(&self.modifiers, |m| m.set_masked(mask))
    }

    pub fn clear_masked_modifiers(&self) -> bool {
        with(&self.modifiers, |m| m.clear_masked())
    }

    pub fn modifier_pressed(&self, modifier: Modifier) -> bool {
        with(&self.modifiers, |m| m.is_pressed(modifier))
    }

    pub fn explicit_modifiers(&self) -> u8 {
        with(&self.modifiers, |m| m.explicit())
    }

    pub fn effective_modifiers(&self) -> u8 {
        with(&self.modifiers, |m| m.effective())
    }

    /// Modifier bookkeeping snapshot.
    pub fn modifier_state(&self) -> ModifierState {
        with(&self.modifiers, |m| m.clone())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Keys
    // ═══════════════════════════════════════════════════════════════════

    pub fn keys_held(&self) -> usize {
        with(&self.keyboard, |k| k.keys_held())
    }

    /// Release every keyboard key, leaving modifiers alone.
    pub fn keyboard_clear(&self) -> bool {
        with(&self.keyboard, |k| k.clear())
    }

    pub fn consumer_clear(&self) -> bool {
        with(&self.consumer, |c| c.clear())
    }

    /// Reset keys, modifiers, consumer keys and mouse.
    pub fn clear(&self) {
        with(&self.keyboard, |k| k.clear());
        with(&self.modifiers, |m| m.clear());
        with(&self.consumer, |c| c.clear());
        with(&self.mouse, |m| m.clear());
        debug!("all input state cleared");
    }

    // ═══════════════════════════════════════════════════════════════════
    // Mouse
    // ═══════════════════════════════════════════════════════════════════

    pub fn mouse_press(&self, button: u8) -> Result<bool> {
        with(&self.mouse, |m| m.press(button))
    }

    pub fn mouse_release(&self, button: u8) -> Result<bool> {
        with(&self.mouse, |m| m.release(button))
    }

    pub fn mouse_press_mask(&self, mask: u8) -> Result<bool> {
        with(&self.mouse, |m| m.press_mask(mask))
    }

    pub fn mouse_release_mask(&self, mask: u8) -> Result<bool> {
        with(&self.mouse, |m| m.release_mask(mask))
    }

    pub fn mouse_is_pressed(&self, button: MouseButton) -> bool {
        with(&self.mouse, |m| m.is_pressed(button))
    }

    pub fn mouse_set_motion(&self, buttons: u8, x: i8, y: i8, wheel: i8) {
        with(&self.mouse, |m| m.set_motion(buttons, x, y, wheel))
    }

    pub fn mouse_clear(&self) {
        with(&self.mouse, |m| m.clear())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Report snapshots
    // ═══════════════════════════════════════════════════════════════════

    pub fn keyboard_report(&self) -> KeyboardReport {
        let modifier = self.effective_modifiers();
        KeyboardReport {
            modifier,
            reserved: 0,
            keys: with(&self.keyboard, |k| k.key_data()),
        }
    }

    /// Legacy six-key view; every slot reads 0x01 when more than six keys
    /// are held.
    pub fn boot_report(&self) -> BootKeyboardReport {
        let modifier = self.effective_modifiers();
        with(&self.keyboard, |k| {
            if k.is_rollover() {
                BootKeyboardReport::rollover(modifier)
            } else {
                BootKeyboardReport {
                    modifier,
                    reserved: 0,
                    keycodes: k.boot_keys(),
                }
            }
        })
    }

    pub fn consumer_report(&self) -> ConsumerReport {
        with(&self.consumer, |c| ConsumerReport {
            width: c.width(),
            keys: c.slots().clone(),
        })
    }

    pub fn mouse_report(&self) -> MouseReport {
        with(&self.mouse, |m| m.report())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Feature reports
    // ═══════════════════════════════════════════════════════════════════

    pub fn selective_reporting(&self) -> SelectiveReport {
        with(&self.features, |f| f.selective)
    }

    pub fn input_mode(&self) -> InputModeReport {
        with(&self.features, |f| f.input_mode)
    }

    /// Write feature report `id` (with its report id in byte 0) into `buf`.
    pub fn get_feature_report(&self, id: u8, buf: &mut [u8]) -> Result<usize> {
        let written = match id {
            REPORT_ID_FEATURE_PTP_CAPABILITIES => CapabilitiesReport::default().serialize(buf),
            REPORT_ID_FEATURE_PTPHQA => CertificationReport.serialize(buf),
            REPORT_ID_FEATURE_PTP_CONFIGURATION => self.input_mode().serialize(buf),
            REPORT_ID_FEATURE_PTP_SELECTIVE => self.selective_reporting().serialize(buf),
            _ => {
                warn!("get of unknown feature report {}", id);
                return Err(Error::UnknownReport);
            }
        };
        if written == 0 {
            return Err(Error::BufferTooSmall);
        }
        Ok(written)
    }

    /// Apply a host write of feature report `id`. `data` starts with the
    /// report id. Capabilities and certification are read-only.
    pub fn set_feature_report(&self, id: u8, data: &[u8]) -> Result<()> {
        match id {
            REPORT_ID_FEATURE_PTP_CONFIGURATION => {
                let report = InputModeReport::from_bytes(data).ok_or(Error::BufferTooSmall)?;
                self.set_input_mode(report.mode)
            }
            REPORT_ID_FEATURE_PTP_SELECTIVE => {
                let report = SelectiveReport::from_bytes(data).ok_or(Error::BufferTooSmall)?;
                self.post_trackpad_event(TrackpadEvent::SetSelective(
                    report.selective_reporting,
                ))?;
                with(&self.features, |f| f.selective = report);
                debug!("selective reporting set to {}", report.selective_reporting);
                Ok(())
            }
            _ => {
                warn!("set of unknown feature report {}", id);
                Err(Error::UnknownReport)
            }
        }
    }

    /// Record the host's input mode and ask the trackpad worker to switch.
    pub fn set_input_mode(&self, mode: u8) -> Result<()> {
        let report = InputModeReport { mode };
        self.post_trackpad_event(TrackpadEvent::SetMouseMode(
            !report.is_precision_touchpad(),
        ))?;
        self.store_input_mode(mode);
        Ok(())
    }

    pub(crate) fn store_input_mode(&self, mode: u8) {
        with(&self.features, |f| f.input_mode = InputModeReport { mode });
        debug!("input mode set to {}", mode);
    }

    // ═══════════════════════════════════════════════════════════════════
    // Trackpad queue
    // ═══════════════════════════════════════════════════════════════════

    /// Queue an event for the trackpad worker without blocking.
    pub fn post_trackpad_event(&self, event: TrackpadEvent) -> Result<()> {
        self.trackpad_events.try_send(event).map_err(|_| {
            warn!("trackpad event queue full, event dropped");
            Error::QueueFull
        })
    }

    pub fn trackpad_events(&self) -> Receiver<'_, M, TrackpadEvent, TRACKPAD_EVENT_QUEUE> {
        self.trackpad_events.receiver()
    }
}

fn split_usage(encoded: u32) -> (u16, u16) {
    ((encoded >> 16) as u16, (encoded & 0xFFFF) as u16)
}
