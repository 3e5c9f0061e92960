//! GPIO key switches with async debouncing.
//!
//! Each switch (active-low with internal pull-up) is bound to a
//! [`KeyAction`] and handled by its own task. A debounced press or
//! release is fed to the engine, and when the tracked state changes the
//! refreshed report is queued for the USB writer.

use defmt::{info, warn, Format};
use embassy_nrf::gpio::{AnyPin, Input, Pull};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Sender;
use embassy_time::{Duration, Timer};
use kbreport::config::{KEY_DEBOUNCE_MS, USAGE_PAGE_CONSUMER};
use kbreport::{HidReport, TrackpadCommand, TrackpadEvent};

use crate::usb::hid_device::SharedEngine;
use crate::REPORT_QUEUE;

/// What a physical switch does.
#[derive(Clone, Copy, Debug, Format)]
pub enum KeyAction {
    /// Keymap-encoded `(page << 16) | usage`.
    Usage(u32),
    /// Trackpad command, fired on press only.
    Trackpad(TrackpadCommand),
}

/// Run a single key switch loop.
///
/// Waits for the pin to go low (pressed), debounces, applies the action,
/// then does the same for the release.
pub async fn key_task(
    pin: AnyPin,
    action: KeyAction,
    engine: &'static SharedEngine,
    tx: Sender<'static, CriticalSectionRawMutex, HidReport, REPORT_QUEUE>,
) -> ! {
    let mut key = Input::new(pin, Pull::Up);

    loop {
        key.wait_for_falling_edge().await;
        Timer::after(Duration::from_millis(KEY_DEBOUNCE_MS)).await;
        if key.is_high() {
            continue;
        }
        info!("key down: {}", action);
        apply(action, true, engine, &tx).await;

        key.wait_for_rising_edge().await;
        Timer::after(Duration::from_millis(KEY_DEBOUNCE_MS)).await;
        info!("key up: {}", action);
        apply(action, false, engine, &tx).await;
    }
}

async fn apply(
    action: KeyAction,
    pressed: bool,
    engine: &'static SharedEngine,
    tx: &Sender<'static, CriticalSectionRawMutex, HidReport, REPORT_QUEUE>,
) {
    match action {
        KeyAction::Usage(encoded) => {
            let result = if pressed {
                engine.press_usage(encoded)
            } else {
                engine.release_usage(encoded)
            };
            match result {
                Ok(true) => {
                    let report = if (encoded >> 16) as u16 == USAGE_PAGE_CONSUMER {
                        HidReport::Consumer(engine.consumer_report())
                    } else {
                        HidReport::Keyboard(engine.keyboard_report())
                    };
                    tx.send(report).await;
                }
                Ok(false) => {}
                Err(e) => warn!("key {} rejected: {}", encoded, e),
            }
        }
        KeyAction::Trackpad(command) if pressed => {
            if engine
                .post_trackpad_event(TrackpadEvent::Command(command))
                .is_err()
            {
                warn!("trackpad command dropped");
            }
        }
        KeyAction::Trackpad(_) => {}
    }
}
