//! Integration tests for the report engine and trackpad worker.

use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, NoopRawMutex};
use heapless::Vec;
use kbreport::config::{
    KeyboardReportType, UsageWidth, REPORT_ID_FEATURE_PTP_CONFIGURATION,
    REPORT_ID_FEATURE_PTP_SELECTIVE, USAGE_PAGE_CONSUMER, USAGE_PAGE_KEYBOARD,
};
use kbreport::hid::consumer::ConsumerUsage;
use kbreport::hid::feature::{InputModeReport, SelectiveReport};
use kbreport::hid::touch::{Finger, TouchReport};
use kbreport::trackpad::{NoSensor, PointerSample, TouchSample};
use kbreport::tracker::Modifier;
use kbreport::{
    ContactCountPolicy, Engine, EngineConfig, Error, FlushPolicy, HidReport, Trackpad,
    TrackpadCommand, TrackpadEvent,
};

type Sink = Vec<HidReport, 32>;

fn engine() -> Engine<NoopRawMutex> {
    Engine::new(EngineConfig::default())
}

fn touch(id: u8, contacts: u8) -> TrackpadEvent {
    TrackpadEvent::Touch(TouchSample {
        contact_id: id,
        confidence_tip: Finger::CONFIDENCE | Finger::TIP,
        x: 100 + id as u16,
        y: 200 + id as u16,
        contacts,
        scan_time: 1,
        buttons: 0,
    })
}

fn touch_reports(sink: &Sink) -> impl Iterator<Item = &TouchReport> {
    sink.iter().filter_map(|r| match r {
        HidReport::Touch(t) => Some(t),
        _ => None,
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// Modifiers
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn effective_modifiers_combine_explicit_masked_and_implicit() {
    let e = engine();
    e.register_modifier(Modifier::LeftShift);
    e.register_modifier(Modifier::LeftCtrl);
    assert_eq!(e.effective_modifiers(), 0x03);

    e.set_masked_modifiers(0x02);
    assert_eq!(e.effective_modifiers(), 0x01);

    e.set_implicit_modifiers(0x02);
    assert_eq!(e.effective_modifiers(), 0x03);

    e.set_implicit_modifiers(0x40);
    assert_eq!(e.effective_modifiers(), 0x41);

    e.clear_masked_modifiers();
    e.clear_implicit_modifiers();
    assert_eq!(e.effective_modifiers(), 0x03);
    assert_eq!(e.keyboard_report().modifier, 0x03);
}

#[test]
fn balanced_modifier_presses_return_to_idle() {
    let e = engine();
    let usages = [0xE0u16, 0xE1, 0xE0, 0xE7, 0xE1];
    for &u in &usages {
        e.press(USAGE_PAGE_KEYBOARD, u).unwrap();
    }
    assert_eq!(e.explicit_modifiers(), 0x83);
    assert_eq!(e.modifier_state().count(Modifier::LeftCtrl), 2);

    for &u in usages.iter().rev() {
        e.release(USAGE_PAGE_KEYBOARD, u).unwrap();
    }
    assert_eq!(e.explicit_modifiers(), 0);
    assert_eq!(
        e.release(USAGE_PAGE_KEYBOARD, 0xE0),
        Err(Error::InvalidState)
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// Keyboard
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn nkro_report_on_the_wire() {
    let e = engine();
    e.press(USAGE_PAGE_KEYBOARD, 0x04).unwrap();
    e.press(USAGE_PAGE_KEYBOARD, 0xE1).unwrap();

    let mut buf = [0u8; 64];
    let n = HidReport::Keyboard(e.keyboard_report()).serialize(&mut buf);
    assert_eq!(n, 3 + 13);
    assert_eq!(&buf[..4], &[0x01, 0x02, 0x00, 0x10]);
    assert!(buf[4..n].iter().all(|&b| b == 0));
}

#[test]
fn nkro_rejects_usage_past_bitmap() {
    let e = engine();
    e.press(USAGE_PAGE_KEYBOARD, 0x04).unwrap();
    assert_eq!(e.press(USAGE_PAGE_KEYBOARD, 0x68), Err(Error::OutOfRange));
    assert_eq!(e.keys_held(), 1);

    let extended: Engine<NoopRawMutex> = Engine::new(
        EngineConfig::default().with_keyboard(KeyboardReportType::Nkro { extended: true }),
    );
    assert_eq!(extended.press(USAGE_PAGE_KEYBOARD, 0x68), Ok(true));
    assert_eq!(extended.keyboard_report().keys.len(), 19);
}

#[test]
fn boot_report_rolls_over_past_six_keys() {
    let e = engine();
    for usage in 0x04..0x0B {
        e.press(USAGE_PAGE_KEYBOARD, usage).unwrap();
    }
    assert_eq!(e.keys_held(), 7);
    assert!(e.boot_report().is_rollover());

    e.release(USAGE_PAGE_KEYBOARD, 0x04).unwrap();
    assert_eq!(
        e.boot_report().keycodes,
        [0x05, 0x06, 0x07, 0x08, 0x09, 0x0A]
    );
}

#[test]
fn hkro_overflow_is_counted_but_not_reported() {
    let e: Engine<NoopRawMutex> = Engine::new(
        EngineConfig::default().with_keyboard(KeyboardReportType::Hkro { slots: 2 }),
    );
    assert_eq!(e.press(USAGE_PAGE_KEYBOARD, 0x04), Ok(true));
    assert_eq!(e.press(USAGE_PAGE_KEYBOARD, 0x05), Ok(true));
    assert_eq!(e.press(USAGE_PAGE_KEYBOARD, 0x06), Ok(false));
    assert_eq!(e.keys_held(), 3);
    assert_eq!(&e.keyboard_report().keys[..], &[0x04, 0x05]);

    e.release(USAGE_PAGE_KEYBOARD, 0x04).unwrap();
    assert_eq!(&e.keyboard_report().keys[..], &[0x00, 0x05]);
    e.release(USAGE_PAGE_KEYBOARD, 0x06).unwrap();
    assert_eq!(e.keys_held(), 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// Consumer
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn consumer_usage_width() {
    let e = engine();
    e.press_usage(0x000C_00E9).unwrap();
    let mut buf = [0u8; 16];
    let n = HidReport::Consumer(e.consumer_report()).serialize(&mut buf);
    assert_eq!(n, 1 + 6 * 2);
    assert_eq!(&buf[..3], &[0x02, 0xE9, 0x00]);

    let basic: Engine<NoopRawMutex> =
        Engine::new(EngineConfig::default().with_consumer(UsageWidth::Basic, 4));
    assert_eq!(
        basic.press(USAGE_PAGE_CONSUMER, 0x0183),
        Err(Error::UnsupportedUsage)
    );
    assert_eq!(basic.press(USAGE_PAGE_CONSUMER, 0xE9), Ok(true));
    assert_eq!(basic.consumer_report().len(), 1 + 4);
}

#[test]
fn consumer_usage_binding_reaches_consumer_report() {
    let e = engine();
    assert_eq!(ConsumerUsage::VolumeUp.encoded(), 0x000C_00E9);
    assert_eq!(e.press_usage(ConsumerUsage::VolumeUp.encoded()), Ok(true));
    assert_eq!(e.press_usage(ConsumerUsage::PlayPause.encoded()), Ok(true));
    assert_eq!(e.consumer_report().keys[..2], [0x00E9, 0x00CD]);

    assert_eq!(e.release_usage(ConsumerUsage::VolumeUp.encoded()), Ok(true));
    assert_eq!(e.consumer_report().keys[..2], [0, 0x00CD]);
}

#[test]
fn clear_resets_every_tracker() {
    let e = engine();
    e.press_usage(0x0007_0004).unwrap();
    e.press_usage(0x0007_00E0).unwrap();
    e.press_usage(0x000C_00E2).unwrap();
    e.mouse_press(1).unwrap();

    e.clear();
    assert!(e.keyboard_report().is_empty());
    assert!(e.consumer_report().is_empty());
    assert!(e.mouse_report().is_idle());
    assert_eq!(e.keys_held(), 0);
}

// ═══════════════════════════════════════════════════════════════════════════
// Trackpad
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn host_selects_touchpad_mode_through_feature_report() {
    let e = engine();
    let mut tp = Trackpad::new(&e, NoSensor, Sink::new());

    let mut buf = [0u8; 4];
    let n = e
        .get_feature_report(REPORT_ID_FEATURE_PTP_CONFIGURATION, &mut buf)
        .unwrap();
    assert_eq!(&buf[..n], &[0x08, 0x00]);

    e.set_feature_report(REPORT_ID_FEATURE_PTP_CONFIGURATION, &[0x08, 0x03])
        .unwrap();
    assert_eq!(tp.pump(), 1);
    assert!(!tp.mouse_mode());
    assert_eq!(e.input_mode().mode, InputModeReport::PRECISION_TOUCHPAD);
}

#[test]
fn scan_is_reported_only_once_complete() {
    let e: Engine<NoopRawMutex> = Engine::new(
        EngineConfig::default().with_flush_policy(FlushPolicy::WaitForAll { stale_ticks: 0 }),
    );
    let mut tp = Trackpad::new(&e, NoSensor, Sink::new());
    tp.command(TrackpadCommand::MultiOn).unwrap();
    tp.sink_mut().clear();

    // Two of three fingers: nothing, no matter how many ticks.
    tp.handle(touch(0, 3)).unwrap();
    tp.handle(touch(1, 3)).unwrap();
    for _ in 0..8 {
        tp.handle(TrackpadEvent::Tick).unwrap();
    }
    assert_eq!(touch_reports(tp.sink()).count(), 0);

    tp.handle(touch(2, 3)).unwrap();
    let reports: std::vec::Vec<_> = touch_reports(tp.sink()).collect();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].contact_count, 3);
    assert_eq!(reports[0].fingers[2].x, 102);
    assert!(reports[0].fingers[2].is_touching());
}

#[test]
fn stale_scan_is_forced_out() {
    let e = engine();
    let mut tp = Trackpad::new(&e, NoSensor, Sink::new());
    tp.command(TrackpadCommand::MultiOn).unwrap();
    tp.sink_mut().clear();

    tp.handle(touch(0, 2)).unwrap();
    for _ in 0..4 {
        tp.handle(TrackpadEvent::Tick).unwrap();
    }
    assert_eq!(touch_reports(tp.sink()).count(), 1);
}

#[test]
fn mode_switch_mid_scan_emits_one_empty_report() {
    let e = engine();
    let mut tp = Trackpad::new(&e, NoSensor, Sink::new());
    e.set_input_mode(InputModeReport::PRECISION_TOUCHPAD).unwrap();
    tp.pump();
    tp.sink_mut().clear();

    e.post_trackpad_event(touch(0, 2)).unwrap();
    e.set_input_mode(InputModeReport::MOUSE).unwrap();
    e.post_trackpad_event(touch(1, 2)).unwrap();
    assert_eq!(tp.pump(), 3);

    assert_eq!(&tp.sink()[..], &[HidReport::Touch(TouchReport::empty())]);
    assert!(tp.mouse_mode());
}

#[test]
fn selective_reporting_write_reaches_worker() {
    let e = engine();
    let mut tp = Trackpad::new(&e, NoSensor, Sink::new());
    tp.command(TrackpadCommand::MultiOn).unwrap();
    tp.sink_mut().clear();

    e.set_feature_report(
        REPORT_ID_FEATURE_PTP_SELECTIVE,
        &[0x09, SelectiveReport::BUTTON],
    )
    .unwrap();
    tp.pump();
    assert!(!tp.aggregator().surface_mode());

    tp.handle(touch(0, 1)).unwrap();
    let report = touch_reports(tp.sink()).next().copied().unwrap();
    assert_eq!(report.contact_count, 0);
    assert_eq!(report.fingers[0], Finger::EMPTY);
}

#[test]
fn read_only_feature_reports_reject_writes() {
    let e = engine();
    assert_eq!(e.set_feature_report(0x06, &[0x06, 0x01, 0x00]), Err(Error::UnknownReport));
    assert_eq!(e.set_feature_report(0x07, &[0x07]), Err(Error::UnknownReport));

    let mut buf = [0u8; 300];
    assert_eq!(e.get_feature_report(0x07, &mut buf), Ok(257));
    let mut small = [0u8; 8];
    assert_eq!(
        e.get_feature_report(0x07, &mut small),
        Err(Error::BufferTooSmall)
    );
}

#[test]
fn follow_scan_policy_reports_lift_off() {
    let e: Engine<NoopRawMutex> = Engine::new(
        EngineConfig::default().with_contact_policy(ContactCountPolicy::FollowScan),
    );
    let mut tp = Trackpad::new(&e, NoSensor, Sink::new());
    tp.command(TrackpadCommand::MultiOn).unwrap();
    tp.sink_mut().clear();

    tp.handle(touch(0, 1)).unwrap();
    tp.handle(TrackpadEvent::Touch(TouchSample {
        contact_id: 0,
        contacts: 0,
        ..Default::default()
    }))
    .unwrap();

    let counts: std::vec::Vec<u8> = touch_reports(tp.sink()).map(|r| r.contact_count).collect();
    assert_eq!(counts, [1, 0]);
}

#[test]
fn pointer_mode_with_reverse_scroll() {
    let e: Engine<NoopRawMutex> = Engine::new(EngineConfig::default().with_reverse_scroll(true));
    let mut tp = Trackpad::new(&e, NoSensor, Sink::new());
    tp.handle(TrackpadEvent::Pointer(PointerSample {
        buttons: 0,
        dx: -7,
        dy: 2,
        wheel: -128,
    }))
    .unwrap();
    assert_eq!(e.mouse_report().wheel, 127);
    assert_eq!(e.mouse_report().x, -7);
}

#[test]
fn endpoint_change_returns_to_mouse_mode() {
    let e = engine();
    let mut tp = Trackpad::new(&e, NoSensor, Sink::new());
    tp.command(TrackpadCommand::MultiOn).unwrap();
    assert!(!tp.mouse_mode());

    e.post_trackpad_event(TrackpadEvent::EndpointChanged).unwrap();
    tp.pump();
    assert!(tp.mouse_mode());
    assert!(!e.input_mode().is_precision_touchpad());
}

#[test]
fn full_event_queue_leaves_feature_state_unchanged() {
    let e = engine();
    while e.post_trackpad_event(TrackpadEvent::Tick).is_ok() {}
    assert_eq!(
        e.set_feature_report(REPORT_ID_FEATURE_PTP_CONFIGURATION, &[0x08, 0x03]),
        Err(Error::QueueFull)
    );
    assert_eq!(e.input_mode().mode, InputModeReport::MOUSE);
}

// ═══════════════════════════════════════════════════════════════════════════
// Concurrency
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn concurrent_presses_balance_out() {
    let e: Engine<CriticalSectionRawMutex> = Engine::new(EngineConfig::default());

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..200 {
                    e.press(USAGE_PAGE_KEYBOARD, 0xE1).unwrap();
                    let _ = e.press_usage(0x000C_00E9);
                    e.mouse_press(0).unwrap();
                    e.mouse_release(0).unwrap();
                    e.release(USAGE_PAGE_KEYBOARD, 0xE1).unwrap();
                }
            });
        }
    });

    assert_eq!(e.explicit_modifiers(), 0);
    assert_eq!(e.modifier_state().count(Modifier::LeftShift), 0);
    assert_eq!(e.mouse_report().buttons, 0);
    assert!(e.consumer_report().keys.contains(&0xE9));
}

#[test]
fn events_posted_from_other_threads_reach_the_worker() {
    let e: Engine<CriticalSectionRawMutex> = Engine::new(EngineConfig::default());

    std::thread::scope(|s| {
        s.spawn(|| {
            e.post_trackpad_event(TrackpadEvent::Command(TrackpadCommand::Off))
                .unwrap();
        });
    });

    let event = embassy_futures::block_on(e.trackpad_events().receive());
    assert_eq!(event, TrackpadEvent::Command(TrackpadCommand::Off));

    let mut tp = Trackpad::new(&e, NoSensor, Sink::new());
    tp.handle(event).unwrap();
    assert!(!tp.enabled());
}
