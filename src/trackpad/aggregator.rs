//! Multi-finger contact aggregation.
//!
//! The sensor reports one finger per sample, together with the number of
//! fingers down in the current scan. Samples are buffered per finger slot
//! until the scan is complete and then materialised as a single
//! [`TouchReport`], so the host never sees a half-updated contact set.
//!
//! ```text
//!  Idle ──sample──▶ Collecting ──received >= present──▶ FlushReady
//!   ▲                   │                                   │
//!   └──────── flush ◀───┴──(stale tick / per-tick flush)◀───┘
//! ```

use crate::config::{ContactCountPolicy, FlushPolicy, TRACKPAD_MAX_FINGERS};
use crate::error::{Error, Result};
use crate::hid::feature::SelectiveReport;
use crate::hid::touch::{Finger, TouchReport};

/// One per-finger sample from the sensor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchSample {
    pub contact_id: u8,
    /// Bit 0 = confidence, bit 1 = tip switch.
    pub confidence_tip: u8,
    pub x: u16,
    pub y: u16,
    /// Fingers down in this scan.
    pub contacts: u8,
    pub scan_time: u16,
    pub buttons: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AggregatorState {
    /// Nothing buffered since the last flush.
    Idle,
    /// Some fingers of the current scan have reported.
    Collecting,
    /// Every finger of the current scan has reported.
    FlushReady,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContactAggregator {
    fingers: [Finger; TRACKPAD_MAX_FINGERS],
    to_send: u8,
    present: u8,
    received: u8,
    scan_time: u16,
    buttons: u8,
    last_updated: Option<u8>,
    incomplete_ticks: u8,
    flush_policy: FlushPolicy,
    contact_policy: ContactCountPolicy,
    surface_mode: bool,
    button_mode: bool,
}

impl ContactAggregator {
    pub fn new(flush_policy: FlushPolicy, contact_policy: ContactCountPolicy) -> Self {
        Self {
            fingers: [Finger::EMPTY; TRACKPAD_MAX_FINGERS],
            to_send: 0,
            present: 0,
            received: 0,
            scan_time: 0,
            buttons: 0,
            last_updated: None,
            incomplete_ticks: 0,
            flush_policy,
            contact_policy,
            surface_mode: true,
            button_mode: true,
        }
    }

    pub fn state(&self) -> AggregatorState {
        if self.to_send == 0 {
            AggregatorState::Idle
        } else if self.flush_policy != FlushPolicy::PerTick && self.received >= self.present {
            AggregatorState::FlushReady
        } else {
            AggregatorState::Collecting
        }
    }

    pub fn present_contacts(&self) -> u8 {
        self.present
    }

    pub fn received_contacts(&self) -> u8 {
        self.received
    }

    pub fn surface_mode(&self) -> bool {
        self.surface_mode
    }

    pub fn button_mode(&self) -> bool {
        self.button_mode
    }

    /// Apply selective-reporting flags. Takes effect at the next flush.
    pub fn set_selective(&mut self, flags: u8) {
        self.surface_mode = flags & SelectiveReport::SURFACE != 0;
        self.button_mode = flags & SelectiveReport::BUTTON != 0;
        debug!(
            "selective reporting: surface {} button {}",
            self.surface_mode,
            self.button_mode
        );
    }

    /// Buffer one finger sample and return the resulting state.
    pub fn update(&mut self, sample: TouchSample) -> Result<AggregatorState> {
        let id = sample.contact_id;
        if id as usize >= TRACKPAD_MAX_FINGERS {
            warn!("contact id {} out of range", id);
            return Err(Error::OutOfRange);
        }

        self.fingers[id as usize] = Finger {
            confidence_tip: sample.confidence_tip & 0x03,
            contact_id: id,
            x: sample.x,
            y: sample.y,
        };
        self.to_send |= 1 << id;
        self.received = self.received.saturating_add(1);
        self.last_updated = Some(id);

        let contacts = sample.contacts.min(TRACKPAD_MAX_FINGERS as u8);
        match self.contact_policy {
            ContactCountPolicy::Sticky if contacts == 0 => {}
            _ => self.present = contacts,
        }
        self.scan_time = sample.scan_time;
        self.buttons = sample.buttons;

        trace!(
            "finger {} received {} of {}",
            id,
            self.received,
            self.present
        );
        Ok(self.state())
    }

    /// Periodic tick. Returns a report when the flush policy says one is due.
    pub fn tick(&mut self) -> Option<TouchReport> {
        match self.flush_policy {
            FlushPolicy::PerTick => {
                let id = self.last_updated?;
                if self.to_send & (1 << id) == 0 {
                    return None;
                }
                self.to_send = 1 << id;
                Some(self.flush())
            }
            FlushPolicy::WaitForAll { stale_ticks } => match self.state() {
                AggregatorState::Idle => None,
                AggregatorState::FlushReady => Some(self.flush()),
                AggregatorState::Collecting => {
                    self.incomplete_ticks = self.incomplete_ticks.saturating_add(1);
                    if stale_ticks != 0 && self.incomplete_ticks >= stale_ticks {
                        debug!(
                            "flushing incomplete scan, {} of {} fingers",
                            self.received,
                            self.present
                        );
                        Some(self.flush())
                    } else {
                        None
                    }
                }
            },
        }
    }

    /// Materialise the buffered fingers and start a new cycle.
    pub fn flush(&mut self) -> TouchReport {
        let mut report = TouchReport::empty();
        if self.surface_mode {
            for (i, finger) in report.fingers.iter_mut().enumerate() {
                if self.to_send & (1 << i) != 0 {
                    *finger = self.fingers[i];
                }
            }
            report.contact_count = self.present;
        }
        report.scan_time = self.scan_time;
        report.buttons = if self.button_mode { self.buttons } else { 0 };

        self.to_send = 0;
        self.received = 0;
        self.incomplete_ticks = 0;
        report
    }

    /// Drop everything buffered, including the contact count.
    pub fn reset(&mut self) {
        self.fingers = [Finger::EMPTY; TRACKPAD_MAX_FINGERS];
        self.to_send = 0;
        self.present = 0;
        self.received = 0;
        self.buttons = 0;
        self.last_updated = None;
        self.incomplete_ticks = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: u8, contacts: u8) -> TouchSample {
        TouchSample {
            contact_id: id,
            confidence_tip: Finger::CONFIDENCE | Finger::TIP,
            x: 100 * (id as u16 + 1),
            y: 50 * (id as u16 + 1),
            contacts,
            scan_time: 42,
            buttons: 0x01,
        }
    }

    fn wait_for_all() -> ContactAggregator {
        ContactAggregator::new(
            FlushPolicy::WaitForAll { stale_ticks: 0 },
            ContactCountPolicy::Sticky,
        )
    }

    #[test]
    fn three_of_three_becomes_ready() {
        let mut agg = wait_for_all();
        assert_eq!(agg.state(), AggregatorState::Idle);
        assert_eq!(agg.update(sample(0, 3)), Ok(AggregatorState::Collecting));
        assert_eq!(agg.update(sample(2, 3)), Ok(AggregatorState::Collecting));
        assert_eq!(agg.update(sample(3, 3)), Ok(AggregatorState::FlushReady));

        let report = agg.flush();
        assert_eq!(report.contact_count, 3);
        assert_eq!(report.fingers[0].x, 100);
        assert_eq!(report.fingers[1], Finger::EMPTY);
        assert_eq!(report.fingers[2].contact_id, 2);
        assert_eq!(report.fingers[3].y, 200);
        assert_eq!(report.fingers[4], Finger::EMPTY);
        assert_eq!(report.scan_time, 42);
        assert_eq!(report.buttons, 0x01);
        assert_eq!(agg.state(), AggregatorState::Idle);
        assert_eq!(agg.received_contacts(), 0);
    }

    #[test]
    fn two_of_three_never_ready() {
        let mut agg = wait_for_all();
        agg.update(sample(0, 3)).unwrap();
        agg.update(sample(1, 3)).unwrap();
        for _ in 0..10 {
            assert_eq!(agg.tick(), None);
        }
        assert_eq!(agg.state(), AggregatorState::Collecting);
    }

    #[test]
    fn stale_cycle_forced_after_ticks() {
        let mut agg = ContactAggregator::new(
            FlushPolicy::WaitForAll { stale_ticks: 2 },
            ContactCountPolicy::Sticky,
        );
        agg.update(sample(0, 2)).unwrap();
        assert_eq!(agg.tick(), None);
        let report = agg.tick().unwrap();
        assert_eq!(report.contact_count, 2);
        assert_eq!(report.fingers[1], Finger::EMPTY);
        assert_eq!(agg.tick(), None);
    }

    #[test]
    fn per_tick_flushes_latest_finger_only() {
        let mut agg = ContactAggregator::new(FlushPolicy::PerTick, ContactCountPolicy::Sticky);
        assert_eq!(agg.update(sample(0, 2)), Ok(AggregatorState::Collecting));
        assert_eq!(agg.update(sample(1, 2)), Ok(AggregatorState::Collecting));

        let report = agg.tick().unwrap();
        assert_eq!(report.fingers[0], Finger::EMPTY);
        assert_eq!(report.fingers[1].contact_id, 1);
        assert_eq!(agg.tick(), None);
    }

    #[test]
    fn sticky_contact_count_survives_empty_scan() {
        let mut agg = wait_for_all();
        agg.update(sample(0, 2)).unwrap();
        agg.update(sample(1, 2)).unwrap();
        agg.flush();

        let lift = TouchSample {
            confidence_tip: 0,
            ..sample(0, 0)
        };
        agg.update(lift).unwrap();
        assert_eq!(agg.present_contacts(), 2);
    }

    #[test]
    fn follow_scan_lift_flushes_with_zero_count() {
        let mut agg = ContactAggregator::new(
            FlushPolicy::WaitForAll { stale_ticks: 0 },
            ContactCountPolicy::FollowScan,
        );
        agg.update(sample(0, 1)).unwrap();
        agg.flush();

        let lift = TouchSample {
            confidence_tip: 0,
            ..sample(0, 0)
        };
        assert_eq!(agg.update(lift), Ok(AggregatorState::FlushReady));
        assert_eq!(agg.flush().contact_count, 0);
    }

    #[test]
    fn selective_flags_gate_flush() {
        let mut agg = wait_for_all();
        agg.set_selective(SelectiveReport::BUTTON);
        agg.update(sample(0, 1)).unwrap();
        let report = agg.flush();
        assert_eq!(report.contact_count, 0);
        assert!(report.fingers.iter().all(|f| *f == Finger::EMPTY));
        assert_eq!(report.buttons, 0x01);

        agg.set_selective(SelectiveReport::SURFACE);
        agg.update(sample(0, 1)).unwrap();
        let report = agg.flush();
        assert_eq!(report.buttons, 0);
        assert_eq!(report.contact_count, 1);
    }

    #[test]
    fn contact_id_out_of_range() {
        let mut agg = wait_for_all();
        assert_eq!(
            agg.update(sample(TRACKPAD_MAX_FINGERS as u8, 1)),
            Err(Error::OutOfRange)
        );
        assert_eq!(agg, wait_for_all());
    }
}
