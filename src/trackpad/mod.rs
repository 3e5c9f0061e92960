//! Trackpad worker.
//!
//! Sensor callbacks and the periodic tick never touch aggregation state
//! directly. They post a [`TrackpadEvent`] to the engine's queue, and a
//! single [`Trackpad`] worker consumes the queue in order. The worker owns
//! the [`ContactAggregator`] and the sensor handle and decides which
//! sample stream is live:
//!
//! - **mouse mode**: pointer deltas become mouse reports,
//! - **precision touchpad mode**: finger samples are aggregated into touch
//!   reports.

pub mod aggregator;

pub use aggregator::{AggregatorState, ContactAggregator, TouchSample};

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::engine::{Engine, ReportSink};
use crate::error::Result;
use crate::hid::feature::InputModeReport;
use crate::hid::{HidReport, TouchReport};

/// Operating mode requested from the sensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorMode {
    /// Relative pointer deltas.
    Pointer,
    /// Absolute per-finger contacts.
    MultiTouch,
}

/// Control surface of the touch sensor driver.
pub trait TouchSensor {
    fn set_mode(&mut self, mode: SensorMode) -> Result<()>;
    /// Start or stop sample delivery.
    fn set_sampling(&mut self, enabled: bool) -> Result<()>;
}

/// Relative sample delivered in mouse mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PointerSample {
    pub buttons: u8,
    pub dx: i8,
    pub dy: i8,
    pub wheel: i8,
}

/// Keymap-bound trackpad actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrackpadCommand {
    Toggle,
    On,
    Off,
    /// Flip between mouse and precision touchpad input mode.
    MultiToggle,
    MultiOn,
    MultiOff,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrackpadEvent {
    Touch(TouchSample),
    Pointer(PointerSample),
    Tick,
    SetMouseMode(bool),
    SetSelective(u8),
    SetEnabled(bool),
    Command(TrackpadCommand),
    /// The active output endpoint changed; the new host has not negotiated
    /// precision touchpad mode yet.
    EndpointChanged,
}

pub struct Trackpad<'a, M: RawMutex, S: TouchSensor, R: ReportSink> {
    engine: &'a Engine<M>,
    sensor: S,
    sink: R,
    aggregator: ContactAggregator,
    mouse_mode: bool,
    enabled: bool,
    reverse_scroll: bool,
}

impl<'a, M: RawMutex, S: TouchSensor, R: ReportSink> Trackpad<'a, M, S, R> {
    /// Create the worker in mouse mode with sampling enabled.
    pub fn new(engine: &'a Engine<M>, mut sensor: S, sink: R) -> Self {
        let config = engine.config();
        let mut aggregator = ContactAggregator::new(config.flush_policy, config.contact_policy);
        aggregator.set_selective(engine.selective_reporting().selective_reporting);
        if let Err(e) = sensor.set_mode(SensorMode::Pointer) {
            warn!("sensor mode setup failed: {}", e);
        }
        Self {
            engine,
            sensor,
            sink,
            aggregator,
            mouse_mode: true,
            enabled: true,
            reverse_scroll: config.reverse_scroll,
        }
    }

    pub fn mouse_mode(&self) -> bool {
        self.mouse_mode
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn aggregator(&self) -> &ContactAggregator {
        &self.aggregator
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sink(&self) -> &R {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut R {
        &mut self.sink
    }

    /// Process one event.
    pub fn handle(&mut self, event: TrackpadEvent) -> Result<()> {
        match event {
            TrackpadEvent::Touch(sample) => self.on_touch(sample),
            TrackpadEvent::Pointer(sample) => self.on_pointer(sample),
            TrackpadEvent::Tick => self.on_tick(),
            TrackpadEvent::SetMouseMode(mouse_mode) => self.set_mouse_mode(mouse_mode),
            TrackpadEvent::SetSelective(flags) => {
                self.aggregator.set_selective(flags);
                Ok(())
            }
            TrackpadEvent::SetEnabled(enabled) => self.set_enabled(enabled),
            TrackpadEvent::Command(command) => self.command(command),
            TrackpadEvent::EndpointChanged => {
                self.engine.store_input_mode(InputModeReport::MOUSE);
                self.set_mouse_mode(true)
            }
        }
    }

    /// Drain every queued event without waiting. Returns how many were
    /// handled; an event that fails is logged and skipped.
    pub fn pump(&mut self) -> usize {
        let engine = self.engine;
        let events = engine.trackpad_events();
        let mut handled = 0;
        while let Ok(event) = events.try_receive() {
            if let Err(e) = self.handle(event) {
                warn!("trackpad event failed: {}", e);
            }
            handled += 1;
        }
        handled
    }

    /// Handle queued events forever.
    pub async fn run(&mut self) -> ! {
        info!("trackpad worker started");
        let engine = self.engine;
        let events = engine.trackpad_events();
        loop {
            let event = events.receive().await;
            if let Err(e) = self.handle(event) {
                warn!("trackpad event failed: {}", e);
            }
        }
    }

    /// Switch between pointer and multi-touch reporting. The mode being
    /// left gets one cleared report so the host drops any stale state.
    ///
    /// The switch always completes; a failed delivery of the cleared report
    /// is returned afterwards.
    pub fn set_mouse_mode(&mut self, mouse_mode: bool) -> Result<()> {
        if mouse_mode == self.mouse_mode {
            return Ok(());
        }
        info!("trackpad mouse mode {}", mouse_mode);
        let cleared = self.clear_active_mode();
        self.mouse_mode = mouse_mode;

        let mode = if mouse_mode {
            SensorMode::Pointer
        } else {
            SensorMode::MultiTouch
        };
        if let Err(e) = self.sensor.set_mode(mode) {
            error!("sensor refused mode change: {}", e);
        }
        self.deliver(cleared)
    }

    /// Enable or disable the trackpad. Disabling sends one empty report for
    /// the active mode. Like a mode switch, the change itself always
    /// completes.
    pub fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        if enabled == self.enabled {
            return Ok(());
        }
        info!("trackpad enabled {}", enabled);
        let cleared = if enabled {
            None
        } else {
            Some(self.clear_active_mode())
        };
        self.enabled = enabled;
        if let Err(e) = self.sensor.set_sampling(enabled) {
            error!("sensor refused sampling change: {}", e);
        }
        match cleared {
            Some(report) => self.deliver(report),
            None => Ok(()),
        }
    }

    /// Drop the state of the active mode and build its cleared report.
    fn clear_active_mode(&mut self) -> HidReport {
        if self.mouse_mode {
            self.engine.mouse_clear();
            HidReport::Mouse(self.engine.mouse_report())
        } else {
            self.aggregator.reset();
            HidReport::Touch(TouchReport::empty())
        }
    }

    fn deliver(&mut self, report: HidReport) -> Result<()> {
        self.sink.send_report(report).map_err(|e| {
            warn!("cleared report not delivered: {}", e);
            e
        })
    }

    pub fn command(&mut self, command: TrackpadCommand) -> Result<()> {
        debug!("trackpad command {}", command as u8);
        match command {
            TrackpadCommand::Toggle => self.set_enabled(!self.enabled),
            TrackpadCommand::On => self.set_enabled(true),
            TrackpadCommand::Off => self.set_enabled(false),
            TrackpadCommand::MultiToggle => {
                let mode = if self.engine.input_mode().mode != InputModeReport::MOUSE {
                    InputModeReport::MOUSE
                } else {
                    InputModeReport::PRECISION_TOUCHPAD
                };
                self.apply_input_mode(mode)
            }
            TrackpadCommand::MultiOn => {
                self.apply_input_mode(InputModeReport::PRECISION_TOUCHPAD)
            }
            TrackpadCommand::MultiOff => self.apply_input_mode(InputModeReport::MOUSE),
        }
    }

    fn apply_input_mode(&mut self, mode: u8) -> Result<()> {
        self.engine.store_input_mode(mode);
        self.set_mouse_mode(!InputModeReport { mode }.is_precision_touchpad())
    }

    fn on_touch(&mut self, sample: TouchSample) -> Result<()> {
        if !self.enabled || self.mouse_mode {
            trace!("touch sample ignored");
            return Ok(());
        }
        if self.aggregator.update(sample)? == AggregatorState::FlushReady {
            let report = self.aggregator.flush();
            self.sink.send_report(HidReport::Touch(report))?;
        }
        Ok(())
    }

    fn on_pointer(&mut self, sample: PointerSample) -> Result<()> {
        if !self.enabled || !self.mouse_mode {
            trace!("pointer sample ignored");
            return Ok(());
        }
        let wheel = if self.reverse_scroll {
            sample.wheel.saturating_neg()
        } else {
            sample.wheel
        };
        self.engine
            .mouse_set_motion(sample.buttons, sample.dx, sample.dy, wheel);
        self.sink
            .send_report(HidReport::Mouse(self.engine.mouse_report()))
    }

    fn on_tick(&mut self) -> Result<()> {
        if !self.enabled || self.mouse_mode {
            return Ok(());
        }
        match self.aggregator.tick() {
            Some(report) => self.sink.send_report(HidReport::Touch(report)),
            None => Ok(()),
        }
    }
}

/// Sensor handle for boards without a controllable sensor.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSensor;

impl TouchSensor for NoSensor {
    fn set_mode(&mut self, _mode: SensorMode) -> Result<()> {
        Ok(())
    }

    fn set_sampling(&mut self, _enabled: bool) -> Result<()> {
        Ok(())
    }
}
