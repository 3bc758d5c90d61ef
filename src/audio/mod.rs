// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Audio side of the scheduler.
//!
//! This module provides:
//! - The `AudioRenderer` interface the scheduler triggers notes on
//! - Metronome click descriptions
//! - Renderers that log or record instead of producing sound
//! - A timebase driven by an audio output stream (cpal)

pub mod clock;
pub mod timeline;

pub use clock::AudioClock;
pub use timeline::{Timeline, TimelineEntry, TimelineRenderer};

use tracing::{debug, info};

use crate::song::{Instrument, NoteEvent};

/// Metronome click type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickType {
    /// First step of a measure
    Accent,
    /// Other beat boundaries
    Regular,
}

/// A metronome click to sound at `time`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Click {
    pub kind: ClickType,
    /// Timebase seconds
    pub time: f64,
    /// Mixer channel the click is routed to
    pub channel: usize,
}

impl Click {
    /// Click pitch in Hz; the downbeat is higher
    pub fn frequency(&self) -> f32 {
        match self.kind {
            ClickType::Accent => 1200.0,
            ClickType::Regular => 800.0,
        }
    }
}

/// Receives note triggers from the scheduler.
///
/// Implementations render sound; the scheduler never observes a result.
pub trait AudioRenderer {
    /// Start `event` with `instrument` at timebase time `at_time`
    fn note_on(&mut self, event: &NoteEvent, instrument: &Instrument, at_time: f64);

    /// Release `event`
    fn note_off(&mut self, event: &NoteEvent);

    /// Sound a metronome click
    fn click(&mut self, click: &Click);

    /// Playback stopped: silence anything still sounding
    fn all_notes_off(&mut self) {}
}

impl<R: AudioRenderer + ?Sized> AudioRenderer for Box<R> {
    fn note_on(&mut self, event: &NoteEvent, instrument: &Instrument, at_time: f64) {
        (**self).note_on(event, instrument, at_time)
    }

    fn note_off(&mut self, event: &NoteEvent) {
        (**self).note_off(event)
    }

    fn click(&mut self, click: &Click) {
        (**self).click(click)
    }

    fn all_notes_off(&mut self) {
        (**self).all_notes_off()
    }
}

/// Renderer that writes every trigger to the log
#[derive(Debug, Default)]
pub struct TraceRenderer {
    notes_on: u64,
}

impl TraceRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of note-ons received so far
    pub fn notes_on(&self) -> u64 {
        self.notes_on
    }
}

impl AudioRenderer for TraceRenderer {
    fn note_on(&mut self, event: &NoteEvent, instrument: &Instrument, at_time: f64) {
        self.notes_on += 1;
        info!(
            note = %format!("{}{}", event.note, event.octave),
            instrument = %instrument.name,
            measure = event.seq.start_measure,
            at = at_time,
            "note on"
        );
    }

    fn note_off(&mut self, event: &NoteEvent) {
        info!(note = %format!("{}{}", event.note, event.octave), "note off");
    }

    fn click(&mut self, click: &Click) {
        debug!(kind = ?click.kind, at = click.time, "click");
    }

    fn all_notes_off(&mut self) {
        info!("all notes off");
    }
}
