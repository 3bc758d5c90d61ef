// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Recording renderer.
//!
//! Captures every trigger with its timebase time instead of producing
//! sound. Used for offline rendering and for inspecting what the
//! scheduler did.

use std::sync::{Arc, Mutex};

use super::{AudioRenderer, Click, ClickType};
use crate::song::{Instrument, NoteEvent};
use crate::timing::Timebase;

/// One captured trigger
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEntry {
    NoteOn {
        time: f64,
        instrument: usize,
        note: String,
        octave: u8,
        measure: usize,
    },
    NoteOff {
        time: f64,
        instrument: usize,
        note: String,
        octave: u8,
        measure: usize,
    },
    Click {
        time: f64,
        kind: ClickType,
    },
}

impl TimelineEntry {
    pub fn time(&self) -> f64 {
        match self {
            TimelineEntry::NoteOn { time, .. }
            | TimelineEntry::NoteOff { time, .. }
            | TimelineEntry::Click { time, .. } => *time,
        }
    }

    pub fn is_note_on(&self) -> bool {
        matches!(self, TimelineEntry::NoteOn { .. })
    }

    pub fn is_note_off(&self) -> bool {
        matches!(self, TimelineEntry::NoteOff { .. })
    }

    pub fn is_click(&self) -> bool {
        matches!(self, TimelineEntry::Click { .. })
    }

    /// Identifies the note an entry belongs to (clicks have none)
    pub fn note_key(&self) -> Option<(usize, &str, u8, usize)> {
        match self {
            TimelineEntry::NoteOn {
                instrument,
                note,
                octave,
                measure,
                ..
            }
            | TimelineEntry::NoteOff {
                instrument,
                note,
                octave,
                measure,
                ..
            } => Some((*instrument, note.as_str(), *octave, *measure)),
            TimelineEntry::Click { .. } => None,
        }
    }
}

/// Shared view of the captured entries
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    entries: Arc<Mutex<Vec<TimelineEntry>>>,
}

impl Timeline {
    /// Copy of everything captured so far
    pub fn entries(&self) -> Vec<TimelineEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    fn push(&self, entry: TimelineEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }
}

/// Renderer that appends to a `Timeline`.
///
/// Note-offs carry no time from the scheduler, so they are stamped with
/// the timebase's current time when they arrive.
pub struct TimelineRenderer {
    timebase: Box<dyn Timebase>,
    timeline: Timeline,
}

impl TimelineRenderer {
    pub fn new(timebase: impl Timebase + 'static) -> Self {
        Self {
            timebase: Box::new(timebase),
            timeline: Timeline::default(),
        }
    }

    /// Handle to the captured entries
    pub fn timeline(&self) -> Timeline {
        self.timeline.clone()
    }
}

impl AudioRenderer for TimelineRenderer {
    fn note_on(&mut self, event: &NoteEvent, _instrument: &Instrument, at_time: f64) {
        self.timeline.push(TimelineEntry::NoteOn {
            time: at_time,
            instrument: event.instrument,
            note: event.note.clone(),
            octave: event.octave,
            measure: event.seq.start_measure,
        });
    }

    fn note_off(&mut self, event: &NoteEvent) {
        self.timeline.push(TimelineEntry::NoteOff {
            time: self.timebase.now(),
            instrument: event.instrument,
            note: event.note.clone(),
            octave: event.octave,
            measure: event.seq.start_measure,
        });
    }

    fn click(&mut self, click: &Click) {
        self.timeline.push(TimelineEntry::Click {
            time: click.time,
            kind: click.kind,
        });
    }
}
