// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Note events and the pattern grid that holds them.

use serde::{Deserialize, Serialize};

/// Timing metadata the scheduler matches against.
///
/// All times are seconds at the song's current tempo.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EventSequencing {
    /// Measure (pattern index) the event starts in
    #[serde(default)]
    pub start_measure: usize,
    /// Seconds from the start of the measure
    #[serde(default)]
    pub start_measure_offset: f64,
    /// Duration in seconds
    #[serde(default)]
    pub length: f64,
    /// Set while a note-on has been armed and its note-off has not fired
    #[serde(skip)]
    pub playing: bool,
}

impl EventSequencing {
    /// Finite, non-negative timing. Anything else is never scheduled.
    pub fn is_playable(&self) -> bool {
        self.start_measure_offset.is_finite()
            && self.start_measure_offset >= 0.0
            && self.length.is_finite()
            && self.length >= 0.0
    }

    /// Whether `compare_time` (seconds into the measure) falls inside the event
    pub fn covers(&self, compare_time: f64) -> bool {
        compare_time >= self.start_measure_offset
            && compare_time < self.start_measure_offset + self.length
    }
}

/// A note placed in a channel slot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoteEvent {
    /// Index into the song's instrument table
    pub instrument: usize,
    /// Note name ("C", "C#", ...)
    #[serde(default = "default_note")]
    pub note: String,
    /// Octave number
    #[serde(default = "default_octave")]
    pub octave: u8,
    /// Scheduling metadata
    #[serde(default)]
    pub seq: EventSequencing,
}

fn default_note() -> String {
    "C".to_string()
}
fn default_octave() -> u8 {
    3
}

impl NoteEvent {
    /// Create an event with no timing yet
    pub fn new(instrument: usize, note: impl Into<String>, octave: u8) -> Self {
        Self {
            instrument,
            note: note.into(),
            octave,
            seq: EventSequencing::default(),
        }
    }
}

/// One channel of a pattern: fixed-length slots, empty or holding an event
pub type Channel = Vec<Option<NoteEvent>>;

/// A measure worth of channels
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Pattern {
    #[serde(default)]
    pub channels: Vec<Channel>,
}

impl Pattern {
    /// Create an empty pattern with `channels` channels of `slots` slots each
    pub fn new(channels: usize, slots: usize) -> Self {
        Self {
            channels: vec![vec![None; slots]; channels],
        }
    }

    /// Iterate every event with its channel and slot index
    pub fn events(&self) -> impl Iterator<Item = (usize, usize, &NoteEvent)> {
        self.channels.iter().enumerate().flat_map(|(channel, slots)| {
            slots
                .iter()
                .enumerate()
                .filter_map(move |(slot, event)| event.as_ref().map(|e| (channel, slot, e)))
        })
    }

    /// Mutable access to every event
    pub fn events_mut(&mut self) -> impl Iterator<Item = &mut NoteEvent> {
        self.channels
            .iter_mut()
            .flat_map(|slots| slots.iter_mut().filter_map(Option::as_mut))
    }
}

/// Address of an event slot: pattern, channel and slot index.
///
/// Triggers hold these instead of the event itself so the song stays
/// the only owner of its events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventRef {
    pub pattern: usize,
    pub channel: usize,
    pub slot: usize,
}

impl EventRef {
    pub fn new(pattern: usize, channel: usize, slot: usize) -> Self {
        Self {
            pattern,
            channel,
            slot,
        }
    }
}

/// Clear the `playing` flag of every event in every pattern
pub fn reset_play_state(patterns: &mut [Pattern]) {
    for event in patterns.iter_mut().flat_map(Pattern::events_mut) {
        event.seq.playing = false;
    }
}

/// Scale every event's offset and length by `ratio` (old tempo / new tempo)
pub fn update_event_offsets(patterns: &mut [Pattern], ratio: f64) {
    for event in patterns.iter_mut().flat_map(Pattern::events_mut) {
        event.seq.start_measure_offset *= ratio;
        event.seq.length *= ratio;
    }
}
