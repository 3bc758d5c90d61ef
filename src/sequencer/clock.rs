// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Step clock: the measure/step position model.
//!
//! Steps advance at a tempo-derived rate, wrap at measure boundaries and
//! re-anchor the measure timing against the timebase on every wrap so the
//! accumulated step clock cannot drift away from the hardware clock.

use tracing::debug;

use super::metronome::Metronome;
use crate::error::{check_tempo, Result};
use crate::song::{update_event_offsets, Song};

/// Playback position and its timing anchors (timebase seconds)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// Current measure (pattern index)
    pub measure: usize,
    /// Current step within the measure
    pub step: usize,
    /// Time of the next step boundary to schedule
    pub next_note_time: f64,
    /// Time the current measure started
    pub measure_start_time: f64,
    /// Time measure 0 started (or would have)
    pub first_measure_start_time: f64,
    /// Seconds per measure at the current tempo
    pub measure_length: f64,
    /// Drift-corrected offset of the timebase into the current measure
    pub measure_offset: f64,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            measure: 0,
            step: 0,
            next_note_time: 0.0,
            measure_start_time: 0.0,
            first_measure_start_time: 0.0,
            measure_length: 2.0,
            measure_offset: 0.0,
        }
    }
}

/// Transport flags the step clock consults on a measure wrap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportFlags {
    pub recording: bool,
    pub looping: bool,
}

/// Result of advancing one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Still inside the same measure
    Advanced,
    /// Crossed into a new measure
    PatternSwitch(usize),
    /// Reached the end of the song while recording without looping
    RecordingComplete,
}

/// Measure/step position model
#[derive(Debug, Clone)]
pub struct StepClock {
    position: Position,
    step_precision: usize,
}

impl StepClock {
    pub fn new(step_precision: usize) -> Self {
        Self {
            position: Position::default(),
            step_precision: step_precision.max(1),
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn step_precision(&self) -> usize {
        self.step_precision
    }

    /// Duration of one step.
    ///
    /// The `* 4` is fixed regardless of the time signature; existing tempo
    /// math depends on it.
    pub fn step_duration(&self, tempo: f64) -> f64 {
        (60.0 / tempo * 4.0) / self.step_precision as f64
    }

    /// Move to `measure` (clamped to the song), anchoring its start at `anchor`.
    ///
    /// Changing measure resets the step unless `step` is given.
    pub fn set_position(&mut self, song: &Song, measure: usize, step: Option<usize>, anchor: f64) {
        let measure = measure.min(song.patterns.len().saturating_sub(1));
        let measure_length = song.measure_length();
        let position = &mut self.position;

        if position.measure != measure {
            position.step = 0;
        }
        if let Some(step) = step {
            position.step = step.min(self.step_precision - 1);
        }

        position.measure = measure;
        position.measure_length = measure_length;
        position.next_note_time = anchor;
        position.measure_start_time = anchor;
        position.first_measure_start_time = anchor - measure as f64 * measure_length;
    }

    /// Advance to the next step.
    ///
    /// On a measure wrap the new measure is anchored at the boundary that
    /// was just reached. `now` is the timebase time of the current pass and
    /// only feeds the drift-corrected `measure_offset`.
    pub fn advance_step(
        &mut self,
        song: &Song,
        now: f64,
        flags: TransportFlags,
        metronome: &mut Metronome,
    ) -> StepOutcome {
        self.position.next_note_time += self.step_duration(song.meta.tempo);
        self.position.step += 1;

        let mut outcome = StepOutcome::Advanced;

        if self.position.step >= self.step_precision {
            self.position.step = 0;
            let boundary = self.position.next_note_time;

            let mut measure = self.position.measure + 1;
            if measure >= song.patterns.len() {
                measure = 0;
                if flags.recording && !flags.looping {
                    self.position.measure = 0;
                    return StepOutcome::RecordingComplete;
                }
            }
            self.set_position(song, measure, None, boundary);

            if flags.recording && metronome.count_in() && !metronome.count_in_complete() {
                // the count-in measure is over, the take starts here
                metronome.complete_count_in();
                self.position.measure = 0;
                self.position.first_measure_start_time = boundary;
                debug!("count-in complete");
            }
            outcome = StepOutcome::PatternSwitch(self.position.measure);
        }

        self.position.measure_offset = (now - self.position.first_measure_start_time)
            - self.position.measure as f64 * self.position.measure_length;

        outcome
    }

    /// Change the song tempo, rescaling every event so its musical position
    /// is unchanged. Returns the previous tempo.
    pub fn update_tempo(&mut self, song: &mut Song, new_tempo: f64) -> Result<f64> {
        let new_tempo = check_tempo(new_tempo)?;
        let old_tempo = song.meta.tempo;

        song.meta.tempo = new_tempo;
        update_event_offsets(&mut song.patterns, old_tempo / new_tempo);
        self.sync(song);

        Ok(old_tempo)
    }

    /// Re-read the measure length from the song
    pub fn sync(&mut self, song: &Song) {
        self.position.measure_length = song.measure_length();
    }

    /// Zero the drift-corrected offset (playback restart)
    pub fn reset_offset(&mut self) {
        self.position.measure_offset = 0.0;
    }
}
