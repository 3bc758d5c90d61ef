// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Playback scheduler.
//!
//! This module provides the core scheduling infrastructure:
//! - Step clock tracking measure/step position against the timebase
//! - Lookahead dispatcher arming note triggers ahead of time
//! - Pending trigger arena with cancellation
//! - Metronome with recording count-in
//! - Notification fan-out
//!
//! All state for one playback session lives in [`Sequencer`]. It is a
//! single-writer structure: whoever owns it (normally the transport run
//! loop) serializes ticker pulses, trigger firing and external commands.

pub mod clock;
pub mod dispatcher;
pub mod metronome;
pub mod notification;
pub mod pending;

pub use clock::{Position, StepClock, StepOutcome, TransportFlags};
pub use metronome::Metronome;
pub use notification::{Notification, NotificationBus};
pub use pending::{PendingTriggers, Trigger, TriggerAction, TriggerHandle};

use std::mem;
use std::sync::mpsc::Receiver;

use tracing::{debug, info};

use crate::audio::AudioRenderer;
use crate::config::SequencerConfig;
use crate::error::Result;
use crate::song::{reset_play_state, Song};
use crate::timing::Timebase;

/// One playback session
pub struct Sequencer {
    song: Song,
    config: SequencerConfig,
    timebase: Box<dyn Timebase>,
    renderer: Box<dyn AudioRenderer>,
    metronome: Metronome,
    clock: StepClock,
    pending: PendingTriggers,
    bus: NotificationBus,
    playing: bool,
    looping: bool,
    recording: bool,
}

impl Sequencer {
    /// Start a session for `song`, positioned at the first measure
    pub fn new(
        song: Song,
        config: SequencerConfig,
        timebase: impl Timebase + 'static,
        renderer: impl AudioRenderer + 'static,
    ) -> Result<Self> {
        song.validate()?;
        config.validate()?;

        let mut metronome = Metronome::new();
        metronome.set_enabled(config.metronome);
        metronome.set_count_in(config.count_in);

        let mut sequencer = Self {
            clock: StepClock::new(config.step_precision),
            looping: config.looping,
            song,
            config,
            timebase: Box::new(timebase),
            renderer: Box::new(renderer),
            metronome,
            pending: PendingTriggers::new(),
            bus: NotificationBus::new(),
            playing: false,
            recording: false,
        };
        sequencer.clock.sync(&sequencer.song);
        sequencer.set_position(0, None);
        Ok(sequencer)
    }

    /// Receive notifications from this session
    pub fn subscribe(&mut self) -> Receiver<Notification> {
        self.bus.subscribe()
    }

    /// Start or stop playback.
    ///
    /// Stopping cancels every pending trigger before returning and is
    /// idempotent; starting while already playing does nothing.
    pub fn set_playing(&mut self, playing: bool) {
        if !playing {
            self.stop();
            return;
        }
        if self.playing {
            return;
        }

        if self.recording && self.metronome.count_in() {
            self.metronome.begin_count_in();
        }
        self.clock.reset_offset();
        let measure = self.clock.position().measure;
        self.set_position(measure, None);
        self.playing = true;

        info!(measure, tempo = self.song.meta.tempo, "playback started");
        self.bus.publish(Notification::PlaybackStarted);
    }

    /// Flip playback, returning the new state
    pub fn toggle_playing(&mut self) -> bool {
        let playing = !self.playing;
        self.set_playing(playing);
        self.playing
    }

    /// Jump to `measure` (clamped to the song) and optionally a step in it
    pub fn set_position(&mut self, measure: usize, step: Option<usize>) {
        let now = self.timebase.now();
        self.clock.set_position(&self.song, measure, step, now);
    }

    /// Change tempo, keeping every event at the same musical position
    pub fn update_tempo(&mut self, tempo: f64) -> Result<()> {
        let old = self.clock.update_tempo(&mut self.song, tempo)?;
        debug!(old, new = tempo, "tempo updated");
        self.bus.publish(Notification::TempoUpdated { old, new: tempo });
        Ok(())
    }

    /// Replace the song: stop, resync to the new tempo and rewind.
    /// Returns the previous song.
    pub fn load_song(&mut self, song: Song) -> Result<Song> {
        song.validate()?;
        self.stop();

        let previous = mem::replace(&mut self.song, song);
        self.clock.sync(&self.song);
        self.set_position(0, Some(0));

        info!(
            title = %self.song.meta.title,
            patterns = self.song.patterns.len(),
            tempo = self.song.meta.tempo,
            "song loaded"
        );
        self.bus.publish(Notification::SongLoaded);
        Ok(previous)
    }

    /// End the session, handing the song back
    pub fn teardown(mut self) -> Song {
        self.stop();
        self.bus.clear();
        self.song
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
    }

    pub fn set_metronome_enabled(&mut self, enabled: bool) {
        self.metronome.set_enabled(enabled);
    }

    /// Flip the metronome, returning the new state
    pub fn toggle_metronome(&mut self) -> bool {
        self.metronome.toggle()
    }

    pub fn set_count_in(&mut self, count_in: bool) {
        self.metronome.set_count_in(count_in);
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn position(&self) -> Position {
        self.clock.position()
    }

    pub fn metronome(&self) -> &Metronome {
        &self.metronome
    }

    pub fn song(&self) -> &Song {
        &self.song
    }

    /// Edit the song in place. Tempo changes made here are picked up at the
    /// next step but do not rescale events; use `update_tempo` for that.
    pub fn song_mut(&mut self) -> &mut Song {
        &mut self.song
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Number of armed triggers
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Current timebase time
    pub fn now(&self) -> f64 {
        self.timebase.now()
    }

    fn stop(&mut self) {
        let was_playing = self.playing;
        self.playing = false;

        let cancelled = self.pending.cancel_all();
        reset_play_state(&mut self.song.patterns);

        if was_playing {
            self.renderer.all_notes_off();
            info!(cancelled, "playback stopped");
            self.bus.publish(Notification::PlaybackStopped);
        }
    }
}
