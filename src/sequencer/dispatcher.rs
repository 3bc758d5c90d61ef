// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Lookahead dispatcher.
//!
//! Each collect pass walks the step clock forward until it is a full
//! lookahead window ahead of the timebase, arming a note-on trigger for
//! every event that starts in a step it passes. An event's `playing`
//! flag is set when its note-on is armed and cleared when its note-off
//! fires, so an event is never armed twice while it sounds.

use tracing::{debug, info, trace, warn};

use super::clock::{Position, StepOutcome, TransportFlags};
use super::notification::Notification;
use super::pending::{Trigger, TriggerAction};
use super::Sequencer;
use crate::song::EventRef;

impl Sequencer {
    /// Run one lookahead pass. Returns the number of steps scheduled.
    pub fn collect(&mut self) -> usize {
        if !self.playing {
            return 0;
        }

        let now = self.timebase.now();
        let horizon = now + self.config.schedule_ahead_time;
        let flags = TransportFlags {
            recording: self.recording,
            looping: self.looping,
        };
        let mut steps = 0;

        while self.playing && self.clock.position().next_note_time < horizon {
            let position = self.clock.position();

            if !self.metronome.suppresses_events(self.recording) {
                self.sequence_events(&position);
            }

            if self.metronome.is_enabled() {
                let click = self.metronome.play(
                    self.config.metronome_channel,
                    position.step,
                    self.clock.step_precision(),
                    self.song.time_signature.beat_amount,
                    position.next_note_time,
                );
                if let Some(click) = click {
                    self.pending
                        .schedule(position.next_note_time, TriggerAction::Click(click));
                }
            }

            steps += 1;
            match self
                .clock
                .advance_step(&self.song, now, flags, &mut self.metronome)
            {
                StepOutcome::Advanced => {}
                StepOutcome::PatternSwitch(measure) => {
                    debug!(measure, "pattern switch");
                    self.bus.publish(Notification::PatternSwitch(measure));
                }
                StepOutcome::RecordingComplete => {
                    info!("recording complete");
                    self.stop();
                    self.bus.publish(Notification::RecordingComplete);
                }
            }
        }

        steps
    }

    /// Fire every trigger that is due. Returns how many fired.
    pub fn fire_due(&mut self) -> usize {
        let now = self.timebase.now();
        let mut fired = 0;

        // a late note-on can arm a note-off that is already due
        loop {
            let due = self.pending.pop_due(now);
            if due.is_empty() {
                break;
            }
            fired += due.len();
            for trigger in due {
                self.fire(trigger);
            }
        }

        fired
    }

    /// Time of the earliest armed trigger
    pub fn next_trigger_time(&self) -> Option<f64> {
        self.pending.next_due()
    }

    /// Arm every event of the current measure covering this step
    fn sequence_events(&mut self, position: &Position) {
        let measure = position.measure;
        let compare_time = position.next_note_time - position.measure_start_time;
        let Some(pattern) = self.song.patterns.get(measure) else {
            return;
        };

        let starting: Vec<EventRef> = pattern
            .events()
            .filter(|(_, _, event)| {
                !event.seq.playing
                    && event.seq.is_playable()
                    && event.seq.start_measure == measure
                    && event.seq.covers(compare_time)
            })
            .map(|(channel, slot, _)| EventRef::new(measure, channel, slot))
            .collect();

        for at in starting {
            self.enqueue_event(at, position.next_note_time);
        }
    }

    fn enqueue_event(&mut self, at: EventRef, time: f64) {
        let Some(event) = self.song.event_mut(at) else {
            return;
        };
        event.seq.playing = true;
        let handle = self.pending.schedule(time, TriggerAction::NoteOn(at));
        trace!(?at, ?handle, time, "note on armed");
    }

    fn fire(&mut self, trigger: Trigger) {
        match trigger.action {
            TriggerAction::NoteOn(at) => {
                let Some(event) = self.song.event(at) else {
                    trace!(?at, "note on for a removed event");
                    return;
                };
                match self.song.instrument(event.instrument) {
                    Some(instrument) => self.renderer.note_on(event, instrument, trigger.time),
                    None => warn!(
                        instrument = event.instrument,
                        "note on skipped, unknown instrument"
                    ),
                }
                let release = trigger.time + event.seq.length;
                let handle = self.pending.schedule(release, TriggerAction::NoteOff(at));
                trace!(?at, ?handle, release, "note off armed");
            }
            TriggerAction::NoteOff(at) => {
                if let Some(event) = self.song.event_mut(at) {
                    event.seq.playing = false;
                    self.renderer.note_off(event);
                }
            }
            TriggerAction::Click(click) => self.renderer.click(&click),
        }
    }
}
