// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Integration tests for tracker-seq
//!
//! These drive a whole playback session through the public API against a
//! manual clock and a recording renderer.

use std::collections::HashMap;
use std::fs;

use tempfile::tempdir;
use tracker_seq::audio::{ClickType, Timeline, TimelineEntry, TimelineRenderer};
use tracker_seq::song::{EventRef, NoteEvent};
use tracker_seq::timing::{ManualTimebase, Timebase};
use tracker_seq::{render_offline, Notification, Sequencer, SequencerConfig, Song};

const EPSILON: f64 = 1e-9;

fn session(song: Song, config: SequencerConfig) -> (Sequencer, ManualTimebase, Timeline) {
    let clock = ManualTimebase::new();
    let renderer = TimelineRenderer::new(clock.clone());
    let timeline = renderer.timeline();
    let sequencer = Sequencer::new(song, config, clock.clone(), renderer).unwrap();
    (sequencer, clock, timeline)
}

/// One worker ticker pulse as the transport handles it
fn tick(sequencer: &mut Sequencer) {
    sequencer.fire_due();
    sequencer.collect();
    sequencer.fire_due();
}

/// Tick every `step` seconds from the current time up to `until`
fn run_until(sequencer: &mut Sequencer, clock: &ManualTimebase, until: f64, step: f64) {
    let start = clock.now();
    let mut i = 0;
    loop {
        let t = start + i as f64 * step;
        if t > until + EPSILON {
            break;
        }
        clock.set(t);
        tick(sequencer);
        i += 1;
    }
}

fn note_ons(timeline: &Timeline) -> Vec<TimelineEntry> {
    timeline
        .entries()
        .into_iter()
        .filter(TimelineEntry::is_note_on)
        .collect()
}

fn busy_song() -> Song {
    let mut song = Song::new(120.0, 2, 2, 16);
    song.place(EventRef::new(0, 0, 0), NoteEvent::new(0, "C", 3), 0.5);
    song.place(EventRef::new(0, 0, 4), NoteEvent::new(0, "E", 3), 0.2);
    song.place(EventRef::new(0, 1, 2), NoteEvent::new(0, "G", 2), 1.2);
    song.place(EventRef::new(1, 0, 8), NoteEvent::new(0, "A", 3), 0.7);
    song.place(EventRef::new(1, 1, 15), NoteEvent::new(0, "B", 3), 0.1);
    song
}

#[test]
fn test_no_double_trigger() {
    let mut config = SequencerConfig::default();
    config.looping = true;
    let (mut sequencer, clock, timeline) = session(busy_song(), config);
    sequencer.set_playing(true);

    // uneven pulses, all shorter than the lookahead window
    let increments = [0.01, 0.05, 0.13, 0.025, 0.19, 0.07];
    let mut t = 0.0;
    let mut i = 0;
    while t < 11.5 {
        clock.set(t);
        tick(&mut sequencer);
        t += increments[i % increments.len()];
        i += 1;
    }

    let mut sounding: HashMap<(usize, String, u8, usize), bool> = HashMap::new();
    let mut ons = 0;
    for entry in timeline.entries() {
        let Some((instrument, note, octave, measure)) = entry.note_key() else {
            continue;
        };
        let key = (instrument, note.to_string(), octave, measure);
        let state = sounding.entry(key.clone()).or_insert(false);
        if entry.is_note_on() {
            assert!(!*state, "{:?} triggered twice at {}", key, entry.time());
            *state = true;
            ons += 1;
        } else {
            assert!(*state, "{:?} released without a note on", key);
            *state = false;
        }
    }
    // five events, three full passes of a two measure song
    assert_eq!(ons, 15);
}

#[test]
fn test_bounded_lookahead() {
    let (mut sequencer, clock, _timeline) = session(busy_song(), SequencerConfig::default());
    sequencer.set_playing(true);

    let mut t = 0.0;
    while t < 5.0 {
        clock.set(t);
        sequencer.collect();
        let position = sequencer.position();
        assert!(
            position.next_note_time >= t + 0.2,
            "next step {} behind window at {}",
            position.next_note_time,
            t
        );
        t += 0.037;
    }
}

#[test]
fn test_wrap_returns_to_first_measure() {
    let (mut sequencer, clock, _timeline) =
        session(Song::new(120.0, 3, 1, 16), SequencerConfig::default());
    let rx = sequencer.subscribe();
    sequencer.set_position(0, Some(0));
    sequencer.set_playing(true);

    // 3 measures of 64 steps; the step at 6.0 is scheduled by t = 5.9
    run_until(&mut sequencer, &clock, 5.9, 0.05);

    let position = sequencer.position();
    assert_eq!(position.measure, 0);
    assert!((position.first_measure_start_time - 6.0).abs() < EPSILON);
    assert!((position.measure_start_time - 6.0).abs() < EPSILON);
    assert!(position.measure_offset < 0.0);

    let switches: Vec<_> = rx
        .try_iter()
        .filter_map(|n| match n {
            Notification::PatternSwitch(measure) => Some(measure),
            _ => None,
        })
        .collect();
    assert_eq!(switches, vec![1, 2, 0]);
}

#[test]
fn test_tempo_change_preserves_musical_position() {
    let mut song = Song::new(120.0, 1, 1, 16);
    song.place(EventRef::new(0, 0, 4), NoteEvent::new(0, "C", 4), 0.25);
    let (mut sequencer, _clock, _timeline) = session(song, SequencerConfig::default());
    let rx = sequencer.subscribe();

    let at = EventRef::new(0, 0, 4);
    let before = sequencer.song().event(at).unwrap().seq.start_measure_offset;
    assert!((before - 0.5).abs() < EPSILON);

    sequencer.update_tempo(60.0).unwrap();

    let seq = &sequencer.song().event(at).unwrap().seq;
    assert!((seq.start_measure_offset - 2.0 * before).abs() < EPSILON);
    assert!((seq.length - 0.5).abs() < EPSILON);
    assert!((sequencer.position().measure_length - 4.0).abs() < EPSILON);
    assert_eq!(
        rx.try_recv().unwrap(),
        Notification::TempoUpdated {
            old: 120.0,
            new: 60.0
        }
    );

    // rejected tempi leave the song untouched
    assert!(sequencer.update_tempo(0.0).is_err());
    assert!(sequencer.update_tempo(-30.0).is_err());
    assert_eq!(sequencer.song().meta.tempo, 60.0);
}

#[test]
fn test_stop_cancels_all() {
    let mut song = Song::new(120.0, 1, 1, 64);
    for slot in [0, 2, 4] {
        song.place(EventRef::new(0, 0, slot), NoteEvent::new(0, "D", 3), 1.0);
    }
    let (mut sequencer, clock, timeline) = session(song, SequencerConfig::default());
    let rx = sequencer.subscribe();
    sequencer.set_playing(true);

    sequencer.collect();
    assert_eq!(sequencer.pending_len(), 3);

    sequencer.set_playing(false);
    assert_eq!(sequencer.pending_len(), 0);
    for slot in [0, 2, 4] {
        let event = sequencer.song().event(EventRef::new(0, 0, slot)).unwrap();
        assert!(!event.seq.playing);
    }

    clock.set(5.0);
    assert_eq!(sequencer.fire_due(), 0);
    assert_eq!(sequencer.collect(), 0);
    assert!(timeline.is_empty());
    assert_eq!(
        rx.try_iter().collect::<Vec<_>>(),
        vec![Notification::PlaybackStarted, Notification::PlaybackStopped]
    );
}

#[test]
fn test_stop_after_note_on_cancels_release() {
    let mut song = Song::new(120.0, 1, 1, 64);
    song.place(EventRef::new(0, 0, 0), NoteEvent::new(0, "D", 3), 1.0);
    let (mut sequencer, clock, timeline) = session(song, SequencerConfig::default());
    sequencer.set_playing(true);
    tick(&mut sequencer);
    assert_eq!(note_ons(&timeline).len(), 1);

    sequencer.set_playing(false);
    clock.set(2.0);
    sequencer.fire_due();

    assert!(!timeline.entries().iter().any(TimelineEntry::is_note_off));
    let event = sequencer.song().event(EventRef::new(0, 0, 0)).unwrap();
    assert!(!event.seq.playing);
}

#[test]
fn test_count_in_gating() {
    let mut song = Song::new(120.0, 2, 1, 16);
    song.place(EventRef::new(0, 0, 0), NoteEvent::new(0, "C", 3), 0.25);
    let mut config = SequencerConfig::default();
    config.count_in = true;
    let (mut sequencer, clock, timeline) = session(song, config);
    sequencer.set_recording(true);
    sequencer.set_playing(true);
    assert!(sequencer.metronome().is_enabled());

    // the count-in measure: clicks on every beat, no channel events
    run_until(&mut sequencer, &clock, 1.75, 0.05);
    assert!(note_ons(&timeline).is_empty());
    assert!(!sequencer.metronome().count_in_complete());

    let clicks: Vec<_> = timeline
        .entries()
        .into_iter()
        .filter_map(|e| match e {
            TimelineEntry::Click { time, kind } => Some((time, kind)),
            _ => None,
        })
        .collect();
    assert_eq!(
        clicks,
        vec![
            (0.0, ClickType::Accent),
            (0.5, ClickType::Regular),
            (1.0, ClickType::Regular),
            (1.5, ClickType::Regular)
        ]
    );

    // the take starts at the first wrap, measure 0 again
    run_until(&mut sequencer, &clock, 2.1, 0.05);
    assert!(sequencer.metronome().count_in_complete());
    assert!(!sequencer.metronome().is_enabled());
    let ons = note_ons(&timeline);
    assert_eq!(ons.len(), 1);
    assert!((ons[0].time() - 2.0).abs() < EPSILON);
    assert!((sequencer.position().first_measure_start_time - 2.0).abs() < EPSILON);
}

#[test]
fn test_recording_pass_completes() {
    let mut song = Song::new(120.0, 2, 1, 16);
    song.place(EventRef::new(1, 0, 0), NoteEvent::new(0, "F", 3), 0.25);
    let (mut sequencer, clock, timeline) = session(song, SequencerConfig::default());
    let rx = sequencer.subscribe();
    sequencer.set_recording(true);
    sequencer.set_playing(true);

    run_until(&mut sequencer, &clock, 6.0, 0.05);

    assert!(!sequencer.is_playing());
    assert_eq!(sequencer.pending_len(), 0);
    assert_eq!(note_ons(&timeline).len(), 1);
    let notifications: Vec<_> = rx.try_iter().collect();
    assert_eq!(
        notifications,
        vec![
            Notification::PlaybackStarted,
            Notification::PatternSwitch(1),
            Notification::PlaybackStopped,
            Notification::RecordingComplete
        ]
    );
}

#[test]
fn test_single_note_scenario() {
    let mut song = Song::new(120.0, 1, 1, 64);
    song.place(EventRef::new(0, 0, 0), NoteEvent::new(0, "C", 3), 0.5);
    let (mut sequencer, clock, timeline) = session(song, SequencerConfig::default());

    sequencer.set_position(0, None);
    sequencer.set_playing(true);
    run_until(&mut sequencer, &clock, 1.0, 0.05);

    let entries: Vec<_> = timeline
        .entries()
        .into_iter()
        .filter(|e| !e.is_click())
        .collect();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].is_note_on());
    assert!(entries[0].time().abs() < 1e-6);
    assert!(entries[1].is_note_off());
    assert!((entries[1].time() - 0.5).abs() < 1e-6);
}

#[test]
fn test_song_reload_resets_playback() {
    let (mut sequencer, clock, timeline) = session(busy_song(), SequencerConfig::default());
    let rx = sequencer.subscribe();
    sequencer.set_playing(true);
    run_until(&mut sequencer, &clock, 0.3, 0.05);
    assert!(sequencer.pending_len() > 0);

    let previous = sequencer.load_song(Song::new(100.0, 4, 1, 16)).unwrap();
    assert_eq!(previous.patterns.len(), 2);
    assert!(!sequencer.is_playing());
    assert_eq!(sequencer.pending_len(), 0);
    assert_eq!(sequencer.position().measure, 0);
    assert!((sequencer.position().measure_length - 2.4).abs() < EPSILON);

    let before = timeline.len();
    clock.set(3.0);
    sequencer.fire_due();
    assert_eq!(timeline.len(), before);
    assert_eq!(rx.try_iter().last(), Some(Notification::SongLoaded));
}

#[test]
fn test_render_song_from_files() {
    let dir = tempdir().unwrap();
    let song_path = dir.path().join("song.yaml");
    let config_path = dir.path().join("seq.toml");
    busy_song().save(&song_path).unwrap();
    fs::write(&config_path, "metronome = true\nlooping = true\n").unwrap();

    let song = Song::load(&song_path).unwrap();
    let config = SequencerConfig::load(&config_path).unwrap();
    assert_eq!(config.step_precision, 64);

    let entries = render_offline(song, config, 3.9).unwrap();
    let ons = entries.iter().filter(|e| e.is_note_on()).count();
    let clicks = entries.iter().filter(|e| e.is_click()).count();
    assert_eq!(ons, 5);
    assert_eq!(clicks, 8);
    assert!(entries.windows(2).all(|w| w[0].time() <= w[1].time() + EPSILON));
}
