// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Song data model.
//!
//! A song is an ordered list of patterns (one measure each), a tempo,
//! a time signature and an instrument table. Songs are stored as YAML.

pub mod event;

pub use event::{
    reset_play_state, update_event_offsets, Channel, EventRef, EventSequencing, NoteEvent,
    Pattern,
};

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::{check_tempo, SequencerError};

/// Song metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SongMeta {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub author: String,
    /// Tempo in BPM
    #[serde(default = "default_tempo")]
    pub tempo: f64,
}

fn default_title() -> String {
    "Untitled".to_string()
}
fn default_tempo() -> f64 {
    120.0
}

impl Default for SongMeta {
    fn default() -> Self {
        Self {
            title: default_title(),
            author: String::new(),
            tempo: default_tempo(),
        }
    }
}

/// Time signature: `beat_amount` over `beat_unit` (the 3 and 4 in 3/4)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeSignature {
    #[serde(default = "default_beats")]
    pub beat_amount: u8,
    #[serde(default = "default_beats")]
    pub beat_unit: u8,
}

fn default_beats() -> u8 {
    4
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            beat_amount: 4,
            beat_unit: 4,
        }
    }
}

/// Instrument table entry. Sound generation happens in the renderer;
/// the scheduler only passes the entry along with each note-on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instrument {
    pub name: String,
    #[serde(default = "default_volume")]
    pub volume: f32,
}

fn default_volume() -> f32 {
    1.0
}

impl Instrument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            volume: default_volume(),
        }
    }
}

/// A song
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Song {
    #[serde(default)]
    pub meta: SongMeta,
    #[serde(default)]
    pub time_signature: TimeSignature,
    #[serde(default)]
    pub instruments: Vec<Instrument>,
    #[serde(default)]
    pub patterns: Vec<Pattern>,
}

impl Song {
    /// Create a song of empty patterns
    pub fn new(tempo: f64, patterns: usize, channels: usize, slots: usize) -> Self {
        Self {
            meta: SongMeta {
                tempo,
                ..SongMeta::default()
            },
            time_signature: TimeSignature::default(),
            instruments: vec![Instrument::new("default")],
            patterns: (0..patterns).map(|_| Pattern::new(channels, slots)).collect(),
        }
    }

    /// Load a song from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read song file: {:?}", path.as_ref()))?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate a song from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let song: Self = serde_yaml::from_str(yaml).context("Failed to parse song YAML")?;
        song.validate()?;
        Ok(song)
    }

    /// Serialize to a YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize song to YAML")
    }

    /// Save the song to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = self.to_yaml()?;
        fs::write(path.as_ref(), yaml)
            .with_context(|| format!("Failed to write song file: {:?}", path.as_ref()))
    }

    /// Check the song can be played
    pub fn validate(&self) -> crate::error::Result<()> {
        check_tempo(self.meta.tempo)?;
        if self.patterns.is_empty() {
            return Err(SequencerError::EmptySong);
        }
        Ok(())
    }

    /// Seconds per measure at the current tempo
    pub fn measure_length(&self) -> f64 {
        60.0 / self.meta.tempo * self.time_signature.beat_amount as f64
    }

    pub fn instrument(&self, index: usize) -> Option<&Instrument> {
        self.instruments.get(index)
    }

    pub fn event(&self, at: EventRef) -> Option<&NoteEvent> {
        self.patterns
            .get(at.pattern)?
            .channels
            .get(at.channel)?
            .get(at.slot)?
            .as_ref()
    }

    pub fn event_mut(&mut self, at: EventRef) -> Option<&mut NoteEvent> {
        self.patterns
            .get_mut(at.pattern)?
            .channels
            .get_mut(at.channel)?
            .get_mut(at.slot)?
            .as_mut()
    }

    /// Put `event` into a slot, deriving its timing from the slot position.
    ///
    /// Returns false when the slot does not exist.
    pub fn place(&mut self, at: EventRef, mut event: NoteEvent, length: f64) -> bool {
        let measure_length = self.measure_length();
        let Some(channel) = self
            .patterns
            .get_mut(at.pattern)
            .and_then(|p| p.channels.get_mut(at.channel))
        else {
            return false;
        };
        let slots = channel.len();
        let Some(slot) = channel.get_mut(at.slot) else {
            return false;
        };

        event.seq = EventSequencing {
            start_measure: at.pattern,
            start_measure_offset: at.slot as f64 / slots as f64 * measure_length,
            length,
            playing: false,
        };
        *slot = Some(event);
        true
    }

    /// Total number of events across all patterns
    pub fn event_count(&self) -> usize {
        self.patterns.iter().map(|p| p.events().count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_song() {
        let yaml = r#"
meta:
  title: "Test Song"
  tempo: 140
instruments:
  - name: "Lead"
    volume: 0.8
patterns:
  - channels:
      - - instrument: 0
          note: "D"
          octave: 4
          seq:
            start_measure: 0
            start_measure_offset: 0.0
            length: 0.5
        - ~
      - [~, ~]
  - channels: []
"#;

        let song = Song::from_yaml(yaml).unwrap();
        assert_eq!(song.meta.title, "Test Song");
        assert_eq!(song.meta.tempo, 140.0);
        assert_eq!(song.time_signature, TimeSignature::default());
        assert_eq!(song.instruments[0].volume, 0.8);
        assert_eq!(song.patterns.len(), 2);

        let event = song.event(EventRef::new(0, 0, 0)).unwrap();
        assert_eq!(event.note, "D");
        assert_eq!(event.seq.length, 0.5);
        assert!(!event.seq.playing);
        assert!(song.event(EventRef::new(0, 0, 1)).is_none());
        assert!(song.event(EventRef::new(0, 5, 0)).is_none());
    }

    #[test]
    fn test_validation() {
        assert!(Song::from_yaml("meta:\n  tempo: 0\npatterns:\n  - channels: []\n").is_err());
        assert!(Song::from_yaml("meta:\n  tempo: 120\n").is_err());
        assert_eq!(
            Song::new(-1.0, 1, 1, 4).validate(),
            Err(SequencerError::InvalidTempo(-1.0))
        );
        assert_eq!(Song::new(120.0, 0, 1, 4).validate(), Err(SequencerError::EmptySong));
    }

    #[test]
    fn test_measure_length() {
        let mut song = Song::new(120.0, 1, 1, 16);
        assert_eq!(song.measure_length(), 2.0);

        song.time_signature.beat_amount = 3;
        assert_eq!(song.measure_length(), 1.5);
    }

    #[test]
    fn test_place_event() {
        let mut song = Song::new(120.0, 2, 1, 16);
        assert!(song.place(EventRef::new(1, 0, 4), NoteEvent::new(0, "G", 2), 0.25));

        let event = song.event(EventRef::new(1, 0, 4)).unwrap();
        assert_eq!(event.seq.start_measure, 1);
        // a quarter of the way into a 2 second measure
        assert_eq!(event.seq.start_measure_offset, 0.5);
        assert_eq!(event.seq.length, 0.25);

        assert!(!song.place(EventRef::new(2, 0, 0), NoteEvent::new(0, "G", 2), 0.25));
        assert!(!song.place(EventRef::new(0, 0, 16), NoteEvent::new(0, "G", 2), 0.25));
        assert_eq!(song.event_count(), 1);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("song.yaml");

        let mut song = Song::new(90.0, 1, 2, 8);
        song.place(EventRef::new(0, 1, 2), NoteEvent::new(0, "A", 3), 0.3);
        song.save(&path).unwrap();

        let loaded = Song::load(&path).unwrap();
        assert_eq!(loaded, song);
    }
}
