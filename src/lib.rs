// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Lookahead playback scheduler for tracker-style songs.
//!
//! A song is a list of patterns (one per measure) holding note events.
//! The [`sequencer::Sequencer`] walks a step clock ahead of a monotonic
//! [`timing::Timebase`], arming note-on/note-off triggers that an
//! [`audio::AudioRenderer`] plays at their exact times. The
//! [`transport::Transport`] run loop owns the sequencer and serializes
//! worker ticker pulses with controller commands.

pub mod audio;
pub mod config;
pub mod error;
pub mod sequencer;
pub mod song;
pub mod timing;
pub mod transport;

pub use config::SequencerConfig;
pub use error::{Result, SequencerError};
pub use sequencer::{Notification, Sequencer};
pub use song::Song;
pub use transport::{render_offline, Transport, TransportCommand, TransportHandle};
