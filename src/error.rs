// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Error types for the playback scheduler.

use thiserror::Error;

/// Errors raised at the scheduler's input boundaries.
///
/// Nothing inside the lookahead loop produces an error: out-of-range
/// positions are clamped and missing slots are skipped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SequencerError {
    /// Tempo was zero, negative or not a finite number
    #[error("invalid tempo: {0} BPM (must be a positive number)")]
    InvalidTempo(f64),
    /// Song contains no patterns to play
    #[error("song contains no patterns")]
    EmptySong,
    /// Sequencer settings are out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The audio device clock could not be opened
    #[error("audio clock unavailable: {0}")]
    AudioClock(String),
}

/// Result alias for scheduler operations
pub type Result<T> = std::result::Result<T, SequencerError>;

/// Reject tempi the step math cannot divide by.
pub fn check_tempo(tempo: f64) -> Result<f64> {
    if tempo.is_finite() && tempo > 0.0 {
        Ok(tempo)
    } else {
        Err(SequencerError::InvalidTempo(tempo))
    }
}
