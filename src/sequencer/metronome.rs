// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Metronome and count-in state.

use crate::audio::{Click, ClickType};

/// Metronome state.
///
/// `restore` remembers whether the metronome was on before a count-in
/// forced it on, so the take continues with the user's choice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metronome {
    enabled: bool,
    count_in: bool,
    count_in_complete: bool,
    restore: bool,
}

impl Metronome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Flip the enabled state, returning the new value
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    /// Whether recordings start with a one measure count-in
    pub fn count_in(&self) -> bool {
        self.count_in
    }

    pub fn set_count_in(&mut self, count_in: bool) {
        self.count_in = count_in;
    }

    pub fn count_in_complete(&self) -> bool {
        self.count_in_complete
    }

    /// Force the click on for the count-in measure
    pub fn begin_count_in(&mut self) {
        self.restore = self.enabled;
        self.enabled = true;
        self.count_in_complete = false;
    }

    /// End of the count-in measure: put the click back how it was
    pub fn complete_count_in(&mut self) {
        self.enabled = self.restore;
        self.count_in_complete = true;
    }

    /// Channel events stay silent while a recording's count-in runs
    pub fn suppresses_events(&self, recording: bool) -> bool {
        recording && self.count_in && !self.count_in_complete
    }

    /// Click for `step`, if it lands on a beat boundary.
    ///
    /// Step 0 is the downbeat and gets the accented click.
    pub fn play(
        &self,
        channel: usize,
        step: usize,
        step_precision: usize,
        beat_amount: u8,
        time: f64,
    ) -> Option<Click> {
        let steps_per_beat = (step_precision / beat_amount.max(1) as usize).max(1);
        if step % steps_per_beat != 0 {
            return None;
        }
        let kind = if step == 0 {
            ClickType::Accent
        } else {
            ClickType::Regular
        };
        Some(Click {
            kind,
            time,
            channel,
        })
    }
}
