// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Pending triggers.
//!
//! An arena of armed, not yet fired triggers keyed by insertion order.
//! The dispatcher owns every entry until it fires or is cancelled; a
//! handle is never reused, so cancelling an entry that already fired is a
//! harmless no-op.

use std::collections::BTreeMap;

use crate::audio::Click;
use crate::song::EventRef;

/// Handle to an armed trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriggerHandle(u64);

/// What a trigger does when it fires
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerAction {
    /// Start the event and arm its release
    NoteOn(EventRef),
    /// Release the event and clear its `playing` flag
    NoteOff(EventRef),
    /// Sound a metronome click
    Click(Click),
}

/// An armed trigger
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub handle: TriggerHandle,
    /// Timebase seconds to fire at
    pub time: f64,
    pub action: TriggerAction,
}

/// Arena of pending triggers
#[derive(Debug, Default)]
pub struct PendingTriggers {
    next_id: u64,
    triggers: BTreeMap<TriggerHandle, Trigger>,
}

impl PendingTriggers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `action` to fire at `time`
    pub fn schedule(&mut self, time: f64, action: TriggerAction) -> TriggerHandle {
        let handle = TriggerHandle(self.next_id);
        self.next_id += 1;
        self.triggers.insert(
            handle,
            Trigger {
                handle,
                time,
                action,
            },
        );
        handle
    }

    /// Disarm a trigger. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TriggerHandle) -> bool {
        self.triggers.remove(&handle).is_some()
    }

    /// Disarm everything, returning how many were pending
    pub fn cancel_all(&mut self) -> usize {
        let count = self.triggers.len();
        self.triggers.clear();
        count
    }

    /// Remove and return every trigger due at `now`, earliest first.
    /// Equal times fire in the order they were armed.
    pub fn pop_due(&mut self, now: f64) -> Vec<Trigger> {
        let due: Vec<TriggerHandle> = self
            .triggers
            .values()
            .filter(|t| t.time <= now)
            .map(|t| t.handle)
            .collect();

        let mut fired: Vec<Trigger> = due
            .into_iter()
            .filter_map(|handle| self.triggers.remove(&handle))
            .collect();
        // stable sort keeps insertion order for ties
        fired.sort_by(|a, b| a.time.total_cmp(&b.time));
        fired
    }

    /// Time of the earliest pending trigger
    pub fn next_due(&self) -> Option<f64> {
        self.triggers
            .values()
            .map(|t| t.time)
            .min_by(|a, b| a.total_cmp(b))
    }

    pub fn contains(&self, handle: TriggerHandle) -> bool {
        self.triggers.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}
