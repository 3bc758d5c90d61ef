// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Clock sources.
//!
//! The scheduler never reads wall-clock time. Everything is expressed in
//! seconds on a monotonic timebase: the audio device's own clock when one
//! is available, a monotonic `Instant` otherwise, or a manually driven
//! clock for offline rendering and tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A monotonic clock measured in seconds
pub trait Timebase {
    /// Current time in seconds
    fn now(&self) -> f64;
}

impl<T: Timebase + ?Sized> Timebase for Box<T> {
    fn now(&self) -> f64 {
        (**self).now()
    }
}

impl<T: Timebase + ?Sized> Timebase for Arc<T> {
    fn now(&self) -> f64 {
        (**self).now()
    }
}

/// Seconds elapsed since the timebase was created
#[derive(Debug, Clone, Copy)]
pub struct SystemTimebase {
    origin: Instant,
}

impl SystemTimebase {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTimebase {
    fn default() -> Self {
        Self::new()
    }
}

impl Timebase for SystemTimebase {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the sequencer.
#[derive(Debug, Clone, Default)]
pub struct ManualTimebase {
    bits: Arc<AtomicU64>,
}

impl ManualTimebase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jump to an absolute time. Going backwards is ignored.
    pub fn set(&self, seconds: f64) {
        if seconds > self.now() {
            self.bits.store(seconds.to_bits(), Ordering::Release);
        }
    }

    /// Move forward by `seconds`
    pub fn advance(&self, seconds: f64) {
        self.set(self.now() + seconds);
    }
}

impl Timebase for ManualTimebase {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }
}
