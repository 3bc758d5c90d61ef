// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Timing module.
//!
//! This module provides the clock sources the scheduler reads and the
//! worker ticker that drives the lookahead loop.

pub mod ticker;
pub mod timebase;

pub use ticker::{TickerCommand, TickerMessage, WorkerTicker, DEFAULT_TICK_INTERVAL};
pub use timebase::{ManualTimebase, SystemTimebase, Timebase};
