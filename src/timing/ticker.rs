// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Worker ticker.
//!
//! A dedicated thread that emits `Collect` pulses at a fixed interval while
//! started. It carries no timing state of its own; whoever receives the
//! pulse re-reads the authoritative timebase. Running on its own thread keeps
//! pulse delivery independent of whatever the consuming thread is busy with.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

/// Default pulse interval
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(25);

/// Inbound ticker commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerCommand {
    Start,
    Stop,
}

/// Outbound ticker messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerMessage {
    /// Time to run a lookahead pass
    Collect,
}

/// Handle to the ticker thread. Dropping it shuts the thread down.
pub struct WorkerTicker {
    commands: Option<Sender<TickerCommand>>,
    thread: Option<JoinHandle<()>>,
    interval: Duration,
}

impl WorkerTicker {
    /// Spawn the ticker thread. Pulses go to `outbound`, converted into
    /// the receiver's message type.
    pub fn spawn<M>(interval: Duration, outbound: Sender<M>) -> std::io::Result<Self>
    where
        M: From<TickerMessage> + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("worker-ticker".to_string())
            .spawn(move || run(interval, command_rx, outbound))?;

        Ok(Self {
            commands: Some(command_tx),
            thread: Some(thread),
            interval,
        })
    }

    /// Begin emitting pulses; the first one is sent immediately
    pub fn start(&self) {
        self.send(TickerCommand::Start);
    }

    /// Stop emitting pulses
    pub fn stop(&self) {
        self.send(TickerCommand::Stop);
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn send(&self, command: TickerCommand) {
        if let Some(commands) = &self.commands {
            let _ = commands.send(command);
        }
    }
}

impl Drop for WorkerTicker {
    fn drop(&mut self) {
        // hanging up the command channel ends the thread
        self.commands = None;
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn run<M>(interval: Duration, commands: Receiver<TickerCommand>, outbound: Sender<M>)
where
    M: From<TickerMessage>,
{
    let mut running = false;
    let mut next_pulse = Instant::now();

    loop {
        let command = if running {
            let wait = next_pulse.saturating_duration_since(Instant::now());
            match commands.recv_timeout(wait) {
                Ok(command) => Some(command),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match commands.recv() {
                Ok(command) => Some(command),
                Err(_) => break,
            }
        };

        match command {
            Some(TickerCommand::Start) => {
                if !running {
                    debug!(?interval, "worker ticker started");
                    running = true;
                    next_pulse = Instant::now();
                }
            }
            Some(TickerCommand::Stop) => {
                if running {
                    debug!("worker ticker stopped");
                }
                running = false;
            }
            None => {
                trace!("collect pulse");
                if outbound.send(M::from(TickerMessage::Collect)).is_err() {
                    // receiver is gone
                    break;
                }
                // skip missed pulses rather than bursting to catch up
                next_pulse = (next_pulse + interval).max(Instant::now());
            }
        }
    }
}
