// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Transport run loop.
//!
//! The sequencer is single-writer state. The transport owns it and drains
//! one channel carrying both worker ticker pulses and controller commands,
//! firing due triggers between messages. Every mutation therefore happens
//! on the thread that calls [`Transport::run`].

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::audio::{TimelineEntry, TimelineRenderer};
use crate::config::SequencerConfig;
use crate::sequencer::Sequencer;
use crate::song::Song;
use crate::timing::{ManualTimebase, TickerMessage, WorkerTicker};

/// Commands a controller can send
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCommand {
    Play,
    Stop,
    TogglePlay,
    SetTempo(f64),
    SetPosition { measure: usize, step: Option<usize> },
    SetLooping(bool),
    SetRecording(bool),
    SetMetronome(bool),
    ToggleMetronome,
    SetCountIn(bool),
    LoadSong(Box<Song>),
    Shutdown,
}

/// Everything the run loop receives
#[derive(Debug, Clone, PartialEq)]
pub enum TransportMessage {
    /// Worker ticker pulse
    Collect,
    Command(TransportCommand),
}

impl From<TickerMessage> for TransportMessage {
    fn from(message: TickerMessage) -> Self {
        match message {
            TickerMessage::Collect => TransportMessage::Collect,
        }
    }
}

/// Cloneable sender for controllers on other threads
#[derive(Debug, Clone)]
pub struct TransportHandle {
    sender: Sender<TransportMessage>,
}

impl TransportHandle {
    /// Send a command; false once the transport is gone
    pub fn send(&self, command: TransportCommand) -> bool {
        self.sender.send(TransportMessage::Command(command)).is_ok()
    }

    pub fn play(&self) -> bool {
        self.send(TransportCommand::Play)
    }

    pub fn stop(&self) -> bool {
        self.send(TransportCommand::Stop)
    }

    pub fn set_tempo(&self, tempo: f64) -> bool {
        self.send(TransportCommand::SetTempo(tempo))
    }

    pub fn load_song(&self, song: Song) -> bool {
        self.send(TransportCommand::LoadSong(Box::new(song)))
    }

    pub fn shutdown(&self) -> bool {
        self.send(TransportCommand::Shutdown)
    }
}

/// Owns a sequencer and drives it from ticker pulses and commands
pub struct Transport {
    sequencer: Sequencer,
    ticker: WorkerTicker,
    receiver: Receiver<TransportMessage>,
    sender: Sender<TransportMessage>,
    ticking: bool,
}

impl Transport {
    /// Wrap `sequencer` and spawn its worker ticker
    pub fn new(sequencer: Sequencer) -> Result<Self> {
        let (sender, receiver) = mpsc::channel();
        let tick_interval = sequencer.config().tick_interval();
        let ticker = WorkerTicker::spawn(tick_interval, sender.clone())
            .context("Failed to spawn worker ticker thread")?;

        Ok(Self {
            sequencer,
            ticker,
            receiver,
            sender,
            ticking: false,
        })
    }

    pub fn handle(&self) -> TransportHandle {
        TransportHandle {
            sender: self.sender.clone(),
        }
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn sequencer_mut(&mut self) -> &mut Sequencer {
        &mut self.sequencer
    }

    /// Process messages until a `Shutdown` command arrives.
    /// Playback is stopped on the way out.
    pub fn run(&mut self) {
        info!("transport running");
        while self.pump(self.wait_timeout()) {}
        self.sequencer.set_playing(false);
        self.sync_ticker();
        info!("transport shut down");
    }

    /// Wait up to `timeout` for one message, handle it, then fire due
    /// triggers. Returns false after a `Shutdown`.
    pub fn pump(&mut self, timeout: Duration) -> bool {
        let keep_running = match self.receiver.recv_timeout(timeout) {
            Ok(message) => self.handle_message(message),
            Err(RecvTimeoutError::Timeout) => true,
            // unreachable while we hold a sender, but harmless
            Err(RecvTimeoutError::Disconnected) => false,
        };
        self.sequencer.fire_due();
        self.sync_ticker();
        keep_running
    }

    /// Stop the sequencer and hand it back
    pub fn into_sequencer(mut self) -> Sequencer {
        self.sequencer.set_playing(false);
        self.ticker.stop();
        self.sequencer
    }

    fn handle_message(&mut self, message: TransportMessage) -> bool {
        match message {
            TransportMessage::Collect => {
                self.sequencer.fire_due();
                self.sequencer.collect();
                true
            }
            TransportMessage::Command(TransportCommand::Shutdown) => false,
            TransportMessage::Command(command) => {
                self.apply(command);
                true
            }
        }
    }

    fn apply(&mut self, command: TransportCommand) {
        debug!(?command, "transport command");
        let sequencer = &mut self.sequencer;
        match command {
            TransportCommand::Play => sequencer.set_playing(true),
            TransportCommand::Stop => sequencer.set_playing(false),
            TransportCommand::TogglePlay => {
                sequencer.toggle_playing();
            }
            TransportCommand::SetTempo(tempo) => {
                if let Err(e) = sequencer.update_tempo(tempo) {
                    warn!("tempo change rejected: {}", e);
                }
            }
            TransportCommand::SetPosition { measure, step } => {
                sequencer.set_position(measure, step)
            }
            TransportCommand::SetLooping(looping) => sequencer.set_looping(looping),
            TransportCommand::SetRecording(recording) => sequencer.set_recording(recording),
            TransportCommand::SetMetronome(enabled) => sequencer.set_metronome_enabled(enabled),
            TransportCommand::ToggleMetronome => {
                sequencer.toggle_metronome();
            }
            TransportCommand::SetCountIn(count_in) => sequencer.set_count_in(count_in),
            TransportCommand::LoadSong(song) => {
                if let Err(e) = sequencer.load_song(*song) {
                    warn!("song rejected: {}", e);
                }
            }
            TransportCommand::Shutdown => {}
        }
    }

    /// Keep the ticker running exactly while the sequencer plays
    fn sync_ticker(&mut self) {
        let playing = self.sequencer.is_playing();
        if playing == self.ticking {
            return;
        }
        if playing {
            self.ticker.start();
        } else {
            self.ticker.stop();
        }
        self.ticking = playing;
    }

    /// Sleep no longer than the next armed trigger or one tick
    fn wait_timeout(&self) -> Duration {
        match self.sequencer.next_trigger_time() {
            Some(time) => {
                let tick = self.ticker.interval();
                let until = (time - self.sequencer.now()).clamp(0.0, tick.as_secs_f64());
                Duration::try_from_secs_f64(until).unwrap_or(tick)
            }
            None => self.ticker.interval(),
        }
    }
}

/// Play `song` for `duration` seconds against a manual clock and return
/// everything the renderer saw.
///
/// The clock advances one tick interval at a time, so the result matches
/// what a real-time run would produce with a perfectly punctual ticker.
pub fn render_offline(
    song: Song,
    config: SequencerConfig,
    duration: f64,
) -> crate::error::Result<Vec<TimelineEntry>> {
    let clock = ManualTimebase::new();
    let renderer = TimelineRenderer::new(clock.clone());
    let timeline = renderer.timeline();
    let tick = config.tick_interval().as_secs_f64();
    let mut sequencer = Sequencer::new(song, config, clock.clone(), renderer)?;

    sequencer.set_playing(true);
    let mut now = 0.0;
    while now <= duration && sequencer.is_playing() {
        sequencer.fire_due();
        sequencer.collect();
        sequencer.fire_due();

        // land exactly on armed triggers that fall inside this tick
        let next_tick = now + tick;
        while let Some(due) = sequencer.next_trigger_time() {
            if due >= next_tick || due > duration {
                break;
            }
            clock.set(due);
            sequencer.fire_due();
        }
        now = next_tick;
        clock.set(now);
    }
    sequencer.set_playing(false);
    debug!(entries = timeline.len(), "offline render finished");

    Ok(timeline.entries())
}
