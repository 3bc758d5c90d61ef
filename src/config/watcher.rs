// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Song file watcher for hot reload.
//!
//! Editors often replace a file instead of writing it in place, so the
//! parent directory is watched and events are filtered down to the song's
//! file name. Bursts of events are debounced before the song is parsed.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use crate::song::Song;

/// Default quiet period before a changed file is reloaded
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Events emitted by the song watcher
#[derive(Debug, Clone)]
pub enum SongEvent {
    /// The file changed and parsed into a playable song
    Reloaded(Box<Song>),
    /// The file changed but could not be loaded
    Error(String),
}

/// Watches one song file and reloads it when it changes
pub struct SongWatcher {
    _watcher: RecommendedWatcher,
    event_receiver: Receiver<SongEvent>,
    watched_path: PathBuf,
}

impl SongWatcher {
    /// Watch the song at `path`, waiting `debounce` (default 500ms) after
    /// the last change before reloading it
    pub fn new<P: AsRef<Path>>(path: P, debounce: Option<Duration>) -> Result<Self> {
        let watched_path = path.as_ref().to_path_buf();
        let debounce = debounce.unwrap_or(DEFAULT_DEBOUNCE);

        let file_name = watched_path
            .file_name()
            .map(|name| name.to_os_string())
            .ok_or_else(|| anyhow!("Not a song file path: {:?}", watched_path))?;
        let directory = match watched_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (event_tx, event_rx) = mpsc::channel();
        let (notify_tx, notify_rx): (Sender<Event>, Receiver<Event>) = mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                if let Ok(event) = res {
                    let _ = notify_tx.send(event);
                }
            },
            Config::default(),
        )
        .context("Failed to create file watcher")?;

        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory {:?}", directory))?;

        let song_path = watched_path.clone();
        thread::Builder::new()
            .name("song-watcher".into())
            .spawn(move || {
                let mut last_change: Option<Instant> = None;

                loop {
                    match notify_rx.recv_timeout(Duration::from_millis(50)) {
                        Ok(event) => {
                            let relevant = matches!(
                                event.kind,
                                EventKind::Create(_) | EventKind::Modify(_)
                            ) && event
                                .paths
                                .iter()
                                .any(|p| p.file_name() == Some(file_name.as_os_str()));
                            if relevant {
                                last_change = Some(Instant::now());
                            }
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                        // watcher dropped
                        Err(RecvTimeoutError::Disconnected) => break,
                    }

                    let settled = last_change.is_some_and(|t| t.elapsed() >= debounce);
                    if settled {
                        last_change = None;
                        if event_tx.send(reload(&song_path)).is_err() {
                            break;
                        }
                    }
                }
            })
            .context("Failed to spawn song watcher thread")?;

        Ok(Self {
            _watcher: watcher,
            event_receiver: event_rx,
            watched_path,
        })
    }

    /// Next event, if one is waiting
    pub fn try_recv(&self) -> Option<SongEvent> {
        self.event_receiver.try_recv().ok()
    }

    /// Drain every waiting event
    pub fn recv_all(&self) -> Vec<SongEvent> {
        self.event_receiver.try_iter().collect()
    }

    /// Block until the next event; `None` once the watcher thread exits
    pub fn recv(&self) -> Option<SongEvent> {
        self.event_receiver.recv().ok()
    }

    /// Wait up to `timeout` for the next event
    pub fn recv_timeout(&self, timeout: Duration) -> Option<SongEvent> {
        self.event_receiver.recv_timeout(timeout).ok()
    }

    pub fn watched_path(&self) -> &Path {
        &self.watched_path
    }
}

fn reload(path: &Path) -> SongEvent {
    match Song::load(path) {
        Ok(song) => {
            debug!(?path, "song reloaded");
            SongEvent::Reloaded(Box::new(song))
        }
        Err(e) => {
            warn!(?path, "song reload failed: {:#}", e);
            SongEvent::Error(format!("Failed to load {:?}: {:#}", path, e))
        }
    }
}
