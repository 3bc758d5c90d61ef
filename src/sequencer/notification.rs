// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Playback notifications.
//!
//! Fire-and-forget fan-out to any number of channel subscribers. Each
//! subscriber sees notifications in emission order; nothing more is
//! promised.

use std::sync::mpsc::{self, Receiver, Sender};

/// Something observers of the scheduler may care about
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Notification {
    PlaybackStarted,
    PlaybackStopped,
    /// Playback moved into the given measure
    PatternSwitch(usize),
    /// The end of the song was reached while recording
    RecordingComplete,
    TempoUpdated { old: f64, new: f64 },
    /// A new song replaced the current one
    SongLoaded,
}

/// Publisher side of the notification channel
#[derive(Debug, Default)]
pub struct NotificationBus {
    subscribers: Vec<Sender<Notification>>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber
    pub fn subscribe(&mut self) -> Receiver<Notification> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Send to every subscriber, dropping the ones that hung up
    pub fn publish(&mut self, notification: Notification) {
        self.subscribers.retain(|tx| tx.send(notification).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Disconnect every subscriber
    pub fn clear(&mut self) {
        self.subscribers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_out_in_order() {
        let mut bus = NotificationBus::new();
        let first = bus.subscribe();
        let second = bus.subscribe();

        bus.publish(Notification::PlaybackStarted);
        bus.publish(Notification::PatternSwitch(3));

        for rx in [first, second] {
            let received: Vec<_> = rx.try_iter().collect();
            assert_eq!(
                received,
                vec![Notification::PlaybackStarted, Notification::PatternSwitch(3)]
            );
        }
    }

    #[test]
    fn test_prunes_disconnected() {
        let mut bus = NotificationBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(Notification::SongLoaded);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(kept.try_recv().unwrap(), Notification::SongLoaded);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let mut bus = NotificationBus::new();
        bus.publish(Notification::PlaybackStopped);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_clear_disconnects() {
        let mut bus = NotificationBus::new();
        let rx = bus.subscribe();
        bus.clear();
        assert!(rx.recv().is_err());
    }
}
