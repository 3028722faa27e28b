//! Watcher configuration.

use std::time::Duration;

/// Configuration for a [`ChangeWatcher`](crate::ChangeWatcher).
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Pause between two scans of the watched trees.
    pub poll_interval: Duration,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            event_capacity: 256,
        }
    }
}

impl WatcherConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the event channel capacity.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}
