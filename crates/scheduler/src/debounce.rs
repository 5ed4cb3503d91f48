//! Last-value-wins debouncer
//!
//! Time is passed in explicitly so callers drive the debouncer from their own
//! event loop and tests never sleep.

use std::time::{Duration, Instant};

/// Holds the latest pushed value until no new value arrives for `window`
#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self { window, pending: None }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a value, replacing any pending one and restarting the window
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    /// Take the pending value if its quiet window has elapsed at `now`
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, last)) if now.saturating_duration_since(*last) >= self.window => {
                self.pending.take().map(|(value, _)| value)
            }
            _ => None,
        }
    }

    /// When the pending value becomes due, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, last)| *last + self.window)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop the pending value without firing
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }
}
