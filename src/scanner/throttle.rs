//! Trailing-edge throttle for high-frequency input.
//!
//! The first value passes through immediately. Values offered inside the
//! window replace each other; the latest one is released by `flush` once
//! the window has elapsed.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
pub struct Throttle<T> {
    window: Duration,
    last_fired: Option<Instant>,
    pending: Option<T>,
}

impl<T> Throttle<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_fired: None,
            pending: None,
        }
    }

    /// Returns the value if it may be applied now, otherwise parks it.
    pub fn offer(&mut self, value: T, now: Instant) -> Option<T> {
        match self.last_fired {
            Some(last) if now.saturating_duration_since(last) < self.window => {
                self.pending = Some(value);
                None
            }
            _ => {
                self.last_fired = Some(now);
                self.pending = None;
                Some(value)
            }
        }
    }

    /// When the parked value becomes due, if there is one.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref()?;
        Some(match self.last_fired {
            Some(last) => last + self.window,
            None => Instant::now(),
        })
    }

    pub fn flush(&mut self, now: Instant) -> Option<T> {
        let due = self.deadline()?;
        if now < due {
            return None;
        }
        self.last_fired = Some(now);
        self.pending.take()
    }

    pub fn reset(&mut self) {
        self.last_fired = None;
        self.pending = None;
    }
}
