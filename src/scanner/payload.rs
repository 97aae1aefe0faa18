//! Recent-payload memory used to suppress repeated notifications.
//!
//! Entries are kept oldest first. Expired entries are evicted from the
//! front on every access, then the size cap is enforced.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
struct PayloadEntry {
    value: String,
    timestamp: Instant,
}

#[derive(Debug)]
pub struct RecentPayloads {
    ttl: Duration,
    max_size: usize,
    entries: VecDeque<PayloadEntry>,
}

impl RecentPayloads {
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            ttl,
            max_size,
            entries: VecDeque::with_capacity(max_size),
        }
    }

    /// Drops entries older than the TTL, then trims to the size cap.
    pub fn prune(&mut self, now: Instant) {
        while let Some(front) = self.entries.front() {
            if now.saturating_duration_since(front.timestamp) > self.ttl {
                self.entries.pop_front();
            } else {
                break;
            }
        }
        while self.entries.len() > self.max_size {
            self.entries.pop_front();
        }
    }

    pub fn is_recent(&mut self, payload: &str, now: Instant) -> bool {
        self.prune(now);
        self.entries.iter().any(|entry| entry.value == payload)
    }

    pub fn remember(&mut self, payload: impl Into<String>, now: Instant) {
        self.entries.push_back(PayloadEntry {
            value: payload.into(),
            timestamp: now,
        });
        self.prune(now);
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
