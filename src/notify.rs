use std::time::{Duration, Instant};

use serde::Serialize;

use crate::domain::Severity;

pub const DEFAULT_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: u64,
    pub text: String,
    pub severity: Severity,
    #[serde(skip)]
    pub expires_at: Instant,
}

#[derive(Debug, Clone)]
pub struct NotificationQueue {
    ttl: Duration,
    next_id: u64,
    entries: Vec<Notification>,
}

impl NotificationQueue {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            next_id: 1,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, text: impl Into<String>, severity: Severity, now: Instant) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(Notification {
            id,
            text: text.into(),
            severity,
            expires_at: now + self.ttl,
        });
        id
    }

    pub fn sweep(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.expires_at > now);
        before - self.entries.len()
    }

    pub fn visible(&self, now: Instant) -> impl Iterator<Item = &Notification> {
        self.entries.iter().filter(move |entry| entry.expires_at > now)
    }

    pub fn get(&self, id: u64) -> Option<&Notification> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct() {
        let now = Instant::now();
        let mut queue = NotificationQueue::default();
        let a = queue.push("one", Severity::Info, now);
        let b = queue.push("one", Severity::Info, now);
        assert_ne!(a, b);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn each_entry_expires_on_its_own_deadline() {
        let start = Instant::now();
        let mut queue = NotificationQueue::default();
        let first = queue.push("first", Severity::Success, start);
        let second = queue.push("second", Severity::Error, start + Duration::from_secs(3));

        assert_eq!(queue.sweep(start + Duration::from_secs(5)), 1);
        assert!(queue.get(first).is_none());
        assert!(queue.get(second).is_some());

        queue.sweep(start + Duration::from_millis(8_001));
        assert!(queue.is_empty());
    }
}
