use std::time::{Duration, Instant};

/// Time-limited copy of the last successful load. The snapshot goes stale
/// either when `ttl` elapses or when a write calls [`Snapshot::invalidate`].
#[derive(Debug)]
pub struct Snapshot<T> {
    ttl: Duration,
    entry: Option<(Instant, T)>,
}

impl<T> Snapshot<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    /// Cached value if it is younger than the configured lifetime.
    pub fn get(&self) -> Option<&T> {
        self.entry
            .as_ref()
            .filter(|(stored_at, _)| stored_at.elapsed() < self.ttl)
            .map(|(_, value)| value)
    }

    pub fn store(&mut self, value: T) {
        self.entry = Some((Instant::now(), value));
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn is_fresh(&self) -> bool {
        self.get().is_some()
    }

    /// Age of the cached value, stale or not.
    pub fn age(&self) -> Option<Duration> {
        self.entry.as_ref().map(|(stored_at, _)| stored_at.elapsed())
    }
}
