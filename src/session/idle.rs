//! Idle deadline tracked next to the token.

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::Result;
use crate::storage::{ClientStorage, StorageKey};

/// Default idle timeout (1 hour).
pub const DEFAULT_IDLE_TIMEOUT: TimeDelta = TimeDelta::hours(1);

/// Keeps the `session_timeout` entry: epoch milliseconds after which the
/// session counts as idle-expired.
#[derive(Debug, Clone, Copy)]
pub struct IdleTimer {
    timeout: TimeDelta,
}

impl Default for IdleTimer {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TIMEOUT)
    }
}

impl IdleTimer {
    #[must_use]
    pub fn new(timeout: TimeDelta) -> Self {
        Self { timeout }
    }

    #[must_use]
    pub fn timeout(&self) -> TimeDelta {
        self.timeout
    }

    /// Deadline that a reset at `now` would store. Saturates at the latest
    /// representable instant.
    #[must_use]
    pub fn deadline_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.timeout)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Storage entry for a reset at `now`.
    #[must_use]
    pub fn entry(&self, now: DateTime<Utc>) -> (StorageKey, String) {
        (
            StorageKey::SessionTimeout,
            self.deadline_from(now).timestamp_millis().to_string(),
        )
    }

    /// Push the deadline out to `now + timeout`.
    pub fn reset(&self, storage: &dyn ClientStorage, now: DateTime<Utc>) -> Result<()> {
        let (key, value) = self.entry(now);
        storage.set(key, &value)
    }

    /// Stored deadline, if present and readable.
    pub fn deadline(storage: &dyn ClientStorage) -> Option<DateTime<Utc>> {
        storage
            .get(StorageKey::SessionTimeout)
            .ok()
            .flatten()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis)
    }

    /// True when the deadline is missing, unreadable, or reached.
    pub fn is_expired(storage: &dyn ClientStorage, now: DateTime<Utc>) -> bool {
        Self::deadline(storage).is_none_or(|deadline| now >= deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_missing_deadline_is_expired() {
        let storage = MemoryStorage::new();
        assert!(IdleTimer::is_expired(&storage, Utc::now()));
    }

    #[test]
    fn test_reset_extends_deadline() {
        let storage = MemoryStorage::new();
        let timer = IdleTimer::new(TimeDelta::minutes(5));
        let start = Utc::now();

        timer.reset(&storage, start).unwrap();
        assert!(!IdleTimer::is_expired(&storage, start + TimeDelta::minutes(4)));
        assert!(IdleTimer::is_expired(&storage, start + TimeDelta::minutes(5)));

        timer.reset(&storage, start + TimeDelta::minutes(4)).unwrap();
        assert!(!IdleTimer::is_expired(&storage, start + TimeDelta::minutes(8)));
    }

    #[test]
    fn test_huge_timeout_saturates() {
        let storage = MemoryStorage::new();
        let timer = IdleTimer::new(TimeDelta::MAX);
        let now = Utc::now();

        assert_eq!(timer.deadline_from(now), DateTime::<Utc>::MAX_UTC);
        timer.reset(&storage, now).unwrap();
        assert!(!IdleTimer::is_expired(&storage, now + TimeDelta::days(365 * 100)));
    }

    #[test]
    fn test_unreadable_deadline_is_expired() {
        let storage = MemoryStorage::new();
        storage.set(StorageKey::SessionTimeout, "soon").unwrap();
        assert!(IdleTimer::is_expired(&storage, Utc::now()));
    }
}
