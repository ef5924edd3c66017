use chrono::{DateTime, Duration, Utc};

use crate::{errors::Result, storage::LedgerSink};

use super::session::{ephemeral_created_at, DEFAULT_DEMO_PREFIX};

/// Default age after which an abandoned demo ledger is deleted.
pub const DEFAULT_RETENTION_MINUTES: u64 = 60;
const MAX_RETENTION_MINUTES: i64 = 60 * 24 * 365 * 100;

/// Deletes ephemeral sinks older than a fixed age. Run once at process start.
#[derive(Debug, Clone)]
pub struct RetentionSweep {
    prefix: String,
    max_age: Duration,
}

impl RetentionSweep {
    pub fn new(prefix: impl Into<String>, max_age_minutes: u64) -> Self {
        let minutes = i64::try_from(max_age_minutes)
            .unwrap_or(MAX_RETENTION_MINUTES)
            .min(MAX_RETENTION_MINUTES);
        Self {
            prefix: prefix.into(),
            max_age: Duration::minutes(minutes),
        }
    }

    /// Removes every expired ephemeral sink and returns the identities removed.
    ///
    /// Sinks whose handle does not carry the ephemeral prefix and timestamp are
    /// never touched. A sink that cannot be deleted is logged and skipped.
    pub fn run(&self, storage: &dyn LedgerSink, now: DateTime<Utc>) -> Result<Vec<String>> {
        let mut removed = Vec::new();
        for identity in storage.identities()? {
            let Some(created_at) = ephemeral_created_at(&self.prefix, &identity) else {
                continue;
            };
            if now - created_at <= self.max_age {
                continue;
            }
            match storage.remove(&identity) {
                Ok(_) => removed.push(identity),
                Err(err) => {
                    tracing::warn!(%identity, error = %err, "failed to remove expired demo ledger")
                }
            }
        }
        if !removed.is_empty() {
            tracing::info!(count = removed.len(), "retention sweep removed expired demo ledgers");
        }
        Ok(removed)
    }
}

impl Default for RetentionSweep {
    fn default() -> Self {
        Self::new(DEFAULT_DEMO_PREFIX, DEFAULT_RETENTION_MINUTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::session::Session, storage::CsvStorage};
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn removes_only_expired_ephemeral_sinks() {
        let temp = tempdir().unwrap();
        let storage = CsvStorage::new(temp.path().to_path_buf()).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();

        let stale = Session::ephemeral("guest", now - Duration::minutes(61));
        let fresh = Session::ephemeral("guest", now - Duration::minutes(10));
        for identity in [stale.identity(), fresh.identity(), "alice", "guest"] {
            storage.write(identity, b"Date,Profit/Loss\n").unwrap();
        }

        let removed = RetentionSweep::default().run(&storage, now).unwrap();
        assert_eq!(removed, vec![stale.identity().to_string()]);

        let remaining = storage.identities().unwrap();
        assert!(remaining.contains(&fresh.identity().to_string()));
        assert!(remaining.contains(&"alice".to_string()));
        assert!(remaining.contains(&"guest".to_string()));
        assert_eq!(remaining.len(), 3);
    }

    #[test]
    fn honours_custom_prefix_and_age() {
        let temp = tempdir().unwrap();
        let storage = CsvStorage::new(temp.path().to_path_buf()).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        let demo = Session::ephemeral("demo", now - Duration::minutes(6));
        storage.write(demo.identity(), b"Date,Profit/Loss\n").unwrap();

        let untouched = RetentionSweep::new("guest", 5).run(&storage, now).unwrap();
        assert!(untouched.is_empty());
        let removed = RetentionSweep::new("demo", 5).run(&storage, now).unwrap();
        assert_eq!(removed.len(), 1);
    }

    #[test]
    fn handles_are_matched_exactly() {
        let temp = tempdir().unwrap();
        let storage = CsvStorage::new(temp.path().to_path_buf()).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        let lookalike = "Guest-20200101000000-abcdef12";
        storage.write(lookalike, b"Date,Profit/Loss\n").unwrap();

        assert!(RetentionSweep::default().run(&storage, now).unwrap().is_empty());
        assert_eq!(storage.identities().unwrap(), vec![lookalike.to_string()]);
    }
}
