//! Explicit login state passed to every ledger operation.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

use crate::{
    config::Config,
    domain::{LedgerSchema, Record},
    errors::{LedgerError, Result},
};

const HANDLE_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
const HANDLE_SUFFIX_LEN: usize = 8;
pub const DEFAULT_DEMO_PREFIX: &str = "guest";

/// Who is operating on a ledger, and whether their data outlives the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    identity: String,
    ephemeral: bool,
    started_at: DateTime<Utc>,
}

impl Session {
    /// Session for a registered identity whose ledger persists across logins.
    pub fn persistent(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            ephemeral: false,
            started_at: Utc::now(),
        }
    }

    /// Checks `username`/`password` against the configured credentials.
    ///
    /// Comparison is plaintext; the configuration file is the only secret
    /// store.
    pub fn authenticate(config: &Config, username: &str, password: &str) -> Result<Self> {
        if ephemeral_created_at(&config.demo.prefix, username).is_some() {
            tracing::warn!(user = username, "login rejected: name is reserved for demo sessions");
            return Err(LedgerError::InvalidCredentials);
        }
        match config.credentials.get(username) {
            Some(expected) if expected == password => {
                tracing::info!(user = username, "login succeeded");
                Ok(Self::persistent(username))
            }
            _ => {
                tracing::warn!(user = username, "login rejected");
                Err(LedgerError::InvalidCredentials)
            }
        }
    }

    /// Disposable session with a uniquely suffixed handle embedding `now`.
    pub fn ephemeral(prefix: &str, now: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        let identity = format!(
            "{}-{}-{}",
            demo_prefix_slug(prefix),
            now.format(HANDLE_TIMESTAMP_FORMAT),
            &suffix[..HANDLE_SUFFIX_LEN]
        );
        Self {
            identity,
            ephemeral: true,
            started_at: now,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

/// Recovers the creation time embedded in an ephemeral handle.
///
/// Returns `None` for identities that were not minted with `prefix`.
pub fn ephemeral_created_at(prefix: &str, identity: &str) -> Option<DateTime<Utc>> {
    let prefix = format!("{}-", demo_prefix_slug(prefix));
    let rest = identity.strip_prefix(&prefix)?;
    let (stamp, suffix) = rest.split_once('-')?;
    if suffix.len() != HANDLE_SUFFIX_LEN || !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    NaiveDateTime::parse_from_str(stamp, HANDLE_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

/// Lowercased demo prefix with anything outside `[a-z0-9-]` dropped.
pub fn demo_prefix_slug(prefix: &str) -> String {
    let slug: String = prefix
        .to_lowercase()
        .chars()
        .filter(|c| matches!(c, 'a'..='z' | '0'..='9' | '-'))
        .collect();
    if slug.is_empty() {
        DEFAULT_DEMO_PREFIX.into()
    } else {
        slug
    }
}

/// Example rows a demo ledger starts with, dated in the weeks before `today`.
pub fn demo_records(schema: LedgerSchema, today: NaiveDate) -> Vec<Record> {
    let rows: [(i64, &str, f64, f64); 4] = [
        (21, "Friday Turbo", 1000.0, -1000.0),
        (14, "Sunday Major", 1500.0, 4500.0),
        (7, "Deepstack", 3000.0, -3000.0),
        (2, "Bounty Hunter", 500.0, 1300.0),
    ];
    rows.iter()
        .map(|(days_ago, name, fee, profit)| {
            let date = today - Duration::days(*days_ago);
            match schema {
                LedgerSchema::Minimal => Record::minimal(date, *profit),
                LedgerSchema::ProfitLoss => Record::profit_loss(date, *name, *fee, *profit),
                LedgerSchema::CashOut => Record::cash_out(date, *name, *fee, fee + profit),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn authenticate_checks_configured_credentials() {
        let mut config = Config::default();
        config
            .credentials
            .insert("alice".into(), "hunter2".into());

        let session = Session::authenticate(&config, "alice", "hunter2").unwrap();
        assert_eq!(session.identity(), "alice");
        assert!(!session.is_ephemeral());

        let err = Session::authenticate(&config, "alice", "wrong").unwrap_err();
        assert!(matches!(err, LedgerError::InvalidCredentials));
        assert!(Session::authenticate(&config, "mallory", "").is_err());
    }

    #[test]
    fn ephemeral_handles_are_unique_and_carry_their_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 7, 1, 12, 30, 5).unwrap();
        let a = Session::ephemeral("Guest", now);
        let b = Session::ephemeral("Guest", now);
        assert_ne!(a.identity(), b.identity());
        assert!(a.identity().starts_with("guest-20240701123005-"));
        assert!(a.is_ephemeral());
        assert_eq!(ephemeral_created_at("guest", a.identity()), Some(now));
    }

    #[test]
    fn demo_handle_names_cannot_log_in() {
        let mut config = Config::default();
        let reserved = "guest-20200101000000-abcdef12";
        config.credentials.insert(reserved.into(), "pw".into());
        assert!(matches!(
            Session::authenticate(&config, reserved, "pw"),
            Err(LedgerError::InvalidCredentials)
        ));
    }

    #[test]
    fn prefix_slug_drops_unsafe_characters() {
        assert_eq!(demo_prefix_slug("Demo User!"), "demouser");
        assert_eq!(demo_prefix_slug("..."), "guest");
    }

    #[test]
    fn non_ephemeral_identities_have_no_timestamp() {
        assert_eq!(ephemeral_created_at("guest", "alice"), None);
        assert_eq!(ephemeral_created_at("guest", "guest-notadate-abcdef12"), None);
        assert_eq!(ephemeral_created_at("guest", "guest-20240701123005-xyz"), None);
    }

    #[test]
    fn demo_rows_respect_schema() {
        let today = NaiveDate::from_ymd_opt(2024, 7, 22).unwrap();
        for schema in LedgerSchema::ALL {
            let rows = demo_records(schema, today);
            assert_eq!(rows.len(), 4);
            assert!(rows.iter().all(|row| row.validate(schema).is_ok()));
            let profit: f64 = rows.iter().map(Record::profit).sum();
            assert_eq!(profit, 1800.0);
        }
    }
}
