use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use crate::{
    core::{
        retention::{RetentionSweep, DEFAULT_RETENTION_MINUTES},
        session::{ephemeral_created_at, DEFAULT_DEMO_PREFIX},
        utils::{ensure_dir, PathResolver},
    },
    domain::LedgerSchema,
    errors::{LedgerError, Result},
};

const TMP_SUFFIX: &str = "tmp";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub schema: LedgerSchema,
    #[serde(default = "Config::default_currency_symbol")]
    pub currency_symbol: String,
    /// Overrides the directory ledger files are kept in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Username to plaintext password.
    #[serde(default)]
    pub credentials: BTreeMap<String, String>,
    #[serde(default)]
    pub demo: DemoSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema: LedgerSchema::default(),
            currency_symbol: Self::default_currency_symbol(),
            data_dir: None,
            credentials: BTreeMap::new(),
            demo: DemoSettings::default(),
        }
    }
}

impl Config {
    pub fn default_currency_symbol() -> String {
        "$".into()
    }

    /// Directory holding ledger sinks, relative to `base` unless overridden.
    pub fn resolve_ledger_dir(&self, base: &Path) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| PathResolver::ledger_dir_in(base))
    }

    pub fn retention_sweep(&self) -> RetentionSweep {
        RetentionSweep::new(self.demo.prefix.clone(), self.demo.retention_minutes)
    }

    /// Rejects usernames that are empty or shaped like a demo handle, which
    /// the retention sweep would delete.
    pub fn validate(&self) -> Result<()> {
        for username in self.credentials.keys() {
            if username.trim().is_empty() {
                return Err(LedgerError::Config("usernames must not be empty".into()));
            }
            if ephemeral_created_at(&self.demo.prefix, username).is_some() {
                return Err(LedgerError::Config(format!(
                    "username `{username}` is reserved for demo sessions"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Disposable guest logins.
pub struct DemoSettings {
    #[serde(default = "DemoSettings::default_enabled")]
    pub enabled: bool,
    #[serde(default = "DemoSettings::default_prefix")]
    pub prefix: String,
    #[serde(default = "DemoSettings::default_retention_minutes")]
    pub retention_minutes: u64,
    #[serde(default = "DemoSettings::default_enabled")]
    pub seed_examples: bool,
}

impl DemoSettings {
    fn default_enabled() -> bool {
        true
    }

    fn default_prefix() -> String {
        DEFAULT_DEMO_PREFIX.into()
    }

    fn default_retention_minutes() -> u64 {
        DEFAULT_RETENTION_MINUTES
    }
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: Self::default_prefix(),
            retention_minutes: DEFAULT_RETENTION_MINUTES,
            seed_examples: true,
        }
    }
}

/// Loads and saves [`Config`] under the application home directory.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    base: PathBuf,
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Self::with_base_dir(PathResolver::base_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self> {
        ensure_dir(&base)?;
        ensure_dir(&PathResolver::config_dir_in(&base))?;
        Ok(Self {
            path: PathResolver::config_file_in(&base),
            base,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file yields defaults; malformed JSON is an error.
    pub fn load(&self) -> Result<Config> {
        if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            let config: Config = serde_json::from_str(&data).map_err(|err| {
                LedgerError::Config(format!("{}: {}", self.path.display(), err))
            })?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        config.validate()?;
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        let json = serde_json::to_string_pretty(config)?;
        let tmp = tmp_path(&self.path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempdir().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        let config = manager.load().unwrap();
        assert_eq!(config.schema, LedgerSchema::ProfitLoss);
        assert_eq!(config.demo.prefix, "guest");
        assert_eq!(config.demo.retention_minutes, 60);
        assert!(config.credentials.is_empty());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let temp = tempdir().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        let mut config = Config::default();
        config.schema = LedgerSchema::CashOut;
        config.credentials.insert("alice".into(), "pw".into());
        manager.save(&config).unwrap();

        let loaded = manager.load().unwrap();
        assert_eq!(loaded.schema, LedgerSchema::CashOut);
        assert_eq!(loaded.credentials.get("alice").map(String::as_str), Some("pw"));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempdir().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        fs::write(
            manager.path(),
            r#"{ "schema": "minimal", "demo": { "retention_minutes": 5 } }"#,
        )
        .unwrap();
        let config = manager.load().unwrap();
        assert_eq!(config.schema, LedgerSchema::Minimal);
        assert_eq!(config.demo.retention_minutes, 5);
        assert!(config.demo.enabled);
        assert_eq!(config.currency_symbol, "$");
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let temp = tempdir().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        fs::write(manager.path(), "{ not json").unwrap();
        assert!(matches!(manager.load(), Err(LedgerError::Config(_))));
    }

    #[test]
    fn demo_shaped_usernames_are_refused() {
        let temp = tempdir().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        fs::write(
            manager.path(),
            r#"{ "credentials": { "guest-20200101000000-abcdef12": "pw" } }"#,
        )
        .unwrap();
        assert!(matches!(manager.load(), Err(LedgerError::Config(_))));

        let mut config = Config::default();
        config.credentials.insert(String::new(), "pw".into());
        assert!(manager.save(&config).is_err());
    }

    #[test]
    fn ledger_dir_defaults_under_base() {
        let config = Config::default();
        let base = PathBuf::from("/srv/poker");
        assert_eq!(config.resolve_ledger_dir(&base), base.join("ledgers"));
    }
}
