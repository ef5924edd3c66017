use dirs::home_dir;
use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

const DEFAULT_DIR_NAME: &str = ".poker_ledger";
const HOME_ENV: &str = "POKER_LEDGER_HOME";
const LEDGER_DIR: &str = "ledgers";
const CONFIG_DIR: &str = "config";
const CONFIG_FILE: &str = "config.json";

/// Creates `path` and its parents when missing.
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

/// Resolves the on-disk layout under the application home directory.
pub struct PathResolver;

impl PathResolver {
    /// `$POKER_LEDGER_HOME`, defaulting to `~/.poker_ledger`.
    pub fn base_dir() -> PathBuf {
        if let Some(custom) = env::var_os(HOME_ENV) {
            return PathBuf::from(custom);
        }
        home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_DIR_NAME)
    }

    pub fn ledger_dir_in(base: &Path) -> PathBuf {
        base.join(LEDGER_DIR)
    }

    pub fn config_dir_in(base: &Path) -> PathBuf {
        base.join(CONFIG_DIR)
    }

    pub fn config_file_in(base: &Path) -> PathBuf {
        Self::config_dir_in(base).join(CONFIG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_rooted_at_base() {
        let base = PathBuf::from("/tmp/poker");
        assert_eq!(PathResolver::ledger_dir_in(&base), base.join("ledgers"));
        assert_eq!(
            PathResolver::config_file_in(&base),
            base.join("config").join("config.json")
        );
    }
}
