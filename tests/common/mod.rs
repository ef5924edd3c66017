#![allow(dead_code)]

use std::{path::PathBuf, sync::Mutex};

use once_cell::sync::Lazy;
use poker_ledger::{
    core::LedgerEngine,
    domain::LedgerSchema,
    storage::CsvStorage,
};
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub fn temp_base() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

/// Engine over an isolated ledger directory; also returns that directory.
pub fn setup_engine(schema: LedgerSchema) -> (LedgerEngine, PathBuf) {
    let dir = temp_base().join("ledgers");
    let storage = CsvStorage::new(dir.clone()).expect("create csv storage");
    (LedgerEngine::new(Box::new(storage), schema), dir)
}
