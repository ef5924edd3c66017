#![doc(test(attr(deny(warnings))))]

//! Poker Ledger keeps a per-user log of tournament results in a CSV file and
//! derives profit, ROI and in-the-money statistics from it.

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod errors;
pub mod storage;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Poker Ledger tracing initialized.");
    });
}
