pub mod codec;
pub mod csv_backend;

use std::path::PathBuf;

use crate::errors::Result;

/// Durable byte sink holding one serialized ledger per identity.
pub trait LedgerSink: Send + Sync {
    /// Returns `None` when the identity has no sink yet.
    fn read(&self, identity: &str) -> Result<Option<Vec<u8>>>;
    /// Replaces the identity's sink contents in full.
    fn write(&self, identity: &str, bytes: &[u8]) -> Result<()>;
    /// Deletes the sink; `false` when there was nothing to delete.
    fn remove(&self, identity: &str) -> Result<bool>;
    /// Identities that currently own a sink.
    fn identities(&self) -> Result<Vec<String>>;
    fn location(&self, identity: &str) -> PathBuf;
}

pub use csv_backend::{decode_identity, encode_identity, CsvStorage, SINK_SUFFIX};
