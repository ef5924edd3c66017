use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Error type that captures every ledger engine failure.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Sink or import payload does not carry the declared columns, or a row
    /// cannot be decoded against them.
    #[error("Schema error: {0}")]
    Schema(String),
    #[error("Invalid record: {0}")]
    Validation(String),
    #[error("Record not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<csv::Error> for LedgerError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            match err.into_kind() {
                csv::ErrorKind::Io(io) => LedgerError::Io(io),
                other => LedgerError::Schema(format!("{other:?}")),
            }
        } else {
            LedgerError::Schema(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}
