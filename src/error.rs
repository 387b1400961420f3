use crate::domain::ids::PaymentRequestId;
use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Payment request {0} not found")]
    NotFound(PaymentRequestId),
    #[error("Invalid amount {0}: must be strictly positive")]
    InvalidAmount(Decimal),
    #[error("Concurrent write on payment request {0}")]
    Conflict(PaymentRequestId),
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    /// The commit may or may not have been applied; re-read before retrying.
    #[error("Commit on payment request {0} timed out, outcome unknown")]
    CommitTimeout(PaymentRequestId),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether re-running the whole read-mutate-write cycle may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::StorageUnavailable(_))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for LedgerError {
    fn from(e: rocksdb::Error) -> Self {
        Self::StorageUnavailable(e.into_string())
    }
}
