use thiserror::Error;

use crate::domain::request::request_store::RequestId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to read or write JSON: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Failed to write statistics: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Invalid simulation config: {0}")]
    InvalidConfig(String),

    #[error("Invariant violated in slot {slot}, round {round}, request {request:?}: {reason}")]
    InvariantViolation { slot: u64, round: u32, request: Option<RequestId>, reason: String },
}

impl Error {
    pub fn invariant(slot: u64, round: u32, request: Option<RequestId>, reason: impl Into<String>) -> Self {
        Error::InvariantViolation { slot, round, request, reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
