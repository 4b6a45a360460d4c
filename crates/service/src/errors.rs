use thiserror::Error;

use crate::storage::StoreError;

/// Failures surfaced by [`crate::status::StatusStore`].
#[derive(Debug, Error)]
pub enum StatusError {
    /// Client supplied a source outside the fixed set, or no usable source at all.
    #[error("invalid source: {0}")]
    InvalidSource(String),
    #[error("store read failed: {0}")]
    StoreRead(#[source] StoreError),
    #[error("store write failed: {0}")]
    StoreWrite(#[source] StoreError),
}

impl StatusError {
    /// Underlying backend message, passed through to callers for diagnostics.
    pub fn details(&self) -> String {
        match self {
            StatusError::InvalidSource(s) => s.clone(),
            StatusError::StoreRead(e) | StatusError::StoreWrite(e) => e.to_string(),
        }
    }
}
