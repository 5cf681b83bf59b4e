//! Sync response validation errors.

use thiserror::Error;

/// Reasons a block response is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyncResponseError {
    #[error("no request pending for height {height}")]
    NoRequestPending { height: u64 },

    #[error("response height {got} does not match requested height {requested}")]
    HeightMismatch { requested: u64, got: u64 },

    #[error("peer has no block at height {height}")]
    Empty { height: u64 },

    #[error("response at height {height} carries a block without a QC (or vice versa)")]
    PartialResponse { height: u64 },

    #[error("QC at height {height} does not certify the returned block")]
    QcBlockMismatch { height: u64 },

    #[error("QC at height {height} is not a Decide certificate")]
    NotADecideQc { height: u64 },

    #[error("QC at height {height} rejected: {reason}")]
    QcInvalid { height: u64, reason: String },
}

impl SyncResponseError {
    /// Whether the peer sent provably invalid data (as opposed to simply
    /// not having the block or a transient mixup).
    pub fn is_malicious(&self) -> bool {
        matches!(
            self,
            SyncResponseError::QcBlockMismatch { .. }
                | SyncResponseError::NotADecideQc { .. }
                | SyncResponseError::QcInvalid { .. }
        )
    }
}
