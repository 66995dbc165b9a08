//! Error types for tierstore
//!
//! This module defines the common error types used throughout the block
//! store. Every failure leaves store state unmutated; callers decide
//! retry/backoff policy.

use crate::types::{BlockId, DirKey};
use thiserror::Error;

/// Common result type for tierstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for tierstore
#[derive(Debug, Error)]
pub enum Error {
    /// Block absent from the queried directory
    #[error("block {block_id} not found in directory {dir}")]
    BlockNotFound { block_id: BlockId, dir: DirKey },

    /// Block absent from every directory of the queried tier
    #[error("block {block_id} not found in tier {tier_level}")]
    BlockNotFoundInTier { block_id: BlockId, tier_level: usize },

    /// Block absent from the whole tier set
    #[error("block {0} not resident on this worker")]
    BlockNotResident(BlockId),

    /// Allocation impossible even after an eviction attempt
    #[error("insufficient space: required {required} bytes, available {available} bytes")]
    InsufficientSpace { required: u64, available: u64 },

    /// Invalid directory index for a tier
    #[error("dir index {index} out of range for tier {tier_level} ({dir_count} dirs)")]
    DirIndexOutOfRange {
        tier_level: usize,
        index: usize,
        dir_count: usize,
    },

    /// Invalid tier level for the tier set
    #[error("tier level {level} out of range ({tier_count} tiers)")]
    TierOutOfRange { level: usize, tier_count: usize },
}

impl Error {
    /// Check if this is a not found error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::BlockNotFound { .. }
                | Self::BlockNotFoundInTier { .. }
                | Self::BlockNotResident(_)
        )
    }
}
