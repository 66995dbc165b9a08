//! Core type definitions for tierstore
//!
//! This module defines the identifier types used throughout the worker's
//! block store: block identifiers and directory locations within the tier
//! set.

use derive_more::{From, Into};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Alias of the memory tier.
pub const ALIAS_MEM: u32 = 1;
/// Alias of the SSD tier.
pub const ALIAS_SSD: u32 = 2;
/// Alias of the HDD tier.
pub const ALIAS_HDD: u32 = 3;

/// Unique identifier for a block, process-wide
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, From, Into,
)]
pub struct BlockId(u64);

impl BlockId {
    /// Create a block ID from its raw value
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw value
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Location of a storage directory within the tier set
///
/// Tiers are ranked by `level` (0 = fastest); `index` is the directory's
/// position within its tier, which doubles as allocation-preference order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DirKey {
    /// Tier level (0-based, strictly increasing = slower)
    pub level: usize,
    /// Directory index within the tier
    pub index: usize,
}

impl DirKey {
    /// Create a directory key
    #[must_use]
    pub const fn new(level: usize, index: usize) -> Self {
        Self { level, index }
    }
}

impl fmt::Debug for DirKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DirKey({}.{})", self.level, self.index)
    }
}

impl fmt::Display for DirKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.level, self.index)
    }
}
