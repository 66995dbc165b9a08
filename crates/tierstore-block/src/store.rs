//! Tier set container
//!
//! Owns the worker's ordered storage tiers and exposes the read interface
//! consumed by the RPC/transfer layer: cross-tier block lookup and capacity
//! queries.

use crate::block::BlockMeta;
use crate::tier::StorageTier;
use tierstore_common::{BlockId, Error, Result, StoreConfig};

/// The worker's full set of storage tiers, ordered fastest first.
///
/// Tier level equals position in the list, so levels form a contiguous,
/// strictly increasing sequence starting at 0 by construction.
pub struct TieredStore {
    tiers: Vec<StorageTier>,
}

impl TieredStore {
    /// Create a store from already-constructed tiers.
    ///
    /// Tiers must be passed fastest first; each tier's `level` must equal its
    /// position.
    #[must_use]
    pub fn new(tiers: Vec<StorageTier>) -> Self {
        debug_assert!(tiers.iter().enumerate().all(|(i, t)| t.level() == i));
        Self { tiers }
    }

    /// Build the tier set from configuration.
    ///
    /// `default_quota` is the capacity used for any directory whose quota
    /// literal is missing or unparseable.
    #[must_use]
    pub fn from_config(config: &StoreConfig, default_quota: u64) -> Self {
        let tiers = config
            .tiers
            .iter()
            .enumerate()
            .map(|(level, tier)| StorageTier::from_config(level, tier, default_quota))
            .collect();
        Self { tiers }
    }

    /// Number of tiers
    #[must_use]
    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }

    /// The tier at `level`
    pub fn tier(&self, level: usize) -> Result<&StorageTier> {
        self.tiers.get(level).ok_or(Error::TierOutOfRange {
            level,
            tier_count: self.tiers.len(),
        })
    }

    /// Iterate the tiers fastest first
    pub fn tiers(&self) -> impl Iterator<Item = &StorageTier> {
        self.tiers.iter()
    }

    /// Level of the next-slower tier, if one exists.
    ///
    /// Eviction victims cascade there instead of being discarded.
    #[must_use]
    pub fn next_level(&self, level: usize) -> Option<usize> {
        let next = level + 1;
        (next < self.tiers.len()).then_some(next)
    }

    /// Look up a block across the whole tier set
    pub fn block_meta(&self, block_id: BlockId) -> Result<BlockMeta> {
        for tier in &self.tiers {
            if let Ok(meta) = tier.block_meta(block_id) {
                return Ok(meta);
            }
        }
        Err(Error::BlockNotResident(block_id))
    }

    /// Check whether a block is resident anywhere on this worker
    #[must_use]
    pub fn has_block(&self, block_id: BlockId) -> bool {
        self.block_meta(block_id).is_ok()
    }

    /// Total capacity across all tiers
    #[must_use]
    pub fn capacity_bytes(&self) -> u64 {
        self.tiers.iter().map(StorageTier::capacity_bytes).sum()
    }

    /// Total available bytes across all tiers, recomputed on each call
    #[must_use]
    pub fn available_bytes(&self) -> u64 {
        self.tiers.iter().map(StorageTier::available_bytes).sum()
    }
}
