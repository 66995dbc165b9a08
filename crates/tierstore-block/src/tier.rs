//! Storage tiers
//!
//! A tier is an ordered collection of storage directories representing one
//! medium class (memory, SSD, HDD). Directory order is allocation-preference
//! order. Each directory sits behind its own `RwLock`; multi-step occupancy
//! changes are additionally serialized by the allocator's exclusive scope.

use crate::block::BlockMeta;
use crate::dir::StorageDir;
use parking_lot::RwLock;
use std::path::PathBuf;
use tierstore_common::{BlockId, DirKey, Error, Result, TierConfig, parse_space_size};
use tracing::warn;

/// One storage tier: an ordered set of capacity-bounded directories
#[derive(Debug)]
pub struct StorageTier {
    /// Medium-class alias (memory = 1, SSD = 2, HDD = 3)
    alias: u32,
    /// Level in the tier set, 0 = fastest
    level: usize,
    /// Sum of directory capacities, fixed at construction
    capacity_bytes: u64,
    dirs: Vec<RwLock<StorageDir>>,
}

/// Point-in-time view of one directory's occupancy.
///
/// An owned copy: holding or mutating it has no effect on tier state.
#[derive(Clone, Debug)]
pub struct DirSnapshot {
    /// Location of the directory
    pub key: DirKey,
    /// Configured mount path
    pub path: PathBuf,
    /// Fixed capacity in bytes
    pub capacity_bytes: u64,
    /// Bytes occupied at snapshot time
    pub used_bytes: u64,
    /// Resident blocks at snapshot time
    pub block_count: usize,
}

impl DirSnapshot {
    /// Bytes available at snapshot time
    #[must_use]
    pub const fn available_bytes(&self) -> u64 {
        self.capacity_bytes - self.used_bytes
    }
}

impl StorageTier {
    /// Create a tier from already-constructed directories
    #[must_use]
    pub fn new(level: usize, alias: u32, dirs: Vec<StorageDir>) -> Self {
        let capacity_bytes = dirs.iter().map(StorageDir::capacity_bytes).sum();
        Self {
            alias,
            level,
            capacity_bytes,
            dirs: dirs.into_iter().map(RwLock::new).collect(),
        }
    }

    /// Create a tier from its configuration.
    ///
    /// One directory is created per configured path. A quota list shorter
    /// than the path list reuses its last value for the remaining
    /// directories. A quota literal that fails to parse falls back to
    /// `default_quota` instead of failing construction.
    #[must_use]
    pub fn from_config(level: usize, config: &TierConfig, default_quota: u64) -> Self {
        let paths = config.paths();
        let mut dirs = Vec::with_capacity(paths.len());
        for (index, path) in paths.into_iter().enumerate() {
            let literal = config.quota_literal(index);
            let capacity = parse_space_size(literal).unwrap_or_else(|err| {
                warn!(
                    tier = level,
                    dir = index,
                    quota = literal,
                    %err,
                    "unparseable dir quota, using default of {default_quota} bytes"
                );
                default_quota
            });
            dirs.push(StorageDir::new(DirKey::new(level, index), path, capacity));
        }
        Self::new(level, config.alias, dirs)
    }

    /// Medium-class alias
    #[must_use]
    pub const fn alias(&self) -> u32 {
        self.alias
    }

    /// Level in the tier set, 0 = fastest
    #[must_use]
    pub const fn level(&self) -> usize {
        self.level
    }

    /// Sum of directory capacities
    #[must_use]
    pub const fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }

    /// Number of directories
    #[must_use]
    pub fn dir_count(&self) -> usize {
        self.dirs.len()
    }

    /// The directory at `index`, in allocation-preference order
    pub fn dir(&self, index: usize) -> Result<&RwLock<StorageDir>> {
        self.dirs.get(index).ok_or(Error::DirIndexOutOfRange {
            tier_level: self.level,
            index,
            dir_count: self.dirs.len(),
        })
    }

    /// Iterate the directories in allocation-preference order
    pub fn dirs(&self) -> impl Iterator<Item = &RwLock<StorageDir>> {
        self.dirs.iter()
    }

    /// Bytes available across all directories, recomputed on each call
    /// (directories mutate independently, so no aggregate is cached)
    #[must_use]
    pub fn available_bytes(&self) -> u64 {
        self.dirs.iter().map(|dir| dir.read().available_bytes()).sum()
    }

    /// Look up a block's metadata, scanning directories in order.
    ///
    /// The linear scan is fine here: tiers hold a single-digit number of
    /// directories.
    pub fn block_meta(&self, block_id: BlockId) -> Result<BlockMeta> {
        for dir in &self.dirs {
            if let Ok(meta) = dir.read().block_meta(block_id) {
                return Ok(meta);
            }
        }
        Err(Error::BlockNotFoundInTier {
            block_id,
            tier_level: self.level,
        })
    }

    /// Snapshot view of every directory's occupancy
    #[must_use]
    pub fn dir_snapshots(&self) -> Vec<DirSnapshot> {
        self.dirs
            .iter()
            .map(|dir| {
                let dir = dir.read();
                DirSnapshot {
                    key: dir.key(),
                    path: dir.path().to_path_buf(),
                    capacity_bytes: dir.capacity_bytes(),
                    used_bytes: dir.used_bytes(),
                    block_count: dir.block_count(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tierstore_common::types::ALIAS_SSD;

    const GB: u64 = 1 << 30;

    fn tier_config(paths: &str, quotas: &str) -> TierConfig {
        TierConfig {
            alias: ALIAS_SSD,
            dir_paths: paths.to_string(),
            dir_quotas: quotas.to_string(),
        }
    }

    #[test]
    fn test_quota_alignment_reuses_last_value() {
        let config = tier_config("/ssd1,/ssd2,/ssd3", "10GB,5GB");
        let tier = StorageTier::from_config(1, &config, 0);

        let capacities: Vec<u64> = tier
            .dir_snapshots()
            .iter()
            .map(|s| s.capacity_bytes)
            .collect();
        assert_eq!(capacities, vec![10 * GB, 5 * GB, 5 * GB]);
        assert_eq!(tier.capacity_bytes(), 20 * GB);
    }

    #[test]
    fn test_malformed_quota_falls_back_to_default() {
        let config = tier_config("/ssd1,/ssd2", "10GB,lots");
        let tier = StorageTier::from_config(0, &config, 512);

        let snapshots = tier.dir_snapshots();
        assert_eq!(snapshots[0].capacity_bytes, 10 * GB);
        assert_eq!(snapshots[1].capacity_bytes, 512);
    }

    #[test]
    fn test_dir_index_out_of_range() {
        let config = tier_config("/ssd1", "1GB");
        let tier = StorageTier::from_config(0, &config, 0);

        assert!(tier.dir(0).is_ok());
        assert!(matches!(
            tier.dir(1).unwrap_err(),
            Error::DirIndexOutOfRange {
                tier_level: 0,
                index: 1,
                dir_count: 1,
            }
        ));
    }

    #[test]
    fn test_block_lookup_scans_dirs_in_order() {
        let config = tier_config("/ssd1,/ssd2", "1GB,1GB");
        let tier = StorageTier::from_config(1, &config, 0);

        let meta = BlockMeta::new(BlockId::new(7), 128, DirKey::new(1, 1));
        tier.dir(1).unwrap().write().add_block_meta(meta).unwrap();

        assert_eq!(tier.block_meta(BlockId::new(7)).unwrap(), meta);
        let err = tier.block_meta(BlockId::new(8)).unwrap_err();
        assert_eq!(err.to_string(), "block 8 not found in tier 1");
    }

    #[test]
    fn test_available_bytes_recomputed() {
        let config = tier_config("/ssd1,/ssd2", "1KB,1KB");
        let tier = StorageTier::from_config(0, &config, 0);
        assert_eq!(tier.available_bytes(), 2048);

        let meta = BlockMeta::new(BlockId::new(1), 100, DirKey::new(0, 0));
        tier.dir(0).unwrap().write().add_block_meta(meta).unwrap();
        assert_eq!(tier.available_bytes(), 1948);
    }

    #[test]
    fn test_snapshots_are_copies() {
        let config = tier_config("/ssd1", "1KB");
        let tier = StorageTier::from_config(0, &config, 0);

        let before = tier.dir_snapshots();
        let meta = BlockMeta::new(BlockId::new(1), 100, DirKey::new(0, 0));
        tier.dir(0).unwrap().write().add_block_meta(meta).unwrap();

        // The earlier snapshot still shows the old occupancy
        assert_eq!(before[0].used_bytes, 0);
        assert_eq!(tier.dir_snapshots()[0].used_bytes, 100);
    }
}
