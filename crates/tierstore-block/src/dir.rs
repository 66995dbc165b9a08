//! Storage directory occupancy bookkeeping

use crate::block::BlockMeta;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tierstore_common::{BlockId, DirKey, Error, Result};

/// One physical capacity-bounded allocation unit within a tier.
///
/// The block map is the sole source of truth for occupancy; `used_bytes` is
/// derived from it on every call. Capacity is fixed at construction and the
/// directory is never destroyed during normal operation (it represents a
/// fixed physical mount).
///
/// Not internally thread-safe: the owning tier wraps each directory in a
/// lock, and multi-step sequences are serialized by the allocator's
/// per-directory exclusive scope.
#[derive(Debug)]
pub struct StorageDir {
    key: DirKey,
    path: PathBuf,
    capacity_bytes: u64,
    blocks: HashMap<BlockId, BlockMeta>,
}

impl StorageDir {
    /// Create an empty directory with a fixed capacity
    #[must_use]
    pub fn new(key: DirKey, path: impl Into<PathBuf>, capacity_bytes: u64) -> Self {
        Self {
            key,
            path: path.into(),
            capacity_bytes,
            blocks: HashMap::new(),
        }
    }

    /// Location of this directory within the tier set
    #[must_use]
    pub const fn key(&self) -> DirKey {
        self.key
    }

    /// Configured mount path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fixed capacity in bytes
    #[must_use]
    pub const fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }

    /// Bytes occupied by resident blocks
    #[must_use]
    pub fn used_bytes(&self) -> u64 {
        self.blocks.values().map(BlockMeta::size).sum()
    }

    /// Bytes still available for new blocks
    #[must_use]
    pub fn available_bytes(&self) -> u64 {
        self.capacity_bytes - self.used_bytes()
    }

    /// Number of resident blocks
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Check whether a block is resident in this directory
    #[must_use]
    pub fn has_block_meta(&self, block_id: BlockId) -> bool {
        self.blocks.contains_key(&block_id)
    }

    /// Look up a resident block's metadata
    pub fn block_meta(&self, block_id: BlockId) -> Result<BlockMeta> {
        self.blocks
            .get(&block_id)
            .copied()
            .ok_or(Error::BlockNotFound {
                block_id,
                dir: self.key,
            })
    }

    /// Commit a block's metadata into this directory.
    ///
    /// The capacity check here is a hard invariant, not the primary space
    /// path: the caller must already have reserved the space via a free-space
    /// check or a successful eviction.
    pub fn add_block_meta(&mut self, meta: BlockMeta) -> Result<()> {
        let available = self.available_bytes();
        if meta.size() > available {
            return Err(Error::InsufficientSpace {
                required: meta.size(),
                available,
            });
        }
        debug_assert_eq!(meta.dir(), self.key);
        self.blocks.insert(meta.block_id(), meta);
        Ok(())
    }

    /// Remove a block's metadata, unconditionally freeing its space
    pub fn remove_block_meta(&mut self, block_id: BlockId) -> Result<BlockMeta> {
        self.blocks
            .remove(&block_id)
            .ok_or(Error::BlockNotFound {
                block_id,
                dir: self.key,
            })
    }

    /// Metadata of every resident block (owned copies)
    #[must_use]
    pub fn block_metas(&self) -> Vec<BlockMeta> {
        self.blocks.values().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir(capacity: u64) -> StorageDir {
        StorageDir::new(DirKey::new(0, 0), "/mnt/ramdisk", capacity)
    }

    fn meta(id: u64, size: u64) -> BlockMeta {
        BlockMeta::new(BlockId::new(id), size, DirKey::new(0, 0))
    }

    #[test]
    fn test_add_and_lookup() {
        let mut d = dir(100);
        d.add_block_meta(meta(1, 60)).unwrap();

        assert!(d.has_block_meta(BlockId::new(1)));
        assert_eq!(d.block_meta(BlockId::new(1)).unwrap().size(), 60);
        assert_eq!(d.used_bytes(), 60);
        assert_eq!(d.available_bytes(), 40);
    }

    #[test]
    fn test_lookup_missing() {
        let d = dir(100);
        let err = d.block_meta(BlockId::new(5)).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_add_over_capacity() {
        let mut d = dir(100);
        d.add_block_meta(meta(1, 60)).unwrap();

        let err = d.add_block_meta(meta(2, 50)).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientSpace {
                required: 50,
                available: 40,
            }
        ));
        // Failed add leaves occupancy untouched
        assert_eq!(d.used_bytes(), 60);
        assert!(!d.has_block_meta(BlockId::new(2)));
    }

    #[test]
    fn test_remove_frees_space() {
        let mut d = dir(100);
        d.add_block_meta(meta(1, 60)).unwrap();
        d.add_block_meta(meta(2, 40)).unwrap();

        let removed = d.remove_block_meta(BlockId::new(1)).unwrap();
        assert_eq!(removed.size(), 60);
        assert_eq!(d.available_bytes(), 60);
        assert!(d.remove_block_meta(BlockId::new(1)).is_err());
    }

    #[test]
    fn test_used_equals_sum_of_sizes() {
        let mut d = dir(1000);
        for id in 0..10 {
            d.add_block_meta(meta(id, 10 + id)).unwrap();
        }
        let sum: u64 = d.block_metas().iter().map(BlockMeta::size).sum();
        assert_eq!(d.used_bytes(), sum);
        assert!(d.used_bytes() <= d.capacity_bytes());
    }
}
