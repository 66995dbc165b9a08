//! Block metadata

use tierstore_common::{BlockId, DirKey};

/// Metadata record for one resident block: identity, size, and location.
///
/// Immutable after creation. Lifecycle is owned entirely by
/// [`StorageDir`](crate::dir::StorageDir): a `BlockMeta` is created when a
/// block is committed into a directory and destroyed when the block is
/// evicted or removed. A block id never appears in two directories at once;
/// the allocator's exclusive scope upholds that invariant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockMeta {
    block_id: BlockId,
    size: u64,
    dir: DirKey,
}

impl BlockMeta {
    /// Create metadata for a block resident in `dir`
    #[must_use]
    pub const fn new(block_id: BlockId, size: u64, dir: DirKey) -> Self {
        Self {
            block_id,
            size,
            dir,
        }
    }

    /// The block's process-wide identifier
    #[must_use]
    pub const fn block_id(&self) -> BlockId {
        self.block_id
    }

    /// Size of the block in bytes
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Location of the containing directory (non-owning back-reference)
    #[must_use]
    pub const fn dir(&self) -> DirKey {
        self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let meta = BlockMeta::new(BlockId::new(9), 4096, DirKey::new(1, 2));
        assert_eq!(meta.block_id(), BlockId::new(9));
        assert_eq!(meta.size(), 4096);
        assert_eq!(meta.dir(), DirKey::new(1, 2));
    }
}
