//! Recency-based eviction

use super::{EvictionPlan, EvictionRequest, Evictor, PinChecker, PlanEntry};
use crate::block::BlockMeta;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use tierstore_common::{BlockId, DirKey};

/// Evicts the least-recently-used blocks first.
///
/// Keeps a per-directory access-order history, oldest first; a block moves to
/// the back whenever it is read or newly committed, so simultaneous commits
/// keep their insertion order. Pinned blocks are skipped during planning but
/// stay in the history. Candidates the history has never seen rank oldest,
/// in block-id order.
pub struct LruEvictor {
    /// Per-directory access order, front = least recently used
    order: Mutex<HashMap<DirKey, Vec<BlockId>>>,
}

impl LruEvictor {
    /// Create an evictor with empty history
    #[must_use]
    pub fn new() -> Self {
        Self {
            order: Mutex::new(HashMap::new()),
        }
    }

    fn touch(&self, dir: DirKey, block_id: BlockId) {
        let mut order = self.order.lock();
        let history = order.entry(dir).or_default();
        history.retain(|id| *id != block_id);
        history.push(block_id);
    }
}

impl Default for LruEvictor {
    fn default() -> Self {
        Self::new()
    }
}

impl Evictor for LruEvictor {
    fn compute_plan(
        &self,
        request: &EvictionRequest<'_>,
        pins: &dyn PinChecker,
    ) -> Option<EvictionPlan> {
        let order = self.order.lock();
        let history: &[BlockId] = order.get(&request.dir).map_or(&[], Vec::as_slice);
        let known: HashSet<BlockId> = history.iter().copied().collect();
        let resident: HashMap<BlockId, BlockMeta> = request
            .candidates
            .iter()
            .map(|meta| (meta.block_id(), *meta))
            .collect();

        // Walk order: history-less candidates first (oldest), then the
        // history from least to most recently used
        let mut unknown: Vec<BlockMeta> = request
            .candidates
            .iter()
            .filter(|meta| !known.contains(&meta.block_id()))
            .copied()
            .collect();
        unknown.sort_by_key(BlockMeta::block_id);
        let ranked = unknown
            .into_iter()
            .chain(history.iter().filter_map(|id| resident.get(id).copied()));

        let action = request.action();
        let mut entries = Vec::new();
        let mut freed = 0u64;
        for block in ranked {
            if freed >= request.bytes_needed {
                break;
            }
            if pins.is_pinned(block.block_id()) {
                continue;
            }
            freed += block.size();
            entries.push(PlanEntry { block, action });
        }

        (freed >= request.bytes_needed).then(|| EvictionPlan::new(entries))
    }

    fn on_access(&self, dir: DirKey, block_id: BlockId) {
        self.touch(dir, block_id);
    }

    fn on_commit(&self, dir: DirKey, block_id: BlockId) {
        self.touch(dir, block_id);
    }

    fn on_remove(&self, dir: DirKey, block_id: BlockId) {
        let mut order = self.order.lock();
        if let Some(history) = order.get_mut(&dir) {
            history.retain(|id| *id != block_id);
        }
    }
}
