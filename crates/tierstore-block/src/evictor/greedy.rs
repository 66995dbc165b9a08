//! Minimal-eviction-count eviction

use super::{EvictionPlan, EvictionRequest, Evictor, PinChecker, PlanEntry};
use crate::block::BlockMeta;

/// Evicts as few blocks as possible.
///
/// Sorts unpinned candidates by size descending (ties by block id) and takes
/// the shortest prefix whose cumulative size covers the shortfall, so a
/// single sufficiently large block is always evicted alone. This is a greedy
/// approximation rather than an optimal subset-sum; it favors fewer I/O
/// operations over byte-tightness.
pub struct GreedyEvictor;

impl Evictor for GreedyEvictor {
    fn compute_plan(
        &self,
        request: &EvictionRequest<'_>,
        pins: &dyn PinChecker,
    ) -> Option<EvictionPlan> {
        let mut unpinned: Vec<BlockMeta> = request
            .candidates
            .iter()
            .filter(|meta| !pins.is_pinned(meta.block_id()))
            .copied()
            .collect();
        unpinned.sort_by(|a, b| {
            b.size()
                .cmp(&a.size())
                .then_with(|| a.block_id().cmp(&b.block_id()))
        });

        let action = request.action();
        let mut entries = Vec::new();
        let mut freed = 0u64;
        for block in unpinned {
            if freed >= request.bytes_needed {
                break;
            }
            freed += block.size();
            entries.push(PlanEntry { block, action });
        }

        (freed >= request.bytes_needed).then(|| EvictionPlan::new(entries))
    }
}
