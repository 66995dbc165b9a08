//! Eviction policies
//!
//! A policy is a pure function of observed metadata plus policy-internal
//! history: given a directory and a byte shortfall it selects victim blocks
//! and their disposition, and never mutates store state itself. The closed
//! set of variants sits behind the [`Evictor`] trait and is chosen once at
//! startup via [`new_evictor`]; nothing branches on the policy kind after
//! construction.

mod greedy;
mod lru;

pub use greedy::GreedyEvictor;
pub use lru::LruEvictor;

use crate::block::BlockMeta;
use tierstore_common::{BlockId, DirKey, EvictorKind};

/// Pin-check capability provided by the external block lock manager.
///
/// A pinned block is in use by some reader or writer and is never eligible
/// for eviction; this core only consumes that guarantee.
pub trait PinChecker: Send + Sync {
    /// Whether the block is currently held in use
    fn is_pinned(&self, block_id: BlockId) -> bool;
}

/// Pin checker for embeddings without a lock manager: nothing is pinned
pub struct NoPins;

impl PinChecker for NoPins {
    fn is_pinned(&self, _block_id: BlockId) -> bool {
        false
    }
}

/// Disposition of one eviction victim
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvictAction {
    /// Move the block to the tier at this level instead of deleting it
    CascadeTo(usize),
    /// Delete the block outright (no slower tier exists)
    Discard,
}

/// One victim block and its disposition
#[derive(Clone, Copy, Debug)]
pub struct PlanEntry {
    /// The victim, as resident in the originating directory
    pub block: BlockMeta,
    /// What happens to it
    pub action: EvictAction,
}

/// Ordered sequence of victims produced by a policy.
///
/// The plan's total freed bytes always covers the requested shortfall; a
/// shortfall no plan can cover is reported as `None` from
/// [`Evictor::compute_plan`].
#[derive(Clone, Debug, Default)]
pub struct EvictionPlan {
    entries: Vec<PlanEntry>,
}

impl EvictionPlan {
    /// Wrap an ordered victim list
    #[must_use]
    pub fn new(entries: Vec<PlanEntry>) -> Self {
        Self { entries }
    }

    /// The victims, in execution order
    #[must_use]
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// Consume the plan
    #[must_use]
    pub fn into_entries(self) -> Vec<PlanEntry> {
        self.entries
    }

    /// Bytes freed in the originating directory when the plan executes
    #[must_use]
    pub fn freed_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.block.size()).sum()
    }

    /// Number of victims
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the plan evicts nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What a policy sees when asked to free space in one directory
pub struct EvictionRequest<'a> {
    /// The directory the shortfall is in
    pub dir: DirKey,
    /// Resident candidate blocks, minus any already claimed by the
    /// in-progress allocation plan
    pub candidates: &'a [BlockMeta],
    /// Bytes the plan must free
    pub bytes_needed: u64,
    /// Level of the next-slower tier; `None` when `dir` is in the last tier
    pub cascade_to: Option<usize>,
}

impl EvictionRequest<'_> {
    /// Disposition for every victim of this request
    #[must_use]
    pub fn action(&self) -> EvictAction {
        self.cascade_to
            .map_or(EvictAction::Discard, EvictAction::CascadeTo)
    }
}

/// Pluggable victim-selection algorithm
pub trait Evictor: Send + Sync {
    /// Select victims covering `bytes_needed`, or `None` if no set of
    /// unpinned candidates can
    fn compute_plan(
        &self,
        request: &EvictionRequest<'_>,
        pins: &dyn PinChecker,
    ) -> Option<EvictionPlan>;

    /// A resident block was read
    fn on_access(&self, _dir: DirKey, _block_id: BlockId) {}

    /// A block was committed into a directory
    fn on_commit(&self, _dir: DirKey, _block_id: BlockId) {}

    /// A block left a directory (evicted or removed)
    fn on_remove(&self, _dir: DirKey, _block_id: BlockId) {}
}

/// Instantiate the configured policy.
///
/// `Default` resolves to LRU. Selection happens once at startup and is
/// immutable for the process lifetime.
#[must_use]
pub fn new_evictor(kind: EvictorKind) -> Box<dyn Evictor> {
    match kind {
        EvictorKind::Default | EvictorKind::Lru => Box::new(LruEvictor::new()),
        EvictorKind::Greedy => Box::new(GreedyEvictor),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(id: u64, size: u64) -> BlockMeta {
        BlockMeta::new(BlockId::new(id), size, DirKey::new(0, 0))
    }

    #[test]
    fn test_default_kind_resolves_to_lru() {
        let evictor = new_evictor(EvictorKind::Default);
        let dir = DirKey::new(0, 0);
        // Oldest-first access order: 1, then 2
        evictor.on_commit(dir, BlockId::new(1));
        evictor.on_commit(dir, BlockId::new(2));

        let candidates = [meta(1, 10), meta(2, 100)];
        let request = EvictionRequest {
            dir,
            candidates: &candidates,
            bytes_needed: 10,
            cascade_to: None,
        };
        let plan = evictor.compute_plan(&request, &NoPins).unwrap();

        // LRU evicts the oldest block, not the one Greedy would pick
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.entries()[0].block.block_id(), BlockId::new(1));
    }

    #[test]
    fn test_plan_freed_bytes() {
        let plan = EvictionPlan::new(vec![
            PlanEntry {
                block: meta(1, 30),
                action: EvictAction::Discard,
            },
            PlanEntry {
                block: meta(2, 12),
                action: EvictAction::CascadeTo(1),
            },
        ]);
        assert_eq!(plan.freed_bytes(), 42);
        assert_eq!(plan.len(), 2);
        assert!(!plan.is_empty());
    }

    #[test]
    fn test_request_action_tagging() {
        let request = EvictionRequest {
            dir: DirKey::new(0, 0),
            candidates: &[],
            bytes_needed: 1,
            cascade_to: Some(1),
        };
        assert_eq!(request.action(), EvictAction::CascadeTo(1));

        let last_tier = EvictionRequest {
            cascade_to: None,
            ..request
        };
        assert_eq!(last_tier.action(), EvictAction::Discard);
    }
}
