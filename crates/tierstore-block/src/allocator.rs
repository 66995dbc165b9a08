//! Allocation and eviction coordination
//!
//! The [`Allocator`] drives every occupancy change end-to-end: it checks free
//! space, invokes the configured eviction policy on a shortfall, cascades
//! victims to the next-slower tier (recursing into that tier's own eviction
//! when needed), and commits the new block only once the whole chain is known
//! to succeed.
//!
//! Every operation is all-or-nothing. The full cascade is first planned
//! against a virtual-capacity overlay while holding the exclusive scope of
//! each involved directory; only a completely validated plan is applied, so
//! no failure path ever observes partial mutation.

use crate::block::BlockMeta;
use crate::dir::StorageDir;
use crate::evictor::{EvictAction, EvictionRequest, Evictor, PinChecker, new_evictor};
use crate::store::TieredStore;
use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tierstore_common::{BlockId, DirKey, Error, EvictorKind, Result};
use tracing::{debug, warn};

/// Per-directory exclusive-scope provider.
///
/// The scope serializes multi-step occupancy changes: at most one in-flight
/// allocation/eviction operation touches a directory at a time. `acquire` may
/// block; returning `false` aborts the operation, which the coordinator
/// surfaces as `InsufficientSpace`.
pub trait ScopeProvider: Send + Sync {
    /// Acquire the exclusive scope for `dir`; `false` if it cannot be granted
    fn acquire(&self, dir: DirKey) -> bool;

    /// Release a previously acquired scope
    fn release(&self, dir: DirKey);
}

/// In-process scope provider backed by a lock table.
///
/// Waiters block up to the configured timeout; a timed-out acquisition is
/// reported as failure, which keeps cross-directory waits bounded.
pub struct DirLockTable {
    held: Mutex<HashSet<DirKey>>,
    released: Condvar,
    timeout: Duration,
}

impl DirLockTable {
    /// Default acquisition timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Create a lock table with the default timeout
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }

    /// Create a lock table with a custom acquisition timeout
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            held: Mutex::new(HashSet::new()),
            released: Condvar::new(),
            timeout,
        }
    }
}

impl Default for DirLockTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeProvider for DirLockTable {
    fn acquire(&self, dir: DirKey) -> bool {
        let mut held = self.held.lock();
        let deadline = Instant::now() + self.timeout;
        while held.contains(&dir) {
            if self.released.wait_until(&mut held, deadline).timed_out() {
                return false;
            }
        }
        held.insert(dir);
        true
    }

    fn release(&self, dir: DirKey) {
        self.held.lock().remove(&dir);
        self.released.notify_all();
    }
}

/// Scopes held by one in-flight operation, released together on every exit
/// path
struct ScopeSet<'a> {
    provider: &'a dyn ScopeProvider,
    held: Vec<DirKey>,
}

impl<'a> ScopeSet<'a> {
    fn new(provider: &'a dyn ScopeProvider) -> Self {
        Self {
            provider,
            held: Vec::new(),
        }
    }

    /// Acquire `dir`'s scope; idempotent within this operation
    fn acquire(&mut self, dir: DirKey) -> bool {
        if self.held.contains(&dir) {
            return true;
        }
        if self.provider.acquire(dir) {
            self.held.push(dir);
            return true;
        }
        false
    }
}

impl Drop for ScopeSet<'_> {
    fn drop(&mut self) {
        for dir in self.held.drain(..) {
            self.provider.release(dir);
        }
    }
}

/// Allocation statistics
#[derive(Debug, Default)]
pub struct AllocStats {
    /// Successful allocations
    pub allocations: AtomicU64,
    /// Allocations that failed (space, feasibility, or scope)
    pub failed_allocations: AtomicU64,
    /// Victims deleted outright
    pub blocks_discarded: AtomicU64,
    /// Victims moved to a slower tier
    pub blocks_cascaded: AtomicU64,
    /// Blocks removed through the explicit free path
    pub blocks_removed: AtomicU64,
    /// Victim bytes freed in originating directories
    pub bytes_evicted: AtomicU64,
}

/// Virtual capacity state accumulated while planning, before anything is
/// applied
#[derive(Default)]
struct Overlay {
    /// Bytes reserved per directory by planned commits and cascade arrivals
    reserved: HashMap<DirKey, u64>,
    /// Bytes freed per directory by planned evictions
    freed: HashMap<DirKey, u64>,
    /// Blocks already claimed as victims by the in-progress plan
    claimed: HashSet<BlockId>,
}

impl Overlay {
    /// Effective available bytes of `dir` under the plan so far
    fn available(&self, dir: &StorageDir) -> u64 {
        let freed = self.freed.get(&dir.key()).copied().unwrap_or(0);
        let reserved = self.reserved.get(&dir.key()).copied().unwrap_or(0);
        (dir.available_bytes() + freed).saturating_sub(reserved)
    }

    fn reserve(&mut self, dir: DirKey, bytes: u64) {
        *self.reserved.entry(dir).or_default() += bytes;
    }

    fn evict(&mut self, block: &BlockMeta) {
        self.claimed.insert(block.block_id());
        *self.freed.entry(block.dir()).or_default() += block.size();
    }

    /// Eviction candidates still resident under the plan so far, in a
    /// deterministic order
    fn candidates(&self, dir: &StorageDir) -> Vec<BlockMeta> {
        let mut candidates: Vec<BlockMeta> = dir
            .block_metas()
            .into_iter()
            .filter(|meta| !self.claimed.contains(&meta.block_id()))
            .collect();
        candidates.sort_by_key(BlockMeta::block_id);
        candidates
    }
}

/// One validated mutation of the tier set
enum PlanStep {
    /// Delete a victim outright
    Discard { block: BlockMeta },
    /// Move a victim to a directory in the next-slower tier
    Move { block: BlockMeta, to: DirKey },
    /// Commit the newly allocated block
    Commit { meta: BlockMeta },
}

/// Coordinates allocation, eviction, and cross-tier cascading over a
/// [`TieredStore`].
///
/// The eviction policy is chosen once at construction. Pin checks and
/// per-directory exclusive scopes come from external collaborators.
pub struct Allocator {
    store: TieredStore,
    evictor: Box<dyn Evictor>,
    pins: Arc<dyn PinChecker>,
    scopes: Arc<dyn ScopeProvider>,
    stats: AllocStats,
}

impl Allocator {
    /// Create an allocator over `store` with the configured policy
    #[must_use]
    pub fn new(
        store: TieredStore,
        kind: EvictorKind,
        pins: Arc<dyn PinChecker>,
        scopes: Arc<dyn ScopeProvider>,
    ) -> Self {
        Self {
            store,
            evictor: new_evictor(kind),
            pins,
            scopes,
            stats: AllocStats::default(),
        }
    }

    /// Build the tier set and allocator straight from configuration.
    ///
    /// `default_quota` is the capacity used for any directory whose quota
    /// literal is missing or unparseable.
    #[must_use]
    pub fn from_config(
        config: &tierstore_common::StoreConfig,
        default_quota: u64,
        pins: Arc<dyn PinChecker>,
        scopes: Arc<dyn ScopeProvider>,
    ) -> Self {
        Self::new(
            TieredStore::from_config(config, default_quota),
            config.evictor,
            pins,
            scopes,
        )
    }

    /// The underlying tier set (read interface for the RPC/transfer layer)
    #[must_use]
    pub fn store(&self) -> &TieredStore {
        &self.store
    }

    /// Allocation statistics
    #[must_use]
    pub fn stats(&self) -> &AllocStats {
        &self.stats
    }

    /// Allocate `size` bytes for `block_id` in the given directory, evicting
    /// resident blocks if needed.
    ///
    /// On success the block's metadata is committed into the directory. On
    /// any failure, including an infeasible eviction or a scope-acquisition
    /// failure anywhere along the cascade chain, no directory's occupancy
    /// changes.
    pub fn allocate(
        &self,
        tier_level: usize,
        dir_index: usize,
        block_id: BlockId,
        size: u64,
    ) -> Result<()> {
        // Invalid indices are programmer errors, surfaced before anything is
        // planned or counted
        self.store.tier(tier_level)?.dir(dir_index)?;

        let dir = DirKey::new(tier_level, dir_index);
        let result = self.allocate_inner(dir, block_id, size);
        match &result {
            Ok(()) => {
                self.stats.allocations.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                self.stats.failed_allocations.fetch_add(1, Ordering::Relaxed);
                debug!(block = %block_id, %dir, size, %err, "allocation failed");
            }
        }
        result
    }

    /// Remove a resident block, unconditionally freeing its space
    pub fn remove_block(&self, block_id: BlockId) -> Result<()> {
        let meta = self.store.block_meta(block_id)?;
        let mut scopes = ScopeSet::new(&*self.scopes);
        if !scopes.acquire(meta.dir()) {
            return Err(self.scope_failure(meta.dir(), 0));
        }

        // The block may have moved between lookup and scope acquisition
        let removed = self.dir(meta.dir())?.write().remove_block_meta(block_id);
        match removed {
            Ok(meta) => {
                self.evictor.on_remove(meta.dir(), block_id);
                self.stats.blocks_removed.fetch_add(1, Ordering::Relaxed);
                debug!(block = %block_id, dir = %meta.dir(), "removed block");
                Ok(())
            }
            Err(_) => Err(Error::BlockNotResident(block_id)),
        }
    }

    /// Record a read of a resident block, feeding recency-based policies
    pub fn record_access(&self, block_id: BlockId) -> Result<BlockMeta> {
        let meta = self.store.block_meta(block_id)?;
        self.evictor.on_access(meta.dir(), block_id);
        Ok(meta)
    }

    fn allocate_inner(&self, dir: DirKey, block_id: BlockId, size: u64) -> Result<()> {
        let mut scopes = ScopeSet::new(&*self.scopes);
        if !scopes.acquire(dir) {
            return Err(self.scope_failure(dir, size));
        }

        let mut overlay = Overlay::default();
        let mut steps = Vec::new();
        self.plan_space(dir, size, &mut overlay, &mut steps, &mut scopes)?;
        steps.push(PlanStep::Commit {
            meta: BlockMeta::new(block_id, size, dir),
        });

        self.apply(&steps)?;
        debug!(block = %block_id, %dir, size, steps = steps.len(), "allocated block");
        Ok(())
    }

    /// Plan whatever evictions are needed for `dir` to take `bytes` more,
    /// recursing down the tier chain for cascaded victims.
    ///
    /// Recursion is bounded by the number of tiers: every cascade hop goes to
    /// a strictly higher level, so there are no cycles. Scopes are acquired
    /// as the cascade descends, in ascending tier-level order.
    fn plan_space(
        &self,
        dir: DirKey,
        bytes: u64,
        overlay: &mut Overlay,
        steps: &mut Vec<PlanStep>,
        scopes: &mut ScopeSet<'_>,
    ) -> Result<()> {
        let dir_lock = self.dir(dir)?;
        let (available, candidates) = {
            let guard = dir_lock.read();
            (overlay.available(&guard), overlay.candidates(&guard))
        };
        if available >= bytes {
            overlay.reserve(dir, bytes);
            return Ok(());
        }

        let shortfall = bytes - available;
        let request = EvictionRequest {
            dir,
            candidates: &candidates,
            bytes_needed: shortfall,
            cascade_to: self.store.next_level(dir.level),
        };
        let Some(plan) = self.evictor.compute_plan(&request, &*self.pins) else {
            return Err(Error::InsufficientSpace {
                required: bytes,
                available,
            });
        };
        debug_assert!(plan.freed_bytes() >= shortfall);

        for entry in plan.into_entries() {
            match entry.action {
                EvictAction::Discard => {
                    overlay.evict(&entry.block);
                    steps.push(PlanStep::Discard { block: entry.block });
                }
                EvictAction::CascadeTo(level) => {
                    let target =
                        self.pick_target_dir(level, entry.block.size(), overlay, scopes)?;
                    self.plan_space(target, entry.block.size(), overlay, steps, scopes)?;
                    overlay.evict(&entry.block);
                    steps.push(PlanStep::Move {
                        block: entry.block,
                        to: target,
                    });
                }
            }
        }

        overlay.reserve(dir, bytes);
        Ok(())
    }

    /// Choose the preferred directory in `level` for a cascaded block: the
    /// first directory (in allocation-preference order) whose effective
    /// available space already fits it, otherwise the directory with the most
    /// effective available space, which minimizes the recursive shortfall.
    fn pick_target_dir(
        &self,
        level: usize,
        size: u64,
        overlay: &Overlay,
        scopes: &mut ScopeSet<'_>,
    ) -> Result<DirKey> {
        let tier = self.store.tier(level)?;
        let mut best: Option<(DirKey, u64)> = None;
        let mut target = None;
        for (index, dir_lock) in tier.dirs().enumerate() {
            let key = DirKey::new(level, index);
            let available = overlay.available(&dir_lock.read());
            if available >= size {
                target = Some(key);
                break;
            }
            if best.is_none_or(|(_, most)| available > most) {
                best = Some((key, available));
            }
        }
        let target = target
            .or(best.map(|(key, _)| key))
            .ok_or(Error::InsufficientSpace {
                required: size,
                available: 0,
            })?;

        if !scopes.acquire(target) {
            return Err(self.scope_failure(target, size));
        }
        Ok(target)
    }

    /// Apply a fully validated plan. Planning holds every involved scope and
    /// has verified capacity at each step, so application cannot fail.
    fn apply(&self, steps: &[PlanStep]) -> Result<()> {
        for step in steps {
            match step {
                PlanStep::Discard { block } => {
                    self.dir(block.dir())?
                        .write()
                        .remove_block_meta(block.block_id())?;
                    self.evictor.on_remove(block.dir(), block.block_id());
                    self.stats.blocks_discarded.fetch_add(1, Ordering::Relaxed);
                    self.stats
                        .bytes_evicted
                        .fetch_add(block.size(), Ordering::Relaxed);
                    debug!(block = %block.block_id(), dir = %block.dir(), "discarded block");
                }
                PlanStep::Move { block, to } => {
                    self.dir(block.dir())?
                        .write()
                        .remove_block_meta(block.block_id())?;
                    let moved = BlockMeta::new(block.block_id(), block.size(), *to);
                    self.dir(*to)?.write().add_block_meta(moved)?;
                    self.evictor.on_remove(block.dir(), block.block_id());
                    self.evictor.on_commit(*to, block.block_id());
                    self.stats.blocks_cascaded.fetch_add(1, Ordering::Relaxed);
                    self.stats
                        .bytes_evicted
                        .fetch_add(block.size(), Ordering::Relaxed);
                    debug!(
                        block = %block.block_id(),
                        from = %block.dir(),
                        to = %to,
                        "cascaded block"
                    );
                }
                PlanStep::Commit { meta } => {
                    self.dir(meta.dir())?.write().add_block_meta(*meta)?;
                    self.evictor.on_commit(meta.dir(), meta.block_id());
                }
            }
        }
        Ok(())
    }

    fn dir(&self, key: DirKey) -> Result<&RwLock<StorageDir>> {
        self.store.tier(key.level)?.dir(key.index)
    }

    fn scope_failure(&self, dir: DirKey, required: u64) -> Error {
        warn!(%dir, "exclusive scope unavailable, aborting operation");
        let available = self
            .dir(dir)
            .map_or(0, |lock| lock.read().available_bytes());
        Error::InsufficientSpace {
            required,
            available,
        }
    }
}
