//! Tierstore Block Store - tiered space accounting and eviction
//!
//! This crate implements the storage worker's local block-space engine:
//! - Block metadata, directory, and tier bookkeeping
//! - Pluggable eviction policies (LRU and Greedy) behind one interface
//! - Cross-tier cascading eviction, bounded by tier depth
//! - All-or-nothing allocation coordination with per-directory scopes
//!
//! The physical data path, RPC surfaces, and the block pin manager are
//! external collaborators; this crate accounts for space and decides what
//! moves where.

pub mod allocator;
pub mod block;
pub mod dir;
pub mod evictor;
pub mod store;
pub mod tier;

// Re-exports
pub use allocator::{AllocStats, Allocator, DirLockTable, ScopeProvider};
pub use block::BlockMeta;
pub use dir::StorageDir;
pub use evictor::{
    EvictAction, EvictionPlan, EvictionRequest, Evictor, GreedyEvictor, LruEvictor, NoPins,
    PinChecker, PlanEntry, new_evictor,
};
pub use store::TieredStore;
pub use tier::{DirSnapshot, StorageTier};
