//! Tierstore Common - Shared types and utilities
//!
//! This crate provides the identifier types, error definitions, size-literal
//! parsing, and configuration structures used across all tierstore components.

pub mod config;
pub mod error;
pub mod types;
pub mod units;

pub use config::{EvictorKind, StoreConfig, TierConfig};
pub use error::{Error, Result};
pub use types::*;
pub use units::{SpaceSizeError, parse_space_size};
