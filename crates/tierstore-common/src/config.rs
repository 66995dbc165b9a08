//! Configuration types for tierstore
//!
//! This module defines the *meaning* of the worker's tiered-storage
//! configuration; reading it from a file is the embedding process's concern.

use crate::types::ALIAS_MEM;
use serde::{Deserialize, Serialize};

/// Directory path list used when a tier has none configured
pub const DEFAULT_DIR_PATHS: &str = "/mnt/ramdisk";

/// Quota list used when a tier has none configured
pub const DEFAULT_DIR_QUOTAS: &str = "0";

/// Root configuration for the worker's block store
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Tier configurations; position in this list is the tier level
    /// (0 = fastest), so levels are contiguous by construction
    pub tiers: Vec<TierConfig>,
    /// Eviction policy, chosen once at startup for the process lifetime
    pub evictor: EvictorKind,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            tiers: vec![TierConfig::default()],
            evictor: EvictorKind::default(),
        }
    }
}

/// Configuration for a single storage tier
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TierConfig {
    /// Medium-class alias (memory = 1, SSD = 2, HDD = 3)
    pub alias: u32,
    /// Comma-separated directory paths
    pub dir_paths: String,
    /// Comma-separated quota literals (e.g. `"10GB,5GB"`); if shorter than
    /// the path list, the last value is reused for the remaining directories
    pub dir_quotas: String,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            alias: ALIAS_MEM,
            dir_paths: DEFAULT_DIR_PATHS.to_string(),
            dir_quotas: DEFAULT_DIR_QUOTAS.to_string(),
        }
    }
}

impl TierConfig {
    /// Split the configured directory paths
    #[must_use]
    pub fn paths(&self) -> Vec<&str> {
        self.dir_paths.split(',').map(str::trim).collect()
    }

    /// Quota literal for the directory at `index`, reusing the last quota
    /// value when the quota list is shorter than the path list
    #[must_use]
    pub fn quota_literal(&self, index: usize) -> &str {
        let quotas: Vec<&str> = self.dir_quotas.split(',').map(str::trim).collect();
        quotas[index.min(quotas.len() - 1)]
    }
}

/// Eviction policy selector
///
/// `Default` is resolved to LRU when the evictor is instantiated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvictorKind {
    /// Resolved externally; this core treats it as LRU
    #[default]
    Default,
    /// Evict the least-recently-used blocks first
    Lru,
    /// Evict as few blocks as possible
    Greedy,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ALIAS_HDD, ALIAS_SSD};

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.tiers.len(), 1);
        assert_eq!(config.tiers[0].alias, ALIAS_MEM);
        assert_eq!(config.tiers[0].dir_paths, "/mnt/ramdisk");
        assert_eq!(config.evictor, EvictorKind::Default);
    }

    #[test]
    fn test_quota_alignment() {
        let tier = TierConfig {
            alias: ALIAS_SSD,
            dir_paths: "/ssd1,/ssd2,/ssd3".to_string(),
            dir_quotas: "10GB,5GB".to_string(),
        };
        assert_eq!(tier.paths(), vec!["/ssd1", "/ssd2", "/ssd3"]);
        assert_eq!(tier.quota_literal(0), "10GB");
        assert_eq!(tier.quota_literal(1), "5GB");
        // Last quota value is reused past the end of the quota list
        assert_eq!(tier.quota_literal(2), "5GB");
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = StoreConfig {
            tiers: vec![
                TierConfig::default(),
                TierConfig {
                    alias: ALIAS_HDD,
                    dir_paths: "/disk1,/disk2".to_string(),
                    dir_quotas: "1TB".to_string(),
                },
            ],
            evictor: EvictorKind::Greedy,
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: StoreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tiers.len(), 2);
        assert_eq!(back.tiers[1].dir_paths, "/disk1,/disk2");
        assert_eq!(back.evictor, EvictorKind::Greedy);
    }
}
