//! # Engine Configuration
//!
//! Passed explicitly into `IntegrityService::new`; nothing is read from
//! ambient process state.

use crate::domain::errors::IntegrityError;
use crate::domain::partition::IndexLayout;

/// Tunables for the verification and repair engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityConfig {
    /// Partition naming contract (includes `docs_per_index`).
    pub layout: IndexLayout,
    /// Width of one duplicate-scan window in blocks (default: 10,000,000).
    ///
    /// A single terms aggregation over the full range could produce unbounded
    /// buckets, so full-range scans are split into windows of this size.
    pub scan_window: u64,
    /// Maximum duplicate keys returned by one terms aggregation (default: 100).
    pub duplicate_page_size: usize,
    /// Base of the exponential back-step used to find a repair anchor (default: 10).
    pub backstep_base: u64,
    /// Number of back-steps before giving up (default: 5).
    pub backstep_attempts: u32,
}

impl IntegrityConfig {
    pub fn new(layout: IndexLayout) -> Self {
        Self {
            layout,
            scan_window: 10_000_000,
            duplicate_page_size: 100,
            backstep_base: 10,
            backstep_attempts: 5,
        }
    }

    pub fn with_scan_window(mut self, blocks: u64) -> Self {
        self.scan_window = blocks;
        self
    }

    pub fn with_duplicate_page_size(mut self, size: usize) -> Self {
        self.duplicate_page_size = size;
        self
    }

    pub fn with_backstep(mut self, base: u64, attempts: u32) -> Self {
        self.backstep_base = base;
        self.backstep_attempts = attempts;
        self
    }

    /// Reject values that would make the engine divide by zero or never
    /// make progress.
    pub fn validate(&self) -> Result<(), IntegrityError> {
        let invalid = |reason: &str| {
            Err(IntegrityError::InvalidConfig {
                reason: reason.to_string(),
            })
        };
        if self.layout.chain_prefix.is_empty() {
            return invalid("chain prefix must not be empty");
        }
        if self.layout.docs_per_index == 0 {
            return invalid("docs_per_index must be positive");
        }
        if self.scan_window == 0 {
            return invalid("scan_window must be positive");
        }
        if self.duplicate_page_size == 0 {
            return invalid("duplicate_page_size must be positive");
        }
        if self.backstep_base < 2 {
            return invalid("backstep_base must be at least 2");
        }
        Ok(())
    }
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self::new(IndexLayout::new("telos-mainnet"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_deployment_constants() {
        let config = IntegrityConfig::default();
        assert_eq!(config.layout.docs_per_index, 10_000_000);
        assert_eq!(config.scan_window, 10_000_000);
        assert_eq!(config.duplicate_page_size, 100);
        assert_eq!(config.backstep_base, 10);
        assert_eq!(config.backstep_attempts, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_widths() {
        let layout = IndexLayout::new("telos-local").with_docs_per_index(0);
        assert!(matches!(
            IntegrityConfig::new(layout).validate(),
            Err(IntegrityError::InvalidConfig { .. })
        ));

        let config = IntegrityConfig::default().with_scan_window(0);
        assert!(config.validate().is_err());

        let config = IntegrityConfig::default().with_backstep(1, 5);
        assert!(config.validate().is_err());
    }
}
