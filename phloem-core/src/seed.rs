//! Seed derivation for reproducible randomness
//!
//! Derives component-specific seeds from a master seed via SHA-256 so that
//! the operation chooser, the per-table key choosers, retry jitter, and
//! value-text generation each draw from independent, deterministic streams.
//! Same master + component always yields the same seed; different
//! components never share one.

use sha2::{Digest, Sha256};

/// Derive a component-specific seed from a master seed using SHA-256
///
/// # Parameters
/// - `master_seed`: The master seed (e.g., from the profile's `run.seed`)
/// - `component`: Component identifier (e.g., "operation_chooser")
///
/// # Returns
/// A deterministic u64 seed derived from the inputs
pub fn derive_seed(master_seed: u64, component: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(master_seed.to_be_bytes());
    hasher.update(component.as_bytes());
    let result = hasher.finalize();
    u64::from_be_bytes([
        result[0], result[1], result[2], result[3], result[4], result[5], result[6], result[7],
    ])
}

/// Derive an optional component seed: `None` stays `None` (entropy-seeded).
pub fn derive_opt(master_seed: Option<u64>, component: &str) -> Option<u64> {
    master_seed.map(|seed| derive_seed(seed, component))
}

/// Standard component names for seed derivation
pub mod components {
    pub const OPERATION_CHOOSER: &str = "operation_chooser";
    pub const KEY_CHOOSER: &str = "key_chooser";
    pub const RETRY_JITTER: &str = "retry_jitter";
    pub const VALUE_TEXT: &str = "value_text";
    pub const WORKER: &str = "worker";
}
