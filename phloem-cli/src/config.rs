//! Profile configuration for phloem runs
//!
//! Profiles are TOML files: a `[workload]` section (tables, operation mix,
//! key formatting), a `[target]` section (backend dialect plus HTTP
//! endpoint settings), and a `[run]` section (threads, counts, duration,
//! seed). Profiles are the primary interface; see profiles/ for examples.

use anyhow::{Context, Result};
use phloem_core::config::{HttpConfig, WorkloadConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level profile configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default)]
    pub workload: WorkloadConfig,
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub run: RunConfig,
}

impl ProfileConfig {
    /// Load a profile from a TOML file.
    pub fn load(path: &Path) -> Result<ProfileConfig> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read profile {}", path.display()))?;
        let config: ProfileConfig = toml::from_str(&raw)
            .with_context(|| format!("failed to parse profile {}", path.display()))?;
        Ok(config)
    }
}

/// Target backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Backend dialect: neo4j or prisma
    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(flatten)]
    pub http: HttpConfig,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self { backend: default_backend(), http: HttpConfig::default() }
    }
}

fn default_backend() -> String {
    "neo4j".to_string()
}

/// Run-phase settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of worker threads
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Records to insert during the load phase (split across workers)
    #[serde(default)]
    pub insert_count: u64,

    /// Operations to execute during the run phase (split across workers)
    #[serde(default = "default_operation_count")]
    pub operation_count: u64,

    /// Optional wall-clock cap; the run stops early when it elapses
    #[serde(with = "humantime_serde", default)]
    pub duration: Option<Duration>,

    /// Master seed for reproducible runs (absent = entropy)
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            insert_count: 0,
            operation_count: default_operation_count(),
            duration: None,
            seed: None,
        }
    }
}

fn default_threads() -> usize {
    1
}

fn default_operation_count() -> u64 {
    1000
}
