//! Configuration types for the phloem core engine
//!
//! Profiles are TOML files deserialized with serde; durations use
//! humantime strings ("3s", "500ms").

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Workload configuration: tables, operation mix, and key formatting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadConfig {
    /// Default table for inserts and for operations that name no table
    #[serde(default = "default_table")]
    pub table: String,

    /// Per-table key-space configuration (models and relations alike)
    #[serde(default)]
    pub tables: BTreeMap<String, TableConfig>,

    /// Weighted operation mix, grouped by operation class
    #[serde(default)]
    pub operations: OperationMix,

    /// Total decimal digits keys are left-padded to
    #[serde(default = "default_zeropadding")]
    pub zeropadding: usize,

    /// Whether insert keys are scattered across the key space or kept ordered
    #[serde(default)]
    pub insert_order: InsertOrder,

    /// How many times a failed insert is retried before giving up
    #[serde(default = "default_retry_limit")]
    pub insertion_retry_limit: u32,

    /// Average wait between insert retries (actual sleep is jittered)
    #[serde(with = "humantime_serde", default = "default_retry_interval")]
    pub insertion_retry_interval: Duration,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            tables: BTreeMap::new(),
            operations: OperationMix::default(),
            zeropadding: default_zeropadding(),
            insert_order: InsertOrder::default(),
            insertion_retry_limit: default_retry_limit(),
            insertion_retry_interval: default_retry_interval(),
        }
    }
}

fn default_table() -> String {
    "user".to_string()
}

fn default_zeropadding() -> usize {
    1
}

fn default_retry_limit() -> u32 {
    1
}

fn default_retry_interval() -> Duration {
    Duration::from_secs(3)
}

/// Key ordering mode for insert keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertOrder {
    /// Scatter keys with a deterministic 64-bit mix
    #[default]
    Hashed,
    /// Keep the raw sequence value
    Ordered,
}

/// Per-table key-space configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableConfig {
    /// Number of records assumed present before the run; the insert
    /// sequence starts here
    #[serde(default)]
    pub record_count: u64,

    /// Distribution used for transaction-time key selection
    #[serde(default)]
    pub keychooser: KeyChooserConfig,
}

/// Transaction-time key selection distribution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum KeyChooserConfig {
    /// Every already-inserted key equally likely
    Uniform,
    /// Recency-biased: recently inserted keys are strongly preferred
    Exponential {
        /// Percentile of samples that fall within `frac` of the range
        #[serde(default = "default_exp_percentile")]
        percentile: f64,
        /// Fraction of the record range covered by `percentile`
        #[serde(default = "default_exp_frac")]
        frac: f64,
    },
}

impl Default for KeyChooserConfig {
    fn default() -> Self {
        KeyChooserConfig::Uniform
    }
}

fn default_exp_percentile() -> f64 {
    95.0
}

fn default_exp_frac() -> f64 {
    0.8571
}

/// Operation mix grouped by class; each class carries its overall traffic
/// share and the per-query proportions within it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationMix {
    #[serde(default)]
    pub read: OperationClassConfig,
    #[serde(default)]
    pub update: OperationClassConfig,
    #[serde(default)]
    pub insert: OperationClassConfig,
}

/// One operation class: overall proportion plus declared queries.
///
/// Queries are `<name>_<table>` strings; `weights` maps the `<name>` part
/// to its proportion within the class. Absent weights default to 0 and the
/// query is excluded from the mix entirely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationClassConfig {
    #[serde(default)]
    pub proportion: f64,
    #[serde(default)]
    pub queries: Vec<String>,
    #[serde(default)]
    pub weights: HashMap<String, f64>,
}

/// HTTP endpoint configuration for the transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Endpoint address as host:port
    #[serde(default = "default_address")]
    pub address: String,

    /// Request path on the endpoint
    #[serde(default = "default_path")]
    pub path: String,

    /// TCP connect timeout
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub connect_timeout: Duration,

    /// Socket read timeout (also bounds a single blocked read while draining)
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub read_timeout: Duration,

    /// Watchdog deadline for one whole request, including body draining
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub exec_timeout: Duration,

    /// Extra request headers
    #[serde(default = "default_headers")]
    pub headers: Vec<HttpHeader>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            path: default_path(),
            connect_timeout: default_timeout(),
            read_timeout: default_timeout(),
            exec_timeout: default_timeout(),
            headers: default_headers(),
        }
    }
}

/// One request header as name/value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpHeader {
    pub name: String,
    pub value: String,
}

fn default_address() -> String {
    "127.0.0.1:7474".to_string()
}

fn default_path() -> String {
    "/graphql/".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_headers() -> Vec<HttpHeader> {
    vec![HttpHeader { name: "Content-Type".to_string(), value: "application/json".to_string() }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workload_defaults() {
        let cfg = WorkloadConfig::default();
        assert_eq!(cfg.table, "user");
        assert_eq!(cfg.zeropadding, 1);
        assert_eq!(cfg.insert_order, InsertOrder::Hashed);
        assert_eq!(cfg.insertion_retry_limit, 1);
        assert_eq!(cfg.insertion_retry_interval, Duration::from_secs(3));
    }

    #[test]
    fn test_parse_minimal_workload() {
        let cfg: WorkloadConfig = toml::from_str(
            r#"
            table = "post"
            zeropadding = 5
            insert_order = "ordered"

            [tables.post]
            record_count = 1000

            [operations.read]
            proportion = 0.95
            queries = ["postByIdWithFirstTenComments_post"]

            [operations.read.weights]
            postByIdWithFirstTenComments = 1.0
            "#,
        )
        .expect("minimal workload should parse");

        assert_eq!(cfg.table, "post");
        assert_eq!(cfg.insert_order, InsertOrder::Ordered);
        assert_eq!(cfg.tables["post"].record_count, 1000);
        assert_eq!(cfg.operations.read.proportion, 0.95);
        assert_eq!(cfg.operations.read.weights["postByIdWithFirstTenComments"], 1.0);
    }

    #[test]
    fn test_parse_exponential_keychooser() {
        let cfg: TableConfig = toml::from_str(
            r#"
            record_count = 500
            keychooser = { strategy = "exponential", percentile = 90.0, frac = 0.5 }
            "#,
        )
        .expect("exponential keychooser should parse");

        match cfg.keychooser {
            KeyChooserConfig::Exponential { percentile, frac } => {
                assert_eq!(percentile, 90.0);
                assert_eq!(frac, 0.5);
            }
            other => panic!("expected exponential chooser, got {:?}", other),
        }
    }

    #[test]
    fn test_http_defaults() {
        let cfg = HttpConfig::default();
        assert_eq!(cfg.address, "127.0.0.1:7474");
        assert_eq!(cfg.path, "/graphql/");
        assert_eq!(cfg.exec_timeout, Duration::from_secs(10));
        assert_eq!(cfg.headers.len(), 1);
        assert_eq!(cfg.headers[0].name, "Content-Type");
    }
}
