//! Key-space management: per-table insert counters and key derivation
//!
//! Insert keys are allocated with a lock-free atomic counter per table so
//! concurrent workers never observe a duplicated or skipped sequence value.
//! Transaction-time keys are sampled from a per-table distribution, bounded
//! by the most recently *allocated* sequence value; the bound is a read of
//! the counter, so a sampled key may reference an insert still in flight.

use crate::config::{InsertOrder, KeyChooserConfig, TableConfig, WorkloadConfig};
use crate::error::{Error, Result};
use crate::seed;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution as RandDistribution, Exp};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Table-name suffix for keys allocated by transaction-phase inserts,
/// keeping them disjoint from the load-phase key space.
pub const TRANSACTION_TABLE_SUFFIX: &str = "X";

/// Attempt budget for the bounded-resample loop in transaction key
/// selection before reporting the configuration as unsatisfiable.
const KEY_SELECTION_ATTEMPTS: u32 = 1000;

const KEY_MIX_CONSTANT: u64 = 0x4CF5_AD43_2745_937F;

/// Deterministic 64-bit multiplicative mix used to scatter ordered insert
/// sequences across the key space in `hashed` mode.
pub fn mix_key(value: u64) -> u64 {
    (value ^ (value >> 32)).wrapping_mul(KEY_MIX_CONSTANT)
}

/// Monotonic insert sequence for one table.
///
/// `next_value` is an atomic fetch-and-add: any two concurrent callers are
/// guaranteed distinct, gap-free values.
#[derive(Debug)]
pub struct KeyCounter {
    start: u64,
    next: AtomicU64,
}

impl KeyCounter {
    pub fn new(start: u64) -> Self {
        Self { start, next: AtomicU64::new(start) }
    }

    /// Allocate the next insert sequence value (exactly-once per call).
    pub fn next_value(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Most recently allocated value, or `start - 1` if none yet.
    pub fn last_value(&self) -> i64 {
        self.next.load(Ordering::Relaxed) as i64 - 1
    }

    pub fn start(&self) -> u64 {
        self.start
    }
}

/// Transaction-time key selection distribution for one table.
#[derive(Debug)]
enum KeyChooser {
    Uniform { range: u64, rng: SmallRng },
    Exponential { dist: Exp<f64>, rng: SmallRng },
}

impl KeyChooser {
    fn from_config(cfg: &KeyChooserConfig, record_count: u64, seed: Option<u64>) -> Result<Self> {
        let rng = match seed {
            Some(s) => SmallRng::seed_from_u64(s),
            None => SmallRng::from_os_rng(),
        };
        match *cfg {
            KeyChooserConfig::Uniform => {
                // A zero-record table still constructs; the range bound in
                // transaction_key rejects every sample until inserts happen.
                Ok(KeyChooser::Uniform { range: record_count.max(1), rng })
            }
            KeyChooserConfig::Exponential { percentile, frac } => {
                if record_count == 0 {
                    return Err(Error::Config(
                        "exponential keychooser requires record_count > 0".to_string(),
                    ));
                }
                if !(0.0..100.0).contains(&percentile) || frac <= 0.0 {
                    return Err(Error::Config(format!(
                        "invalid exponential keychooser parameters: percentile={percentile} frac={frac}"
                    )));
                }
                let gamma = -(1.0 - percentile / 100.0).ln() / (record_count as f64 * frac);
                let dist = Exp::new(gamma)
                    .map_err(|e| Error::Config(format!("exponential keychooser: {e}")))?;
                Ok(KeyChooser::Exponential { dist, rng })
            }
        }
    }

    fn sample(&mut self) -> u64 {
        match self {
            KeyChooser::Uniform { range, rng } => rng.random_range(0..*range),
            KeyChooser::Exponential { dist, rng } => dist.sample(rng) as u64,
        }
    }

    /// Recency-biased choosers sample an *offset* from the newest key;
    /// whole-range choosers sample the key index directly.
    fn is_recency_biased(&self) -> bool {
        matches!(self, KeyChooser::Exponential { .. })
    }
}

struct TableKeys {
    counter: Arc<KeyCounter>,
    chooser: KeyChooser,
    config: TableConfig,
}

/// Per-worker handle over the shared key space.
///
/// Counters are shared across all handles via `Arc`; the choosers own
/// per-handle RNG state, so sampling needs `&mut self` but takes no lock.
pub struct KeySpace {
    tables: HashMap<String, TableKeys>,
    zeropadding: usize,
    ordered: bool,
}

impl KeySpace {
    /// Build the key space from configuration. Fails fast on distribution
    /// parameters that can never produce a valid key.
    pub fn from_config(cfg: &WorkloadConfig, master_seed: Option<u64>) -> Result<Self> {
        let mut tables = HashMap::new();
        for (name, table_cfg) in &cfg.tables {
            let chooser_seed = seed::derive_opt(
                master_seed,
                &format!("{}/{}", seed::components::KEY_CHOOSER, name),
            );
            let chooser =
                KeyChooser::from_config(&table_cfg.keychooser, table_cfg.record_count, chooser_seed)?;
            tables.insert(
                name.clone(),
                TableKeys {
                    counter: Arc::new(KeyCounter::new(table_cfg.record_count)),
                    chooser,
                    config: table_cfg.clone(),
                },
            );
        }
        Ok(Self {
            tables,
            zeropadding: cfg.zeropadding,
            ordered: cfg.insert_order == InsertOrder::Ordered,
        })
    }

    /// Create another handle over the same counters, with freshly seeded
    /// choosers for an independent worker.
    pub fn for_worker(&self, worker_seed: Option<u64>) -> Result<KeySpace> {
        let mut tables = HashMap::new();
        for (name, keys) in &self.tables {
            let chooser_seed = seed::derive_opt(
                worker_seed,
                &format!("{}/{}", seed::components::KEY_CHOOSER, name),
            );
            let chooser = KeyChooser::from_config(
                &keys.config.keychooser,
                keys.config.record_count,
                chooser_seed,
            )?;
            tables.insert(
                name.clone(),
                TableKeys {
                    counter: Arc::clone(&keys.counter),
                    chooser,
                    config: keys.config.clone(),
                },
            );
        }
        Ok(KeySpace { tables, zeropadding: self.zeropadding, ordered: self.ordered })
    }

    fn table(&self, name: &str) -> Result<&TableKeys> {
        self.tables.get(name).ok_or_else(|| Error::UnknownTable(name.to_string()))
    }

    /// Atomically allocate the next insert sequence value for `table`.
    pub fn next_insert_key(&self, table: &str) -> Result<u64> {
        Ok(self.table(table)?.counter.next_value())
    }

    /// Most recently allocated sequence value for `table`.
    pub fn last_insert_key(&self, table: &str) -> Result<i64> {
        Ok(self.table(table)?.counter.last_value())
    }

    /// Render a raw sequence value as a key string: scatter in hashed mode,
    /// left-pad to `zeropadding` decimal digits, prefix with the table name.
    pub fn build_key(&self, keynum: u64, table: &str) -> String {
        let rendered = if self.ordered { keynum } else { mix_key(keynum) };
        format!("{}{:0width$}", table, rendered, width = self.zeropadding)
    }

    /// Allocate and render a fresh load-phase insert key for `table`.
    pub fn insert_key(&self, table: &str) -> Result<String> {
        let keynum = self.next_insert_key(table)?;
        Ok(self.build_key(keynum, table))
    }

    /// Allocate and render a transaction-phase insert key for `table`,
    /// in the suffixed key space disjoint from load-phase keys.
    pub fn insert_transaction_key(&self, table: &str) -> Result<String> {
        let keynum = self.next_insert_key(table)?;
        Ok(self.build_key(keynum, &format!("{table}{TRANSACTION_TABLE_SUFFIX}")))
    }

    /// Sample a transaction-time key for `table`, never exceeding the most
    /// recently allocated sequence value.
    pub fn transaction_key(&mut self, table: &str) -> Result<String> {
        let keynum = {
            let keys = self
                .tables
                .get_mut(table)
                .ok_or_else(|| Error::UnknownTable(table.to_string()))?;
            let last = keys.counter.last_value();
            let mut found = None;
            for _ in 0..KEY_SELECTION_ATTEMPTS {
                let candidate = if keys.chooser.is_recency_biased() {
                    last - keys.chooser.sample() as i64
                } else {
                    keys.chooser.sample() as i64
                };
                if candidate >= 0 && candidate <= last {
                    found = Some(candidate as u64);
                    break;
                }
            }
            found.ok_or_else(|| Error::KeySelectionExhausted {
                table: table.to_string(),
                attempts: KEY_SELECTION_ATTEMPTS,
            })?
        };
        Ok(self.build_key(keynum, table))
    }
}
