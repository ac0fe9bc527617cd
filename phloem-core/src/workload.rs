//! Benchmark workload driver
//!
//! Ties the pieces together for one worker: pick an operation, resolve its
//! key(s), build the payload through the backend strategy, and execute it.
//! Inserts go through the bounded-retry loop; reads and updates are
//! fire-and-forget — their outcome is reported upward, never retried.
//!
//! Must be safe to drive concurrently from many independent workers: the
//! only shared mutable state is the lock-free key counters, so nothing
//! here takes a lock that could serialize unrelated callers.

use crate::backend::Backend;
use crate::chooser::{Operation, OperationChooser, OperationClass};
use crate::config::WorkloadConfig;
use crate::executor::DeadlineExecutor;
use crate::keyspace::KeySpace;
use crate::outcome::RequestOutcome;
use crate::seed::{self, components};
use crate::threading::Shutdown;
use crate::transport::Transport;
use crate::Result;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// One worker's view of the social-graph benchmark workload.
///
/// Worker instances share key counters (via [`KeySpace`] handles) but own
/// all RNG state, so iteration never contends on anything but the atomic
/// increments.
pub struct SocialWorkload {
    chooser: OperationChooser,
    keys: KeySpace,
    table: String,
    retry_limit: u32,
    retry_interval: Duration,
    jitter_rng: SmallRng,
    shutdown: Shutdown,
}

impl SocialWorkload {
    /// Initialize the workload from configuration. Fails fast on key-space
    /// configuration errors.
    pub fn new(cfg: &WorkloadConfig, master_seed: Option<u64>, shutdown: Shutdown) -> Result<Self> {
        let chooser = OperationChooser::from_config(
            &cfg.operations,
            seed::derive_opt(master_seed, components::OPERATION_CHOOSER),
        );
        let keys = KeySpace::from_config(cfg, master_seed)?;
        let jitter_rng = match seed::derive_opt(master_seed, components::RETRY_JITTER) {
            Some(s) => SmallRng::seed_from_u64(s),
            None => SmallRng::from_os_rng(),
        };
        Ok(Self {
            chooser,
            keys,
            table: cfg.table.clone(),
            retry_limit: cfg.insertion_retry_limit,
            retry_interval: cfg.insertion_retry_interval,
            jitter_rng,
            shutdown,
        })
    }

    /// Derive an independent worker instance sharing the key counters.
    pub fn for_worker(&self, worker_seed: Option<u64>) -> Result<SocialWorkload> {
        let jitter_rng = match seed::derive_opt(worker_seed, components::RETRY_JITTER) {
            Some(s) => SmallRng::seed_from_u64(s),
            None => SmallRng::from_os_rng(),
        };
        Ok(SocialWorkload {
            chooser: self
                .chooser
                .for_worker(seed::derive_opt(worker_seed, components::OPERATION_CHOOSER)),
            keys: self.keys.for_worker(worker_seed)?,
            table: self.table.clone(),
            retry_limit: self.retry_limit,
            retry_interval: self.retry_interval,
            jitter_rng,
            shutdown: self.shutdown.clone(),
        })
    }

    /// Sample the next operation name, or `None` when the configured mix is
    /// empty.
    pub fn choose_operation(&mut self) -> Option<String> {
        self.chooser.choose()
    }

    pub fn key_space(&mut self) -> &mut KeySpace {
        &mut self.keys
    }

    pub fn default_table(&self) -> &str {
        &self.table
    }

    /// One load-phase insert into the default table. Returns whether the
    /// insert (eventually) succeeded.
    pub fn do_insert<T: Transport>(
        &mut self,
        backend: &mut dyn Backend,
        executor: &DeadlineExecutor<T>,
    ) -> Result<bool> {
        let keynum = self.keys.next_insert_key(&self.table)?;
        let dbkey = self.keys.build_key(keynum, &self.table);
        let op = Operation {
            class: OperationClass::Insert,
            query: self.table.clone(),
            table: self.table.clone(),
        };
        self.insert_with_retry(&dbkey, |keys, key| {
            let payload = backend.build_mutation(&op, key, keys)?;
            Ok(executor.execute(&payload))
        })
    }

    /// One transaction-phase operation: sample from the mix, resolve keys,
    /// execute. Returns the operation name and its outcome for the caller's
    /// measurement collector, or `None` when no operation is configured.
    pub fn do_transaction<T: Transport>(
        &mut self,
        backend: &mut dyn Backend,
        executor: &DeadlineExecutor<T>,
    ) -> Result<Option<(String, RequestOutcome)>> {
        let Some(choice) = self.chooser.choose() else {
            return Ok(None);
        };
        let op = Operation::parse(&choice, &self.table);

        let outcome = match op.class {
            OperationClass::Read => {
                let key = self.keys.transaction_key(&op.table)?;
                let payload = backend.build_query(&op, &key);
                executor.execute(&payload)
            }
            OperationClass::Update => {
                let key = self.keys.transaction_key(&op.table)?;
                let payload = backend.build_mutation(&op, &key, &mut self.keys)?;
                executor.execute(&payload)
            }
            OperationClass::Insert => {
                let key = self.keys.insert_transaction_key(&op.table)?;
                let succeeded = self.insert_with_retry(&key, |keys, key| {
                    let payload = backend.build_mutation(&op, key, keys)?;
                    Ok(executor.execute(&payload))
                })?;
                if succeeded {
                    RequestOutcome::Ok
                } else {
                    RequestOutcome::Error
                }
            }
        };

        Ok(Some((choice, outcome)))
    }

    /// Drive one logical insert through bounded attempts.
    ///
    /// The key is allocated by the caller exactly once and reused across
    /// attempts, so a retry never leaks an unused sequence number. On
    /// failure the loop sleeps a jittered interval in
    /// `[0.8, 1.2) × retry_interval`; a shutdown signal received during the
    /// sleep aborts the loop with the failure result.
    pub fn insert_with_retry<F>(&mut self, key: &str, mut attempt: F) -> Result<bool>
    where
        F: FnMut(&mut KeySpace, &str) -> Result<RequestOutcome>,
    {
        let mut attempts = 0u32;
        loop {
            let outcome = attempt(&mut self.keys, key)?;
            if outcome.is_ok() {
                return Ok(true);
            }
            attempts += 1;
            if attempts > self.retry_limit {
                tracing::error!(
                    key,
                    attempts,
                    retry_limit = self.retry_limit,
                    "insert failed, not retrying any more"
                );
                return Ok(false);
            }
            tracing::warn!(key, attempt = attempts, outcome = %outcome, "retrying insertion");
            let jitter = 0.8 + 0.4 * self.jitter_rng.random::<f64>();
            if !self.shutdown.sleep(self.retry_interval.mul_f64(jitter)) {
                tracing::debug!(key, "shutdown during insert backoff, abandoning retry");
                return Ok(false);
            }
        }
    }
}
