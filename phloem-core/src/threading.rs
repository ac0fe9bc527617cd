//! Threading runtime and shutdown signalling
//!
//! Workers are native OS threads released together through a barrier; the
//! shutdown signal is a condvar-backed flag so blocked backoff sleeps wake
//! immediately when the run is cancelled.

use crate::{Error, Result};
use std::sync::{Arc, Barrier, Condvar, Mutex};
use std::thread;
use std::time::Duration;

/// Cooperative shutdown signal shared by all workers.
#[derive(Clone, Default)]
pub struct Shutdown {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger shutdown and wake every sleeper.
    pub fn trigger(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().expect("shutdown lock poisoned") = true;
        cvar.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        let (lock, _) = &*self.inner;
        *lock.lock().expect("shutdown lock poisoned")
    }

    /// Sleep for `duration`, waking early on shutdown.
    ///
    /// Returns true if the full duration elapsed, false if shutdown was
    /// triggered first.
    pub fn sleep(&self, duration: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let guard = lock.lock().expect("shutdown lock poisoned");
        let (guard, _timeout) = cvar
            .wait_timeout_while(guard, duration, |triggered| !*triggered)
            .expect("shutdown lock poisoned");
        !*guard
    }
}

/// Multi-threaded runtime for spawning and joining workers.
pub struct Runtime {
    num_threads: usize,
}

impl Runtime {
    pub fn new(num_threads: usize) -> Self {
        Self { num_threads }
    }

    /// Run one worker per thread and collect their results.
    ///
    /// All threads start together after a barrier so no worker gets a head
    /// start on the shared counters.
    pub fn run_workers<R, F>(&self, worker: F) -> Result<Vec<R>>
    where
        R: Send + 'static,
        F: Fn(usize) -> Result<R> + Send + Sync + Clone + 'static,
    {
        let barrier = Arc::new(Barrier::new(self.num_threads));
        let mut handles = Vec::new();

        for thread_id in 0..self.num_threads {
            let worker = worker.clone();
            let barrier = barrier.clone();
            handles.push(thread::spawn(move || {
                barrier.wait();
                worker(thread_id)
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            let result = handle
                .join()
                .map_err(|e| Error::Other(format!("Worker thread panicked: {e:?}")))??;
            results.push(result);
        }
        Ok(results)
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }
}
