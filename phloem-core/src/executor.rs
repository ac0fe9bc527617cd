//! Deadline-bound request execution
//!
//! One request per call, bounded by a watchdog deadline enforced outside
//! the blocking transport call: a timer thread flips a shared flag after
//! `exec_timeout`, and the body is drained in increments with the flag
//! checked between reads. Dropping the response on the timeout path
//! releases the connection. Cooperative cancellation, not preemption.

use crate::outcome::RequestOutcome;
use crate::transport::Transport;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const BODY_CHUNK_SIZE: usize = 4096;

/// Background timer that flips a shared flag once the deadline elapses,
/// unless disarmed first. Disarming (or dropping) joins the timer thread,
/// so no watchdog outlives its request by more than the deadline.
pub struct Watchdog {
    fired: Arc<AtomicBool>,
    disarm: Arc<(Mutex<bool>, Condvar)>,
    handle: Option<JoinHandle<()>>,
}

impl Watchdog {
    pub fn arm(deadline: Duration) -> Self {
        let fired = Arc::new(AtomicBool::new(false));
        let disarm = Arc::new((Mutex::new(false), Condvar::new()));

        let thread_fired = Arc::clone(&fired);
        let thread_disarm = Arc::clone(&disarm);
        let handle = thread::spawn(move || {
            let (lock, cvar) = &*thread_disarm;
            let guard = lock.lock().expect("watchdog lock poisoned");
            let (_guard, timeout) = cvar
                .wait_timeout_while(guard, deadline, |disarmed| !*disarmed)
                .expect("watchdog lock poisoned");
            if timeout.timed_out() {
                thread_fired.store(true, Ordering::SeqCst);
            }
        });

        Self { fired, disarm, handle: Some(handle) }
    }

    /// Has the deadline elapsed?
    pub fn fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Cancel the timer; a no-op if it already fired.
    pub fn disarm(&mut self) {
        {
            let (lock, cvar) = &*self.disarm;
            *lock.lock().expect("watchdog lock poisoned") = true;
            cvar.notify_all();
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.disarm();
    }
}

/// Executes single requests under the watchdog deadline and maps transport
/// outcomes to the fixed status taxonomy.
pub struct DeadlineExecutor<T> {
    transport: T,
    exec_timeout: Duration,
    error_marker: String,
}

impl<T: Transport> DeadlineExecutor<T> {
    pub fn new(transport: T, exec_timeout: Duration, error_marker: impl Into<String>) -> Self {
        Self { transport, exec_timeout, error_marker: error_marker.into() }
    }

    /// Execute one GraphQL document against the backend.
    ///
    /// The payload is wrapped as a `{"query": …}` JSON envelope; every
    /// failure mode maps into a `RequestOutcome`, so the caller's loop
    /// never has to unwind.
    pub fn execute(&self, payload: &str) -> RequestOutcome {
        let wrapped = serde_json::json!({ "query": payload }).to_string();

        let mut watchdog = Watchdog::arm(self.exec_timeout);
        let mut response = match self.transport.execute(wrapped.as_bytes()) {
            Ok(response) => response,
            Err(e) => {
                if watchdog.fired() {
                    tracing::debug!(error = %e, "request timed out during transport call");
                    return RequestOutcome::Timeout;
                }
                tracing::debug!(error = %e, "transport call failed");
                return RequestOutcome::Error;
            }
        };

        let mut body = Vec::new();
        let mut chunk = [0u8; BODY_CHUNK_SIZE];
        loop {
            if watchdog.fired() {
                // Dropping `response` here closes the connection
                tracing::debug!("request exceeded execution deadline while draining body");
                return RequestOutcome::Timeout;
            }
            match response.body.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => body.extend_from_slice(&chunk[..n]),
                Err(e) => {
                    if watchdog.fired() {
                        tracing::debug!(error = %e, "request timed out during body read");
                        return RequestOutcome::Timeout;
                    }
                    tracing::debug!(error = %e, "body read failed");
                    return RequestOutcome::Error;
                }
            }
        }
        watchdog.disarm();

        let body = String::from_utf8_lossy(&body);
        let outcome = map_status(response.status, &body, &self.error_marker);
        if outcome == RequestOutcome::Error && (200..300).contains(&response.status) {
            tracing::debug!(%body, "request failed with embedded errors");
        }
        outcome
    }

    pub fn error_marker(&self) -> &str {
        &self.error_marker
    }
}

/// Map a response to an outcome.
///
/// Note the deliberate permissiveness at the end: any status that is not
/// explicitly listed and not 2xx/5xx (e.g. a 3xx redirect) falls through
/// to `Ok`. Kept for compatibility with existing result baselines; the
/// test suite pins this down so a change is a conscious one.
pub fn map_status(status: u16, body: &str, error_marker: &str) -> RequestOutcome {
    match status {
        400 => RequestOutcome::BadRequest,
        403 => RequestOutcome::Forbidden,
        404 => RequestOutcome::NotFound,
        501 => RequestOutcome::NotImplemented,
        503 => RequestOutcome::ServiceUnavailable,
        500..=599 => RequestOutcome::Error,
        200..=299 if !error_marker.is_empty() && body.contains(error_marker) => {
            RequestOutcome::Error
        }
        _ => RequestOutcome::Ok,
    }
}
