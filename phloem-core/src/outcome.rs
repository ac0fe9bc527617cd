//! Status taxonomy for one network attempt

use std::fmt;

/// Result of a single request attempt against the backend.
///
/// Produced once per attempt and never mutated. `Timeout` is reported when
/// the execution deadline elapses before the response body finishes
/// draining; all other variants come from the response status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
    Ok,
    BadRequest,
    Forbidden,
    NotFound,
    NotImplemented,
    ServiceUnavailable,
    Error,
    Timeout,
}

impl RequestOutcome {
    /// True only for `Ok`; every other variant counts as a failed attempt.
    pub fn is_ok(self) -> bool {
        matches!(self, RequestOutcome::Ok)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestOutcome::Ok => "ok",
            RequestOutcome::BadRequest => "bad-request",
            RequestOutcome::Forbidden => "forbidden",
            RequestOutcome::NotFound => "not-found",
            RequestOutcome::NotImplemented => "not-implemented",
            RequestOutcome::ServiceUnavailable => "service-unavailable",
            RequestOutcome::Error => "error",
            RequestOutcome::Timeout => "timeout",
        }
    }
}

impl fmt::Display for RequestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
