//! Request logging for NOVA client calls.
//!
//! Every outbound call made by [`crate::NovaClient`] is timed and reported to
//! a [`RequestLogger`] once it resolves.  Logging is a pure side effect: it
//! never changes the outcome of a call.  The default logger emits `tracing`
//! events; implement the trait to capture records elsewhere.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::observability::{
    CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, CLIENT_TRANSPORT_ERRORS,
};

/// How a request resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The backend answered with a success status and a readable body.
    Success {
        /// HTTP status code.
        status_code: u16,
    },

    /// The call failed.
    Failure {
        /// HTTP status code, or 0 when no response was received.
        status_code: u16,
        /// The failure's message.
        message: String,
    },
}

impl RequestOutcome {
    /// Returns true if the request succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Success { .. })
    }
}

/// A completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    /// HTTP method, e.g. `"GET"`.
    pub method: String,

    /// Request path, e.g. `"/chat"`.
    pub path: String,

    /// Wall time from dispatch to resolution.
    pub duration: Duration,

    /// How the request resolved.
    pub outcome: RequestOutcome,
}

/// A sink for request records.
///
/// # Example
///
/// ```rust
/// use novachat::{RequestLogger, RequestRecord};
/// use std::sync::Mutex;
///
/// #[derive(Default)]
/// struct Capture {
///     records: Mutex<Vec<RequestRecord>>,
/// }
///
/// impl RequestLogger for Capture {
///     fn log_request(&self, record: &RequestRecord) {
///         self.records.lock().unwrap().push(record.clone());
///     }
/// }
/// ```
pub trait RequestLogger: Send + Sync {
    /// Called once per request, after it resolves.
    fn log_request(&self, record: &RequestRecord);
}

/// Logs each request as a `tracing` event.
///
/// Successes are logged at `info`, failures at `warn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl RequestLogger for TracingLogger {
    fn log_request(&self, record: &RequestRecord) {
        let duration_ms = record.duration.as_millis() as u64;
        match &record.outcome {
            RequestOutcome::Success { status_code } => {
                tracing::info!(
                    method = %record.method,
                    path = %record.path,
                    status_code,
                    duration_ms,
                    "NOVA API request succeeded"
                );
            }
            RequestOutcome::Failure {
                status_code,
                message,
            } => {
                tracing::warn!(
                    method = %record.method,
                    path = %record.path,
                    status_code,
                    duration_ms,
                    error = %message,
                    "NOVA API request failed"
                );
            }
        }
    }
}

/// Counts requests in flight and reports each one when it resolves.
pub(crate) struct RequestTracker {
    active: AtomicUsize,
    logger: Arc<dyn RequestLogger>,
}

impl RequestTracker {
    pub(crate) fn new(logger: Arc<dyn RequestLogger>) -> Self {
        Self {
            active: AtomicUsize::new(0),
            logger,
        }
    }

    pub(crate) fn set_logger(&mut self, logger: Arc<dyn RequestLogger>) {
        self.logger = logger;
    }

    /// Number of requests dispatched but not yet resolved.
    pub(crate) fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Marks a request as dispatched.
    pub(crate) fn start(&self, method: &str, path: &str) -> InFlight<'_> {
        self.active.fetch_add(1, Ordering::Relaxed);
        CLIENT_REQUESTS.click();
        InFlight {
            tracker: self,
            method: method.to_string(),
            path: path.to_string(),
            started: Instant::now(),
        }
    }
}

/// A dispatched request.  Dropping it decrements the in-flight count whether
/// or not it was finished.
pub(crate) struct InFlight<'a> {
    tracker: &'a RequestTracker,
    method: String,
    path: String,
    started: Instant,
}

impl InFlight<'_> {
    /// Reports the outcome of the request.
    pub(crate) fn finish(self, outcome: RequestOutcome) {
        let duration = self.started.elapsed();
        CLIENT_REQUEST_DURATION.add(duration.as_secs_f64());
        if let RequestOutcome::Failure { status_code, .. } = &outcome {
            CLIENT_REQUEST_ERRORS.click();
            if *status_code == 0 {
                CLIENT_TRANSPORT_ERRORS.click();
            }
        }
        let record = RequestRecord {
            method: self.method.clone(),
            path: self.path.clone(),
            duration,
            outcome,
        };
        self.tracker.logger.log_request(&record);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.tracker.active.fetch_sub(1, Ordering::Relaxed);
    }
}
