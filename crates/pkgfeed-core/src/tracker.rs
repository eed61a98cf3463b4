//! Correlates outbound upstream calls with their responses and reports
//! timing to telemetry.
//!
//! Every call is registered at send time and completed when its response
//! arrives. Calls whose response never arrives (transport failure,
//! cancellation) stay pending until an opportunistic sweep discards them;
//! they are never reported. The registry is the only shared mutable state in
//! the engine and is mutated under a single mutex guard per operation.

use crate::telemetry::{DependencyReport, Telemetry};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Pending entries older than this are treated as abandoned and discarded.
pub const STALE_AFTER: Duration = Duration::from_secs(10 * 60);

/// Identity of one in-flight upstream call. Unique among concurrently
/// pending calls by construction (monotonic counter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallId(u64);

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Contract violations on the tracker registry.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TrackerError {
    /// A response was matched against a call that is not pending. Request
    /// identity must be unique among in-flight calls, so this is a defect
    /// in the caller, not a recoverable condition.
    #[error("No pending upstream call matches {0}")]
    UnmatchedCompletion(CallId),
}

struct PendingCall {
    host: String,
    path: String,
    started_at: DateTime<Utc>,
    started: Instant,
}

/// Tracks in-flight upstream calls and reports completed ones to telemetry.
pub struct DependencyTracker {
    name: String,
    target: String,
    stale_after: Duration,
    telemetry: Arc<dyn Telemetry>,
    next_id: AtomicU64,
    pending: Mutex<HashMap<CallId, PendingCall>>,
}

impl fmt::Debug for DependencyTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyTracker")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("pending", &self.pending_calls())
            .finish()
    }
}

impl DependencyTracker {
    /// A tracker reporting under `name` against `target`, with the default
    /// 10-minute staleness threshold.
    pub fn new(
        name: impl Into<String>,
        target: impl Into<String>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            stale_after: STALE_AFTER,
            telemetry,
            next_id: AtomicU64::new(0),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Overrides the staleness threshold. Tests shrink it to exercise the
    /// sweep without waiting ten minutes.
    pub fn with_staleness(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Registers an outbound call and returns its identity.
    ///
    /// Also sweeps pending entries whose age exceeds the staleness
    /// threshold; those are discarded without a report, which bounds
    /// registry growth when responses never arrive.
    pub fn register(&self, host: &str, path: &str) -> CallId {
        let id = CallId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut pending = self.lock();

        let before = pending.len();
        pending.retain(|_, call| call.started.elapsed() <= self.stale_after);
        let evicted = before - pending.len();
        if evicted > 0 {
            tracing::debug!(evicted, "discarded abandoned upstream calls");
        }

        pending.insert(
            id,
            PendingCall {
                host: host.to_string(),
                path: path.to_string(),
                started_at: Utc::now(),
                started: Instant::now(),
            },
        );
        id
    }

    /// Completes a pending call with the upstream status code, removing it
    /// from the registry and emitting exactly one telemetry report.
    ///
    /// # Errors
    ///
    /// [`TrackerError::UnmatchedCompletion`] when no pending entry matches
    /// `id`. Logged at error level; never silently swallowed.
    pub fn complete(&self, id: CallId, status: u16) -> Result<(), TrackerError> {
        let call = self.lock().remove(&id).ok_or_else(|| {
            tracing::error!(call = %id, status, "completion for a call that is not pending");
            TrackerError::UnmatchedCompletion(id)
        })?;

        // Report outside the critical section; a slow sink must not
        // serialize unrelated requests.
        let report = DependencyReport {
            name: self.name.clone(),
            target: self.target.clone(),
            host: call.host,
            path: call.path,
            started_at: call.started_at,
            elapsed: call.started.elapsed(),
            result_code: status.to_string(),
            success: status == 200,
        };
        if let Err(error) = self.telemetry.report_dependency(&report) {
            tracing::warn!(%error, "failed to report upstream dependency call");
        }
        Ok(())
    }

    /// Number of calls currently pending.
    pub fn pending_calls(&self) -> usize {
        self.lock().len()
    }

    // A poisoned registry is still structurally sound; recover the guard.
    fn lock(&self) -> MutexGuard<'_, HashMap<CallId, PendingCall>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
