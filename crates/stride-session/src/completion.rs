//! What happens to a recording after it stops.
//!
//! A finished snapshot is saved, continued or discarded exactly once. The
//! first action to claim the handler wins; anything arriving later, such as
//! an auto-save timer racing a user tap, is a no-op. The claim is taken
//! before any work starts and is never given back, so a failing action
//! reports its error to its own caller and still ends the handler.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use stride_core::{MetricsSettings, SessionSnapshot, WorkoutRecord};
use tracing::{debug, info};

use crate::error::CompletionError;
use crate::session::WeakSessionHandle;

/// Persistence seam for finished recordings.
pub trait SnapshotSink: Send + Sync {
    fn save(
        &self,
        snapshot: &SessionSnapshot,
        record: &WorkoutRecord,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// The result of a completion action.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    Saved(Box<WorkoutRecord>),
    Continued,
    Discarded,
    /// Another action already took place.
    AlreadyHandled,
}

/// Holds one finished snapshot until it is saved, continued or discarded.
pub struct SessionCompletionHandler {
    snapshot: Arc<SessionSnapshot>,
    session: WeakSessionHandle,
    sink: Arc<dyn SnapshotSink>,
    settings: MetricsSettings,
    acted: AtomicBool,
}

impl std::fmt::Debug for SessionCompletionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCompletionHandler")
            .field("snapshot", &self.snapshot.id)
            .field("acted", &self.is_handled())
            .finish_non_exhaustive()
    }
}

impl SessionCompletionHandler {
    pub fn new(
        snapshot: Arc<SessionSnapshot>,
        session: WeakSessionHandle,
        sink: Arc<dyn SnapshotSink>,
        settings: MetricsSettings,
    ) -> Self {
        Self {
            snapshot,
            session,
            sink,
            settings,
            acted: AtomicBool::new(false),
        }
    }

    pub fn snapshot(&self) -> &SessionSnapshot {
        &self.snapshot
    }

    /// Whether an action has already been taken.
    pub fn is_handled(&self) -> bool {
        self.acted.load(Ordering::Acquire)
    }

    fn claim(&self) -> bool {
        self.acted
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Audits the snapshot and hands it to the sink.
    pub fn save(&self) -> Result<CompletionOutcome, CompletionError> {
        if !self.claim() {
            debug!(id = %self.snapshot.id, "save ignored, already handled");
            return Ok(CompletionOutcome::AlreadyHandled);
        }

        let record = WorkoutRecord::from_snapshot(&self.snapshot, &self.settings);
        self.sink
            .save(&self.snapshot, &record)
            .map_err(CompletionError::Sink)?;
        info!(id = %record.id, "recording saved");
        Ok(CompletionOutcome::Saved(Box::new(record)))
    }

    /// Re-opens the recording in the session it came from.
    ///
    /// Fails if the session is gone or busy. The handler stays claimed either
    /// way; [`snapshot`](Self::snapshot) remains readable.
    pub async fn continue_recording(&self) -> Result<CompletionOutcome, CompletionError> {
        if !self.claim() {
            debug!(id = %self.snapshot.id, "continue ignored, already handled");
            return Ok(CompletionOutcome::AlreadyHandled);
        }

        let session = self.session.upgrade().ok_or(CompletionError::SessionGone)?;
        session.continue_from(Arc::clone(&self.snapshot)).await?;
        info!(id = %self.snapshot.id, "recording continued");
        Ok(CompletionOutcome::Continued)
    }

    /// Drops the recording.
    pub fn discard(&self) -> CompletionOutcome {
        if !self.claim() {
            debug!(id = %self.snapshot.id, "discard ignored, already handled");
            return CompletionOutcome::AlreadyHandled;
        }
        info!(id = %self.snapshot.id, "recording discarded");
        CompletionOutcome::Discarded
    }

    /// Saves after `delay` unless another action came first.
    pub async fn save_after(&self, delay: Duration) -> Result<CompletionOutcome, CompletionError> {
        tokio::time::sleep(delay).await;
        self.save()
    }
}
