//! Recording status state machine.
//!
//! Validates requested status changes and derives the pause list from the
//! transitions that were accepted.
//!
//! # Transitions
//!
//! | from                    | to            | trigger             |
//! |-------------------------|---------------|---------------------|
//! | `ready`                 | `recording`   | request             |
//! | `recording`/`auto_paused` | `paused`    | request             |
//! | `recording`             | `auto_paused` | request             |
//! | `paused`/`auto_paused`  | `recording`   | request (resume)    |
//! | any active              | `ready`       | request (stop)      |
//! | `waiting`               | `ready`       | all components ready |
//! | `ready`                 | `waiting`     | a component not ready |
//!
//! Anything else is rejected without side effects.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info};

use crate::pause::{PauseInterval, PauseKind};
use crate::status::RecordingStatus;
use crate::timeline::{OpenPause, Timeline};

/// Pauses of the same kind that follow each other within this window merge,
/// and automatic pauses shorter than it are dropped as noise.
pub const FLUTTER_WINDOW_MS: i64 = 3_000;

fn flutter_window() -> TimeDelta {
    TimeDelta::milliseconds(FLUTTER_WINDOW_MS)
}

/// Result of a transition request.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Not a valid transition from the current status. Nothing changed.
    Rejected {
        from: RecordingStatus,
        to: RecordingStatus,
    },
    Applied {
        from: RecordingStatus,
        to: RecordingStatus,
    },
    /// The session was stopped; the machine is back to `ready` and reset.
    Stopped {
        from: RecordingStatus,
        timeline: Timeline,
    },
}

impl Transition {
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Whether a user or status-suggestion request may move `from` to `to`.
///
/// Readiness-driven moves between `waiting` and `ready` are not requests and
/// go through [`StatusMachine::readiness_changed`].
#[must_use]
pub const fn is_valid_request(from: RecordingStatus, to: RecordingStatus) -> bool {
    use RecordingStatus::{AutoPaused, Paused, Ready, Recording};
    matches!(
        (from, to),
        (Ready | Paused | AutoPaused, Recording)
            | (Recording | AutoPaused, Paused)
            | (Recording, AutoPaused)
            | (Recording | Paused | AutoPaused, Ready)
    )
}

/// The finite-state core of a recording session.
#[derive(Debug, Clone, Default)]
pub struct StatusMachine {
    status: RecordingStatus,
    start: Option<DateTime<Utc>>,
    pauses: Vec<PauseInterval>,
    open_pause: Option<OpenPause>,
}

impl StatusMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn status(&self) -> RecordingStatus {
        self.status
    }

    #[must_use]
    pub const fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    /// Closed pauses, in time order.
    #[must_use]
    pub fn pauses(&self) -> &[PauseInterval] {
        &self.pauses
    }

    #[must_use]
    pub const fn open_pause(&self) -> Option<OpenPause> {
        self.open_pause
    }

    /// The live timeline (no end yet, no motion-detected intervals).
    #[must_use]
    pub fn timeline(&self) -> Timeline {
        Timeline {
            status: self.status,
            start: self.start,
            end: None,
            pauses: self.pauses.clone(),
            open_pause: self.open_pause,
            auto_pauses: Vec::new(),
        }
    }

    /// Applies a requested status change if it is valid.
    pub fn request(&mut self, to: RecordingStatus, now: DateTime<Utc>) -> Transition {
        let from = self.status;
        if !is_valid_request(from, to) {
            debug!(%from, %to, "rejected status transition");
            return Transition::Rejected { from, to };
        }

        match to {
            RecordingStatus::Recording => {
                if self.start.is_none() {
                    info!(%now, "recording started");
                    self.start = Some(now);
                } else {
                    self.close_open_pause(now);
                }
            }
            RecordingStatus::Paused => {
                self.close_open_pause(now);
                self.open(PauseKind::Manual, now);
            }
            RecordingStatus::AutoPaused => self.open(PauseKind::Automatic, now),
            RecordingStatus::Ready => return self.stop(from, now),
            RecordingStatus::Waiting => return Transition::Rejected { from, to },
        }

        self.status = to;
        debug!(%from, %to, "status transition");
        Transition::Applied { from, to }
    }

    /// Moves between `waiting` and `ready` as component readiness changes.
    ///
    /// Active sessions are unaffected; they keep recording in degraded mode.
    pub fn readiness_changed(&mut self, all_ready: bool) -> Transition {
        let from = self.status;
        let to = match (from, all_ready) {
            (RecordingStatus::Waiting, true) => RecordingStatus::Ready,
            (RecordingStatus::Ready, false) => RecordingStatus::Waiting,
            _ => return Transition::Rejected { from, to: from },
        };
        self.status = to;
        debug!(%from, %to, "readiness transition");
        Transition::Applied { from, to }
    }

    /// Re-opens a finished timeline so recording can continue.
    ///
    /// The gap between the old end and `now` becomes a manual pause, and the
    /// machine is left `paused`.
    pub fn restore(&mut self, timeline: &Timeline, now: DateTime<Utc>) {
        let Some(start) = timeline.start else {
            debug!("cannot restore a timeline that never started");
            return;
        };
        let resume_gap_from = timeline.end.unwrap_or(now).min(now);

        self.start = Some(start);
        self.pauses.clone_from(&timeline.pauses);
        self.open_pause = None;
        self.open(PauseKind::Manual, resume_gap_from);
        self.status = RecordingStatus::Paused;
        info!(%start, pauses = self.pauses.len(), "restored previous recording");
    }

    /// Clears all state; readiness is re-established by the caller.
    pub fn reset(&mut self, status: RecordingStatus) {
        self.status = status;
        self.start = None;
        self.pauses.clear();
        self.open_pause = None;
    }

    fn stop(&mut self, from: RecordingStatus, now: DateTime<Utc>) -> Transition {
        self.close_open_pause(now);
        let timeline = Timeline {
            status: RecordingStatus::Ready,
            start: self.start,
            end: Some(now),
            pauses: std::mem::take(&mut self.pauses),
            open_pause: None,
            auto_pauses: Vec::new(),
        };
        info!(%now, pauses = timeline.pauses.len(), "recording stopped");
        self.reset(RecordingStatus::Ready);
        Transition::Stopped { from, timeline }
    }

    /// Opens a pause, reopening the last one when it is the same kind and
    /// ended within the flutter window.
    fn open(&mut self, kind: PauseKind, at: DateTime<Utc>) {
        let reopen = self.pauses.last().is_some_and(|last| {
            last.kind() == kind && at >= last.end() && at - last.end() < flutter_window()
        });
        if reopen {
            debug!(%kind, %at, "reopening previous pause");
        }
        let since = match (reopen, self.pauses.last()) {
            (true, Some(last)) => last.end(),
            _ => at,
        };
        self.open_pause = Some(OpenPause {
            since,
            kind,
            extends_last: reopen,
        });
    }

    fn close_open_pause(&mut self, at: DateTime<Utc>) {
        let Some(open) = self.open_pause.take() else {
            return;
        };

        if open.extends_last {
            if let Some(last) = self.pauses.last_mut() {
                last.extend_to(at);
            }
            return;
        }

        let Some(interval) = PauseInterval::new(open.since, at, open.kind) else {
            return;
        };
        if open.kind == PauseKind::Automatic && interval.duration() < flutter_window() {
            debug!(start = %open.since, end = %at, "discarding short automatic pause");
            return;
        }
        self.pauses.push(interval);
    }
}
