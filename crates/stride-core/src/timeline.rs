//! A coherent view of one session's temporal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auto_pause::AutoPause;
use crate::pause::{PauseInterval, PauseKind};
use crate::status::RecordingStatus;

/// A pause that has not ended yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenPause {
    /// Where the still-open portion begins.
    pub since: DateTime<Utc>,
    pub kind: PauseKind,
    /// Set when this pause reopened the last closed pause, so closing it
    /// moves that pause's end instead of appending a new one.
    pub extends_last: bool,
}

/// Everything the metric calculations need, captured at one instant.
///
/// Values of this type are published as a whole, so a reader never mixes an
/// old start with a newer pause list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub status: RecordingStatus,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Closed pauses from status transitions, in time order.
    pub pauses: Vec<PauseInterval>,
    pub open_pause: Option<OpenPause>,
    /// Intervals reported by motion detection.
    #[serde(default)]
    pub auto_pauses: Vec<AutoPause>,
}

impl Timeline {
    /// Replaces the motion-detected intervals.
    #[must_use]
    pub fn with_auto_pauses(mut self, auto_pauses: &[AutoPause]) -> Self {
        self.auto_pauses = auto_pauses.to_vec();
        self
    }

    /// Whether the session has been started and not stopped.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.start.is_some() && self.end.is_none()
    }
}
