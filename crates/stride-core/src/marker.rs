//! Raw, unvalidated workout event markers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pause::{PauseInterval, PauseKind};

/// The type of a raw workout event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    PauseStart,
    PauseEnd,
    AutoPauseStart,
    AutoPauseEnd,
    Lap,
    Marker,
    Segment,
    #[serde(other)]
    Unknown,
}

impl MarkerKind {
    /// The pause kind this marker opens, if it is a pause start.
    #[must_use]
    pub const fn opens(self) -> Option<PauseKind> {
        match self {
            Self::PauseStart => Some(PauseKind::Manual),
            Self::AutoPauseStart => Some(PauseKind::Automatic),
            _ => None,
        }
    }

    /// The pause kind this marker closes, if it is a resume.
    #[must_use]
    pub const fn closes(self) -> Option<PauseKind> {
        match self {
            Self::PauseEnd => Some(PauseKind::Manual),
            Self::AutoPauseEnd => Some(PauseKind::Automatic),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_pause_start(self) -> bool {
        self.opens().is_some()
    }

    #[must_use]
    pub const fn is_resume(self) -> bool {
        self.closes().is_some()
    }

    /// The marker kind that opens a pause of the given kind.
    #[must_use]
    pub const fn start_of(kind: PauseKind) -> Self {
        match kind {
            PauseKind::Manual => Self::PauseStart,
            PauseKind::Automatic => Self::AutoPauseStart,
        }
    }

    /// The marker kind that closes a pause of the given kind.
    #[must_use]
    pub const fn end_of(kind: PauseKind) -> Self {
        match kind {
            PauseKind::Manual => Self::PauseEnd,
            PauseKind::Automatic => Self::AutoPauseEnd,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PauseStart => "pause_start",
            Self::PauseEnd => "pause_end",
            Self::AutoPauseStart => "auto_pause_start",
            Self::AutoPauseEnd => "auto_pause_end",
            Self::Lap => "lap",
            Self::Marker => "marker",
            Self::Segment => "segment",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A timestamped marker as recorded or imported, before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawEventMarker {
    pub timestamp: DateTime<Utc>,
    pub kind: MarkerKind,
}

impl RawEventMarker {
    #[must_use]
    pub const fn new(timestamp: DateTime<Utc>, kind: MarkerKind) -> Self {
        Self { timestamp, kind }
    }

    /// The start/end marker pair describing a closed pause.
    #[must_use]
    pub fn pair_for(pause: &PauseInterval) -> [Self; 2] {
        [
            Self::new(pause.start(), MarkerKind::start_of(pause.kind())),
            Self::new(pause.end(), MarkerKind::end_of(pause.kind())),
        ]
    }
}
