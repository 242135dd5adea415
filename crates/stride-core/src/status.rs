//! Recording status values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The recording state of a session.
///
/// `Waiting` and `Ready` are inactive and gated by component readiness.
/// `Recording` is the only state in which elapsed time counts as active.
/// `Paused` and `AutoPaused` are active but do not accrue duration; they only
/// differ in how they were entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingStatus {
    #[default]
    Waiting,
    Ready,
    Recording,
    Paused,
    AutoPaused,
}

impl RecordingStatus {
    /// Whether a workout is in progress (recording or any kind of pause).
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Recording | Self::Paused | Self::AutoPaused)
    }

    /// Whether elapsed time currently counts towards active duration.
    #[must_use]
    pub const fn accrues_duration(self) -> bool {
        matches!(self, Self::Recording)
    }

    /// Whether the session is in one of the two pause states.
    #[must_use]
    pub const fn is_paused(self) -> bool {
        matches!(self, Self::Paused | Self::AutoPaused)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Ready => "ready",
            Self::Recording => "recording",
            Self::Paused => "paused",
            Self::AutoPaused => "auto_paused",
        }
    }
}

impl fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "ready" => Ok(Self::Ready),
            "recording" => Ok(Self::Recording),
            "paused" => Ok(Self::Paused),
            "auto_paused" => Ok(Self::AutoPaused),
            _ => Err(format!("invalid recording status: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_recording_accrues_duration() {
        assert!(RecordingStatus::Recording.accrues_duration());
        assert!(!RecordingStatus::Paused.accrues_duration());
        assert!(!RecordingStatus::AutoPaused.accrues_duration());
        assert!(!RecordingStatus::Ready.accrues_duration());
    }

    #[test]
    fn pauses_are_active() {
        assert!(RecordingStatus::Paused.is_active());
        assert!(RecordingStatus::AutoPaused.is_active());
        assert!(!RecordingStatus::Waiting.is_active());
        assert!(!RecordingStatus::Ready.is_active());
    }

    #[test]
    fn status_string_forms_roundtrip() {
        for status in [
            RecordingStatus::Waiting,
            RecordingStatus::Ready,
            RecordingStatus::Recording,
            RecordingStatus::Paused,
            RecordingStatus::AutoPaused,
        ] {
            assert_eq!(status.as_str().parse::<RecordingStatus>(), Ok(status));
        }
        assert!("stopped".parse::<RecordingStatus>().is_err());
    }
}
