//! Pause intervals.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// How a pause was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseKind {
    /// Initiated by the user.
    Manual,
    /// Inferred by motion detection.
    Automatic,
}

impl PauseKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Automatic => "automatic",
        }
    }
}

impl fmt::Display for PauseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A closed pause with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PauseIntervalRepr")]
pub struct PauseInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    kind: PauseKind,
}

#[derive(Deserialize)]
struct PauseIntervalRepr {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    kind: PauseKind,
}

impl TryFrom<PauseIntervalRepr> for PauseInterval {
    type Error = String;

    fn try_from(repr: PauseIntervalRepr) -> Result<Self, Self::Error> {
        Self::new(repr.start, repr.end, repr.kind)
            .ok_or_else(|| format!("pause must end after it starts: {} >= {}", repr.start, repr.end))
    }
}

impl PauseInterval {
    /// Returns `None` unless `start < end`.
    #[must_use]
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, kind: PauseKind) -> Option<Self> {
        (start < end).then_some(Self { start, end, kind })
    }

    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    #[must_use]
    pub const fn kind(&self) -> PauseKind {
        self.kind
    }

    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// True when the two intervals share more than a single boundary instant.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }

    /// Moves the end forward. Ignored unless `end` is later than the current end.
    pub(crate) fn extend_to(&mut self, end: DateTime<Utc>) {
        if end > self.end {
            self.end = end;
        }
    }
}
