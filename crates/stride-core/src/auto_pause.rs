//! Automatically detected stationary intervals.
//!
//! Motion detection reports candidate intervals as they are discovered, often
//! late and overlapping. The tracker folds them into a sorted, disjoint set.

use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::marker::{MarkerKind, RawEventMarker};

/// A candidate automatic pause with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AutoPause {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl AutoPause {
    /// Returns `None` unless `start < end`. Callers treat `None` as a no-op.
    #[must_use]
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Overlapping or touching.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// The interval spanning both inputs.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// The start/end marker pair for pause accounting.
    #[must_use]
    pub const fn as_workout_events(&self) -> [RawEventMarker; 2] {
        [
            RawEventMarker::new(self.start, MarkerKind::AutoPauseStart),
            RawEventMarker::new(self.end, MarkerKind::AutoPauseEnd),
        ]
    }

    /// Signed seconds relative to `reference`.
    #[expect(
        clippy::cast_precision_loss,
        reason = "millisecond offsets within a workout fit in f64"
    )]
    #[must_use]
    pub fn as_range(&self, reference: DateTime<Utc>) -> RangeInclusive<f64> {
        let offset = |at: DateTime<Utc>| (at - reference).num_milliseconds() as f64 / 1_000.0;
        offset(self.start)..=offset(self.end)
    }
}

/// The set of automatic pauses detected during one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoPauseTracker {
    pauses: Vec<AutoPause>,
}

impl AutoPauseTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self { pauses: Vec::new() }
    }

    /// Adds a candidate, merging it with every interval it overlaps or touches.
    pub fn insert(&mut self, candidate: AutoPause) {
        let mut merged = candidate;
        self.pauses.retain(|existing| {
            if existing.overlaps(&merged) {
                merged = merged.merge(existing);
                false
            } else {
                true
            }
        });
        let at = self.pauses.partition_point(|p| p.start < merged.start);
        self.pauses.insert(at, merged);
    }

    /// Adds a candidate from raw bounds. Invalid bounds are ignored.
    pub fn record(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        match AutoPause::new(start, end) {
            Some(pause) => {
                self.insert(pause);
                true
            }
            None => {
                tracing::debug!(%start, %end, "ignoring empty auto-pause candidate");
                false
            }
        }
    }

    #[must_use]
    pub fn pauses(&self) -> &[AutoPause] {
        &self.pauses
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pauses.is_empty()
    }

    /// All intervals as start/end marker pairs, in time order.
    #[must_use]
    pub fn as_workout_events(&self) -> Vec<RawEventMarker> {
        self.pauses
            .iter()
            .flat_map(AutoPause::as_workout_events)
            .collect()
    }

    pub fn reset(&mut self) {
        self.pauses.clear();
    }
}
