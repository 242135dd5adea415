//! Final, audited workout records.
//!
//! Live values are estimates over partial data. When a session ends, the
//! complete series is run through the batch algorithms once more and the
//! result is what gets persisted.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::elevation::{ElevationChange, smooth_elevation, smooth_samples};
use crate::marker::RawEventMarker;
use crate::metrics::{HeartRateSummary, MetricsSettings, energy_kcal, heart_rate_summary};
use crate::pause::{PauseInterval, PauseKind};
use crate::snapshot::SessionSnapshot;
use crate::status::RecordingStatus;
use crate::timeline::Timeline;
use crate::types::ActivityType;
use crate::validate::validate_pauses;

/// A validated workout ready for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    pub id: Uuid,
    pub activity_type: ActivityType,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub pauses: Vec<PauseInterval>,
    /// Why the pause markers were dropped, if they were.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_rejection: Option<String>,
    pub active_duration_ms: i64,
    pub pause_duration_ms: i64,
    pub distance_m: f64,
    pub elevation: ElevationChange,
    pub energy_kcal: f64,
    pub steps: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<HeartRateSummary>,
}

impl WorkoutRecord {
    /// Builds the record from a finished snapshot.
    ///
    /// The pause markers are audited by the validator; a rejected sequence
    /// leaves the record with no pauses rather than a partial set.
    pub fn from_snapshot(snapshot: &SessionSnapshot, settings: &MetricsSettings) -> Self {
        let start = snapshot.start;
        let end = snapshot.effective_end();

        let markers = pause_markers(snapshot, start, end);
        let (pauses, pause_rejection) = match validate_pauses(&markers, start, end) {
            Ok(pauses) => (pauses, None),
            Err(rejection) => {
                tracing::warn!(workout = %snapshot.id, %rejection, "discarding recorded pauses");
                (Vec::new(), Some(rejection.to_string()))
            }
        };

        let pause_duration = pauses
            .iter()
            .map(PauseInterval::duration)
            .fold(TimeDelta::zero(), |acc, d| acc + d);
        let active_duration = ((end - start) - pause_duration).max(TimeDelta::zero());

        let elevation = if snapshot.altitudes.is_empty() {
            let altitudes: Vec<f64> = snapshot.locations.iter().map(|l| l.altitude).collect();
            smooth_elevation(&altitudes)
        } else {
            smooth_samples(&snapshot.altitudes)
        };

        let audited = Timeline {
            status: RecordingStatus::Ready,
            start: Some(start),
            end: Some(end),
            pauses: pauses.clone(),
            open_pause: None,
            auto_pauses: Vec::new(),
        };

        Self {
            id: snapshot.id,
            activity_type: snapshot.activity_type,
            start,
            end,
            pause_rejection,
            active_duration_ms: active_duration.num_milliseconds(),
            pause_duration_ms: pause_duration.num_milliseconds(),
            distance_m: snapshot.distance_m,
            elevation,
            energy_kcal: energy_kcal(
                snapshot.distance_m,
                snapshot.activity_type,
                settings.body_weight,
            ),
            steps: snapshot.steps,
            heart_rate: heart_rate_summary(&audited, &snapshot.heart_rates, end),
            pauses,
        }
    }
}

/// Marker sequence for the snapshot's pauses.
///
/// Motion-detected intervals only contribute the parts not already covered
/// by a status pause, clamped to the session, so the two sources never
/// describe the same time twice.
fn pause_markers(
    snapshot: &SessionSnapshot,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<RawEventMarker> {
    let mut intervals: Vec<PauseInterval> = snapshot.pauses.clone();

    for detected in &snapshot.auto_pauses {
        let mut fragments = vec![(detected.start().max(start), detected.end().min(end))];
        for covered in &snapshot.pauses {
            fragments = fragments
                .into_iter()
                .flat_map(|(from, to)| subtract(from, to, covered.start(), covered.end()))
                .collect();
        }
        intervals.extend(
            fragments
                .into_iter()
                .filter_map(|(from, to)| PauseInterval::new(from, to, PauseKind::Automatic)),
        );
    }

    intervals.sort_by_key(PauseInterval::start);
    intervals.iter().flat_map(RawEventMarker::pair_for).collect()
}

/// `[from, to]` minus `[cut_from, cut_to]`, as zero, one or two pieces.
fn subtract(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    cut_from: DateTime<Utc>,
    cut_to: DateTime<Utc>,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    if cut_to <= from || cut_from >= to {
        return vec![(from, to)];
    }
    let mut pieces = Vec::with_capacity(2);
    if cut_from > from {
        pieces.push((from, cut_from));
    }
    if cut_to < to {
        pieces.push((cut_to, to));
    }
    pieces
}
