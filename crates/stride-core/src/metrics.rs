//! Live metric calculations.
//!
//! Everything here is a read-only derivation over a [`Timeline`] and the
//! recorded samples. Nothing mutates its inputs, so the functions can run on
//! any published snapshot while new samples keep arriving elsewhere.

use std::ops::RangeInclusive;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::timeline::Timeline;
use crate::types::{
    ActivityType, BodyWeight, HeartRateSample, LocationSample, RelativeMeasurement, Unit,
    UnitSystem,
};

/// Distance covered by the rolling speed window, in meters.
pub const ROLLING_WINDOW_M: f64 = 1_000.0;

/// Instantaneous speed samples averaged when rolling speed is off.
pub const RECENT_SPEED_SAMPLES: usize = 3;

const METERS_PER_KILOMETER: f64 = 1_000.0;
const METERS_PER_MILE: f64 = 1_609.344;

/// User preferences that shape the derived values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSettings {
    pub activity_type: ActivityType,
    pub unit_system: UnitSystem,
    pub body_weight: BodyWeight,
    pub rolling_speed: bool,
}

/// A time span with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Span {
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

/// Average and peak heart rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeartRateSummary {
    pub average_bpm: f64,
    pub max_bpm: f64,
}

/// All live values derived at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveMetrics {
    pub active_duration: TimeDelta,
    pub pause_duration: TimeDelta,
    pub distance_m: f64,
    /// Distance in the preferred unit.
    pub distance: f64,
    /// m/s, rolling or recent depending on preference.
    pub current_speed: Option<f64>,
    /// m/s over the active duration.
    pub average_speed: Option<f64>,
    pub current_pace: Option<RelativeMeasurement>,
    pub average_pace: Option<RelativeMeasurement>,
    pub energy_kcal: f64,
    pub heart_rate: Option<HeartRateSummary>,
}

/// The end of the measured range: the session end, or `now` while live.
fn until(timeline: &Timeline, now: DateTime<Utc>) -> DateTime<Utc> {
    timeline.end.unwrap_or(now)
}

/// Every pause range (manual, automatic, open, motion-detected) clamped to
/// the session and merged into sorted, disjoint spans.
pub fn pause_spans(timeline: &Timeline, now: DateTime<Utc>) -> Vec<Span> {
    let Some(start) = timeline.start else {
        return Vec::new();
    };
    let end = until(timeline, now);

    let closed = timeline.pauses.iter().map(|p| (p.start(), p.end()));
    let open = timeline.open_pause.iter().map(|p| (p.since, end));
    let detected = timeline.auto_pauses.iter().map(|p| (p.start(), p.end()));

    let mut spans: Vec<Span> = closed
        .chain(open)
        .chain(detected)
        .map(|(s, e)| Span {
            start: s.max(start),
            end: e.min(end),
        })
        .filter(|span| span.end > span.start)
        .collect();
    spans.sort_by_key(|span| span.start);

    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        if let Some(last) = merged.last_mut() {
            if span.start <= last.end {
                last.end = last.end.max(span.end);
                continue;
            }
        }
        merged.push(span);
    }
    merged
}

/// Total paused time inside the session.
pub fn pause_duration(timeline: &Timeline, now: DateTime<Utc>) -> TimeDelta {
    pause_spans(timeline, now)
        .iter()
        .map(Span::duration)
        .fold(TimeDelta::zero(), |acc, d| acc + d)
}

/// Elapsed time since start, minus every pause.
pub fn active_duration(timeline: &Timeline, now: DateTime<Utc>) -> TimeDelta {
    let Some(start) = timeline.start else {
        return TimeDelta::zero();
    };
    let elapsed = until(timeline, now) - start;
    (elapsed - pause_duration(timeline, now)).max(TimeDelta::zero())
}

#[expect(
    clippy::cast_precision_loss,
    reason = "millisecond offsets within a workout fit in f64"
)]
fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1_000.0
}

/// Pause ranges as signed seconds from the session start.
fn pause_offsets(timeline: &Timeline, now: DateTime<Utc>) -> Vec<RangeInclusive<f64>> {
    let Some(start) = timeline.start else {
        return Vec::new();
    };
    let end = until(timeline, now);

    let mut ranges: Vec<RangeInclusive<f64>> = timeline
        .pauses
        .iter()
        .map(|p| seconds_between(start, p.start())..=seconds_between(start, p.end()))
        .collect();
    if let Some(open) = timeline.open_pause {
        ranges.push(seconds_between(start, open.since)..=seconds_between(start, end));
    }
    ranges.extend(timeline.auto_pauses.iter().map(|p| p.as_range(start)));
    ranges
}

/// Whether `at` falls inside any pause of the timeline.
pub fn is_paused_at(timeline: &Timeline, at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let Some(start) = timeline.start else {
        return false;
    };
    let offset = seconds_between(start, at);
    pause_offsets(timeline, now)
        .iter()
        .any(|range| range.contains(&offset))
}

/// Speed over the most recent ~1000 m of unpaused travel, in m/s.
///
/// Locations must be in time order. Walks backwards over samples outside any
/// pause, accumulating distance and time between neighbours until the window
/// is covered or the samples run out.
pub fn rolling_speed(
    timeline: &Timeline,
    locations: &[LocationSample],
    now: DateTime<Utc>,
) -> Option<f64> {
    let start = timeline.start?;
    let paused = pause_offsets(timeline, now);
    let active: Vec<&LocationSample> = locations
        .iter()
        .rev()
        .filter(|sample| {
            let offset = seconds_between(start, sample.timestamp);
            !paused.iter().any(|range| range.contains(&offset))
        })
        .collect();

    let mut distance = 0.0;
    let mut seconds = 0.0;
    for pair in active.windows(2) {
        let (newer, older) = (pair[0], pair[1]);
        distance += older.distance_to(newer);
        seconds += seconds_between(older.timestamp, newer.timestamp);
        if distance >= ROLLING_WINDOW_M {
            break;
        }
    }

    (seconds > 0.0).then(|| distance / seconds)
}

/// Mean of the last three positive instantaneous speeds, in m/s.
#[expect(
    clippy::cast_precision_loss,
    reason = "at most three samples"
)]
pub fn recent_speed(locations: &[LocationSample]) -> Option<f64> {
    let recent: Vec<f64> = locations
        .iter()
        .rev()
        .map(|sample| sample.speed)
        .filter(|speed| *speed > 0.0)
        .take(RECENT_SPEED_SAMPLES)
        .collect();
    if recent.is_empty() {
        return None;
    }
    Some(recent.iter().sum::<f64>() / recent.len() as f64)
}

/// Current speed honouring the rolling-speed preference.
pub fn current_speed(
    timeline: &Timeline,
    locations: &[LocationSample],
    rolling: bool,
    now: DateTime<Utc>,
) -> Option<f64> {
    if rolling {
        rolling_speed(timeline, locations, now)
    } else {
        recent_speed(locations)
    }
}

/// Whole-session average over active time, in m/s.
pub fn average_speed(distance_m: f64, active: TimeDelta) -> Option<f64> {
    #[expect(
        clippy::cast_precision_loss,
        reason = "workout durations in ms fit in f64"
    )]
    let seconds = active.num_milliseconds() as f64 / 1_000.0;
    (seconds > 0.0).then(|| distance_m / seconds)
}

/// Minutes per kilometer or per mile for a speed in m/s.
pub fn pace(speed_mps: f64, units: UnitSystem) -> Option<RelativeMeasurement> {
    if !speed_mps.is_finite() || speed_mps <= 0.0 {
        return None;
    }
    let (meters, denominator) = match units {
        UnitSystem::Metric => (METERS_PER_KILOMETER, Unit::Kilometer),
        UnitSystem::Imperial => (METERS_PER_MILE, Unit::Mile),
    };
    Some(RelativeMeasurement {
        value: meters / speed_mps / 60.0,
        numerator: Unit::Minute,
        denominator,
    })
}

/// Speed in km/h or mph, for display.
pub fn speed_measurement(speed_mps: f64, units: UnitSystem) -> Option<RelativeMeasurement> {
    if !speed_mps.is_finite() || speed_mps <= 0.0 {
        return None;
    }
    Some(RelativeMeasurement {
        value: units.speed(speed_mps),
        numerator: units.distance_unit(),
        denominator: Unit::Hour,
    })
}

/// Distance-based energy estimate in kilocalories.
///
/// Linear in distance and weight; elapsed time plays no part.
pub fn energy_kcal(distance_m: f64, activity: ActivityType, weight: BodyWeight) -> f64 {
    distance_m / METERS_PER_KILOMETER * activity.met_multiplier() * weight.kilograms()
}

/// Average and peak over heart-rate samples taken outside pauses.
#[expect(
    clippy::cast_precision_loss,
    reason = "sample counts fit in f64"
)]
pub fn heart_rate_summary(
    timeline: &Timeline,
    samples: &[HeartRateSample],
    now: DateTime<Utc>,
) -> Option<HeartRateSummary> {
    let spans = pause_spans(timeline, now);
    let active: Vec<f64> = samples
        .iter()
        .filter(|s| !spans.iter().any(|span| span.contains(s.timestamp)))
        .map(|s| s.bpm)
        .filter(|bpm| bpm.is_finite() && *bpm > 0.0)
        .collect();
    if active.is_empty() {
        return None;
    }
    Some(HeartRateSummary {
        average_bpm: active.iter().sum::<f64>() / active.len() as f64,
        max_bpm: active.iter().copied().fold(f64::MIN, f64::max),
    })
}

/// Computes every live value at `now`.
pub fn live_metrics(
    timeline: &Timeline,
    distance_m: f64,
    locations: &[LocationSample],
    heart_rates: &[HeartRateSample],
    settings: &MetricsSettings,
    now: DateTime<Utc>,
) -> LiveMetrics {
    let active = active_duration(timeline, now);
    let current = current_speed(timeline, locations, settings.rolling_speed, now);
    let average = average_speed(distance_m, active);

    LiveMetrics {
        active_duration: active,
        pause_duration: pause_duration(timeline, now),
        distance_m,
        distance: settings.unit_system.distance(distance_m),
        current_speed: current,
        average_speed: average,
        current_pace: current.and_then(|s| pace(s, settings.unit_system)),
        average_pace: average.and_then(|s| pace(s, settings.unit_system)),
        energy_kcal: energy_kcal(distance_m, settings.activity_type, settings.body_weight),
        heart_rate: heart_rate_summary(timeline, heart_rates, now),
    }
}
