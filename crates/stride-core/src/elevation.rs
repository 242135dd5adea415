//! Elevation gain/loss from noisy altitude readings.

use serde::{Deserialize, Serialize};

use crate::types::AltitudeSample;

/// Samples on each side of the centre sample in the moving average.
const WINDOW_HALF_WIDTH: usize = 5;

/// Smallest change, in altitude units, that counts as climbing or descending.
const NOISE_THRESHOLD: f64 = 1.5;

/// Total ascent and descent, both non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ElevationChange {
    pub ascending: f64,
    pub descending: f64,
}

/// Computes total ascent and descent from an ordered altitude series.
///
/// Each value is replaced by the mean of its clamped `[i-5, i+5]` window. A
/// smoothed value only counts once it differs from the last counted value by
/// at least the noise threshold; smaller moves are dropped entirely rather
/// than carried forward.
pub fn smooth_elevation(altitudes: &[f64]) -> ElevationChange {
    let mut change = ElevationChange::default();
    let mut smoothed = (0..altitudes.len()).map(|i| window_mean(altitudes, i));

    let Some(mut last_considered) = smoothed.next() else {
        return change;
    };

    for value in smoothed {
        let delta = value - last_considered;
        if delta.abs() < NOISE_THRESHOLD {
            continue;
        }
        if delta > 0.0 {
            change.ascending += delta;
        } else {
            change.descending += -delta;
        }
        last_considered = value;
    }

    change
}

/// Like [`smooth_elevation`], ordering the samples by timestamp first.
pub fn smooth_samples(samples: &[AltitudeSample]) -> ElevationChange {
    let mut ordered = samples.to_vec();
    ordered.sort_by_key(|s| s.timestamp);
    let altitudes: Vec<f64> = ordered.iter().map(|s| s.altitude).collect();
    smooth_elevation(&altitudes)
}

#[expect(
    clippy::cast_precision_loss,
    reason = "window length is at most 11"
)]
fn window_mean(values: &[f64], center: usize) -> f64 {
    let from = center.saturating_sub(WINDOW_HALF_WIDTH);
    let to = (center + WINDOW_HALF_WIDTH).min(values.len() - 1);
    let window = &values[from..=to];
    window.iter().sum::<f64>() / window.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    fn ts(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0)
            .single()
            .expect("valid test timestamp")
            + TimeDelta::seconds(seconds)
    }

    #[test]
    fn empty_and_single_sample() {
        assert_eq!(smooth_elevation(&[]), ElevationChange::default());
        assert_eq!(smooth_elevation(&[120.0]), ElevationChange::default());
    }

    #[test]
    fn flat_profile_has_no_change() {
        for len in [2, 7, 50, 500] {
            let flat = vec![312.5; len];
            assert_eq!(smooth_elevation(&flat), ElevationChange::default());
        }
    }

    #[test]
    fn steady_climb_accumulates_ascent() {
        let altitudes: Vec<f64> = (0..200_i32).map(|i| f64::from(i) * 0.1).collect();
        let change = smooth_elevation(&altitudes);

        // The smoothed series spans 0.25..19.65 and the latch can leave up
        // to one threshold uncounted at the top.
        assert!(change.ascending > 17.5, "ascending = {}", change.ascending);
        assert!(change.ascending <= 20.0, "ascending = {}", change.ascending);
        assert!(change.descending.abs() < f64::EPSILON);
    }

    #[test]
    fn jitter_below_threshold_is_ignored() {
        let altitudes: Vec<f64> = (0..100)
            .map(|i| if i % 2 == 0 { 100.0 } else { 101.0 })
            .collect();
        assert_eq!(smooth_elevation(&altitudes), ElevationChange::default());
    }

    #[test]
    fn climb_then_descent() {
        let mut altitudes: Vec<f64> = (0..50_i32).map(f64::from).collect();
        altitudes.extend((0..50_i32).map(|i| 49.0 - f64::from(i)));
        let change = smooth_elevation(&altitudes);

        assert!(change.ascending > 40.0, "ascending = {}", change.ascending);
        assert!(change.descending > 40.0, "descending = {}", change.descending);
    }

    #[test]
    fn samples_are_ordered_by_time() {
        let samples: Vec<AltitudeSample> = (0..40_i32)
            .rev()
            .map(|i| AltitudeSample {
                timestamp: ts(i64::from(i)),
                altitude: f64::from(i),
            })
            .collect();
        let change = smooth_samples(&samples);
        assert!(change.ascending > 30.0);
        assert!(change.descending.abs() < f64::EPSILON);
    }
}
