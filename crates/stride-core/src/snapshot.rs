//! Immutable captures of a recording session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auto_pause::AutoPause;
use crate::pause::PauseInterval;
use crate::timeline::Timeline;
use crate::types::{ActivityType, AltitudeSample, HeartRateSample, LocationSample};

/// Everything one recording produced, detached from the session.
///
/// Holds no reference back to the session, so it outlives a session that has
/// already been reset for the next recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub activity_type: ActivityType,
    pub start: DateTime<Utc>,
    /// `None` only for captures taken while still live.
    pub end: Option<DateTime<Utc>>,
    pub pauses: Vec<PauseInterval>,
    #[serde(default)]
    pub auto_pauses: Vec<AutoPause>,
    pub distance_m: f64,
    pub steps: u64,
    #[serde(default)]
    pub locations: Vec<LocationSample>,
    #[serde(default)]
    pub altitudes: Vec<AltitudeSample>,
    #[serde(default)]
    pub heart_rates: Vec<HeartRateSample>,
}

impl SessionSnapshot {
    /// The recorded end, or the latest sample time for live captures.
    #[must_use]
    pub fn effective_end(&self) -> DateTime<Utc> {
        if let Some(end) = self.end {
            return end;
        }
        let latest = self
            .locations
            .iter()
            .map(|s| s.timestamp)
            .chain(self.altitudes.iter().map(|s| s.timestamp))
            .chain(self.heart_rates.iter().map(|s| s.timestamp))
            .chain(self.pauses.iter().map(PauseInterval::end))
            .max();
        latest.map_or(self.start, |at| at.max(self.start))
    }

    /// The temporal part of the snapshot, for continuing or measuring it.
    #[must_use]
    pub fn timeline(&self) -> Timeline {
        Timeline {
            status: crate::status::RecordingStatus::Ready,
            start: Some(self.start),
            end: Some(self.effective_end()),
            pauses: self.pauses.clone(),
            open_pause: None,
            auto_pauses: self.auto_pauses.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn ts(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0)
            .single()
            .expect("valid test timestamp")
            + TimeDelta::seconds(seconds)
    }

    fn snapshot(end: Option<DateTime<Utc>>) -> SessionSnapshot {
        SessionSnapshot {
            id: Uuid::new_v4(),
            activity_type: ActivityType::Running,
            start: ts(0),
            end,
            pauses: Vec::new(),
            auto_pauses: Vec::new(),
            distance_m: 0.0,
            steps: 0,
            locations: Vec::new(),
            altitudes: vec![AltitudeSample {
                timestamp: ts(42),
                altitude: 10.0,
            }],
            heart_rates: Vec::new(),
        }
    }

    #[test]
    fn effective_end_prefers_recorded_end() {
        assert_eq!(snapshot(Some(ts(60))).effective_end(), ts(60));
    }

    #[test]
    fn effective_end_falls_back_to_latest_sample() {
        assert_eq!(snapshot(None).effective_end(), ts(42));
    }

    #[test]
    fn serde_roundtrip_keeps_identity() {
        let original = snapshot(Some(ts(60)));
        let json = serde_json::to_string(&original).unwrap();
        let parsed: SessionSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, original);
    }
}
