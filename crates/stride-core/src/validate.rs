//! Pause sequence validation.
//!
//! Turns a time-ordered list of raw pause/resume markers into validated
//! [`PauseInterval`]s, or rejects the whole list.
//!
//! # Algorithm
//!
//! Every rule sees the whole list, laps and segments included:
//!
//! 1. Every marker must lie within `[session_start, session_end]`
//! 2. The first marker must open a pause
//! 3. There must be at least as many pause starts as resumes
//! 4. Each pause start pairs with the *next* marker when it is the matching
//!    resume; a start that is the last marker closes at `session_end`;
//!    anything else rejects, as does any marker no start claimed
//! 5. No accepted interval may duplicate or overlap an earlier one
//!
//! The pairing is positional and greedy, so the marker order decides which
//! ambiguous sequences pass.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::marker::{MarkerKind, RawEventMarker};
use crate::pause::PauseInterval;

/// Why a marker sequence was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PauseRejection {
    /// A marker lies outside the session.
    #[error("{kind} marker at {timestamp} lies outside the session")]
    OutOfBounds {
        timestamp: DateTime<Utc>,
        kind: MarkerKind,
    },

    /// The sequence begins with something other than a pause start.
    #[error("sequence starts with {kind} at {timestamp} instead of a pause start")]
    StartsWithoutPause {
        timestamp: DateTime<Utc>,
        kind: MarkerKind,
    },

    /// More resumes than pause starts.
    #[error("{resumes} resumes but only {starts} pause starts")]
    UnmatchedResume { starts: usize, resumes: usize },

    /// A pause start is followed by something other than its matching resume.
    #[error("{kind} at {timestamp} is followed by {next} at {next_timestamp}")]
    UnpairedStart {
        timestamp: DateTime<Utc>,
        kind: MarkerKind,
        next: MarkerKind,
        next_timestamp: DateTime<Utc>,
    },

    /// A resume that no pause start claimed.
    #[error("{kind} at {timestamp} does not close any pause")]
    StrayResume {
        timestamp: DateTime<Utc>,
        kind: MarkerKind,
    },

    /// A lap, segment or other non-pause marker outside any pause pairing.
    #[error("unexpected {kind} marker at {timestamp} in a pause sequence")]
    StrayMarker {
        timestamp: DateTime<Utc>,
        kind: MarkerKind,
    },

    /// A resume earlier than the pause start it closes.
    #[error("pause starting at {start} resumes earlier, at {end}")]
    OutOfOrder {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Two intervals are identical or overlap.
    #[error("pause {start}..{end} overlaps an earlier pause")]
    Overlap {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Validates a marker sequence against its session bounds.
///
/// Any failure rejects the entire list; callers never receive a partial set.
pub fn validate_pauses(
    markers: &[RawEventMarker],
    session_start: DateTime<Utc>,
    session_end: DateTime<Utc>,
) -> Result<Vec<PauseInterval>, PauseRejection> {
    if let Some(outside) = markers
        .iter()
        .find(|m| m.timestamp < session_start || m.timestamp > session_end)
    {
        return Err(PauseRejection::OutOfBounds {
            timestamp: outside.timestamp,
            kind: outside.kind,
        });
    }

    if let Some(first) = markers.first() {
        if !first.kind.is_pause_start() {
            return Err(PauseRejection::StartsWithoutPause {
                timestamp: first.timestamp,
                kind: first.kind,
            });
        }
    }

    let starts = markers.iter().filter(|m| m.kind.is_pause_start()).count();
    let resumes = markers.iter().filter(|m| m.kind.is_resume()).count();
    if starts < resumes {
        return Err(PauseRejection::UnmatchedResume { starts, resumes });
    }

    let mut accepted: Vec<PauseInterval> = Vec::with_capacity(starts);
    let mut i = 0;
    while i < markers.len() {
        let marker = &markers[i];
        let Some(kind) = marker.kind.opens() else {
            let (timestamp, kind) = (marker.timestamp, marker.kind);
            return Err(if kind.is_resume() {
                PauseRejection::StrayResume { timestamp, kind }
            } else {
                PauseRejection::StrayMarker { timestamp, kind }
            });
        };

        let (end, consumed) = match markers.get(i + 1) {
            Some(next) if next.kind.closes() == Some(kind) => (next.timestamp, 2),
            Some(next) => {
                return Err(PauseRejection::UnpairedStart {
                    timestamp: marker.timestamp,
                    kind: marker.kind,
                    next: next.kind,
                    next_timestamp: next.timestamp,
                });
            }
            None => (session_end, 1),
        };
        i += consumed;

        if end < marker.timestamp {
            return Err(PauseRejection::OutOfOrder {
                start: marker.timestamp,
                end,
            });
        }

        // A zero-length pair carries no paused time.
        let Some(interval) = PauseInterval::new(marker.timestamp, end, kind) else {
            continue;
        };

        if accepted
            .iter()
            .any(|earlier| *earlier == interval || earlier.overlaps(&interval))
        {
            return Err(PauseRejection::Overlap {
                start: interval.start(),
                end: interval.end(),
            });
        }
        accepted.push(interval);
    }

    Ok(accepted)
}

/// A workout whose pause markers come from storage or an import, not from a
/// live session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportedWorkout {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub markers: Vec<RawEventMarker>,
}

/// The outcome of validating one imported workout.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedWorkout {
    pub id: String,
    /// Empty when the markers were rejected.
    pub pauses: Vec<PauseInterval>,
    pub rejection: Option<PauseRejection>,
}

/// Validates many imported workouts in parallel.
///
/// A rejected workout keeps its place in the output with no pauses.
pub fn validate_batch(workouts: &[ImportedWorkout]) -> Vec<ValidatedWorkout> {
    workouts
        .par_iter()
        .map(|workout| match validate_pauses(&workout.markers, workout.start, workout.end) {
            Ok(pauses) => ValidatedWorkout {
                id: workout.id.clone(),
                pauses,
                rejection: None,
            },
            Err(rejection) => {
                tracing::warn!(workout = %workout.id, %rejection, "dropping pause markers");
                ValidatedWorkout {
                    id: workout.id.clone(),
                    pauses: Vec::new(),
                    rejection: Some(rejection),
                }
            }
        })
        .collect()
}
