//! Core domain logic for workout recording.
//!
//! This crate contains the fundamental types and logic for:
//! - Status machine: the recording lifecycle and its pause bookkeeping
//! - Validation: turning raw pause/resume markers into pause intervals
//! - Metrics: live durations, speed, pace, energy and heart rate
//! - Elevation: smoothed ascent and descent over noisy altitude series
//! - Records: the audited result of a finished session

pub mod auto_pause;
pub mod elevation;
pub mod machine;
pub mod marker;
pub mod metrics;
pub mod pause;
mod record;
mod snapshot;
pub mod status;
mod timeline;
pub mod types;
pub mod validate;

pub use auto_pause::{AutoPause, AutoPauseTracker};
pub use elevation::{ElevationChange, smooth_elevation, smooth_samples};
pub use machine::{StatusMachine, Transition};
pub use marker::{MarkerKind, RawEventMarker};
pub use metrics::{HeartRateSummary, LiveMetrics, MetricsSettings, live_metrics};
pub use pause::{PauseInterval, PauseKind};
pub use record::WorkoutRecord;
pub use snapshot::SessionSnapshot;
pub use status::RecordingStatus;
pub use timeline::{OpenPause, Timeline};
pub use types::{
    ActivityType, AltitudeSample, BodyWeight, Component, HeartRateSample, LocationSample,
    UnitSystem, ValidationError,
};
pub use validate::{
    ImportedWorkout, PauseRejection, ValidatedWorkout, validate_batch, validate_pauses,
};
