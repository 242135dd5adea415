//! Validate command for auditing imported pause markers.
//!
//! This module implements `stride validate`, which runs the pause validator
//! over a batch of imported workouts and reports which marker sequences were
//! accepted and which were dropped.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::TimeDelta;
use serde::Serialize;
use stride_core::{ImportedWorkout, PauseInterval, ValidatedWorkout, validate_batch};

use super::replay::format_duration;

/// Validation result for display.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationEntry {
    pub id: String,
    pub pauses: Vec<PauseInterval>,
    pub pause_duration_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<String>,
}

impl From<ValidatedWorkout> for ValidationEntry {
    fn from(workout: ValidatedWorkout) -> Self {
        let pause_duration = workout
            .pauses
            .iter()
            .map(PauseInterval::duration)
            .fold(TimeDelta::zero(), |acc, d| acc + d);
        Self {
            id: workout.id,
            pause_duration_ms: pause_duration.num_milliseconds(),
            pauses: workout.pauses,
            rejection: workout.rejection.map(|r| r.to_string()),
        }
    }
}

/// Parses a JSON array of imported workouts.
pub fn parse_workouts(content: &str) -> Result<Vec<ImportedWorkout>> {
    serde_json::from_str(content).context("invalid workout list")
}

/// Formats validation results as one line per workout.
pub fn format_entries(entries: &[ValidationEntry]) -> String {
    let width = entries.iter().map(|e| e.id.len()).max().unwrap_or(0);
    let mut output = String::new();
    for entry in entries {
        let line = match &entry.rejection {
            None => {
                let count = entry.pauses.len();
                let noun = if count == 1 { "pause" } else { "pauses" };
                format!(
                    "ok        {count} {noun}, {} paused",
                    format_duration(entry.pause_duration_ms)
                )
            }
            Some(reason) => format!("rejected  {reason}"),
        };
        output.push_str(&format!("{:<width$}  {line}\n", entry.id));
    }
    output
}

pub fn run(markers_path: &Path, json: bool) -> Result<()> {
    let content = std::fs::read_to_string(markers_path)
        .with_context(|| format!("failed to read {}", markers_path.display()))?;
    let workouts = parse_workouts(&content)?;

    let entries: Vec<ValidationEntry> = validate_batch(&workouts)
        .into_iter()
        .map(ValidationEntry::from)
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        print!("{}", format_entries(&entries));
    }

    Ok(())
}
