//! Replay command for driving a session from a recorded trace.
//!
//! This module implements `stride replay`, which feeds every trace line to a
//! fresh recording session on a manual clock and reports each recording the
//! session finishes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use stride_core::metrics::{average_speed, pace, speed_measurement};
use stride_core::{MetricsSettings, SessionSnapshot, UnitSystem, WorkoutRecord};
use stride_session::{
    Clock, CompletionOutcome, ManualClock, RecordingSession, Scheduler, SessionCompletionHandler,
    SessionConfig, SessionHandle, SessionInput, SnapshotSink,
};

/// One line of a replay trace.
#[derive(Debug, Clone, Deserialize)]
pub struct TraceLine {
    /// When the input arrives.
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub input: SessionInput,
}

/// Parses a JSONL trace. Blank lines are skipped.
pub fn parse_trace(content: &str) -> Result<Vec<TraceLine>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("invalid trace entry on line {}", idx + 1))
        })
        .collect()
}

/// Writes finished workouts as `<id>.json` when a directory was given.
#[derive(Debug)]
struct DirectorySink {
    dir: Option<PathBuf>,
}

impl SnapshotSink for DirectorySink {
    fn save(
        &self,
        _snapshot: &SessionSnapshot,
        record: &WorkoutRecord,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(dir.join(format!("{}.json", record.id)), json)?;
        Ok(())
    }
}

/// Feeds `trace` to a new session and returns every workout it finished.
pub async fn replay(
    config: &SessionConfig,
    trace: &[TraceLine],
    sink: Arc<dyn SnapshotSink>,
) -> Result<Vec<WorkoutRecord>> {
    let Some(first) = trace.first() else {
        return Ok(Vec::new());
    };

    let settings = config.metrics_settings()?;
    let clock = Arc::new(ManualClock::new(first.at));
    let scheduler = Arc::new(Scheduler::new());
    let session = RecordingSession::new(config, Arc::clone(&clock) as Arc<dyn Clock>, scheduler)?;
    let (handle, outputs) = session.spawn();
    let mut finished = outputs.finished_snapshots();

    let mut records = Vec::new();
    for line in trace {
        clock.set(line.at);
        handle.send(line.input.clone())?;
        handle.flush().await?;
        while let Ok(snapshot) = finished.try_recv() {
            records.push(save(snapshot, &handle, &sink, settings)?);
        }
    }

    let status = *outputs.status.borrow();
    if status.is_active() {
        tracing::warn!(%status, "trace ended during a recording; it is not reported");
    }
    Ok(records)
}

fn save(
    snapshot: Arc<SessionSnapshot>,
    handle: &SessionHandle,
    sink: &Arc<dyn SnapshotSink>,
    settings: MetricsSettings,
) -> Result<WorkoutRecord> {
    let handler =
        SessionCompletionHandler::new(snapshot, handle.downgrade(), Arc::clone(sink), settings);
    match handler.save()? {
        CompletionOutcome::Saved(record) => Ok(*record),
        other => bail!("unexpected completion outcome: {other:?}"),
    }
}

/// Formats a duration in milliseconds as `h:mm:ss`.
pub fn format_duration(ms: i64) -> String {
    let total = ms.max(0) / 1_000;
    format!("{}:{:02}:{:02}", total / 3_600, total / 60 % 60, total % 60)
}

/// Formats one workout for terminal output.
pub fn format_record(record: &WorkoutRecord, units: UnitSystem) -> String {
    let row = |label: &str, value: String| format!("  {label:<10}{value}");
    let mut lines = vec![format!("{} ({})", record.id, record.activity_type)];

    lines.push(row("start", record.start.format("%Y-%m-%d %H:%M:%S UTC").to_string()));
    lines.push(row("end", record.end.format("%Y-%m-%d %H:%M:%S UTC").to_string()));
    lines.push(row("active", format_duration(record.active_duration_ms)));

    let count = record.pauses.len();
    let noun = if count == 1 { "pause" } else { "pauses" };
    lines.push(row(
        "paused",
        format!("{} ({count} {noun})", format_duration(record.pause_duration_ms)),
    ));
    if let Some(reason) = &record.pause_rejection {
        lines.push(row("warning", format!("pauses discarded: {reason}")));
    }

    lines.push(row(
        "distance",
        format!(
            "{:.2} {}",
            units.distance(record.distance_m),
            units.distance_unit().symbol()
        ),
    ));
    let average = average_speed(
        record.distance_m,
        TimeDelta::milliseconds(record.active_duration_ms),
    );
    if let Some(average_pace) = average.and_then(|speed| pace(speed, units)) {
        lines.push(row("pace", average_pace.to_string()));
    }
    if let Some(speed) = average.and_then(|speed| speed_measurement(speed, units)) {
        lines.push(row("speed", speed.to_string()));
    }
    lines.push(row(
        "elevation",
        format!(
            "+{:.0} m / -{:.0} m",
            record.elevation.ascending, record.elevation.descending
        ),
    ));
    lines.push(row("energy", format!("{:.0} kcal", record.energy_kcal)));
    lines.push(row("steps", record.steps.to_string()));
    if let Some(hr) = record.heart_rate {
        lines.push(row(
            "heart",
            format!("{:.0} avg / {:.0} max bpm", hr.average_bpm, hr.max_bpm),
        ));
    }

    let mut output = lines.join("\n");
    output.push('\n');
    output
}

pub fn run(
    config_path: Option<&Path>,
    trace_path: &Path,
    json: bool,
    out: Option<PathBuf>,
) -> Result<()> {
    let config = SessionConfig::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let content = std::fs::read_to_string(trace_path)
        .with_context(|| format!("failed to read {}", trace_path.display()))?;
    let trace = parse_trace(&content)?;

    if let Some(dir) = &out {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let sink: Arc<dyn SnapshotSink> = Arc::new(DirectorySink { dir: out });

    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    let records = runtime.block_on(replay(&config, &trace, sink))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else if records.is_empty() {
        println!("No finished recordings in trace.");
    } else {
        let blocks: Vec<String> = records
            .iter()
            .map(|record| format_record(record, config.unit_system))
            .collect();
        print!("{}", blocks.join("\n"));
    }

    Ok(())
}
