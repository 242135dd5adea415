//! The recording session orchestrator.
//!
//! A [`RecordingSession`] owns every piece of mutable recording state.
//! Producers talk to it through a [`SessionHandle`]; one driver task applies
//! their inputs in arrival order, so no two updates ever interleave.
//! Consumers read [`SessionOutputs`], which only ever expose whole published
//! values.

use std::collections::{BTreeMap, BTreeSet};
use std::mem;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stride_core::metrics::live_metrics;
use stride_core::{
    ActivityType, AltitudeSample, AutoPauseTracker, Component, HeartRateSample, LiveMetrics,
    LocationSample, MetricsSettings, PauseInterval, RecordingStatus, SessionSnapshot,
    StatusMachine, Timeline, Transition,
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::error::{ConfigError, SessionError};
use crate::scheduler::{AppLifecycle, Scheduler};

/// Buffered one-shot notifications per subscriber before the oldest drop.
const NOTIFICATION_CAPACITY: usize = 16;

/// A value pushed by a producer collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "input", rename_all = "snake_case")]
pub enum SessionInput {
    /// A component became ready or stopped being ready.
    ComponentReady { component: Component, ready: bool },
    /// A component lacks the permission it needs.
    InsufficientPermission { component: Component },
    /// A proposed status change, from the user or from motion detection.
    StatusSuggestion { status: RecordingStatus },
    /// Changes the activity type of a session that has not started.
    Activity { activity_type: ActivityType },
    /// Cumulative path length, as measured by the location producer.
    Distance { meters: f64 },
    /// Cumulative step count.
    Steps { count: u64 },
    Location(LocationSample),
    /// Historical fixes delivered in bulk.
    Locations { samples: Vec<LocationSample> },
    Altitude(AltitudeSample),
    HeartRate(HeartRateSample),
    /// A stationary interval found by motion detection.
    AutoPause {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl SessionInput {
    /// Whether this input carries recorded data rather than control.
    #[must_use]
    pub const fn is_sample(&self) -> bool {
        matches!(
            self,
            Self::Distance { .. }
                | Self::Steps { .. }
                | Self::Location(_)
                | Self::Locations { .. }
                | Self::Altitude(_)
                | Self::HeartRate(_)
                | Self::AutoPause { .. }
        )
    }
}

#[derive(Debug)]
enum Command {
    Input(SessionInput),
    Continue {
        snapshot: Arc<SessionSnapshot>,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Flush(oneshot::Sender<()>),
}

/// The input surface of a running session.
///
/// The session runs for as long as at least one handle exists.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl SessionHandle {
    /// Queues an input. Never blocks.
    pub fn send(&self, input: SessionInput) -> Result<(), SessionError> {
        self.commands
            .send(Command::Input(input))
            .map_err(|_| SessionError::Closed)
    }

    pub fn suggest_status(&self, status: RecordingStatus) -> Result<(), SessionError> {
        self.send(SessionInput::StatusSuggestion { status })
    }

    /// Re-opens a finished recording in this session.
    pub async fn continue_from(&self, snapshot: Arc<SessionSnapshot>) -> Result<(), SessionError> {
        let (reply, done) = oneshot::channel();
        self.commands
            .send(Command::Continue { snapshot, reply })
            .map_err(|_| SessionError::Closed)?;
        done.await.map_err(|_| SessionError::Closed)?
    }

    /// Waits until every input queued before this call has been applied.
    pub async fn flush(&self) -> Result<(), SessionError> {
        let (reply, done) = oneshot::channel();
        self.commands
            .send(Command::Flush(reply))
            .map_err(|_| SessionError::Closed)?;
        done.await.map_err(|_| SessionError::Closed)
    }

    /// A handle that does not keep the session alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakSessionHandle {
        WeakSessionHandle {
            commands: self.commands.downgrade(),
        }
    }
}

/// A non-owning reference to a session.
#[derive(Debug, Clone)]
pub struct WeakSessionHandle {
    commands: mpsc::WeakUnboundedSender<Command>,
}

impl WeakSessionHandle {
    /// `None` once every [`SessionHandle`] is gone.
    #[must_use]
    pub fn upgrade(&self) -> Option<SessionHandle> {
        self.commands
            .upgrade()
            .map(|commands| SessionHandle { commands })
    }
}

/// Everything a live metrics read needs, published as one value.
#[derive(Debug, Clone)]
struct MetricsFrame {
    timeline: Arc<Timeline>,
    activity_type: ActivityType,
    distance_m: f64,
    locations: Arc<[LocationSample]>,
    heart_rates: Arc<[HeartRateSample]>,
}

#[derive(Debug)]
struct Publisher {
    status: watch::Sender<RecordingStatus>,
    activity_type: watch::Sender<ActivityType>,
    start: watch::Sender<Option<DateTime<Utc>>>,
    end: watch::Sender<Option<DateTime<Utc>>>,
    distance_m: watch::Sender<f64>,
    steps: watch::Sender<u64>,
    pauses: watch::Sender<Arc<[PauseInterval]>>,
    locations: watch::Sender<Arc<[LocationSample]>>,
    altitudes: watch::Sender<Arc<[AltitudeSample]>>,
    heart_rates: watch::Sender<Arc<[HeartRateSample]>>,
    timeline: watch::Sender<Arc<Timeline>>,
    ui_suspended: watch::Sender<bool>,
    suspended: watch::Sender<bool>,
    frame: watch::Sender<Arc<MetricsFrame>>,
    permission: broadcast::Sender<Component>,
    finished: broadcast::Sender<Arc<SessionSnapshot>>,
    reset: broadcast::Sender<Option<Arc<SessionSnapshot>>>,
}

/// Replaces a watched value, waking readers only if it changed.
fn replace<T: PartialEq>(sender: &watch::Sender<T>, value: T) {
    sender.send_if_modified(|current| {
        if *current == value {
            false
        } else {
            *current = value;
            true
        }
    });
}

impl Publisher {
    fn new(activity_type: ActivityType) -> Self {
        let frame = MetricsFrame {
            timeline: Arc::new(Timeline::default()),
            activity_type,
            distance_m: 0.0,
            locations: Arc::from([]),
            heart_rates: Arc::from([]),
        };
        Self {
            status: watch::channel(RecordingStatus::Waiting).0,
            activity_type: watch::channel(activity_type).0,
            start: watch::channel(None).0,
            end: watch::channel(None).0,
            distance_m: watch::channel(0.0).0,
            steps: watch::channel(0).0,
            pauses: watch::channel(Arc::from([])).0,
            locations: watch::channel(Arc::from([])).0,
            altitudes: watch::channel(Arc::from([])).0,
            heart_rates: watch::channel(Arc::from([])).0,
            timeline: watch::channel(Arc::new(Timeline::default())).0,
            ui_suspended: watch::channel(false).0,
            suspended: watch::channel(false).0,
            frame: watch::channel(Arc::new(frame)).0,
            permission: broadcast::channel(NOTIFICATION_CAPACITY).0,
            finished: broadcast::channel(NOTIFICATION_CAPACITY).0,
            reset: broadcast::channel(NOTIFICATION_CAPACITY).0,
        }
    }
}

/// The output surface of a session.
///
/// Every `watch` receiver replays its latest value to new readers. One-shot
/// events are subscribed to through the methods; a subscriber only sees
/// events sent after it subscribed.
#[derive(Debug, Clone)]
pub struct SessionOutputs {
    pub status: watch::Receiver<RecordingStatus>,
    pub activity_type: watch::Receiver<ActivityType>,
    pub start: watch::Receiver<Option<DateTime<Utc>>>,
    pub end: watch::Receiver<Option<DateTime<Utc>>>,
    pub distance_m: watch::Receiver<f64>,
    pub steps: watch::Receiver<u64>,
    pub pauses: watch::Receiver<Arc<[PauseInterval]>>,
    pub locations: watch::Receiver<Arc<[LocationSample]>>,
    pub altitudes: watch::Receiver<Arc<[AltitudeSample]>>,
    pub heart_rates: watch::Receiver<Arc<[HeartRateSample]>>,
    pub timeline: watch::Receiver<Arc<Timeline>>,
    pub ui_suspended: watch::Receiver<bool>,
    pub suspended: watch::Receiver<bool>,
    frame: watch::Receiver<Arc<MetricsFrame>>,
    settings: MetricsSettings,
    permission: broadcast::Sender<Component>,
    finished: broadcast::Sender<Arc<SessionSnapshot>>,
    reset: broadcast::Sender<Option<Arc<SessionSnapshot>>>,
}

impl SessionOutputs {
    /// Components reported as lacking permission.
    pub fn permission_notifications(&self) -> broadcast::Receiver<Component> {
        self.permission.subscribe()
    }

    /// Snapshots of stopped recordings.
    pub fn finished_snapshots(&self) -> broadcast::Receiver<Arc<SessionSnapshot>> {
        self.finished.subscribe()
    }

    /// `None` for a fresh reset, or the snapshot a continuation started from.
    pub fn resets(&self) -> broadcast::Receiver<Option<Arc<SessionSnapshot>>> {
        self.reset.subscribe()
    }

    /// The latest coherent timeline.
    pub fn current_timeline(&self) -> Arc<Timeline> {
        Arc::clone(&self.timeline.borrow())
    }

    /// Live metrics at `now`.
    ///
    /// Reads one frame, so the timeline, distance and samples always come
    /// from the same session state.
    pub fn live_metrics(&self, now: DateTime<Utc>) -> LiveMetrics {
        let frame = Arc::clone(&self.frame.borrow());
        let settings = MetricsSettings {
            activity_type: frame.activity_type,
            ..self.settings
        };
        live_metrics(
            &frame.timeline,
            frame.distance_m,
            &frame.locations,
            &frame.heart_rates,
            &settings,
            now,
        )
    }
}

/// One recording session and everything it has recorded so far.
#[derive(Debug)]
pub struct RecordingSession {
    config: SessionConfig,
    settings: MetricsSettings,
    clock: Arc<dyn Clock>,
    scheduler: Arc<Scheduler>,
    machine: StatusMachine,
    auto_pauses: AutoPauseTracker,
    readiness: BTreeMap<Component, bool>,
    /// Components running without permission; they no longer gate readiness.
    degraded: BTreeSet<Component>,
    id: Uuid,
    activity_type: ActivityType,
    distance_m: f64,
    steps: u64,
    locations: Vec<LocationSample>,
    altitudes: Vec<AltitudeSample>,
    heart_rates: Vec<HeartRateSample>,
    lifecycle: AppLifecycle,
    ui_suspended: bool,
    suspended: bool,
    publisher: Publisher,
}

impl RecordingSession {
    pub fn new(
        config: &SessionConfig,
        clock: Arc<dyn Clock>,
        scheduler: Arc<Scheduler>,
    ) -> Result<Self, ConfigError> {
        let settings = config.metrics_settings()?;
        let lifecycle = scheduler.current();
        let mut session = Self {
            config: config.clone(),
            settings,
            clock,
            scheduler,
            machine: StatusMachine::new(),
            auto_pauses: AutoPauseTracker::new(),
            readiness: BTreeMap::new(),
            degraded: BTreeSet::new(),
            id: Uuid::new_v4(),
            activity_type: config.activity_type,
            distance_m: 0.0,
            steps: 0,
            locations: Vec::new(),
            altitudes: Vec::new(),
            heart_rates: Vec::new(),
            lifecycle,
            ui_suspended: false,
            suspended: false,
            publisher: Publisher::new(config.activity_type),
        };
        session.update_readiness();
        session.refresh_suspension();
        session.publish_all();
        session.publish_frame();
        Ok(session)
    }

    /// Subscribes to every output of this session.
    pub fn outputs(&self) -> SessionOutputs {
        let p = &self.publisher;
        SessionOutputs {
            status: p.status.subscribe(),
            activity_type: p.activity_type.subscribe(),
            start: p.start.subscribe(),
            end: p.end.subscribe(),
            distance_m: p.distance_m.subscribe(),
            steps: p.steps.subscribe(),
            pauses: p.pauses.subscribe(),
            locations: p.locations.subscribe(),
            altitudes: p.altitudes.subscribe(),
            heart_rates: p.heart_rates.subscribe(),
            timeline: p.timeline.subscribe(),
            ui_suspended: p.ui_suspended.subscribe(),
            suspended: p.suspended.subscribe(),
            frame: p.frame.subscribe(),
            settings: self.settings,
            permission: p.permission.clone(),
            finished: p.finished.clone(),
            reset: p.reset.clone(),
        }
    }

    /// Starts the driver task. Must be called from within a tokio runtime.
    pub fn spawn(self) -> (SessionHandle, SessionOutputs) {
        let outputs = self.outputs();
        let (commands, receiver) = mpsc::unbounded_channel();
        tokio::spawn(self.run(receiver));
        (SessionHandle { commands }, outputs)
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut lifecycle = self.scheduler.subscribe();
        let initial = *lifecycle.borrow_and_update();
        self.apply_lifecycle(initial);
        let mut lifecycle_open = true;

        loop {
            tokio::select! {
                biased;

                changed = lifecycle.changed(), if lifecycle_open => {
                    if changed.is_ok() {
                        let state = *lifecycle.borrow_and_update();
                        self.apply_lifecycle(state);
                    } else {
                        lifecycle_open = false;
                    }
                }
                command = commands.recv() => match command {
                    Some(command) => self.dispatch(command),
                    None => break,
                },
            }
        }
        debug!(id = %self.id, "session driver stopped");
    }

    fn dispatch(&mut self, command: Command) {
        match command {
            Command::Input(input) => self.handle(input),
            Command::Continue { snapshot, reply } => {
                let _ = reply.send(self.continue_from(snapshot));
            }
            Command::Flush(reply) => {
                let _ = reply.send(());
            }
        }
    }

    pub fn status(&self) -> RecordingStatus {
        self.machine.status()
    }

    /// Applies one producer input.
    pub fn handle(&mut self, input: SessionInput) {
        self.apply(input);
        self.publish_frame();
    }

    fn apply(&mut self, input: SessionInput) {
        if self.suspended && input.is_sample() {
            debug!("dropping sample while suspended");
            return;
        }
        if input.is_sample() && !self.machine.status().is_active() {
            debug!(status = %self.machine.status(), "ignoring sample outside a recording");
            return;
        }

        let now = self.clock.now();
        match input {
            SessionInput::ComponentReady { component, ready } => {
                self.readiness.insert(component, ready);
                if ready {
                    self.degraded.remove(&component);
                }
                self.update_readiness();
            }
            SessionInput::InsufficientPermission { component } => {
                warn!(%component, "insufficient permission, continuing without it");
                self.degraded.insert(component);
                let _ = self.publisher.permission.send(component);
                self.update_readiness();
            }
            SessionInput::StatusSuggestion { status } => self.request(status, now),
            SessionInput::Activity { activity_type } => {
                if self.machine.status().is_active() {
                    debug!(%activity_type, "activity type is fixed once recording started");
                } else {
                    self.activity_type = activity_type;
                    replace(&self.publisher.activity_type, activity_type);
                }
            }
            SessionInput::Distance { meters } => {
                if meters.is_finite() && meters >= 0.0 {
                    self.distance_m = meters;
                    replace(&self.publisher.distance_m, meters);
                } else {
                    debug!(meters, "ignoring invalid distance");
                }
            }
            SessionInput::Steps { count } => {
                self.steps = count;
                replace(&self.publisher.steps, count);
            }
            SessionInput::Location(sample) => {
                insert_sorted(&mut self.locations, sample, |s| s.timestamp);
                self.publish_samples();
            }
            SessionInput::Locations { samples } => {
                self.locations.extend(samples);
                self.locations.sort_by_key(|s| s.timestamp);
                self.publish_samples();
            }
            SessionInput::Altitude(sample) => {
                insert_sorted(&mut self.altitudes, sample, |s| s.timestamp);
                self.publish_samples();
            }
            SessionInput::HeartRate(sample) => {
                insert_sorted(&mut self.heart_rates, sample, |s| s.timestamp);
                self.publish_samples();
            }
            SessionInput::AutoPause { start, end } => {
                if self.auto_pauses.record(start, end) {
                    self.publish_state();
                }
            }
        }
    }

    /// Re-opens a finished recording. The session must be inactive.
    pub fn continue_from(&mut self, snapshot: Arc<SessionSnapshot>) -> Result<(), SessionError> {
        let status = self.machine.status();
        if status.is_active() {
            return Err(SessionError::Busy { status });
        }

        let now = self.clock.now();
        self.machine.restore(&snapshot.timeline(), now);
        self.auto_pauses.reset();
        for pause in &snapshot.auto_pauses {
            self.auto_pauses.insert(*pause);
        }
        self.id = snapshot.id;
        self.activity_type = snapshot.activity_type;
        self.distance_m = snapshot.distance_m;
        self.steps = snapshot.steps;
        self.locations.clone_from(&snapshot.locations);
        self.altitudes.clone_from(&snapshot.altitudes);
        self.heart_rates.clone_from(&snapshot.heart_rates);
        info!(id = %self.id, "continuing previous recording");

        self.refresh_suspension();
        self.publish_all();
        self.publish_frame();
        let _ = self.publisher.reset.send(Some(snapshot));
        Ok(())
    }

    fn request(&mut self, to: RecordingStatus, now: DateTime<Utc>) {
        match self.machine.request(to, now) {
            Transition::Rejected { .. } => {}
            Transition::Applied { .. } => {
                self.refresh_suspension();
                self.publish_state();
            }
            Transition::Stopped { timeline, .. } => self.finish(timeline),
        }
    }

    fn finish(&mut self, timeline: Timeline) {
        let Some(start) = timeline.start else {
            warn!(id = %self.id, "stopped a recording that never started");
            self.reset();
            return;
        };

        let snapshot = SessionSnapshot {
            id: self.id,
            activity_type: self.activity_type,
            start,
            end: timeline.end,
            pauses: timeline.pauses,
            auto_pauses: self.auto_pauses.pauses().to_vec(),
            distance_m: self.distance_m,
            steps: self.steps,
            locations: mem::take(&mut self.locations),
            altitudes: mem::take(&mut self.altitudes),
            heart_rates: mem::take(&mut self.heart_rates),
        };
        info!(
            id = %snapshot.id,
            pauses = snapshot.pauses.len(),
            distance_m = snapshot.distance_m,
            "recording finished"
        );

        replace(&self.publisher.end, snapshot.end);
        let _ = self.publisher.finished.send(Arc::new(snapshot));
        self.reset();
    }

    /// Clears everything for the next recording.
    fn reset(&mut self) {
        self.machine.reset(RecordingStatus::Waiting);
        self.auto_pauses.reset();
        self.id = Uuid::new_v4();
        self.activity_type = self.config.activity_type;
        self.distance_m = 0.0;
        self.steps = 0;
        self.locations.clear();
        self.altitudes.clear();
        self.heart_rates.clear();

        self.update_readiness();
        self.refresh_suspension();
        self.publish_all();
        self.publish_frame();
        let _ = self.publisher.reset.send(None);
    }

    fn all_ready(&self) -> bool {
        self.config
            .required_components
            .iter()
            .filter(|component| !self.degraded.contains(component))
            .all(|component| self.readiness.get(component).copied().unwrap_or(false))
    }

    fn update_readiness(&mut self) {
        if let Transition::Applied { .. } = self.machine.readiness_changed(self.all_ready()) {
            self.refresh_suspension();
            self.publish_state();
        }
    }

    fn apply_lifecycle(&mut self, state: AppLifecycle) {
        self.lifecycle = state;
        self.refresh_suspension();
        self.publish_frame();
    }

    /// Background entry suspends UI output; an inactive session also stops
    /// accepting samples until it is active or foregrounded again.
    fn refresh_suspension(&mut self) {
        let background = self.lifecycle == AppLifecycle::Background;
        let suspended = background && !self.machine.status().is_active();
        let ui_resumed = self.ui_suspended && !background;

        if self.ui_suspended != background || self.suspended != suspended {
            debug!(ui_suspended = background, suspended, "suspension changed");
        }
        self.ui_suspended = background;
        self.suspended = suspended;
        replace(&self.publisher.ui_suspended, background);
        replace(&self.publisher.suspended, suspended);

        if ui_resumed {
            self.publish_samples();
        }
    }

    fn publish_state(&self) {
        let p = &self.publisher;
        let timeline = self
            .machine
            .timeline()
            .with_auto_pauses(self.auto_pauses.pauses());
        replace(&p.status, timeline.status);
        replace(&p.start, timeline.start);
        replace(&p.end, timeline.end);
        replace(&p.activity_type, self.activity_type);
        p.pauses.send_replace(Arc::from(self.machine.pauses()));
        p.timeline.send_replace(Arc::new(timeline));
    }

    /// Sample lists are the heavy outputs; they are held back while the UI
    /// is suspended and sent in full when it resumes.
    fn publish_samples(&self) {
        if self.ui_suspended {
            return;
        }
        let p = &self.publisher;
        p.locations.send_replace(Arc::from(self.locations.as_slice()));
        p.altitudes.send_replace(Arc::from(self.altitudes.as_slice()));
        p.heart_rates.send_replace(Arc::from(self.heart_rates.as_slice()));
    }

    /// Gathers the already published values into one metrics frame. Called
    /// once an operation has finished publishing, never part-way through.
    fn publish_frame(&self) {
        let p = &self.publisher;
        let frame = MetricsFrame {
            timeline: Arc::clone(&p.timeline.borrow()),
            activity_type: *p.activity_type.borrow(),
            distance_m: *p.distance_m.borrow(),
            locations: Arc::clone(&p.locations.borrow()),
            heart_rates: Arc::clone(&p.heart_rates.borrow()),
        };
        p.frame.send_replace(Arc::new(frame));
    }

    fn publish_all(&self) {
        self.publish_state();
        replace(&self.publisher.distance_m, self.distance_m);
        replace(&self.publisher.steps, self.steps);
        self.publish_samples();
    }
}

/// Inserts keeping `items` ordered by `key`; equal keys keep arrival order.
fn insert_sorted<T, K: Ord>(items: &mut Vec<T>, item: T, key: impl Fn(&T) -> K) {
    let k = key(&item);
    let at = items.partition_point(|existing| key(existing) <= k);
    items.insert(at, item);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeDelta, TimeZone};

    fn ts(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0)
            .single()
            .expect("valid test timestamp")
            + TimeDelta::seconds(seconds)
    }

    fn session() -> (RecordingSession, Arc<ManualClock>, Arc<Scheduler>) {
        let clock = Arc::new(ManualClock::new(ts(0)));
        let scheduler = Arc::new(Scheduler::new());
        let session = RecordingSession::new(
            &SessionConfig::default(),
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::clone(&scheduler),
        )
        .unwrap();
        (session, clock, scheduler)
    }

    fn ready(session: &mut RecordingSession) {
        session.handle(SessionInput::ComponentReady {
            component: Component::Location,
            ready: true,
        });
    }

    fn suggest(session: &mut RecordingSession, status: RecordingStatus) {
        session.handle(SessionInput::StatusSuggestion { status });
    }

    fn location(seconds: i64) -> LocationSample {
        LocationSample {
            timestamp: ts(seconds),
            latitude: 0.0,
            longitude: 0.0,
            altitude: 0.0,
            speed: 1.0,
        }
    }

    #[test]
    fn waits_for_required_components() {
        let (mut session, _, _) = session();
        let outputs = session.outputs();
        assert_eq!(*outputs.status.borrow(), RecordingStatus::Waiting);

        suggest(&mut session, RecordingStatus::Recording);
        assert_eq!(session.status(), RecordingStatus::Waiting);

        ready(&mut session);
        assert_eq!(*outputs.status.borrow(), RecordingStatus::Ready);
    }

    #[test]
    fn permission_denial_degrades_instead_of_blocking() {
        let (mut session, _, _) = session();
        let outputs = session.outputs();
        let mut notifications = outputs.permission_notifications();

        session.handle(SessionInput::InsufficientPermission {
            component: Component::Location,
        });

        assert_eq!(notifications.try_recv().unwrap(), Component::Location);
        assert_eq!(session.status(), RecordingStatus::Ready);
    }

    #[test]
    fn samples_outside_a_recording_are_ignored() {
        let (mut session, _, _) = session();
        ready(&mut session);
        session.handle(SessionInput::Distance { meters: 120.0 });
        session.handle(SessionInput::Location(location(1)));

        let outputs = session.outputs();
        assert!(outputs.distance_m.borrow().abs() < f64::EPSILON);
        assert!(outputs.locations.borrow().is_empty());
    }

    #[test]
    fn locations_are_kept_in_time_order() {
        let (mut session, _, _) = session();
        ready(&mut session);
        suggest(&mut session, RecordingStatus::Recording);

        session.handle(SessionInput::Location(location(5)));
        session.handle(SessionInput::Locations {
            samples: vec![location(3), location(1)],
        });
        session.handle(SessionInput::Location(location(4)));

        let outputs = session.outputs();
        let times: Vec<_> = outputs.locations.borrow().iter().map(|s| s.timestamp).collect();
        assert_eq!(times, vec![ts(1), ts(3), ts(4), ts(5)]);
    }

    #[test]
    fn stop_emits_snapshot_and_resets() {
        let (mut session, clock, _) = session();
        let outputs = session.outputs();
        let mut finished = outputs.finished_snapshots();
        let mut resets = outputs.resets();

        ready(&mut session);
        suggest(&mut session, RecordingStatus::Recording);
        session.handle(SessionInput::Distance { meters: 250.0 });
        session.handle(SessionInput::Steps { count: 300 });
        clock.set(ts(10));
        suggest(&mut session, RecordingStatus::Paused);
        clock.set(ts(25));
        suggest(&mut session, RecordingStatus::Recording);
        clock.set(ts(60));
        suggest(&mut session, RecordingStatus::Ready);

        let snapshot = finished.try_recv().unwrap();
        assert_eq!(snapshot.start, ts(0));
        assert_eq!(snapshot.end, Some(ts(60)));
        assert_eq!(snapshot.pauses.len(), 1);
        assert!((snapshot.distance_m - 250.0).abs() < f64::EPSILON);
        assert_eq!(snapshot.steps, 300);
        assert_eq!(resets.try_recv().unwrap(), None);

        // Readiness survives the reset.
        assert_eq!(*outputs.status.borrow(), RecordingStatus::Ready);
        assert_eq!(*outputs.start.borrow(), None);
        assert_eq!(*outputs.steps.borrow(), 0);
        assert_ne!(snapshot.id, session.id);
    }

    #[test]
    fn live_metrics_read_published_timeline() {
        let (mut session, clock, _) = session();
        let outputs = session.outputs();
        ready(&mut session);
        suggest(&mut session, RecordingStatus::Recording);
        clock.set(ts(10));
        suggest(&mut session, RecordingStatus::Paused);
        clock.set(ts(25));
        suggest(&mut session, RecordingStatus::Recording);

        let metrics = outputs.live_metrics(ts(60));
        assert_eq!(metrics.active_duration, TimeDelta::seconds(45));
    }

    #[test]
    fn auto_pause_candidates_reach_the_timeline() {
        let (mut session, _, _) = session();
        let outputs = session.outputs();
        ready(&mut session);
        suggest(&mut session, RecordingStatus::Recording);

        session.handle(SessionInput::AutoPause {
            start: ts(20),
            end: ts(30),
        });
        session.handle(SessionInput::AutoPause {
            start: ts(30),
            end: ts(25),
        });

        assert_eq!(outputs.current_timeline().auto_pauses.len(), 1);
        assert_eq!(
            outputs.live_metrics(ts(60)).active_duration,
            TimeDelta::seconds(50)
        );
    }

    #[test]
    fn background_suspends_ui_but_keeps_recording() {
        let (mut session, _, _) = session();
        let outputs = session.outputs();
        ready(&mut session);
        suggest(&mut session, RecordingStatus::Recording);

        session.apply_lifecycle(AppLifecycle::Background);
        assert!(*outputs.ui_suspended.borrow());
        assert!(!*outputs.suspended.borrow());

        session.handle(SessionInput::Location(location(3)));
        session.handle(SessionInput::Distance { meters: 40.0 });
        assert!(outputs.locations.borrow().is_empty());
        assert!((*outputs.distance_m.borrow() - 40.0).abs() < f64::EPSILON);

        session.apply_lifecycle(AppLifecycle::Foreground);
        assert!(!*outputs.ui_suspended.borrow());
        assert_eq!(outputs.locations.borrow().len(), 1);
    }

    #[test]
    fn background_while_inactive_suspends_entirely() {
        let (mut session, _, _) = session();
        let outputs = session.outputs();
        ready(&mut session);

        session.apply_lifecycle(AppLifecycle::Background);
        assert!(*outputs.suspended.borrow());

        // Starting from the background lifts the full suspension.
        suggest(&mut session, RecordingStatus::Recording);
        assert!(!*outputs.suspended.borrow());
        assert!(*outputs.ui_suspended.borrow());

        suggest(&mut session, RecordingStatus::Ready);
        assert!(*outputs.suspended.borrow());
    }

    #[test]
    fn continue_restores_a_finished_recording() {
        let (mut session, clock, _) = session();
        let outputs = session.outputs();
        let mut finished = outputs.finished_snapshots();
        let mut resets = outputs.resets();

        ready(&mut session);
        suggest(&mut session, RecordingStatus::Recording);
        session.handle(SessionInput::Distance { meters: 500.0 });
        clock.set(ts(60));
        suggest(&mut session, RecordingStatus::Ready);
        let snapshot = finished.try_recv().unwrap();
        assert_eq!(resets.try_recv().unwrap(), None);

        clock.set(ts(90));
        session.continue_from(Arc::clone(&snapshot)).unwrap();

        assert_eq!(session.status(), RecordingStatus::Paused);
        assert_eq!(*outputs.start.borrow(), Some(ts(0)));
        assert!((*outputs.distance_m.borrow() - 500.0).abs() < f64::EPSILON);
        assert_eq!(resets.try_recv().unwrap().map(|s| s.id), Some(snapshot.id));

        suggest(&mut session, RecordingStatus::Recording);
        // The 30 s gap counts as paused.
        assert_eq!(
            outputs.live_metrics(ts(100)).active_duration,
            TimeDelta::seconds(70)
        );
    }

    #[test]
    fn metrics_frame_matches_published_state() {
        let (mut session, clock, _) = session();
        let outputs = session.outputs();
        let mut finished = outputs.finished_snapshots();
        ready(&mut session);
        suggest(&mut session, RecordingStatus::Recording);
        session.handle(SessionInput::Distance { meters: 500.0 });
        clock.set(ts(60));
        suggest(&mut session, RecordingStatus::Ready);

        let after_stop = outputs.live_metrics(ts(60));
        assert!(after_stop.distance_m.abs() < f64::EPSILON);
        assert_eq!(after_stop.active_duration, TimeDelta::zero());

        clock.set(ts(90));
        session
            .continue_from(finished.try_recv().unwrap())
            .unwrap();

        let frame = Arc::clone(&outputs.frame.borrow());
        assert!(Arc::ptr_eq(&frame.timeline, &outputs.current_timeline()));
        assert_eq!(frame.timeline.start, Some(ts(0)));
        assert!((frame.distance_m - 500.0).abs() < f64::EPSILON);
        assert!((outputs.live_metrics(ts(90)).distance_m - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn continue_is_refused_while_recording() {
        let (mut session, _, _) = session();
        ready(&mut session);
        suggest(&mut session, RecordingStatus::Recording);

        let snapshot = Arc::new(SessionSnapshot {
            id: Uuid::new_v4(),
            activity_type: ActivityType::Running,
            start: ts(-100),
            end: Some(ts(-50)),
            pauses: Vec::new(),
            auto_pauses: Vec::new(),
            distance_m: 0.0,
            steps: 0,
            locations: Vec::new(),
            altitudes: Vec::new(),
            heart_rates: Vec::new(),
        });
        assert_eq!(
            session.continue_from(snapshot),
            Err(SessionError::Busy {
                status: RecordingStatus::Recording
            })
        );
    }

    #[test]
    fn activity_type_is_fixed_once_started() {
        let (mut session, _, _) = session();
        let outputs = session.outputs();
        ready(&mut session);
        session.handle(SessionInput::Activity {
            activity_type: ActivityType::Cycling,
        });
        suggest(&mut session, RecordingStatus::Recording);
        session.handle(SessionInput::Activity {
            activity_type: ActivityType::Running,
        });
        assert_eq!(*outputs.activity_type.borrow(), ActivityType::Cycling);
    }

    #[test]
    fn inputs_deserialize_from_tagged_json() {
        let input: SessionInput =
            serde_json::from_str(r#"{"input": "status_suggestion", "status": "auto_paused"}"#)
                .unwrap();
        assert_eq!(
            input,
            SessionInput::StatusSuggestion {
                status: RecordingStatus::AutoPaused
            }
        );
        let input: SessionInput = serde_json::from_str(
            r#"{"input": "location", "timestamp": "2025-06-01T08:00:00Z", "latitude": 1.0, "longitude": 2.0}"#,
        )
        .unwrap();
        assert!(input.is_sample());
    }
}
