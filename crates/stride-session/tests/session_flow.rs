//! Integration tests for a spawned recording session.
//!
//! Drives the session through its handle the way producer collaborators do
//! and observes it only through its published outputs.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use stride_core::{
    Component, LocationSample, MetricsSettings, PauseKind, RecordingStatus, SessionSnapshot,
    WorkoutRecord,
};
use stride_session::{
    AppLifecycle, Clock, CompletionError, CompletionOutcome, ManualClock, RecordingSession,
    Scheduler, SessionCompletionHandler, SessionConfig, SessionError, SessionHandle,
    SessionInput, SessionOutputs, SnapshotSink,
};

fn ts(seconds: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0)
        .single()
        .expect("valid test timestamp")
        + TimeDelta::seconds(seconds)
}

struct Harness {
    clock: Arc<ManualClock>,
    scheduler: Arc<Scheduler>,
    handle: SessionHandle,
    outputs: SessionOutputs,
}

impl Harness {
    async fn ready() -> Self {
        let clock = Arc::new(ManualClock::new(ts(0)));
        let scheduler = Arc::new(Scheduler::new());
        let (handle, outputs) = RecordingSession::new(
            &SessionConfig::default(),
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::clone(&scheduler),
        )
        .unwrap()
        .spawn();

        let harness = Self {
            clock,
            scheduler,
            handle,
            outputs,
        };
        harness
            .send(SessionInput::ComponentReady {
                component: Component::Location,
                ready: true,
            })
            .await;
        harness
    }

    async fn send(&self, input: SessionInput) {
        self.handle.send(input).unwrap();
        self.handle.flush().await.unwrap();
    }

    async fn at(&self, seconds: i64, status: RecordingStatus) {
        self.clock.set(ts(seconds));
        self.send(SessionInput::StatusSuggestion { status }).await;
    }

    fn status(&self) -> RecordingStatus {
        *self.outputs.status.borrow()
    }

    fn settings() -> MetricsSettings {
        SessionConfig::default().metrics_settings().unwrap()
    }
}

#[derive(Default)]
struct MemorySink {
    saved: Mutex<Vec<WorkoutRecord>>,
}

impl SnapshotSink for MemorySink {
    fn save(
        &self,
        _snapshot: &SessionSnapshot,
        record: &WorkoutRecord,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.saved.lock().unwrap().push(record.clone());
        Ok(())
    }
}

#[tokio::test]
async fn full_recording_with_pause() {
    let h = Harness::ready().await;
    let mut finished = h.outputs.finished_snapshots();
    assert_eq!(h.status(), RecordingStatus::Ready);

    h.at(0, RecordingStatus::Recording).await;
    h.at(10, RecordingStatus::Paused).await;
    h.at(25, RecordingStatus::Recording).await;

    let metrics = h.outputs.live_metrics(ts(60));
    assert_eq!(metrics.active_duration, TimeDelta::seconds(45));

    h.at(60, RecordingStatus::Ready).await;
    let snapshot = finished.recv().await.unwrap();
    assert_eq!(snapshot.pauses.len(), 1);
    assert_eq!(snapshot.pauses[0].kind(), PauseKind::Manual);
    assert_eq!(snapshot.pauses[0].duration(), TimeDelta::seconds(15));
}

#[tokio::test]
async fn invalid_requests_are_silently_ignored() {
    let h = Harness::ready().await;

    h.at(0, RecordingStatus::Paused).await;
    h.at(1, RecordingStatus::AutoPaused).await;
    assert_eq!(h.status(), RecordingStatus::Ready);

    h.at(2, RecordingStatus::Recording).await;
    h.at(3, RecordingStatus::Paused).await;
    h.at(4, RecordingStatus::AutoPaused).await;
    assert_eq!(h.status(), RecordingStatus::Paused);
}

#[tokio::test]
async fn auto_pause_flutter_collapses() {
    let h = Harness::ready().await;
    let mut finished = h.outputs.finished_snapshots();

    h.at(0, RecordingStatus::Recording).await;
    h.at(10, RecordingStatus::AutoPaused).await;
    h.at(20, RecordingStatus::Recording).await;
    h.at(22, RecordingStatus::AutoPaused).await;
    h.at(30, RecordingStatus::Recording).await;
    h.at(40, RecordingStatus::Ready).await;

    let snapshot = finished.recv().await.unwrap();
    assert_eq!(snapshot.pauses.len(), 1);
    assert_eq!(snapshot.pauses[0].start(), ts(10));
    assert_eq!(snapshot.pauses[0].end(), ts(30));
}

#[tokio::test]
async fn concurrent_producers_are_serialized() {
    let h = Harness::ready().await;
    h.at(0, RecordingStatus::Recording).await;

    let mut producers = Vec::new();
    for producer in 0..4_i64 {
        let handle = h.handle.clone();
        producers.push(tokio::spawn(async move {
            for i in 0..25_i64 {
                let at = producer * 25 + i;
                handle
                    .send(SessionInput::Location(LocationSample {
                        timestamp: ts(at),
                        latitude: 0.0,
                        longitude: 0.0,
                        altitude: 0.0,
                        speed: 1.0,
                    }))
                    .unwrap();
            }
        }));
    }
    for producer in producers {
        producer.await.unwrap();
    }
    h.handle.flush().await.unwrap();

    let locations = h.outputs.locations.borrow().clone();
    assert_eq!(locations.len(), 100);
    assert!(locations.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[tokio::test]
async fn timeline_is_published_as_one_value() {
    let h = Harness::ready().await;
    let mut timeline = h.outputs.timeline.clone();

    h.at(0, RecordingStatus::Recording).await;
    h.at(10, RecordingStatus::Paused).await;

    assert!(timeline.has_changed().unwrap());
    let current = timeline.borrow_and_update().clone();
    assert_eq!(current.status, RecordingStatus::Paused);
    assert_eq!(current.start, Some(ts(0)));
    assert_eq!(current.open_pause.map(|p| p.since), Some(ts(10)));
}

#[tokio::test]
async fn background_lifecycle_follows_scheduler() {
    let h = Harness::ready().await;

    h.scheduler.enter_background();
    h.handle.flush().await.unwrap();
    assert!(*h.outputs.ui_suspended.borrow());
    assert!(*h.outputs.suspended.borrow());

    // Inactive and backgrounded: samples are dropped.
    h.send(SessionInput::Distance { meters: 10.0 }).await;
    assert!(h.outputs.distance_m.borrow().abs() < f64::EPSILON);

    h.at(0, RecordingStatus::Recording).await;
    assert!(!*h.outputs.suspended.borrow());
    h.send(SessionInput::Distance { meters: 30.0 }).await;
    assert!((*h.outputs.distance_m.borrow() - 30.0).abs() < f64::EPSILON);

    h.scheduler.set(AppLifecycle::Foreground);
    h.handle.flush().await.unwrap();
    assert!(!*h.outputs.ui_suspended.borrow());
}

#[tokio::test]
async fn save_after_stop() {
    let h = Harness::ready().await;
    let mut finished = h.outputs.finished_snapshots();

    h.at(0, RecordingStatus::Recording).await;
    h.send(SessionInput::Distance { meters: 1_000.0 }).await;
    h.at(300, RecordingStatus::Ready).await;

    let sink = Arc::new(MemorySink::default());
    let handler = SessionCompletionHandler::new(
        finished.recv().await.unwrap(),
        h.handle.downgrade(),
        Arc::clone(&sink) as Arc<dyn SnapshotSink>,
        Harness::settings(),
    );

    let CompletionOutcome::Saved(record) = handler.save().unwrap() else {
        panic!("expected a saved record");
    };
    assert_eq!(record.active_duration_ms, 300_000);
    assert!((record.distance_m - 1_000.0).abs() < f64::EPSILON);
    assert_eq!(sink.saved.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn continue_recording_happens_exactly_once() {
    let h = Harness::ready().await;
    let mut finished = h.outputs.finished_snapshots();
    let mut resets = h.outputs.resets();

    h.at(0, RecordingStatus::Recording).await;
    h.at(60, RecordingStatus::Ready).await;
    assert_eq!(resets.recv().await.unwrap(), None);

    let handler = SessionCompletionHandler::new(
        finished.recv().await.unwrap(),
        h.handle.downgrade(),
        Arc::new(MemorySink::default()),
        Harness::settings(),
    );

    h.clock.set(ts(120));
    let first = handler.continue_recording().await.unwrap();
    let second = handler.continue_recording().await.unwrap();
    assert_eq!(first, CompletionOutcome::Continued);
    assert_eq!(second, CompletionOutcome::AlreadyHandled);

    assert!(resets.recv().await.unwrap().is_some());
    assert!(resets.try_recv().is_err());
    assert_eq!(h.status(), RecordingStatus::Paused);
    assert_eq!(*h.outputs.start.borrow(), Some(ts(0)));
}

#[tokio::test]
async fn continue_into_a_busy_session_is_an_error() {
    let h = Harness::ready().await;
    let mut finished = h.outputs.finished_snapshots();

    h.at(0, RecordingStatus::Recording).await;
    h.at(60, RecordingStatus::Ready).await;
    let handler = SessionCompletionHandler::new(
        finished.recv().await.unwrap(),
        h.handle.downgrade(),
        Arc::new(MemorySink::default()),
        Harness::settings(),
    );

    h.at(70, RecordingStatus::Recording).await;
    let err = handler.continue_recording().await.unwrap_err();
    assert!(matches!(
        err,
        CompletionError::Session(SessionError::Busy {
            status: RecordingStatus::Recording
        })
    ));
    assert!(handler.is_handled());
}

#[tokio::test]
async fn racing_actions_leave_the_handler_claimed() {
    let h = Harness::ready().await;
    let mut finished = h.outputs.finished_snapshots();

    h.at(0, RecordingStatus::Recording).await;
    h.at(60, RecordingStatus::Ready).await;
    let sink = Arc::new(MemorySink::default());
    let handler = SessionCompletionHandler::new(
        finished.recv().await.unwrap(),
        h.handle.downgrade(),
        Arc::clone(&sink) as Arc<dyn SnapshotSink>,
        Harness::settings(),
    );

    // A new recording is under way, so continuing cannot succeed.
    h.at(70, RecordingStatus::Recording).await;
    let (continued, saved) = tokio::join!(handler.continue_recording(), async {
        handler.save()
    });

    assert!(handler.is_handled());
    match (continued, saved) {
        (Err(CompletionError::Session(SessionError::Busy { .. })), Ok(saved)) => {
            assert_eq!(saved, CompletionOutcome::AlreadyHandled);
            assert!(sink.saved.lock().unwrap().is_empty());
        }
        (Ok(continued), Ok(CompletionOutcome::Saved(_))) => {
            assert_eq!(continued, CompletionOutcome::AlreadyHandled);
            assert_eq!(sink.saved.lock().unwrap().len(), 1);
        }
        other => panic!("unexpected outcomes: {other:?}"),
    }
    assert_eq!(handler.discard(), CompletionOutcome::AlreadyHandled);
}

#[tokio::test]
async fn handle_reports_closed_session() {
    let h = Harness::ready().await;
    let weak = h.handle.downgrade();
    drop(h);

    assert!(weak.upgrade().is_none());
}
