#![allow(dead_code)]

use async_trait::async_trait;
use attendance_kiosk::attendance::{
    AttendanceEvent, AttendanceOrchestrator, DetectionOutcome, OrchestratorState,
    SubmissionResult, Timeouts,
};
use attendance_kiosk::capture::{Frame, FrameSource};
use attendance_kiosk::detector::FaceDetector;
use attendance_kiosk::identify::IdentificationService;
use attendance_kiosk::{AttendanceError, AttendanceResult};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Tracks how many detector/identifier calls are running at once
#[derive(Default)]
pub struct Activity {
    active: AtomicUsize,
    max_active: AtomicUsize,
}

pub struct ActiveGuard(Arc<Activity>);

impl Activity {
    pub fn enter(self: &Arc<Self>) -> ActiveGuard {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        ActiveGuard(self.clone())
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Frame source that can be switched between "has frame" and "no frame yet"
pub struct FixedSource {
    available: AtomicBool,
    captures: AtomicUsize,
}

impl FixedSource {
    pub fn new(available: bool) -> Arc<Self> {
        Arc::new(Self {
            available: AtomicBool::new(available),
            captures: AtomicUsize::new(0),
        })
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

impl FrameSource for FixedSource {
    fn id(&self) -> &str {
        "fixed"
    }

    fn capture(&self) -> Option<Frame> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        if self.available.load(Ordering::SeqCst) {
            Some(Frame::jpeg(vec![0xFF, 0xD8, 0xFF, 0xD9]))
        } else {
            None
        }
    }
}

pub struct ScriptedDetector {
    delay: Duration,
    outcome: Result<DetectionOutcome, String>,
    warm_up_error: Option<String>,
    calls: AtomicUsize,
    activity: Arc<Activity>,
}

impl ScriptedDetector {
    pub fn new(
        delay: Duration,
        outcome: Result<DetectionOutcome, String>,
        activity: Arc<Activity>,
    ) -> Arc<Self> {
        Arc::new(Self {
            delay,
            outcome,
            warm_up_error: None,
            calls: AtomicUsize::new(0),
            activity,
        })
    }

    pub fn failing_warm_up(message: &str) -> Arc<Self> {
        Arc::new(Self {
            delay: Duration::ZERO,
            outcome: Ok(DetectionOutcome::FacesPresent(1)),
            warm_up_error: Some(message.to_string()),
            calls: AtomicUsize::new(0),
            activity: Arc::new(Activity::default()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FaceDetector for ScriptedDetector {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn warm_up(&self) -> AttendanceResult<()> {
        match &self.warm_up_error {
            Some(message) => Err(AttendanceError::Detection(message.clone())),
            None => Ok(()),
        }
    }

    async fn detect(&self, _frame: &Frame) -> AttendanceResult<DetectionOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _guard = self.activity.enter();
        tokio::time::sleep(self.delay).await;
        self.outcome.clone().map_err(AttendanceError::Detection)
    }
}

pub struct ScriptedIdentifier {
    delay: Duration,
    response: Result<SubmissionResult, String>,
    calls: AtomicUsize,
    completed: AtomicUsize,
    activity: Arc<Activity>,
}

impl ScriptedIdentifier {
    pub fn new(
        delay: Duration,
        response: Result<SubmissionResult, String>,
        activity: Arc<Activity>,
    ) -> Arc<Self> {
        Arc::new(Self {
            delay,
            response,
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            activity,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentificationService for ScriptedIdentifier {
    async fn identify(&self, _frame: &Frame) -> AttendanceResult<SubmissionResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _guard = self.activity.enter();
        tokio::time::sleep(self.delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        self.response.clone().map_err(AttendanceError::Transport)
    }
}

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

pub fn bob() -> SubmissionResult {
    SubmissionResult::Identified {
        name: "Bob".to_string(),
        roll_number: "17".to_string(),
    }
}

pub fn orchestrator(
    source: Arc<FixedSource>,
    detector: Arc<ScriptedDetector>,
    identifier: Arc<ScriptedIdentifier>,
    timeouts: Timeouts,
) -> AttendanceOrchestrator {
    AttendanceOrchestrator::new(source, detector, identifier, timeouts)
}

/// Everything currently buffered on the receiver
pub fn drain(events: &mut broadcast::Receiver<AttendanceEvent>) -> Vec<AttendanceEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

/// Only the state transitions, in order
pub fn states(events: &[AttendanceEvent]) -> Vec<OrchestratorState> {
    events
        .iter()
        .filter_map(|event| match event {
            AttendanceEvent::StateChanged(state) => Some(state.clone()),
            _ => None,
        })
        .collect()
}

/// Codes of every aborted cycle
pub fn abort_codes(events: &[AttendanceEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            AttendanceEvent::CycleAborted(report) => Some(report.code.clone()),
            _ => None,
        })
        .collect()
}
