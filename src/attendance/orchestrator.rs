//! Attendance orchestrator
//!
//! Drives the sampling loop: capture, detect, submit, display, reset.
//!
//! A single timer task ticks at the configured period. A tick that finds the
//! state `Idle` captures a frame and admits one cycle, which runs on its own
//! task; every other tick is dropped. Each cycle carries the generation that
//! was current when it was admitted, and every state change it makes after a
//! suspension point is checked against the live generation. `stop()` bumps the
//! generation, so completions that arrive afterwards are inert.

use super::state::{CycleStats, OrchestratorState, SubmissionResult};
use crate::capture::{Frame, FrameSource};
use crate::detector::FaceDetector;
use crate::identify::IdentificationService;
use crate::utils::error::{AttendanceError, AttendanceResult, ErrorReport};
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use uuid::Uuid;

/// Events emitted by the orchestrator
#[derive(Debug, Clone, PartialEq)]
pub enum AttendanceEvent {
    /// Timer task spawned; waiting for the detector to warm up
    Started,
    /// Detector is ready, sampling has begun
    Ready,
    /// State machine moved
    StateChanged(OrchestratorState),
    /// A cycle (or the warm-up) ended in an error
    CycleAborted(ErrorReport),
    /// `stop()` was called
    Stopped,
}

/// Upper bounds on the two suspension points. `None` waits forever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeouts {
    pub detect: Option<Duration>,
    pub submit: Option<Duration>,
}

/// State shared between the handle, the timer task and cycle tasks
struct Shared {
    session_id: Uuid,
    source: Arc<dyn FrameSource>,
    detector: Arc<dyn FaceDetector>,
    identifier: Arc<dyn IdentificationService>,
    timeouts: Timeouts,
    state: RwLock<OrchestratorState>,
    generation: AtomicU64,
    cycles: AtomicU64,
    stats: Mutex<CycleStats>,
    dwell_cancel: Notify,
    event_tx: broadcast::Sender<AttendanceEvent>,
}

/// Owns the polling loop and its state machine
pub struct AttendanceOrchestrator {
    shared: Arc<Shared>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl AttendanceOrchestrator {
    /// Create an orchestrator around its three collaborators
    pub fn new(
        source: Arc<dyn FrameSource>,
        detector: Arc<dyn FaceDetector>,
        identifier: Arc<dyn IdentificationService>,
        timeouts: Timeouts,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            shared: Arc::new(Shared {
                session_id: Uuid::new_v4(),
                source,
                detector,
                identifier,
                timeouts,
                state: RwLock::new(OrchestratorState::Idle),
                generation: AtomicU64::new(0),
                cycles: AtomicU64::new(0),
                stats: Mutex::new(CycleStats::default()),
                dwell_cancel: Notify::new(),
                event_tx,
            }),
            timer: Mutex::new(None),
        }
    }

    /// Start sampling every `period`, holding each result for `dwell_time`.
    ///
    /// Calling this while already running does nothing. Must be called from
    /// inside a tokio runtime.
    pub fn start(&self, period: Duration, dwell_time: Duration) -> AttendanceResult<()> {
        if period.is_zero() {
            return Err(AttendanceError::Config(
                "Polling period must be greater than zero".to_string(),
            ));
        }

        let mut timer = self.timer.lock();
        if timer.as_ref().map_or(false, |handle| !handle.is_finished()) {
            tracing::warn!("Attendance polling already running");
            return Ok(());
        }

        let generation = {
            let mut state = self.shared.state.write();
            let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = OrchestratorState::Idle;
            generation
        };

        tracing::info!(
            session = %self.shared.session_id,
            generation,
            source = self.shared.source.id(),
            detector = self.shared.detector.name(),
            "Starting attendance polling every {:?} (dwell {:?})",
            period,
            dwell_time
        );

        self.shared.emit(AttendanceEvent::Started);
        self.shared
            .emit(AttendanceEvent::StateChanged(OrchestratorState::Idle));

        let shared = self.shared.clone();
        *timer = Some(tokio::spawn(async move {
            shared.run(generation, period, dwell_time).await;
        }));

        Ok(())
    }

    /// Stop sampling.
    ///
    /// Cancels the timer and any dwell wait. A detector or identification call
    /// already in flight is left to finish; its result is discarded.
    pub fn stop(&self) {
        if let Some(handle) = self.timer.lock().take() {
            handle.abort();
        }

        {
            let mut state = self.shared.state.write();
            if *state == OrchestratorState::Stopped {
                return;
            }
            self.shared.generation.fetch_add(1, Ordering::SeqCst);
            *state = OrchestratorState::Stopped;
        }
        self.shared.dwell_cancel.notify_waiters();

        self.shared
            .emit(AttendanceEvent::StateChanged(OrchestratorState::Stopped));
        self.shared.emit(AttendanceEvent::Stopped);
        tracing::info!(session = %self.shared.session_id, "Attendance polling stopped");
    }

    /// Snapshot of the state machine for the presentation layer
    pub fn current_state(&self) -> OrchestratorState {
        self.shared.state.read().clone()
    }

    /// Whether the timer task is alive
    pub fn is_running(&self) -> bool {
        self.timer
            .lock()
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Subscribe to orchestrator events
    pub fn subscribe(&self) -> broadcast::Receiver<AttendanceEvent> {
        self.shared.event_tx.subscribe()
    }

    /// Counters since construction
    pub fn stats(&self) -> CycleStats {
        *self.shared.stats.lock()
    }
}

impl Drop for AttendanceOrchestrator {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.lock().take() {
            handle.abort();
        }
    }
}

impl Shared {
    fn emit(&self, event: AttendanceEvent) {
        let _ = self.event_tx.send(event);
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Move to `next` if `generation` is still live. Returns whether the
    /// transition happened.
    fn transition(&self, generation: u64, next: OrchestratorState) -> bool {
        {
            let mut state = self.state.write();
            if !self.is_current(generation) {
                return false;
            }
            tracing::trace!("State {} -> {}", state.label(), next.label());
            *state = next.clone();
        }
        self.emit(AttendanceEvent::StateChanged(next));
        true
    }

    /// Timer task body
    async fn run(self: Arc<Self>, generation: u64, period: Duration, dwell_time: Duration) {
        if let Err(e) = self.detector.warm_up().await {
            tracing::error!(
                detector = self.detector.name(),
                error = %e,
                "Detector warm-up failed, polling not started"
            );
            self.emit(AttendanceEvent::CycleAborted(ErrorReport::from(&e)));
            return;
        }

        if !self.is_current(generation) {
            return;
        }

        tracing::info!("Detector {} ready, sampling started", self.detector.name());
        self.emit(AttendanceEvent::Ready);

        // First sample one full period after start
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if !self.is_current(generation) {
                break;
            }
            self.on_tick(generation, dwell_time);
        }
    }

    /// Admit a cycle if the machine is idle and a frame is available
    fn on_tick(self: &Arc<Self>, generation: u64, dwell_time: Duration) {
        enum Admission {
            Busy,
            NoFrame,
            Admitted(Frame),
        }

        let admission = {
            let mut state = self.state.write();
            if !self.is_current(generation) || *state != OrchestratorState::Idle {
                Admission::Busy
            } else {
                match self.source.capture() {
                    Some(frame) => {
                        *state = OrchestratorState::AwaitingDetection;
                        Admission::Admitted(frame)
                    }
                    None => Admission::NoFrame,
                }
            }
        };

        let mut stats = self.stats.lock();
        stats.ticks += 1;
        match admission {
            Admission::Busy => {
                stats.skipped_ticks += 1;
            }
            Admission::NoFrame => {
                stats.captures_missed += 1;
                drop(stats);
                tracing::debug!(source = self.source.id(), "No frame available, skipping tick");
            }
            Admission::Admitted(frame) => {
                drop(stats);
                let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::debug!(cycle, bytes = frame.len(), "Frame captured");
                self.emit(AttendanceEvent::StateChanged(
                    OrchestratorState::AwaitingDetection,
                ));

                let shared = self.clone();
                tokio::spawn(async move {
                    shared.run_cycle(generation, cycle, frame, dwell_time).await;
                });
            }
        }
    }

    /// One detect/submit/display pass. Entered in `AwaitingDetection`.
    async fn run_cycle(
        self: Arc<Self>,
        generation: u64,
        cycle: u64,
        frame: Frame,
        dwell_time: Duration,
    ) {
        self.stats.lock().detections += 1;
        let detected = bounded(
            self.timeouts.detect,
            "detection",
            self.detector.detect(&frame),
        )
        .await;

        let outcome = match detected {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(cycle, error = %e, "Face detection failed");
                self.stats.lock().detection_failures += 1;
                if self.transition(generation, OrchestratorState::Idle) {
                    self.emit(AttendanceEvent::CycleAborted(ErrorReport::from(&e)));
                }
                return;
            }
        };

        if !outcome.has_face() {
            tracing::trace!(cycle, "No face in frame");
            self.transition(generation, OrchestratorState::Idle);
            return;
        }

        tracing::info!(cycle, ?outcome, "Face detected, submitting frame");
        if !self.transition(generation, OrchestratorState::Submitting) {
            tracing::debug!(cycle, "Orchestrator stopped during detection, dropping cycle");
            return;
        }

        self.stats.lock().submissions += 1;
        let submitted = bounded(
            self.timeouts.submit,
            "identification",
            self.identifier.identify(&frame),
        )
        .await;
        drop(frame);

        let result = match submitted {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(cycle, error = %e, code = e.code(), "Identification request failed");
                SubmissionResult::TransportFailure
            }
        };

        if !self.transition(
            generation,
            OrchestratorState::DisplayingResult(result.clone()),
        ) {
            tracing::debug!(cycle, "Orchestrator stopped during submission, dropping result");
            return;
        }

        {
            let mut stats = self.stats.lock();
            match &result {
                SubmissionResult::Identified { .. } => stats.identified += 1,
                SubmissionResult::NoMatch => stats.not_found += 1,
                SubmissionResult::TransportFailure => stats.transport_failures += 1,
            }
        }

        match &result {
            SubmissionResult::Identified { name, roll_number } => {
                tracing::info!(cycle, %name, %roll_number, "Attendance marked");
            }
            _ => {
                tracing::info!(cycle, ?result, "Attendance not found");
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(dwell_time) => {}
            _ = self.dwell_cancel.notified() => {
                tracing::debug!(cycle, "Dwell cancelled");
                return;
            }
        }

        self.transition(generation, OrchestratorState::Idle);
    }
}

/// Await `fut`, failing with `Timeout` once `limit` elapses
async fn bounded<T, F>(limit: Option<Duration>, operation: &'static str, fut: F) -> AttendanceResult<T>
where
    F: Future<Output = AttendanceResult<T>>,
{
    match limit {
        Some(after) => tokio::time::timeout(after, fut)
            .await
            .map_err(|_| AttendanceError::Timeout { operation, after })?,
        None => fut.await,
    }
}
