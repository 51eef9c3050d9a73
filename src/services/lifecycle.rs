use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::error::AppError;
use crate::models::classify_types::ClassificationResult;
use crate::models::history_types::{HistoryRecord, Statistics};
use crate::services::animation::AnimationPort;
use crate::services::camera::CameraPort;
use crate::services::classifier::{Classifier, Readiness};
use crate::services::history::HistoryStore;
use crate::services::image_source::{ImageHandle, ImageSource};

/// The classification session is always in exactly one of these states.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Captured,
    Classifying,
    Classified,
    Animating,
    Settled,
}

/// Payload carried by a state-transition event.
#[derive(Debug, Serialize, Clone)]
pub enum EventPayload {
    None,
    Image {
        locator: String,
    },
    Result(ClassificationResult),
    Error {
        message: String,
    },
    Persisted {
        record: HistoryRecord,
        statistics: Statistics,
    },
}

/// One event per state transition. The presentation layer renders purely
/// as a function of the latest event and feeds nothing back except the
/// discrete input operations below.
#[derive(Debug, Serialize, Clone)]
pub struct LifecycleEvent {
    pub state: LifecycleState,
    pub payload: EventPayload,
}

/// Where lifecycle events go. Adapters decide what to do with them:
/// render a UI, log, or collect in a test.
pub trait EventSink {
    fn emit(&mut self, event: &LifecycleEvent);
}

/// Sink that logs every transition.
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&mut self, event: &LifecycleEvent) {
        log::info!("lifecycle -> {:?}", event.state);
    }
}

/// Sink that records events for assertions.
#[derive(Default)]
pub struct VecSink(pub Vec<LifecycleEvent>);

impl EventSink for VecSink {
    fn emit(&mut self, event: &LifecycleEvent) {
        self.0.push(event.clone());
    }
}

/// A dispatched classification, tagged with the generation it belongs to.
/// Its completion is applied only while the tag still matches.
pub struct ClassifyJob {
    pub generation: u64,
    pub bytes: Arc<Vec<u8>>,
    pub locator: String,
}

/// Handle for an in-flight drop animation.
pub struct AnimationTicket {
    pub generation: u64,
}

/// The state machine driving capture -> classify -> animate -> persist.
///
/// Owns the current image handle, the lifecycle state, and the generation
/// counter. All mutation happens on the single control thread; slow
/// operations (classify, animation) run between `begin_*` and the
/// corresponding completion input, which is generation-guarded so a
/// superseded operation's result is silently discarded.
pub struct ClassificationLifecycle {
    state: LifecycleState,
    source: ImageSource,
    generation: u64,
    result: Option<ClassificationResult>,
}

impl Default for ClassificationLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassificationLifecycle {
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Idle,
            source: ImageSource::new(),
            generation: 0,
            result: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn image(&self) -> Option<&ImageHandle> {
        self.source.current()
    }

    pub fn result(&self) -> Option<&ClassificationResult> {
        self.result.as_ref()
    }

    /// A new captured frame arrives. Accepted from every state; any
    /// outstanding classify or animation is superseded via the generation
    /// counter and the prior image handle is released.
    pub fn image_captured(
        &mut self,
        bytes: Vec<u8>,
        sink: &mut impl EventSink,
    ) -> Result<(), AppError> {
        let locator = self.source.set_from_capture(bytes)?.locator.clone();
        self.supersede();
        self.set_state(LifecycleState::Captured, EventPayload::Image { locator }, sink);
        Ok(())
    }

    /// As [`image_captured`](Self::image_captured), for uploaded files.
    pub fn image_uploaded(
        &mut self,
        bytes: Vec<u8>,
        sink: &mut impl EventSink,
    ) -> Result<(), AppError> {
        let locator = self.source.set_from_upload(bytes)?.locator.clone();
        self.supersede();
        self.set_state(LifecycleState::Captured, EventPayload::Image { locator }, sink);
        Ok(())
    }

    /// Accept a classify request and hand back the generation-tagged job.
    /// Only legal from `Captured`; a second request while `Classifying`
    /// is rejected, never queued. Rejections leave the state untouched.
    pub fn begin_classify(&mut self, sink: &mut impl EventSink) -> Result<ClassifyJob, AppError> {
        match self.state {
            LifecycleState::Captured => {}
            LifecycleState::Classifying => return Err(AppError::DuplicateClassifyRejected),
            _ => {
                return Err(if self.source.current().is_none() {
                    AppError::NoImage
                } else {
                    AppError::DuplicateClassifyRejected
                });
            }
        }
        let handle = self.source.current().ok_or(AppError::NoImage)?;
        let job = ClassifyJob {
            generation: self.generation,
            bytes: handle.bytes(),
            locator: handle.locator.clone(),
        };
        self.set_state(LifecycleState::Classifying, EventPayload::None, sink);
        Ok(job)
    }

    /// Apply a finished classification. Discarded silently when the job's
    /// generation no longer matches or the machine has moved on.
    pub fn classification_succeeded(
        &mut self,
        generation: u64,
        result: ClassificationResult,
        sink: &mut impl EventSink,
    ) {
        if !self.accepts_completion(generation, LifecycleState::Classifying) {
            log::debug!("discarding stale classification result (gen {})", generation);
            return;
        }
        self.result = Some(result.clone());
        self.set_state(LifecycleState::Classified, EventPayload::Result(result), sink);
    }

    /// Apply a failed classification: back to `Captured`, image retained
    /// so the user may retry. Stale failures are discarded like stale
    /// successes.
    pub fn classification_failed(
        &mut self,
        generation: u64,
        error: &AppError,
        sink: &mut impl EventSink,
    ) {
        if !self.accepts_completion(generation, LifecycleState::Classifying) {
            log::debug!("discarding stale classification failure (gen {})", generation);
            return;
        }
        self.set_state(
            LifecycleState::Captured,
            EventPayload::Error {
                message: error.to_string(),
            },
            sink,
        );
    }

    /// Begin the externally owned drop effect. Only legal from
    /// `Classified`.
    pub fn animation_started(
        &mut self,
        sink: &mut impl EventSink,
    ) -> Result<AnimationTicket, AppError> {
        if self.state != LifecycleState::Classified {
            return Err(AppError::from("no classified result to present"));
        }
        self.set_state(LifecycleState::Animating, EventPayload::None, sink);
        Ok(AnimationTicket {
            generation: self.generation,
        })
    }

    /// The animation's completion signal. Persists the record; this is
    /// the only point a record is appended, so an interrupted animation
    /// never leaves an orphan. Late signals for a superseded generation
    /// are ignored.
    pub fn animation_completed(
        &mut self,
        generation: u64,
        history: &HistoryStore,
        sink: &mut impl EventSink,
    ) -> Result<Option<HistoryRecord>, AppError> {
        if !self.accepts_completion(generation, LifecycleState::Animating) {
            log::debug!("ignoring late animation completion (gen {})", generation);
            return Ok(None);
        }
        let Some(result) = self.result.clone() else {
            return Ok(None);
        };
        let image_locator = self
            .source
            .current()
            .map(|h| h.locator.clone())
            .unwrap_or_default();

        let record = history.append(HistoryRecord {
            id: None,
            label: result.label,
            bin: result.bin,
            category: result.category,
            confidence: result.confidence,
            timestamp: None,
            image_locator,
        })?;
        let statistics = history.statistics()?;

        self.set_state(
            LifecycleState::Settled,
            EventPayload::Persisted {
                record: record.clone(),
                statistics,
            },
            sink,
        );
        Ok(Some(record))
    }

    /// Release the image, discard any stored or in-flight result, and
    /// return to `Idle`. Legal from every state; a no-op when already
    /// idle with nothing held.
    pub fn clear_requested(&mut self, sink: &mut impl EventSink) {
        let was_idle = self.state == LifecycleState::Idle && self.source.current().is_none();
        self.supersede();
        self.source.clear();
        if !was_idle {
            self.set_state(LifecycleState::Idle, EventPayload::None, sink);
        }
    }

    /// Bump the generation so outstanding completions are discarded on
    /// arrival, and drop any stored result.
    fn supersede(&mut self) {
        self.generation += 1;
        self.result = None;
    }

    fn accepts_completion(&self, generation: u64, expected: LifecycleState) -> bool {
        self.state == expected && generation == self.generation
    }

    fn set_state(
        &mut self,
        to: LifecycleState,
        payload: EventPayload,
        sink: &mut impl EventSink,
    ) {
        log::debug!("lifecycle: {:?} -> {:?}", self.state, to);
        self.state = to;
        sink.emit(&LifecycleEvent { state: to, payload });
    }
}

/// Wires the lifecycle to its collaborators and drives the asynchronous
/// legs: classification (with timeout) and the animation await. This is
/// the explicit session object that replaces ambient globals. It owns
/// the state machine, the event sink, and the store handle.
pub struct Session<C: Classifier, S: EventSink> {
    lifecycle: ClassificationLifecycle,
    classifier: C,
    history: HistoryStore,
    sink: S,
    classify_timeout: Duration,
}

impl<C: Classifier, S: EventSink> Session<C, S> {
    pub fn new(classifier: C, history: HistoryStore, sink: S) -> Self {
        Self {
            lifecycle: ClassificationLifecycle::new(),
            classifier,
            history,
            sink,
            classify_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_classify_timeout(mut self, timeout: Duration) -> Self {
        self.classify_timeout = timeout;
        self
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn lifecycle(&self) -> &ClassificationLifecycle {
        &self.lifecycle
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Pull one frame from the camera and install it.
    pub fn capture(&mut self, camera: &mut impl CameraPort) -> Result<(), AppError> {
        let bytes = camera.capture_frame()?;
        self.lifecycle.image_captured(bytes, &mut self.sink)
    }

    pub fn upload(&mut self, bytes: Vec<u8>) -> Result<(), AppError> {
        self.lifecycle.image_uploaded(bytes, &mut self.sink)
    }

    /// Run one classification end to end. Readiness is checked before the
    /// machine moves, so a not-ready classifier leaves state at
    /// `Captured`. A timeout takes the same recovery path as a failure.
    pub async fn classify(&mut self) -> Result<(), AppError> {
        match self.classifier.readiness() {
            Readiness::Ready => {}
            Readiness::Loading => {
                return Err(AppError::ClassifierNotReady(
                    "model is still loading".to_string(),
                ))
            }
            Readiness::Failed(msg) => return Err(AppError::ClassifierNotReady(msg)),
        }

        let job = self.lifecycle.begin_classify(&mut self.sink)?;
        let outcome = tokio::time::timeout(
            self.classify_timeout,
            self.classifier.classify(job.bytes.as_slice()),
        )
        .await;

        match outcome {
            Ok(Ok(result)) => {
                self.lifecycle
                    .classification_succeeded(job.generation, result, &mut self.sink);
                Ok(())
            }
            Ok(Err(e)) => {
                self.lifecycle
                    .classification_failed(job.generation, &e, &mut self.sink);
                Err(e)
            }
            Err(_) => {
                let e = AppError::ClassifierTimeout;
                self.lifecycle
                    .classification_failed(job.generation, &e, &mut self.sink);
                Err(e)
            }
        }
    }

    /// Play the drop animation and, on its completion signal, persist the
    /// record and recompute statistics.
    pub async fn present(
        &mut self,
        animation: &mut impl AnimationPort,
    ) -> Result<Option<HistoryRecord>, AppError> {
        let Some(result) = self.lifecycle.result().cloned() else {
            return Err(AppError::from("no classified result to present"));
        };
        let ticket = self.lifecycle.animation_started(&mut self.sink)?;
        animation.play_drop(&result).await;
        self.lifecycle
            .animation_completed(ticket.generation, &self.history, &mut self.sink)
    }

    pub fn clear(&mut self) {
        self.lifecycle.clear_requested(&mut self.sink);
    }
}
