//! Session orchestrator
//!
//! Sequences recording units across the problems of one sitting. All engine
//! state is mutated from the task that owns the orchestrator; the only other
//! tasks are the renderer loop and the capture, which talk back through
//! channels.

use super::problem::{OverwritePrompt, Problem, SurfaceProvider};
use super::store::BinaryStore;
use super::submission::{upload_result, SubmissionUnit};
use crate::activity::{ActivityState, ActivityTransition, PointerActivityClassifier, Tool};
use crate::analytics::ActivitySummary;
use crate::capture::StreamCapture;
use crate::config::EngineConfig;
use crate::recorder::{
    RecorderEvent, RecordingResult, RecordingStatus, SegmentKind, StillFrame,
    StreamRecordingController,
};
use crate::render::{encode_png, CompositeFrameRenderer, ProblemSurfaces};
use crate::utils::error::{EngineError, EngineResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;

/// Host UI events fed into [`SessionOrchestrator::run`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionInput {
    /// The canvas finished layout
    SurfacesReady,
    PointerDown,
    PointerUp,
    ToolChanged(Tool),
    AnswerFocus,
    AnswerBlur,
    CompleteProblem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Now showing the target problem
    Moved,
    /// The student kept the stored recording of the target; index unchanged
    Declined,
    /// Target was already the current problem
    Unchanged,
}

pub struct SessionOrchestrator<C: StreamCapture> {
    config: EngineConfig,
    problems: Vec<Problem>,
    current: usize,
    classifier: PointerActivityClassifier,
    recorder: StreamRecordingController<C>,
    renderer: CompositeFrameRenderer,
    surface_provider: Arc<dyn SurfaceProvider>,
    prompt: Arc<dyn OverwritePrompt>,
    results: HashMap<String, RecordingResult>,
    first_reaction: Option<f64>,
    submitted: bool,
    torn_down: bool,
}

impl<C: StreamCapture> SessionOrchestrator<C> {
    pub fn new(
        problems: Vec<Problem>,
        capture: C,
        surface_provider: Arc<dyn SurfaceProvider>,
        prompt: Arc<dyn OverwritePrompt>,
        config: EngineConfig,
    ) -> EngineResult<Self> {
        config.validate()?;
        let Some(first) = problems.first() else {
            return Err(EngineError::Session("assignment has no problems".to_string()));
        };

        let renderer = CompositeFrameRenderer::new(surface_provider.surfaces(first), &config);
        let mut classifier = PointerActivityClassifier::new(config.debounce_window());
        classifier.reset(Instant::now());

        tracing::info!("Session started with {} problems", problems.len());

        Ok(Self {
            config,
            problems,
            current: 0,
            classifier,
            recorder: StreamRecordingController::new(capture),
            renderer,
            surface_provider,
            prompt,
            results: HashMap::new(),
            first_reaction: None,
            submitted: false,
            torn_down: false,
        })
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_problem(&self) -> &Problem {
        &self.problems[self.current]
    }

    /// Layers of the visible problem, for the host to draw into
    pub fn surfaces(&self) -> &ProblemSurfaces {
        self.renderer.surfaces()
    }

    pub fn recorder_status(&self) -> RecordingStatus {
        self.recorder.status()
    }

    pub fn activity_state(&self) -> ActivityState {
        self.classifier.state()
    }

    pub fn debounce_armed(&self) -> bool {
        self.classifier.debounce_deadline().is_some()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RecorderEvent> {
        self.recorder.subscribe()
    }

    pub fn results(&self) -> &HashMap<String, RecordingResult> {
        &self.results
    }

    /// Stored results in problem order
    pub fn ordered_results(&self) -> Vec<&RecordingResult> {
        self.problems
            .iter()
            .filter_map(|p| self.results.get(&p.id))
            .collect()
    }

    pub fn summary_for(&self, problem_id: &str) -> Option<ActivitySummary> {
        self.results.get(problem_id).map(RecordingResult::summary)
    }

    /// Canvas-ready callback. Returns whether a unit is recording.
    pub async fn surfaces_ready(&mut self) -> EngineResult<bool> {
        self.apply_due(Instant::now())?;
        self.ensure_recording().await
    }

    /// Stroke start. Also starts the recording if nothing is running yet.
    ///
    /// A unit started here opens as writing, so the time before the first
    /// stroke only shows up as `first_reaction_seconds`. Hosts that want it as
    /// a leading paused segment call [`Self::surfaces_ready`] once the canvas
    /// is laid out.
    pub async fn pointer_down(&mut self) -> EngineResult<()> {
        let now = Instant::now();
        self.apply_due(now)?;
        self.ensure_recording().await?;
        if let Some(transition) = self.classifier.pointer_down(now) {
            self.apply(transition)?;
        }
        Ok(())
    }

    pub fn pointer_up(&mut self) {
        self.classifier.pointer_up(Instant::now());
    }

    pub fn tool_changed(&mut self, tool: Tool) -> EngineResult<()> {
        let now = Instant::now();
        self.apply_due(now)?;
        if let Some(transition) = self.classifier.tool_changed(tool, now) {
            self.apply(transition)?;
        }
        Ok(())
    }

    pub fn answer_focus(&mut self) -> EngineResult<()> {
        let now = Instant::now();
        self.apply_due(now)?;
        if let Some(transition) = self.classifier.answer_focus(now) {
            self.apply(transition)?;
        }
        Ok(())
    }

    pub fn answer_blur(&mut self) -> EngineResult<()> {
        let now = Instant::now();
        self.apply_due(now)?;
        if let Some(transition) = self.classifier.answer_blur(now) {
            self.apply(transition)?;
        }
        Ok(())
    }

    /// The student is done with this problem; remaining time reads as a pause
    pub fn complete_problem(&mut self) -> EngineResult<()> {
        let now = Instant::now();
        self.apply_due(now)?;
        self.classifier.complete(now);
        self.change_segment(SegmentKind::Paused, now)
    }

    /// Wait for the armed debounce timer and apply the resulting pause.
    ///
    /// Returns immediately when no timer is armed.
    pub async fn next_debounce(&mut self) -> EngineResult<()> {
        if let Some(transition) = self.classifier.debounce_elapsed().await {
            self.apply(transition)?;
        }
        Ok(())
    }

    pub async fn handle(&mut self, input: SessionInput) -> EngineResult<()> {
        match input {
            SessionInput::SurfacesReady => self.surfaces_ready().await.map(|_| ()),
            SessionInput::PointerDown => self.pointer_down().await,
            SessionInput::PointerUp => {
                self.pointer_up();
                Ok(())
            }
            SessionInput::ToolChanged(tool) => self.tool_changed(tool),
            SessionInput::AnswerFocus => self.answer_focus(),
            SessionInput::AnswerBlur => self.answer_blur(),
            SessionInput::CompleteProblem => self.complete_problem(),
        }
    }

    /// Process host input and debounce expiry until `inbox` closes
    pub async fn run(&mut self, inbox: &mut mpsc::UnboundedReceiver<SessionInput>) -> EngineResult<()> {
        loop {
            let armed = self.debounce_armed();
            tokio::select! {
                input = inbox.recv() => match input {
                    Some(input) => self.handle(input).await?,
                    None => break,
                },
                transition = self.classifier.debounce_elapsed(), if armed => {
                    if let Some(transition) = transition {
                        self.apply(transition)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Move to another problem, storing the current recording first
    pub async fn go_to_problem(&mut self, target: usize) -> EngineResult<TransitionOutcome> {
        if target >= self.problems.len() {
            return Err(EngineError::Session(format!(
                "problem index {} out of range (0..{})",
                target,
                self.problems.len()
            )));
        }
        if target == self.current {
            return Ok(TransitionOutcome::Unchanged);
        }

        self.finalize_current().await?;

        let target_id = self.problems[target].id.clone();
        let confirmed = match self.results.get(&target_id) {
            Some(existing) => Some(
                self.prompt
                    .confirm_overwrite(&self.problems[target], existing)
                    .await,
            ),
            None => None,
        };

        match confirmed {
            Some(false) => {
                tracing::info!(
                    "Revisit of problem {} declined, staying on problem {}",
                    target_id,
                    self.problems[self.current].id
                );
                return Ok(TransitionOutcome::Declined);
            }
            Some(true) => {
                tracing::info!("Discarding stored recording of problem {}", target_id);
                self.results.remove(&target_id);
            }
            None => {}
        }

        self.show_problem(target);
        Ok(TransitionOutcome::Moved)
    }

    /// Store the current recording and upload every result in problem order.
    ///
    /// On a store failure nothing is cleared, so the whole submission can be
    /// retried without recording again. Blobs saved before the failure stay in
    /// the store; their names derive from the result id, so the retry writes
    /// them again under the same names.
    pub async fn submit(&mut self, store: &dyn BinaryStore) -> EngineResult<Vec<SubmissionUnit>> {
        if self.submitted {
            return Err(EngineError::Session("session already submitted".to_string()));
        }

        self.finalize_current().await?;

        let mut units = Vec::new();
        for result in self.ordered_results() {
            let unit = upload_result(store, result).await.map_err(|e| {
                tracing::error!("Upload of problem {} failed: {}", result.problem_id, e);
                EngineError::Storage(e)
            })?;
            units.push(unit);
        }

        self.classifier.complete(Instant::now());
        self.results.clear();
        self.submitted = true;

        tracing::info!("Submitted {} recordings", units.len());
        Ok(units)
    }

    /// Stop everything tied to the visible problem, keeping its result.
    ///
    /// No further recording starts afterwards.
    pub async fn teardown(&mut self) -> EngineResult<()> {
        self.torn_down = true;
        let finalized = self.finalize_current().await;
        self.classifier.complete(Instant::now());
        finalized
    }

    async fn ensure_recording(&mut self) -> EngineResult<bool> {
        if self.submitted {
            tracing::debug!("Session already submitted, not recording");
            return Ok(false);
        }

        if self.torn_down {
            tracing::debug!("Session torn down, not recording");
            return Ok(false);
        }

        if !matches!(
            self.recorder.status(),
            RecordingStatus::Idle | RecordingStatus::Finalized | RecordingStatus::Errored
        ) {
            return Ok(true);
        }

        if self.classifier.state() == ActivityState::Completed {
            tracing::debug!(
                "Problem {} completed, not recording again",
                self.problems[self.current].id
            );
            return Ok(false);
        }
        self.recorder.reset();

        if !self.renderer.start() {
            return Ok(false);
        }

        let problem_id = self.problems[self.current].id.clone();
        if self.results.contains_key(&problem_id) {
            // Stored work of this problem is replaced when the new unit stops
            tracing::warn!(
                "Recording problem {} again; its stored result will be overwritten",
                problem_id
            );
        }

        let frames = self.renderer.frames();
        if let Err(e) = self.recorder.start(frames, problem_id, self.current).await {
            self.renderer.stop().await;
            self.recorder.reset();
            return Err(e);
        }

        // The unit opens as writing; line it up with what the student is doing
        if let Some(started) = self.recorder.unit_started() {
            let kind = self.classifier.segment_kind();
            if let Err(e) = self.recorder.on_segment_change(kind, started) {
                self.renderer.stop().await;
                self.recorder.reset();
                return Err(e);
            }
        }
        Ok(true)
    }

    fn apply(&mut self, transition: ActivityTransition) -> EngineResult<()> {
        if let Some(reaction) = transition.first_reaction {
            self.first_reaction = Some(reaction.as_secs_f64());
        }

        self.change_segment(transition.kind, transition.at)
    }

    /// A failed change leaves the recorder idle again
    fn change_segment(&mut self, kind: SegmentKind, at: Instant) -> EngineResult<()> {
        let changed = self.recorder.on_segment_change(kind, at);
        if changed.is_err() {
            self.recorder.reset();
        }
        changed
    }

    fn apply_due(&mut self, now: Instant) -> EngineResult<()> {
        match self.classifier.fire_due(now) {
            Some(transition) => self.apply(transition),
            None => Ok(()),
        }
    }

    fn capture_still_frame(&self) -> Option<StillFrame> {
        let frame = self.renderer.snapshot()?;
        match encode_png(&frame) {
            Ok(png) => Some(StillFrame {
                width: frame.width,
                height: frame.height,
                png,
            }),
            Err(e) => {
                tracing::warn!("Failed to encode still frame: {}", e);
                None
            }
        }
    }

    async fn finalize_current(&mut self) -> EngineResult<()> {
        let due = self.apply_due(Instant::now());
        self.classifier.cancel_debounce();

        if self.recorder.status() != RecordingStatus::Active {
            self.renderer.stop().await;
            return due;
        }

        let still_frame = self.capture_still_frame();
        let stopped = self.recorder.stop().await;
        self.renderer.stop().await;

        match stopped {
            Ok(Some(result)) => {
                let result = result
                    .with_still_frame(still_frame)
                    .with_first_reaction(self.first_reaction);
                tracing::info!(
                    "Stored recording of problem {} ({:.1}s)",
                    result.problem_id,
                    result.duration_seconds
                );
                self.results.insert(result.problem_id.clone(), result);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                self.recorder.reset();
                Err(e)
            }
        }
    }

    fn show_problem(&mut self, index: usize) {
        self.current = index;
        self.first_reaction = None;
        self.classifier.reset(Instant::now());
        self.recorder.reset();

        let problem = &self.problems[index];
        self.renderer = CompositeFrameRenderer::new(self.surface_provider.surfaces(problem), &self.config);

        tracing::info!("Showing problem {} (#{})", problem.id, index);
    }
}
