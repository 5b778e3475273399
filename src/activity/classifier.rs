//! Pointer activity classifier
//!
//! Debounced state machine turning pointer-down/up, tool switches and answer
//! field focus into segment transitions. It keeps no timeline of its own;
//! every transition is handed back to the caller to apply to a segment log.

use crate::config::DEFAULT_DEBOUNCE_MS;
use crate::recorder::SegmentKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Pen,
    Eraser,
}

impl Tool {
    fn segment_kind(self) -> SegmentKind {
        match self {
            Tool::Pen => SegmentKind::Writing,
            Tool::Eraser => SegmentKind::Erasing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityState {
    Idle,
    Writing,
    Erasing,
    Paused,
    Answering,
    Completed,
}

impl ActivityState {
    fn from_kind(kind: SegmentKind) -> Self {
        match kind {
            SegmentKind::Writing => ActivityState::Writing,
            SegmentKind::Erasing => ActivityState::Erasing,
            SegmentKind::Paused => ActivityState::Paused,
            SegmentKind::Answering => ActivityState::Answering,
        }
    }

    fn is_drawing(self) -> bool {
        matches!(self, ActivityState::Writing | ActivityState::Erasing)
    }
}

/// Segment-change notification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivityTransition {
    pub kind: SegmentKind,
    pub at: Instant,
    /// Set on the first stroke after the problem became visible
    pub first_reaction: Option<Duration>,
}

#[derive(Debug, Clone, Copy)]
struct PendingPause {
    deadline: Instant,
    released_at: Instant,
}

#[derive(Debug)]
pub struct PointerActivityClassifier {
    state: ActivityState,
    state_since: Instant,
    tool: Tool,
    pointer_held: bool,
    visible_at: Instant,
    first_reaction_reported: bool,
    debounce_window: Duration,
    pending: Option<PendingPause>,
}

impl PointerActivityClassifier {
    pub fn new(debounce_window: Duration) -> Self {
        let now = Instant::now();
        Self {
            state: ActivityState::Idle,
            state_since: now,
            tool: Tool::Pen,
            pointer_held: false,
            visible_at: now,
            first_reaction_reported: false,
            debounce_window,
            pending: None,
        }
    }

    pub fn state(&self) -> ActivityState {
        self.state
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn is_idle(&self) -> bool {
        self.state == ActivityState::Idle
    }

    /// Segment kind a recording should currently be in.
    ///
    /// Idle and completed both read as a pause.
    pub fn segment_kind(&self) -> SegmentKind {
        match self.state {
            ActivityState::Writing => SegmentKind::Writing,
            ActivityState::Erasing => SegmentKind::Erasing,
            ActivityState::Answering => SegmentKind::Answering,
            ActivityState::Idle | ActivityState::Paused | ActivityState::Completed => {
                SegmentKind::Paused
            }
        }
    }

    /// Deadline of the armed debounce timer
    pub fn debounce_deadline(&self) -> Option<Instant> {
        self.pending.map(|p| p.deadline)
    }

    /// Back to idle for a newly visible problem
    pub fn reset(&mut self, visible_at: Instant) {
        self.state = ActivityState::Idle;
        self.state_since = visible_at;
        self.pointer_held = false;
        self.visible_at = visible_at;
        self.first_reaction_reported = false;
        self.pending = None;
    }

    pub fn pointer_down(&mut self, now: Instant) -> Option<ActivityTransition> {
        if self.state == ActivityState::Completed {
            return None;
        }

        self.pending = None;
        self.pointer_held = true;

        let first_reaction = if self.state == ActivityState::Idle && !self.first_reaction_reported {
            self.first_reaction_reported = true;
            let elapsed = now.saturating_duration_since(self.visible_at);
            tracing::debug!("First reaction after {:.2}s", elapsed.as_secs_f64());
            Some(elapsed)
        } else {
            None
        };

        let kind = self.tool.segment_kind();
        if self.state == ActivityState::from_kind(kind) {
            return None;
        }
        Some(self.enter(kind, now, first_reaction))
    }

    /// Arm the debounce timer; the stroke is not over until it fires
    pub fn pointer_up(&mut self, now: Instant) {
        self.pointer_held = false;
        if !self.state.is_drawing() {
            return;
        }
        self.pending = Some(PendingPause {
            deadline: now + self.debounce_window,
            released_at: now,
        });
    }

    pub fn tool_changed(&mut self, tool: Tool, now: Instant) -> Option<ActivityTransition> {
        self.tool = tool;
        if !self.state.is_drawing() {
            return None;
        }

        let kind = tool.segment_kind();
        if self.state == ActivityState::from_kind(kind) {
            return None;
        }
        Some(self.enter(kind, now, None))
    }

    /// Text answer field gained focus
    pub fn answer_focus(&mut self, now: Instant) -> Option<ActivityTransition> {
        if matches!(self.state, ActivityState::Answering | ActivityState::Completed) {
            return None;
        }
        self.pending = None;
        self.pointer_held = false;
        Some(self.enter(SegmentKind::Answering, now, None))
    }

    /// Text answer field lost focus
    pub fn answer_blur(&mut self, now: Instant) -> Option<ActivityTransition> {
        if self.state != ActivityState::Answering {
            return None;
        }
        Some(self.enter(SegmentKind::Paused, now, None))
    }

    /// Problem finished; everything after this is ignored
    pub fn complete(&mut self, now: Instant) {
        self.pending = None;
        self.pointer_held = false;
        self.state = ActivityState::Completed;
        self.state_since = now;
    }

    pub fn cancel_debounce(&mut self) {
        self.pending = None;
    }

    /// Fire the debounce if its deadline has passed by `now`.
    ///
    /// The pause is stamped at the pointer-up that armed the timer, not at the
    /// moment the timer fired.
    pub fn fire_due(&mut self, now: Instant) -> Option<ActivityTransition> {
        let pending = self.pending?;
        if pending.deadline > now {
            return None;
        }
        self.pending = None;

        if self.pointer_held || !self.state.is_drawing() {
            return None;
        }

        let at = pending.released_at.max(self.state_since);
        Some(self.enter(SegmentKind::Paused, at, None))
    }

    /// Wait for the armed debounce timer and fire it.
    ///
    /// Returns immediately with `None` if no timer is armed. Cancel-safe: if
    /// the future is dropped the timer stays armed.
    pub async fn debounce_elapsed(&mut self) -> Option<ActivityTransition> {
        let deadline = self.debounce_deadline()?;
        tokio::time::sleep_until(deadline).await;
        self.fire_due(Instant::now())
    }

    fn enter(
        &mut self,
        kind: SegmentKind,
        at: Instant,
        first_reaction: Option<Duration>,
    ) -> ActivityTransition {
        tracing::debug!("Activity {:?} -> {:?}", self.state, kind);
        self.state = ActivityState::from_kind(kind);
        self.state_since = at;
        ActivityTransition {
            kind,
            at,
            first_reaction,
        }
    }
}

impl Default for PointerActivityClassifier {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_DEBOUNCE_MS))
    }
}
