//! Recording controller
//!
//! Owns one capture stream and the segment log of the recording unit it is
//! feeding, and turns both into a [`RecordingResult`] once the capture has
//! flushed.

use super::segment_log::SegmentLog;
use super::state::{MediaPayload, RecordingResult, RecordingStatus, Segment, SegmentKind};
use crate::capture::{capture_channel, CaptureError, CaptureEvent, FrameSource, StreamCapture};
use crate::utils::error::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use uuid::Uuid;

/// Events emitted during recording
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderEvent {
    /// Capture is running for a problem
    Started { problem_id: String },
    /// A new segment became the open one
    SegmentOpened { kind: SegmentKind, start_time: f64 },
    /// Unit finalized
    Stopped { duration_seconds: f64 },
    /// Capture failed
    Error(String),
}

/// In-flight recording unit
struct ActiveUnit {
    id: Uuid,
    problem_id: String,
    problem_index: usize,
    started: Instant,
    started_at: DateTime<Utc>,
    log: SegmentLog,
    events: mpsc::UnboundedReceiver<CaptureEvent>,
    chunks: Vec<Vec<u8>>,
}

impl ActiveUnit {
    fn offset_ms(&self, at: Instant) -> f64 {
        at.saturating_duration_since(self.started).as_secs_f64() * 1000.0
    }
}

pub struct StreamRecordingController<C: StreamCapture> {
    capture: C,
    status: RecordingStatus,
    unit: Option<ActiveUnit>,
    last_result: Option<RecordingResult>,
    event_tx: broadcast::Sender<RecorderEvent>,
}

impl<C: StreamCapture> StreamRecordingController<C> {
    pub fn new(capture: C) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            capture,
            status: RecordingStatus::Idle,
            unit: None,
            last_result: None,
            event_tx,
        }
    }

    pub fn status(&self) -> RecordingStatus {
        self.status
    }

    /// Subscribe to recorder events
    pub fn subscribe(&self) -> broadcast::Receiver<RecorderEvent> {
        self.event_tx.subscribe()
    }

    /// Problem of the active unit
    pub fn problem_id(&self) -> Option<&str> {
        self.unit.as_ref().map(|u| u.problem_id.as_str())
    }

    /// Instant the active unit started
    pub fn unit_started(&self) -> Option<Instant> {
        self.unit.as_ref().map(|u| u.started)
    }

    /// Segments of the active unit, the last one possibly open
    pub fn segments(&self) -> &[Segment] {
        self.unit.as_ref().map(|u| u.log.segments()).unwrap_or(&[])
    }

    /// Seconds since the active unit started, or the finalized duration
    pub fn elapsed_seconds(&self) -> f64 {
        match (&self.unit, &self.last_result) {
            (Some(unit), _) => unit.started.elapsed().as_secs_f64(),
            (None, Some(result)) => result.duration_seconds,
            (None, None) => 0.0,
        }
    }

    /// Start a recording unit.
    ///
    /// Does nothing unless the controller is idle, so several trigger paths
    /// may race to start the same unit.
    pub async fn start(
        &mut self,
        frames: FrameSource,
        problem_id: impl Into<String>,
        problem_index: usize,
    ) -> EngineResult<()> {
        let problem_id = problem_id.into();
        if self.status != RecordingStatus::Idle {
            tracing::debug!(
                "Ignoring start for problem {}: recorder is {:?}",
                problem_id,
                self.status
            );
            return Ok(());
        }

        let started = Instant::now();
        self.status = RecordingStatus::Starting;

        let (sink, events) = capture_channel();
        if let Err(e) = self.capture.start(frames, sink).await {
            tracing::error!("Failed to start capture for problem {}: {}", problem_id, e);
            return Err(self.fail(e));
        }

        let mut log = SegmentLog::new();
        log.begin(SegmentKind::Writing, 0.0);

        self.unit = Some(ActiveUnit {
            id: Uuid::new_v4(),
            problem_id: problem_id.clone(),
            problem_index,
            started,
            started_at: Utc::now(),
            log,
            events,
            chunks: Vec::new(),
        });
        self.status = RecordingStatus::Active;

        let _ = self.event_tx.send(RecorderEvent::Started {
            problem_id: problem_id.clone(),
        });
        let _ = self.event_tx.send(RecorderEvent::SegmentOpened {
            kind: SegmentKind::Writing,
            start_time: 0.0,
        });

        tracing::info!("Recording started for problem {} (#{})", problem_id, problem_index);
        Ok(())
    }

    /// Close the open segment and open one of `kind` at `at`
    pub fn on_segment_change(&mut self, kind: SegmentKind, at: Instant) -> EngineResult<()> {
        if self.status != RecordingStatus::Active {
            tracing::debug!("Segment change to {:?} ignored: recorder is {:?}", kind, self.status);
            return Ok(());
        }
        self.poll_capture()?;

        let Some(unit) = self.unit.as_mut() else {
            return Ok(());
        };
        let at_ms = unit.offset_ms(at);
        if unit.log.transition(kind, at_ms) {
            let start_time = unit.log.current().map(|s| s.start_time).unwrap_or(at_ms);
            tracing::debug!("Segment {:?} opened at {:.0}ms", kind, start_time);
            let _ = self.event_tx.send(RecorderEvent::SegmentOpened { kind, start_time });
        }
        Ok(())
    }

    /// Collect chunks the capture has delivered so far.
    ///
    /// A failure reported by the capture tears the unit down.
    pub fn poll_capture(&mut self) -> EngineResult<()> {
        let Some(unit) = self.unit.as_mut() else {
            return Ok(());
        };

        let failure = loop {
            match unit.events.try_recv() {
                Ok(CaptureEvent::Chunk(chunk)) => unit.chunks.push(chunk),
                Ok(CaptureEvent::Error(e)) => break e,
                Ok(CaptureEvent::Finished) => {
                    tracing::warn!("Capture finished before a stop was requested");
                    break CaptureError::StreamClosed;
                }
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => break CaptureError::StreamClosed,
            }
        };

        tracing::error!("Capture failed mid-recording: {}", failure);
        Err(self.fail(failure))
    }

    /// Stop the unit and wait for the capture's final chunk.
    ///
    /// Resolves with `None` when nothing is recording. Once finalized, further
    /// calls return the same result without touching the capture again.
    pub async fn stop(&mut self) -> EngineResult<Option<RecordingResult>> {
        match self.status {
            RecordingStatus::Finalized => return Ok(self.last_result.clone()),
            RecordingStatus::Active => {}
            _ => return Ok(None),
        }

        let Some(mut unit) = self.unit.take() else {
            self.status = RecordingStatus::Errored;
            return Err(EngineError::Recording(
                "recorder is active without a recording unit".to_string(),
            ));
        };

        let stopped = Instant::now();
        self.status = RecordingStatus::Stopping;
        unit.log.close(unit.offset_ms(stopped));

        tracing::info!("Stopping recording for problem {}", unit.problem_id);

        if let Err(e) = self.capture.request_stop().await {
            return Err(self.fail(e));
        }

        loop {
            match unit.events.recv().await {
                Some(CaptureEvent::Chunk(chunk)) => unit.chunks.push(chunk),
                Some(CaptureEvent::Finished) => break,
                Some(CaptureEvent::Error(e)) => return Err(self.fail(e)),
                None => return Err(self.fail(CaptureError::StreamClosed)),
            }
        }

        let duration_seconds = stopped.saturating_duration_since(unit.started).as_secs_f64();
        let media = MediaPayload {
            mime_type: self.capture.mime_type().to_string(),
            chunk_count: unit.chunks.len(),
            bytes: unit.chunks.concat(),
        };

        let result = RecordingResult {
            id: unit.id,
            problem_id: unit.problem_id,
            problem_index: unit.problem_index,
            started_at: unit.started_at,
            duration_seconds,
            segments: unit.log.into_segments(),
            first_reaction_seconds: None,
            media,
            still_frame: None,
        };

        self.status = RecordingStatus::Finalized;
        self.last_result = Some(result.clone());
        let _ = self.event_tx.send(RecorderEvent::Stopped { duration_seconds });

        tracing::info!(
            "Recording stopped. Duration: {:.2}s, {} segments, {} bytes",
            duration_seconds,
            result.segments.len(),
            result.media.size_bytes()
        );
        Ok(Some(result))
    }

    /// Return a finalized or failed controller to idle so a new unit can start
    pub fn reset(&mut self) {
        match self.status {
            RecordingStatus::Finalized | RecordingStatus::Errored => {
                self.status = RecordingStatus::Idle;
                self.last_result = None;
            }
            RecordingStatus::Idle => {}
            other => tracing::warn!("Refusing to reset a recorder that is {:?}", other),
        }
    }

    fn fail(&mut self, error: CaptureError) -> EngineError {
        self.unit = None;
        self.status = RecordingStatus::Errored;
        let _ = self.event_tx.send(RecorderEvent::Error(error.to_string()));
        EngineError::Capture(error)
    }
}
