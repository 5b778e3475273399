//! Recording state management
//!
//! Defines the recording state machine and the records it produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current state of a recording unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordingStatus {
    /// No recording in progress
    #[default]
    Idle,
    /// Capture is being opened
    Starting,
    /// Currently recording
    Active,
    /// Waiting for the capture to flush its last chunk
    Stopping,
    /// Recording completed, result available
    Finalized,
    /// Capture failed, nothing was kept
    Errored,
}

/// Semantic activity of a time segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Writing,
    Erasing,
    Paused,
    Answering,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_rework: Option<bool>,
}

/// One typed interval of a recording
///
/// Times are milliseconds relative to the start of the recording unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub kind: SegmentKind,

    pub start_time: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SegmentMetadata>,
}

impl Segment {
    /// Open a new segment at `start_time`
    pub fn open(kind: SegmentKind, start_time: f64) -> Self {
        Self {
            kind,
            start_time,
            end_time: None,
            duration_seconds: None,
            metadata: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Stamp the end of the segment
    pub fn close(&mut self, end_time: f64) {
        let end_time = end_time.max(self.start_time);
        self.end_time = Some(end_time);
        self.duration_seconds = Some((end_time - self.start_time) / 1000.0);
    }

    /// Duration in seconds, zero while still open
    pub fn duration(&self) -> f64 {
        self.duration_seconds.unwrap_or(0.0)
    }

    pub fn is_rework(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|m| m.is_rework)
            .unwrap_or(false)
    }

    pub(crate) fn mark_rework(&mut self) {
        self.metadata = Some(SegmentMetadata {
            is_rework: Some(true),
        });
    }
}

/// Captured media of one recording unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPayload {
    pub mime_type: String,

    /// Number of chunks the capture emitted
    pub chunk_count: usize,

    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl MediaPayload {
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

/// PNG still of the composite taken when the unit stopped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StillFrame {
    pub width: u32,
    pub height: u32,

    #[serde(skip)]
    pub png: Vec<u8>,
}

/// Finalized, immutable record of one problem's recording
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingResult {
    pub id: Uuid,

    pub problem_id: String,

    pub problem_index: usize,

    /// Wall-clock time the unit started
    pub started_at: DateTime<Utc>,

    /// Elapsed time from start to stop, taken from the unit's own clock
    pub duration_seconds: f64,

    pub segments: Vec<Segment>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_reaction_seconds: Option<f64>,

    pub media: MediaPayload,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub still_frame: Option<StillFrame>,
}

impl RecordingResult {
    pub fn with_still_frame(mut self, still_frame: Option<StillFrame>) -> Self {
        self.still_frame = still_frame;
        self
    }

    pub fn with_first_reaction(mut self, seconds: Option<f64>) -> Self {
        self.first_reaction_seconds = seconds;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_wire_shape() {
        let mut segment = Segment::open(SegmentKind::Writing, 1000.0);
        segment.close(3500.0);
        segment.mark_rework();

        let json = serde_json::to_value(&segment).unwrap();
        assert_eq!(json["kind"], "writing");
        assert_eq!(json["startTime"], 1000.0);
        assert_eq!(json["endTime"], 3500.0);
        assert_eq!(json["durationSeconds"], 2.5);
        assert_eq!(json["metadata"]["isRework"], true);
    }

    #[test]
    fn test_open_segment_omits_end() {
        let segment = Segment::open(SegmentKind::Paused, 0.0);
        let json = serde_json::to_value(&segment).unwrap();
        assert!(json.get("endTime").is_none());
        assert!(json.get("metadata").is_none());
        assert_eq!(segment.duration(), 0.0);
    }

    #[test]
    fn test_close_never_goes_negative() {
        let mut segment = Segment::open(SegmentKind::Erasing, 500.0);
        segment.close(200.0);
        assert_eq!(segment.end_time, Some(500.0));
        assert_eq!(segment.duration(), 0.0);
    }
}
