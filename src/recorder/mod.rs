//! Recording system module
//!
//! - StreamRecordingController drives one capture stream per recording unit
//! - SegmentLog keeps the unit's activity timeline contiguous
//! - state holds the status machine and the finalized result types

pub mod controller;
pub mod segment_log;
pub mod state;

pub use controller::{RecorderEvent, StreamRecordingController};
pub use segment_log::SegmentLog;
pub use state::{
    MediaPayload, RecordingResult, RecordingStatus, Segment, SegmentKind, SegmentMetadata,
    StillFrame,
};
