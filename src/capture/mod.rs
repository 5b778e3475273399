//! Capture stream abstraction
//!
//! The recording controller only talks to [`StreamCapture`]. A built-in
//! PNG frame-sequence implementation is provided for hosts without a native
//! encoder.

pub mod frame_sequence;
pub mod traits;

pub use frame_sequence::{decode_frame_records, FrameRecord, FrameSequenceCapture, FRAME_SEQUENCE_MIME};
pub use traits::{
    capture_channel, CaptureError, CaptureEvent, CaptureResult, CaptureSink, FrameSource,
    StreamCapture,
};

#[cfg(test)]
pub(crate) mod testing;
