//! Capture trait definitions
//!
//! Platform-agnostic contract between the recording controller and whatever
//! native facility turns composite frames into media.

use crate::render::CompositeFrame;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

/// Latest composite frame, `None` until the renderer produced one
pub type FrameSource = watch::Receiver<Option<Arc<CompositeFrame>>>;

/// Capture failures reported to the controller
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Capture not supported: {0}")]
    Unsupported(String),

    #[error("Capture device error: {0}")]
    Device(String),

    #[error("Capture already running")]
    AlreadyCapturing,

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Capture stream closed before flushing")]
    StreamClosed,
}

pub type CaptureResult<T> = Result<T, CaptureError>;

/// Notifications flowing from a running capture back to its owner
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    /// A buffered slice of encoded media
    Chunk(Vec<u8>),
    /// The capture failed and will not produce more data
    Error(CaptureError),
    /// The last chunk has been delivered
    Finished,
}

/// Sending half handed to a capture when it starts
#[derive(Debug, Clone)]
pub struct CaptureSink {
    tx: mpsc::UnboundedSender<CaptureEvent>,
}

impl CaptureSink {
    /// Deliver a chunk. Returns false if the owner is gone.
    pub fn chunk(&self, bytes: Vec<u8>) -> bool {
        self.tx.send(CaptureEvent::Chunk(bytes)).is_ok()
    }

    pub fn error(&self, error: CaptureError) {
        let _ = self.tx.send(CaptureEvent::Error(error));
    }

    /// Signal that every buffered chunk has been delivered
    pub fn finished(&self) {
        let _ = self.tx.send(CaptureEvent::Finished);
    }
}

/// Create a sink and the receiver the controller drains
pub fn capture_channel() -> (CaptureSink, mpsc::UnboundedReceiver<CaptureEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CaptureSink { tx }, rx)
}

/// A capture stream fed by composite frames
///
/// `request_stop` only asks the capture to wind down. The capture confirms
/// through [`CaptureSink::finished`] once its last chunk is out, which may
/// happen well after `request_stop` returns.
#[async_trait]
pub trait StreamCapture: Send {
    /// MIME type of the chunks this capture emits
    fn mime_type(&self) -> &str;

    /// Begin continuous capture of `frames`
    async fn start(&mut self, frames: FrameSource, sink: CaptureSink) -> CaptureResult<()>;

    /// Ask the capture to flush and finish
    async fn request_stop(&mut self) -> CaptureResult<()>;
}
