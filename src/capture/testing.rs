//! Scripted capture used by the recorder and session tests.

use super::traits::{CaptureError, CaptureResult, CaptureSink, FrameSource, StreamCapture};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const HEAD: &[u8] = b"head;";
pub const TAIL: &[u8] = b"tail;";

/// Shared view into a [`ScriptedCapture`] that survives moving it into a controller
#[derive(Clone, Default)]
pub struct CaptureProbe {
    pub starts: Arc<AtomicUsize>,
    pub stops: Arc<AtomicUsize>,
    pub sink: Arc<Mutex<Option<CaptureSink>>>,
}

impl CaptureProbe {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Report an asynchronous failure as the native capture would
    pub fn fail(&self, error: CaptureError) {
        if let Some(sink) = self.sink.lock().as_ref() {
            sink.error(error);
        }
    }
}

/// Emits `HEAD` on start and, after `flush_delay`, `TAIL` followed by
/// `Finished` once a stop was requested.
pub struct ScriptedCapture {
    probe: CaptureProbe,
    flush_delay: Duration,
    fail_next_start: Option<CaptureError>,
    error_after_start: Option<CaptureError>,
}

impl ScriptedCapture {
    pub fn new(flush_delay: Duration) -> Self {
        Self {
            probe: CaptureProbe::default(),
            flush_delay,
            fail_next_start: None,
            error_after_start: None,
        }
    }

    pub fn failing_once(error: CaptureError) -> Self {
        Self {
            fail_next_start: Some(error),
            ..Self::new(Duration::ZERO)
        }
    }

    /// Starts fine once, then immediately reports `error` through the sink
    pub fn erroring_after_start(error: CaptureError) -> Self {
        Self {
            error_after_start: Some(error),
            ..Self::new(Duration::ZERO)
        }
    }

    pub fn probe(&self) -> CaptureProbe {
        self.probe.clone()
    }
}

#[async_trait]
impl StreamCapture for ScriptedCapture {
    fn mime_type(&self) -> &str {
        "application/x-test"
    }

    async fn start(&mut self, _frames: FrameSource, sink: CaptureSink) -> CaptureResult<()> {
        if let Some(error) = self.fail_next_start.take() {
            return Err(error);
        }
        self.probe.starts.fetch_add(1, Ordering::SeqCst);
        sink.chunk(HEAD.to_vec());
        if let Some(error) = self.error_after_start.take() {
            sink.error(error);
        }
        *self.probe.sink.lock() = Some(sink);
        Ok(())
    }

    async fn request_stop(&mut self) -> CaptureResult<()> {
        self.probe.stops.fetch_add(1, Ordering::SeqCst);
        let Some(sink) = self.probe.sink.lock().take() else {
            return Err(CaptureError::StreamClosed);
        };
        let delay = self.flush_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            sink.chunk(TAIL.to_vec());
            sink.finished();
        });
        Ok(())
    }
}
