//! PNG frame-sequence capture
//!
//! Samples the composite frame source at a fixed rate, encodes each sample
//! as PNG and emits the buffered records as a chunk once per timeslice. On
//! stop the loop grabs one last frame, flushes whatever is buffered and only
//! then reports `Finished`.
//!
//! Record layout: `[u64 LE offset_ms][u32 LE length][png bytes]`.

use super::traits::{CaptureError, CaptureResult, CaptureSink, FrameSource, StreamCapture};
use crate::config::EngineConfig;
use crate::render::encode_png;
use async_trait::async_trait;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const FRAME_SEQUENCE_MIME: &str = "application/x-png-frame-sequence";

const RECORD_HEADER_LEN: usize = 12;

/// One decoded frame of a frame-sequence stream
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub offset_ms: u64,
    pub png: Vec<u8>,
}

pub struct FrameSequenceCapture {
    frame_interval: Duration,
    timeslice: Duration,
    cancel_token: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

impl FrameSequenceCapture {
    pub fn new(frame_interval: Duration, timeslice: Duration) -> Self {
        Self {
            frame_interval,
            timeslice,
            cancel_token: None,
            handle: None,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.frame_interval(), config.chunk_interval())
    }
}

#[async_trait]
impl StreamCapture for FrameSequenceCapture {
    fn mime_type(&self) -> &str {
        FRAME_SEQUENCE_MIME
    }

    async fn start(&mut self, frames: FrameSource, sink: CaptureSink) -> CaptureResult<()> {
        if self.handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return Err(CaptureError::AlreadyCapturing);
        }
        if frames.has_changed().is_err() {
            return Err(CaptureError::Unsupported(
                "frame source has no renderer behind it".to_string(),
            ));
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(capture_loop(
            frames,
            sink,
            cancel_token.clone(),
            self.frame_interval,
            self.timeslice,
        ));

        self.cancel_token = Some(cancel_token);
        self.handle = Some(handle);
        tracing::info!("Frame-sequence capture started");
        Ok(())
    }

    async fn request_stop(&mut self) -> CaptureResult<()> {
        // The loop flushes and reports through the sink on its own schedule
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.handle = None;
        Ok(())
    }
}

async fn capture_loop(
    frames: FrameSource,
    sink: CaptureSink,
    cancel_token: CancellationToken,
    frame_interval: Duration,
    timeslice: Duration,
) {
    let started = Instant::now();
    let mut last_flush = started;
    let mut buffer = Vec::new();

    let mut ticker = tokio::time::interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = append_latest(&frames, &mut buffer, started) {
                    tracing::error!("Frame encoding failed: {}", e);
                    sink.error(e);
                    return;
                }
                if !buffer.is_empty() && last_flush.elapsed() >= timeslice {
                    if !sink.chunk(std::mem::take(&mut buffer)) {
                        tracing::debug!("Capture owner went away, stopping");
                        return;
                    }
                    last_flush = Instant::now();
                }
            }
        }
    }

    // Trailing strokes drawn since the last tick
    if let Err(e) = append_latest(&frames, &mut buffer, started) {
        sink.error(e);
        return;
    }
    if !buffer.is_empty() {
        sink.chunk(buffer);
    }
    sink.finished();
    tracing::debug!("Frame-sequence capture flushed");
}

fn append_latest(frames: &FrameSource, buffer: &mut Vec<u8>, started: Instant) -> CaptureResult<()> {
    let Some(frame) = frames.borrow().clone() else {
        return Ok(());
    };
    let png = encode_png(&frame).map_err(|e| CaptureError::Encoding(e.to_string()))?;
    let offset_ms = started.elapsed().as_millis() as u64;

    buffer.extend_from_slice(&offset_ms.to_le_bytes());
    buffer.extend_from_slice(&(png.len() as u32).to_le_bytes());
    buffer.extend_from_slice(&png);
    Ok(())
}

/// Split a frame-sequence payload back into its records.
///
/// A truncated trailing record is ignored.
pub fn decode_frame_records(bytes: &[u8]) -> Vec<FrameRecord> {
    let mut records = Vec::new();
    let mut rest = bytes;

    while rest.len() >= RECORD_HEADER_LEN {
        let (header, body) = rest.split_at(RECORD_HEADER_LEN);
        let mut offset = [0u8; 8];
        offset.copy_from_slice(&header[..8]);
        let mut len = [0u8; 4];
        len.copy_from_slice(&header[8..]);
        let len = u32::from_le_bytes(len) as usize;

        if body.len() < len {
            tracing::warn!("Truncated frame record ({} of {} bytes)", body.len(), len);
            break;
        }

        records.push(FrameRecord {
            offset_ms: u64::from_le_bytes(offset),
            png: body[..len].to_vec(),
        });
        rest = &body[len..];
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::traits::{capture_channel, CaptureEvent};
    use crate::render::CompositeFrame;
    use std::sync::Arc;
    use tokio::sync::watch;

    fn frame() -> Arc<CompositeFrame> {
        Arc::new(CompositeFrame {
            width: 2,
            height: 2,
            pixels: vec![255; 16],
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_chunk_arrives_after_stop() {
        let (frame_tx, frames) = watch::channel(Some(frame()));
        let (sink, mut events) = capture_channel();
        let mut capture =
            FrameSequenceCapture::new(Duration::from_millis(100), Duration::from_secs(10));

        capture.start(frames, sink).await.unwrap();
        tokio::time::sleep(Duration::from_millis(350)).await;
        capture.request_stop().await.unwrap();

        let mut bytes = Vec::new();
        loop {
            match events.recv().await {
                Some(CaptureEvent::Chunk(chunk)) => bytes.extend(chunk),
                Some(CaptureEvent::Finished) => break,
                other => panic!("unexpected event: {:?}", other),
            }
        }

        // Timeslice never elapsed, so everything came in the final flush
        let records = decode_frame_records(&bytes);
        assert!(records.len() >= 4);
        assert!(records.windows(2).all(|w| w[0].offset_ms <= w[1].offset_ms));
        drop(frame_tx);
    }

    #[tokio::test(start_paused = true)]
    async fn test_emits_chunks_per_timeslice() {
        let (_frame_tx, frames) = watch::channel(Some(frame()));
        let (sink, mut events) = capture_channel();
        let mut capture =
            FrameSequenceCapture::new(Duration::from_millis(100), Duration::from_millis(300));

        capture.start(frames, sink).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1000)).await;

        let mut chunks = 0;
        while let Ok(CaptureEvent::Chunk(_)) = events.try_recv() {
            chunks += 1;
        }
        assert!(chunks >= 2);
        capture.request_stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_orphaned_frame_source() {
        let (frame_tx, frames) = watch::channel(None);
        drop(frame_tx);
        let (sink, _events) = capture_channel();
        let mut capture = FrameSequenceCapture::new(Duration::from_millis(100), Duration::from_secs(1));

        let result = capture.start(frames, sink).await;
        assert!(matches!(result, Err(CaptureError::Unsupported(_))));
    }

    #[test]
    fn test_decode_ignores_truncated_tail() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&5u64.to_le_bytes());
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&[1, 2, 3]);
        bytes.extend_from_slice(&9u64.to_le_bytes());
        bytes.extend_from_slice(&10u32.to_le_bytes());
        bytes.extend_from_slice(&[1, 2]);

        let records = decode_frame_records(&bytes);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].offset_ms, 5);
        assert_eq!(records[0].png, vec![1, 2, 3]);
    }
}
