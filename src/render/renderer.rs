//! Per-frame composite renderer
//!
//! Keeps a capture source fed with fresh pixels whether or not the student
//! is drawing. The loop is a tokio task ticking at the configured frame rate
//! and publishing into a single-slot watch channel.

use super::compositor::{compose_surfaces, CompositeFrame};
use super::surface::ProblemSurfaces;
use crate::capture::FrameSource;
use crate::config::EngineConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

type FrameSender = watch::Sender<Option<Arc<CompositeFrame>>>;

pub struct CompositeFrameRenderer {
    surfaces: ProblemSurfaces,
    frame_interval: Duration,
    ink_opacity: f32,
    frame_tx: FrameSender,
    cancel_token: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

impl CompositeFrameRenderer {
    pub fn new(surfaces: ProblemSurfaces, config: &EngineConfig) -> Self {
        let (frame_tx, _) = watch::channel(None);
        Self {
            surfaces,
            frame_interval: config.frame_interval(),
            ink_opacity: config.ink_opacity,
            frame_tx,
            cancel_token: None,
            handle: None,
        }
    }

    pub fn surfaces(&self) -> &ProblemSurfaces {
        &self.surfaces
    }

    /// Receiver a capture can sample the latest frame from
    pub fn frames(&self) -> FrameSource {
        self.frame_tx.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Start the frame loop.
    ///
    /// Returns false without doing anything while either surface is still
    /// zero-sized; the caller retries once layout settles.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return true;
        }
        if !self.surfaces.is_ready() {
            tracing::debug!("Surfaces not laid out yet, deferring renderer start");
            return false;
        }

        // Publish one frame up front so a capture never starts on an empty slot
        self.render_once();

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(render_loop(
            self.surfaces.clone(),
            self.frame_tx.clone(),
            cancel_token.clone(),
            self.frame_interval,
            self.ink_opacity,
        ));

        self.cancel_token = Some(cancel_token);
        self.handle = Some(handle);
        tracing::debug!("Composite renderer started at {:?}/frame", self.frame_interval);
        true
    }

    /// Compose and publish a single frame immediately
    pub fn render_once(&self) -> bool {
        match compose_surfaces(&self.surfaces, self.ink_opacity) {
            Some(frame) => {
                self.frame_tx.send_replace(Some(Arc::new(frame)));
                true
            }
            None => false,
        }
    }

    /// Compose the current canvas without publishing it
    pub fn snapshot(&self) -> Option<CompositeFrame> {
        compose_surfaces(&self.surfaces, self.ink_opacity)
    }

    /// Cancel the frame loop and wait for it to exit
    pub async fn stop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!("Renderer task failed to join: {}", e);
            }
        }

        self.frame_tx.send_replace(None);
    }
}

impl Drop for CompositeFrameRenderer {
    fn drop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }
}

async fn render_loop(
    surfaces: ProblemSurfaces,
    frame_tx: FrameSender,
    cancel_token: CancellationToken,
    frame_interval: Duration,
    ink_opacity: f32,
) {
    let mut ticker = tokio::time::interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => break,
            _ = ticker.tick() => {
                // A surface collapsed to zero size mid-layout: skip this tick
                if let Some(frame) = compose_surfaces(&surfaces, ink_opacity) {
                    frame_tx.send_replace(Some(Arc::new(frame)));
                }
            }
        }
    }

    tracing::debug!("Composite renderer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::surface::{Point, Surface};

    fn config() -> EngineConfig {
        EngineConfig {
            frame_rate: 10,
            ..EngineConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_defers_until_surfaces_have_extent() {
        let surfaces = ProblemSurfaces::new(Surface::new(0, 0), Surface::new(0, 0));
        let mut renderer = CompositeFrameRenderer::new(surfaces, &config());

        assert!(!renderer.start());
        assert!(!renderer.is_running());
        assert!(renderer.frames().borrow().is_none());

        renderer.surfaces().background.write().resize(8, 8);
        renderer.surfaces().ink.write().resize(8, 8);
        assert!(renderer.start());
        assert!(renderer.is_running());
        renderer.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_follow_ink_changes() {
        let surfaces = ProblemSurfaces::new(
            Surface::filled(8, 8, [255, 255, 255, 255]),
            Surface::new(8, 8),
        );
        let mut renderer = CompositeFrameRenderer::new(surfaces.clone(), &config());
        let frames = renderer.frames();
        assert!(renderer.start());

        let first = frames.borrow().clone().unwrap();
        assert_eq!(first.pixel(4, 4), Some([255, 255, 255, 255]));

        surfaces
            .ink
            .write()
            .draw_line(Point::new(0.0, 4.0), Point::new(8.0, 4.0), 3.0, [0, 0, 255, 255]);
        tokio::time::sleep(Duration::from_millis(250)).await;

        let latest = frames.borrow().clone().unwrap();
        assert_eq!(latest.pixel(4, 4), Some([0, 0, 255, 255]));

        renderer.stop().await;
        assert!(!renderer.is_running());
        assert!(frames.borrow().is_none());
    }
}
