//! Activity Recorder - activity-segmented recording of handwritten problem work.
//!
//! The engine watches pointer activity on a problem canvas, classifies it into
//! writing, erasing, pausing and answering segments, and records a composite
//! of the canvas per problem. Finished recordings are summarized and uploaded
//! as one submission unit per problem.
//!
//! - [`activity`] classifies pointer input into segment transitions
//! - [`render`] composes background and ink into capture frames
//! - [`capture`] abstracts the media stream behind [`capture::StreamCapture`]
//! - [`recorder`] runs one recording unit and keeps its segment timeline
//! - [`session`] sequences units across problems and handles submission
//! - [`analytics`] derives per-problem activity metrics

pub mod activity;
pub mod analytics;
pub mod capture;
pub mod config;
pub mod recorder;
pub mod render;
pub mod session;
pub mod utils;

pub use activity::{ActivityState, PointerActivityClassifier, Tool};
pub use analytics::{summarize, ActivitySummary};
pub use config::EngineConfig;
pub use recorder::{RecordingResult, RecordingStatus, Segment, SegmentKind, StreamRecordingController};
pub use render::CompositeFrameRenderer;
pub use session::{SessionInput, SessionOrchestrator, TransitionOutcome};
pub use utils::error::{EngineError, EngineResult};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a global tracing subscriber.
///
/// Honors `RUST_LOG`, falling back to debug output for this crate. Does
/// nothing if the host already installed a subscriber.
pub fn init_tracing() {
    let installed = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "activity_recorder=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if installed.is_ok() {
        tracing::info!("Activity recorder v{}", env!("CARGO_PKG_VERSION"));
    }
}
