//! Problem sessions
//!
//! - SessionOrchestrator sequences recording units across problems
//! - problem holds the host-facing collaborators (surfaces, overwrite prompt)
//! - store and submission turn finished results into uploaded wire units

pub mod orchestrator;
pub mod problem;
pub mod store;
pub mod submission;

pub use orchestrator::{SessionInput, SessionOrchestrator, TransitionOutcome};
pub use problem::{BlankCanvas, FixedAnswer, OverwritePrompt, Problem, SurfaceProvider};
pub use store::{BinaryStore, FsBinaryStore};
pub use submission::{upload_result, BlobRef, SubmissionUnit};
