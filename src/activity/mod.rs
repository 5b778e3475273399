//! Pointer activity classification

pub mod classifier;

pub use classifier::{ActivityState, ActivityTransition, PointerActivityClassifier, Tool};
