//! Canvas rendering
//!
//! Surfaces, background/ink compositing and the per-frame renderer that
//! feeds the capture stream.

pub mod compositor;
pub mod renderer;
pub mod surface;

pub use compositor::{compose, compose_surfaces, encode_png, CompositeFrame};
pub use renderer::CompositeFrameRenderer;
pub use surface::{masked_background, MaskRect, Point, ProblemSurfaces, Rgba, SharedSurface, Surface};
