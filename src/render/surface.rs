//! Drawable RGBA surfaces
//!
//! A problem canvas is two surfaces: a background holding the artwork with
//! masking rectangles baked in, and a transparent ink layer the student draws
//! on and erases from.

use crate::utils::error::{EngineError, EngineResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub type Rgba = [u8; 4];

pub const TRANSPARENT: Rgba = [0, 0, 0, 0];

/// Axis-aligned rectangle hidden from the student
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Row-major RGBA8 pixel buffer
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Surface {
    /// Fully transparent surface
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, TRANSPARENT)
    }

    pub fn filled(width: u32, height: u32, color: Rgba) -> Self {
        let pixels = color
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> EngineResult<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(EngineError::Render(format!(
                "expected {} bytes for a {}x{} surface, got {}",
                expected,
                width,
                height,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// False while layout has not given the surface a size yet
    pub fn has_extent(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = self.index(x, y);
        let mut out = TRANSPARENT;
        out.copy_from_slice(&self.pixels[idx..idx + 4]);
        Some(out)
    }

    /// Resize after a layout change. Content is discarded.
    pub fn resize(&mut self, width: u32, height: u32) {
        *self = Self::new(width, height);
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Opaque fill, clipped to the surface
    pub fn fill_rect(&mut self, rect: MaskRect, color: Rgba) {
        let x_end = rect.x.saturating_add(rect.width).min(self.width);
        let y_end = rect.y.saturating_add(rect.height).min(self.height);
        for y in rect.y..y_end {
            for x in rect.x..x_end {
                let idx = self.index(x, y);
                self.pixels[idx..idx + 4].copy_from_slice(&color);
            }
        }
    }

    /// Paint a round-capped stroke with source-over blending
    pub fn draw_line(&mut self, from: Point, to: Point, width: f32, color: Rgba) {
        self.stamp_segment(from, to, width, |px| blend_over(px, color, 1.0));
    }

    /// Clear a round-capped stroke back to transparent
    pub fn erase_line(&mut self, from: Point, to: Point, width: f32) {
        self.stamp_segment(from, to, width, |px| px.copy_from_slice(&TRANSPARENT));
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    fn stamp_segment(&mut self, from: Point, to: Point, width: f32, mut paint: impl FnMut(&mut [u8])) {
        if !self.has_extent() {
            return;
        }

        let radius = (width / 2.0).max(0.5);
        let radius_sq = radius * radius;
        let min_x = (from.x.min(to.x) - radius).floor().max(0.0) as u32;
        let min_y = (from.y.min(to.y) - radius).floor().max(0.0) as u32;
        let max_x = ((from.x.max(to.x) + radius).ceil().max(0.0) as u32).min(self.width - 1);
        let max_y = ((from.y.max(to.y) + radius).ceil().max(0.0) as u32).min(self.height - 1);

        let dx = to.x - from.x;
        let dy = to.y - from.y;
        let len_sq = dx * dx + dy * dy;

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;
                let t = if len_sq == 0.0 {
                    0.0
                } else {
                    (((px - from.x) * dx + (py - from.y) * dy) / len_sq).clamp(0.0, 1.0)
                };
                let cx = from.x + t * dx;
                let cy = from.y + t * dy;
                if (px - cx).powi(2) + (py - cy).powi(2) <= radius_sq {
                    let idx = self.index(x, y);
                    paint(&mut self.pixels[idx..idx + 4]);
                }
            }
        }
    }
}

/// Source-over blend of `src` (scaled by `opacity`) onto `dst`
pub(crate) fn blend_over(dst: &mut [u8], src: Rgba, opacity: f32) {
    let src_a = src[3] as f32 / 255.0 * opacity;
    if src_a <= 0.0 {
        return;
    }

    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);

    for c in 0..3 {
        let out = (src[c] as f32 * src_a + dst[c] as f32 * dst_a * (1.0 - src_a)) / out_a;
        dst[c] = out.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Bake masking rectangles into problem artwork
pub fn masked_background(mut artwork: Surface, masks: &[MaskRect], color: Rgba) -> Surface {
    for mask in masks {
        artwork.fill_rect(*mask, color);
    }
    artwork
}

pub type SharedSurface = Arc<RwLock<Surface>>;

/// The two layers of one problem canvas
#[derive(Debug, Clone)]
pub struct ProblemSurfaces {
    pub background: SharedSurface,
    pub ink: SharedSurface,
}

impl ProblemSurfaces {
    pub fn new(background: Surface, ink: Surface) -> Self {
        Self {
            background: Arc::new(RwLock::new(background)),
            ink: Arc::new(RwLock::new(ink)),
        }
    }

    /// Both layers have been laid out with a non-zero size
    pub fn is_ready(&self) -> bool {
        self.background.read().has_extent() && self.ink.read().has_extent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgba_checks_length() {
        assert!(Surface::from_rgba(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            Surface::from_rgba(2, 2, vec![0; 15]),
            Err(EngineError::Render(_))
        ));
    }

    #[test]
    fn test_masks_are_clipped() {
        let artwork = Surface::filled(4, 4, [255, 255, 255, 255]);
        let background = masked_background(
            artwork,
            &[MaskRect { x: 2, y: 2, width: 10, height: 10 }],
            [0, 0, 0, 255],
        );

        assert_eq!(background.pixel(1, 1), Some([255, 255, 255, 255]));
        assert_eq!(background.pixel(3, 3), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_draw_and_erase_line() {
        let mut ink = Surface::new(10, 10);
        ink.draw_line(Point::new(1.0, 5.0), Point::new(9.0, 5.0), 2.0, [255, 0, 0, 255]);
        assert_eq!(ink.pixel(5, 5), Some([255, 0, 0, 255]));
        assert_eq!(ink.pixel(5, 0), Some(TRANSPARENT));

        ink.erase_line(Point::new(0.0, 5.0), Point::new(10.0, 5.0), 4.0);
        assert_eq!(ink.pixel(5, 5), Some(TRANSPARENT));
    }

    #[test]
    fn test_zero_sized_surface_ignores_strokes() {
        let mut ink = Surface::new(0, 0);
        ink.draw_line(Point::new(0.0, 0.0), Point::new(5.0, 5.0), 3.0, [255, 0, 0, 255]);
        assert!(!ink.has_extent());
        assert!(ink.pixels().is_empty());
    }

    #[test]
    fn test_problem_surfaces_ready() {
        let surfaces = ProblemSurfaces::new(Surface::new(4, 4), Surface::new(0, 4));
        assert!(!surfaces.is_ready());
        surfaces.ink.write().resize(4, 4);
        assert!(surfaces.is_ready());
    }
}
