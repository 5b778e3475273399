//! Background + ink compositing

use super::surface::{blend_over, ProblemSurfaces, Surface};

/// One merged frame, ready for capture
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeFrame {
    pub width: u32,
    pub height: u32,
    /// RGBA8, row-major
    pub pixels: Vec<u8>,
}

impl CompositeFrame {
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.pixels[idx..idx + 4]);
        Some(out)
    }
}

/// Paint `background`, then `ink` on top of it.
///
/// The frame takes the background's size; ink outside it is clipped.
/// Returns `None` if either surface has no extent yet.
pub fn compose(background: &Surface, ink: &Surface, ink_opacity: f32) -> Option<CompositeFrame> {
    if !background.has_extent() || !ink.has_extent() {
        return None;
    }

    let width = background.width();
    let height = background.height();
    let mut pixels = background.pixels().to_vec();

    let overlap_w = width.min(ink.width()) as usize;
    let overlap_h = height.min(ink.height()) as usize;
    let ink_pixels = ink.pixels();

    for y in 0..overlap_h {
        for x in 0..overlap_w {
            let src_idx = (y * ink.width() as usize + x) * 4;
            let alpha = ink_pixels[src_idx + 3];
            if alpha == 0 {
                continue;
            }
            let dst_idx = (y * width as usize + x) * 4;
            let src = [
                ink_pixels[src_idx],
                ink_pixels[src_idx + 1],
                ink_pixels[src_idx + 2],
                alpha,
            ];
            blend_over(&mut pixels[dst_idx..dst_idx + 4], src, ink_opacity);
        }
    }

    Some(CompositeFrame {
        width,
        height,
        pixels,
    })
}

/// Compose the current contents of a problem canvas
pub fn compose_surfaces(surfaces: &ProblemSurfaces, ink_opacity: f32) -> Option<CompositeFrame> {
    let background = surfaces.background.read();
    let ink = surfaces.ink.read();
    compose(&background, &ink, ink_opacity)
}

/// Encode a frame as an RGBA PNG
pub fn encode_png(frame: &CompositeFrame) -> Result<Vec<u8>, png::EncodingError> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, frame.width, frame.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&frame.pixels)?;
        writer.finish()?;
    }
    Ok(out)
}
