use std::borrow::Cow;

use image::imageops::FilterType;

use crate::assets::decode::FrameImage;
use crate::foundation::core::{FrameRgba, Placement, SurfaceSize};
use crate::foundation::math::{over_premul, premultiply_rgba8_in_place};

/// Drawing target for resolved frames (a canvas, a texture, a CPU buffer).
pub trait RenderSurface {
    /// Current pixel size.
    fn size(&self) -> SurfaceSize;

    /// Resize the backing store. Resizing discards all pixel content.
    fn resize(&mut self, size: SurfaceSize);

    /// Fill the whole surface with the background color.
    fn clear(&mut self);

    /// Clear, then draw `frame` scaled into `placement`.
    fn draw_frame(&mut self, frame: &FrameImage, placement: Placement);
}

/// CPU [`RenderSurface`] holding premultiplied RGBA8 pixels.
#[derive(Clone, Debug)]
pub struct PixelSurface {
    size: SurfaceSize,
    background: [u8; 4],
    data: Vec<u8>,
    draws: u64,
}

impl PixelSurface {
    /// Create a surface filled with `background_rgba` (straight alpha).
    pub fn new(size: SurfaceSize, background_rgba: [u8; 4]) -> Self {
        let mut background = background_rgba;
        premultiply_rgba8_in_place(&mut background);
        let mut out = Self {
            size,
            background,
            data: Vec::new(),
            draws: 0,
        };
        out.clear();
        out
    }

    /// Premultiplied pixel at `(x, y)`, `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        let i = (y as usize * self.size.width as usize + x as usize) * 4;
        let mut px = [0u8; 4];
        px.copy_from_slice(&self.data[i..i + 4]);
        Some(px)
    }

    /// Number of `draw_frame` calls since creation.
    pub fn draw_count(&self) -> u64 {
        self.draws
    }

    /// Copy the current pixels out.
    pub fn snapshot(&self) -> FrameRgba {
        FrameRgba {
            width: self.size.width,
            height: self.size.height,
            data: self.data.clone(),
            premultiplied: true,
        }
    }

    fn blit(&mut self, src: &[u8], placement: Placement) {
        let dst_w = i64::from(self.size.width);
        let dst_h = i64::from(self.size.height);
        let src_w = i64::from(placement.width);

        for row in 0..i64::from(placement.height) {
            let dy = placement.y + row;
            if dy < 0 || dy >= dst_h {
                continue;
            }
            for col in 0..src_w {
                let dx = placement.x + col;
                if dx < 0 || dx >= dst_w {
                    continue;
                }
                let si = ((row * src_w + col) * 4) as usize;
                let di = ((dy * dst_w + dx) * 4) as usize;
                over_premul(&mut self.data[di..di + 4], &src[si..si + 4]);
            }
        }
    }
}

impl RenderSurface for PixelSurface {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.size = size;
        self.clear();
    }

    fn clear(&mut self) {
        let len = self.size.rgba8_len();
        self.data.clear();
        self.data.reserve(len);
        for _ in 0..len / 4 {
            self.data.extend_from_slice(&self.background);
        }
    }

    fn draw_frame(&mut self, frame: &FrameImage, placement: Placement) {
        self.clear();
        self.draws += 1;
        if placement.width == 0 || placement.height == 0 {
            return;
        }

        let target = SurfaceSize::new(placement.width, placement.height);
        let scaled: Cow<'_, [u8]> = if frame.size() == target {
            Cow::Borrowed(frame.rgba8_premul.as_slice())
        } else {
            let Some(src) = image::ImageBuffer::<image::Rgba<u8>, &[u8]>::from_raw(
                frame.width,
                frame.height,
                frame.rgba8_premul.as_slice(),
            ) else {
                tracing::warn!(
                    width = frame.width,
                    height = frame.height,
                    "frame buffer does not match its dimensions"
                );
                return;
            };
            Cow::Owned(
                image::imageops::resize(&src, target.width, target.height, FilterType::Triangle)
                    .into_raw(),
            )
        };
        self.blit(&scaled, placement);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
