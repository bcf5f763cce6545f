use std::sync::Arc;

use crate::foundation::core::SurfaceSize;
use crate::foundation::error::{ScrubError, ScrubResult};
use crate::foundation::math::premultiply_rgba8_in_place;

/// One decoded still of a sequence in premultiplied RGBA8 form.
#[derive(Clone, Debug)]
pub struct FrameImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl FrameImage {
    /// Wrap straight-alpha RGBA8 pixels, premultiplying them.
    pub fn from_straight_rgba8(width: u32, height: u32, mut rgba8: Vec<u8>) -> ScrubResult<Self> {
        let size = SurfaceSize::new(width, height);
        if size.is_empty() {
            return Err(ScrubError::decode("frame image must have non-zero dimensions"));
        }
        if rgba8.len() != size.rgba8_len() {
            return Err(ScrubError::decode(format!(
                "frame buffer is {} bytes, expected {} for {width}x{height}",
                rgba8.len(),
                size.rgba8_len()
            )));
        }
        premultiply_rgba8_in_place(&mut rgba8);
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba8),
        })
    }

    /// Pixel dimensions.
    pub fn size(&self) -> SurfaceSize {
        SurfaceSize::new(self.width, self.height)
    }
}

/// Decode encoded image bytes (PNG, JPEG, WebP, ...) into a [`FrameImage`].
pub fn decode_frame(bytes: &[u8]) -> ScrubResult<FrameImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| ScrubError::decode(format!("decode frame from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    FrameImage::from_straight_rgba8(width, height, rgba.into_raw())
}

/// Normalize and validate sequence-relative frame locators.
///
/// The normalized result uses `/` separators, removes `.` segments, and rejects absolute paths or
/// parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> ScrubResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(ScrubError::validation("frame paths must be relative"));
    }
    if s.is_empty() {
        return Err(ScrubError::validation("frame path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(ScrubError::validation("frame paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(ScrubError::validation("frame path must contain a file name"));
    }

    Ok(out.join("/"))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
