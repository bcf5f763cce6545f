use crate::foundation::math::unpremultiply_rgba8_in_place;

/// Pixel dimensions of a drawing surface or host container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SurfaceSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl SurfaceSize {
    /// Construct a size from width and height.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Return `true` when either dimension is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of bytes needed for a tightly packed RGBA8 buffer of this size.
    pub fn rgba8_len(self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(4)
    }
}

/// Integer pixel rectangle where a frame lands on a surface.
///
/// `x`/`y` may be negative only for degenerate inputs; [`fit_contain`] never produces them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    /// Left edge in surface pixels.
    pub x: i64,
    /// Top edge in surface pixels.
    pub y: i64,
    /// Drawn width in pixels.
    pub width: u32,
    /// Drawn height in pixels.
    pub height: u32,
}

/// Compute a letterboxed/pillarboxed placement of a `src` image inside `dst`.
///
/// The image keeps its aspect ratio, fills `dst` edge-to-edge along one axis and is centred on the
/// other. Returns `None` when either size is empty.
pub fn fit_contain(src: SurfaceSize, dst: SurfaceSize) -> Option<Placement> {
    if src.is_empty() || dst.is_empty() {
        return None;
    }

    let src_ratio = f64::from(src.width) / f64::from(src.height);
    let dst_ratio = f64::from(dst.width) / f64::from(dst.height);

    let (width, height) = if src_ratio > dst_ratio {
        // wider than the surface: full width, bars top and bottom
        let h = (f64::from(dst.width) / src_ratio).round().max(1.0) as u32;
        (dst.width, h.min(dst.height))
    } else {
        let w = (f64::from(dst.height) * src_ratio).round().max(1.0) as u32;
        (w.min(dst.width), dst.height)
    };

    Some(Placement {
        x: i64::from((dst.width - width) / 2),
        y: i64::from((dst.height - height) / 2),
        width,
        height,
    })
}

/// A painted surface read back as RGBA8 pixels.
#[derive(Clone, Debug)]
pub struct FrameRgba {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRgba {
    /// Convert to straight alpha, as expected by PNG and most image files.
    pub fn into_straight(mut self) -> Self {
        if self.premultiplied {
            unpremultiply_rgba8_in_place(&mut self.data);
            self.premultiplied = false;
        }
        self
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
