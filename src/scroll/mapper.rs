use crate::foundation::math::clamp_unit;

/// Host container position relative to the viewport, in CSS-like pixels.
///
/// Recomputed on every scroll and resize event; never persisted.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ViewportGeometry {
    /// Container top edge relative to the viewport top (negative once scrolled past).
    pub container_top: f64,
    /// Container height.
    pub container_height: f64,
    /// Viewport height.
    pub viewport_height: f64,
}

impl ViewportGeometry {
    /// Geometry for a container whose document offset is `container_offset` while the viewport is
    /// scrolled to `scroll_y`.
    pub fn from_scroll(
        scroll_y: f64,
        container_offset: f64,
        container_height: f64,
        viewport_height: f64,
    ) -> Self {
        Self {
            container_top: container_offset - scroll_y,
            container_height,
            viewport_height,
        }
    }
}

/// Converts viewport geometry into normalized scroll progress.
pub trait ProgressMapper {
    /// Map `geometry` to progress in `[0, 1]`. `None` means the container is not measured yet.
    fn map(&mut self, geometry: Option<ViewportGeometry>) -> f64;

    /// Value produced by the last `map` call (0 before the first call).
    fn last(&self) -> f64;
}

/// Viewport-relative normalization.
///
/// `progress = clamp((viewport_height - top) / (viewport_height + height), 0, 1)`: 0 while the
/// container's top edge is still at or below the viewport bottom, 1 once its bottom edge has left
/// above the viewport top.
#[derive(Clone, Copy, Debug, Default)]
pub struct ViewportProgress {
    last: f64,
}

impl ViewportProgress {
    /// Create a mapper with no cached value.
    pub fn new() -> Self {
        Self::default()
    }

    /// The normalization itself, without caching.
    pub fn progress(geometry: ViewportGeometry) -> f64 {
        let ViewportGeometry {
            container_top,
            container_height,
            viewport_height,
        } = geometry;
        let span = viewport_height + container_height;
        if !span.is_finite() || span <= 0.0 || !container_top.is_finite() {
            return 0.0;
        }
        clamp_unit((viewport_height - container_top) / span)
    }
}

impl ProgressMapper for ViewportProgress {
    fn map(&mut self, geometry: Option<ViewportGeometry>) -> f64 {
        self.last = geometry.map_or(0.0, Self::progress);
        self.last
    }

    fn last(&self) -> f64 {
        self.last
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scroll/mapper.rs"]
mod tests;
