use crate::foundation::core::{SurfaceSize, fit_contain};
use crate::render::surface::RenderSurface;
use crate::store::frame_store::FrameStore;

/// What a paint request did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaintOutcome {
    /// The frame was drawn.
    Painted(u32),
    /// The requested frame is not loaded; the previous picture stays on screen.
    Retained,
    /// Nothing to do: the frame is already on screen or the surface is empty.
    Skipped,
}

/// Paints resolved frames from a [`FrameStore`] into a [`RenderSurface`].
///
/// The driver only reads the store. A missing frame never clears the surface.
#[derive(Debug)]
pub struct SurfaceDriver<S> {
    surface: S,
    painted: Option<u32>,
    // last frame actually drawn; survives resizes that wipe the pixels
    last_good: Option<u32>,
}

impl<S: RenderSurface> SurfaceDriver<S> {
    /// Wrap `surface`; nothing is considered painted yet.
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            painted: None,
            last_good: None,
        }
    }

    /// Borrow the surface.
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Frame currently on screen, if any.
    pub fn painted_frame(&self) -> Option<u32> {
        self.painted
    }

    /// Size the surface to the container and forget prior content.
    pub fn mount(&mut self, size: SurfaceSize) {
        self.surface.resize(size);
        self.painted = None;
        self.last_good = None;
    }

    /// Follow a container resize.
    ///
    /// Resizing to the current size does nothing. Otherwise the surface is resized (which clears
    /// it) and immediately repainted with `resolved`, or with the last frame drawn before when
    /// `resolved` is not loaded. Collapsing to an empty size keeps that frame for the next
    /// non-empty resize. Returns `true` when the surface was resized.
    pub fn resize(&mut self, size: SurfaceSize, resolved: u32, store: &dyn FrameStore) -> bool {
        if size == self.surface.size() {
            return false;
        }
        self.surface.resize(size);
        self.painted = None;
        if size.is_empty() {
            return true;
        }

        if let PaintOutcome::Retained = self.paint(resolved, store)
            && let Some(prev) = self.last_good
        {
            self.paint(prev, store);
        }
        true
    }

    /// Paint `resolved` if it is loaded and not already on screen.
    pub fn paint(&mut self, resolved: u32, store: &dyn FrameStore) -> PaintOutcome {
        let size = self.surface.size();
        if size.is_empty() || self.painted == Some(resolved) {
            return PaintOutcome::Skipped;
        }
        let Some(frame) = store.get(resolved) else {
            return PaintOutcome::Retained;
        };
        let Some(placement) = fit_contain(frame.size(), size) else {
            return PaintOutcome::Skipped;
        };
        self.surface.draw_frame(frame, placement);
        self.painted = Some(resolved);
        self.last_good = Some(resolved);
        PaintOutcome::Painted(resolved)
    }
}

/// Readiness of the preload window, reported to the host's loading indicator.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LoadGate {
    window: u32,
    ready: bool,
}

impl LoadGate {
    /// Gate over the first `window` frames.
    pub fn new(window: u32) -> Self {
        Self {
            window,
            ready: window == 0,
        }
    }

    /// Size of the preload window.
    pub fn window(&self) -> u32 {
        self.window
    }

    /// `true` once every preload-window frame settled; stays `true` afterwards.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Percentage of the window settled, in `[0, 100]`.
    pub fn percent(&self, store: &dyn FrameStore) -> f64 {
        if self.ready || self.window == 0 {
            return 100.0;
        }
        f64::from(store.settled_in(0..self.window)) * 100.0 / f64::from(self.window)
    }

    /// Re-check the store. Returns `true` exactly once, on the transition to ready.
    pub fn update(&mut self, store: &dyn FrameStore) -> bool {
        if self.ready {
            return false;
        }
        self.ready = store.settled_in(0..self.window) >= self.window;
        self.ready
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/driver.rs"]
mod tests;
