use std::ops::RangeInclusive;

use crate::foundation::error::{ScrubError, ScrubResult};
use crate::foundation::math::clamp_unit;

/// Below this distance (in frames) interpolation snaps to the target.
pub const SNAP_EPSILON: f64 = 0.01;

/// How the displayed frame follows the scroll-derived target.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Smoothing {
    /// Display the target frame as soon as progress changes.
    Immediate,
    /// Each refresh tick moves `factor` of the remaining distance toward the target.
    Interpolated {
        /// Gain in `(0, 1]`; larger converges faster.
        factor: f64,
    },
}

impl Default for Smoothing {
    fn default() -> Self {
        Self::Interpolated { factor: 0.15 }
    }
}

impl Smoothing {
    /// Reject gains outside `(0, 1]`.
    pub fn validate(self) -> ScrubResult<()> {
        match self {
            Self::Immediate => Ok(()),
            Self::Interpolated { factor } => {
                if factor.is_finite() && factor > 0.0 && factor <= 1.0 {
                    Ok(())
                } else {
                    Err(ScrubError::validation(format!(
                        "smoothing factor must be in (0, 1], got {factor}"
                    )))
                }
            }
        }
    }

    /// Whether a per-refresh tick loop is required.
    pub fn needs_tick_loop(self) -> bool {
        matches!(self, Self::Interpolated { .. })
    }
}

/// Frames requested around the resolved frame on every update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PrefetchWindow {
    /// Frames after the resolved one (direction of increasing progress).
    pub ahead: u32,
    /// Frames before the resolved one.
    pub behind: u32,
}

impl Default for PrefetchWindow {
    fn default() -> Self {
        Self {
            ahead: 5,
            behind: 1,
        }
    }
}

/// Target and displayed frame positions, both within `[0, frame_count - 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlaybackState {
    /// Position derived from the latest progress value.
    pub target_frame: f64,
    /// Smoothed position actually displayed.
    pub current_frame: f64,
}

/// Turns scroll progress into the frame to display.
pub trait PlaybackController {
    /// Number of frames the controller maps onto.
    fn frame_count(&self) -> u32;

    /// Set the target from `progress`. Returns `true` when the target moved.
    fn on_progress(&mut self, progress: f64) -> bool;

    /// Jump both target and current frame to `progress` without smoothing.
    fn reset(&mut self, progress: f64);

    /// Advance smoothing by one refresh tick. Returns `true` when the current frame moved.
    fn tick(&mut self) -> bool;

    /// Current state.
    fn state(&self) -> PlaybackState;

    /// `floor(current_frame)` clamped to the sequence.
    fn resolved_frame(&self) -> u32;

    /// `true` once the current frame has reached the target.
    fn is_converged(&self) -> bool;

    /// Indices to prefetch around the resolved frame.
    fn prefetch_range(&self) -> RangeInclusive<u32>;

    /// Smoothing mode chosen at construction.
    fn smoothing(&self) -> Smoothing;
}

/// Default [`PlaybackController`] with a linear progress-to-frame mapping.
#[derive(Clone, Debug)]
pub struct FrameController {
    last_index: u32,
    smoothing: Smoothing,
    window: PrefetchWindow,
    state: PlaybackState,
}

impl FrameController {
    /// Create a controller for `frame_count` frames positioned at frame 0.
    pub fn new(
        frame_count: u32,
        smoothing: Smoothing,
        window: PrefetchWindow,
    ) -> ScrubResult<Self> {
        if frame_count == 0 {
            return Err(ScrubError::validation("frame_count must be > 0"));
        }
        smoothing.validate()?;
        Ok(Self {
            last_index: frame_count - 1,
            smoothing,
            window,
            state: PlaybackState::default(),
        })
    }

    fn clamp_frame(&self, f: f64) -> f64 {
        if f.is_nan() {
            return 0.0;
        }
        f.clamp(0.0, f64::from(self.last_index))
    }

    fn frame_for(&self, progress: f64) -> f64 {
        self.clamp_frame(clamp_unit(progress) * f64::from(self.last_index))
    }
}

impl PlaybackController for FrameController {
    fn frame_count(&self) -> u32 {
        self.last_index + 1
    }

    fn on_progress(&mut self, progress: f64) -> bool {
        let target = self.frame_for(progress);
        let moved = target != self.state.target_frame;
        self.state.target_frame = target;
        if self.smoothing == Smoothing::Immediate {
            self.state.current_frame = target;
        }
        moved
    }

    fn reset(&mut self, progress: f64) {
        let f = self.frame_for(progress);
        self.state = PlaybackState {
            target_frame: f,
            current_frame: f,
        };
    }

    fn tick(&mut self) -> bool {
        let Smoothing::Interpolated { factor } = self.smoothing else {
            return false;
        };
        let PlaybackState {
            target_frame,
            current_frame,
        } = self.state;
        if current_frame == target_frame {
            return false;
        }

        let delta = target_frame - current_frame;
        let next = if delta.abs() < SNAP_EPSILON {
            target_frame
        } else {
            current_frame + delta * factor
        };
        self.state.current_frame = self.clamp_frame(next);
        true
    }

    fn state(&self) -> PlaybackState {
        self.state
    }

    fn resolved_frame(&self) -> u32 {
        (self.clamp_frame(self.state.current_frame).floor() as u32).min(self.last_index)
    }

    fn is_converged(&self) -> bool {
        self.state.current_frame == self.state.target_frame
    }

    fn prefetch_range(&self) -> RangeInclusive<u32> {
        let r = self.resolved_frame();
        let start = r.saturating_sub(self.window.behind);
        let end = r.saturating_add(self.window.ahead).min(self.last_index);
        start..=end
    }

    fn smoothing(&self) -> Smoothing {
        self.smoothing
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/controller.rs"]
mod tests;
