pub(crate) mod template;

use crate::foundation::error::{ScrubError, ScrubResult};
use template::{Attempt, FramePathTemplate};

/// A finite, ordered, pre-rendered frame sequence.
///
/// Valid indices are `0..frame_count`; both fields are fixed for the sequence's lifetime.
#[derive(Clone, Debug)]
pub struct FrameSequence {
    frame_count: u32,
    template: FramePathTemplate,
}

impl FrameSequence {
    /// Create a validated sequence with at least one frame.
    pub fn new(frame_count: u32, template: FramePathTemplate) -> ScrubResult<Self> {
        if frame_count == 0 {
            return Err(ScrubError::validation("frame_count must be > 0"));
        }
        Ok(Self {
            frame_count,
            template,
        })
    }

    /// Number of frames.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Index of the terminal frame.
    pub fn last_index(&self) -> u32 {
        self.frame_count - 1
    }

    /// Return `true` when `index` addresses a frame of this sequence.
    pub fn contains(&self, index: u32) -> bool {
        index < self.frame_count
    }

    /// Path template used for locators.
    pub fn template(&self) -> &FramePathTemplate {
        &self.template
    }

    /// Locator for `index`, or `None` when out of range or the fallback is not configured.
    pub fn locator(&self, index: u32, attempt: Attempt) -> Option<String> {
        if !self.contains(index) {
            return None;
        }
        self.template.format(index, attempt)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sequence/sequence.rs"]
mod tests;
