use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use crate::foundation::error::{ScrubError, ScrubResult};
use crate::playback::controller::{PrefetchWindow, Smoothing};
use crate::sequence::FrameSequence;
use crate::sequence::template::FramePathTemplate;
use crate::store::frame_store::TailPacing;

fn default_preload_window() -> u32 {
    30
}

fn default_background_rgba() -> [u8; 4] {
    [0, 0, 0, 255]
}

/// Where the numbered frames live and how they are named.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SequenceConfig {
    /// Number of frames.
    pub frame_count: u32,
    /// Locator pattern with one run of `#`, e.g. `"frames/hero_####.webp"`.
    pub pattern: String,
    /// File number of frame 0.
    #[serde(default)]
    pub start_number: u32,
    /// Alternate extension tried once when a primary load fails.
    #[serde(default)]
    pub fallback_extension: Option<String>,
}

/// Lazy-tail pacing as it appears in JSON.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TailConfig {
    /// Milliseconds between tail batches.
    pub interval_ms: u64,
    /// Frames requested per batch.
    pub batch: u32,
}

impl Default for TailConfig {
    fn default() -> Self {
        let p = TailPacing::default();
        Self {
            interval_ms: p.interval.as_millis() as u64,
            batch: p.batch,
        }
    }
}

/// Player configuration, usually read from JSON.
///
/// ```json
/// {
///   "sequence": { "frame_count": 250, "pattern": "frames/hero_####.webp", "fallback_extension": "jpg" },
///   "preload_window": 30,
///   "smoothing": { "mode": "interpolated", "factor": 0.15 }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerConfig {
    /// Frame sequence description.
    pub sequence: SequenceConfig,
    /// Frames loaded eagerly before the player reports ready.
    #[serde(default = "default_preload_window")]
    pub preload_window: u32,
    /// Pacing of the remaining frames.
    #[serde(default)]
    pub tail: TailConfig,
    /// Frames requested around the displayed one.
    #[serde(default)]
    pub prefetch: PrefetchWindow,
    /// Smoothing mode.
    #[serde(default)]
    pub smoothing: Smoothing,
    /// Surface fill outside the frame, straight-alpha RGBA8.
    #[serde(default = "default_background_rgba")]
    pub background_rgba: [u8; 4],
}

impl PlayerConfig {
    /// Minimal configuration with defaults for everything but the sequence.
    pub fn new(frame_count: u32, pattern: impl Into<String>) -> Self {
        Self {
            sequence: SequenceConfig {
                frame_count,
                pattern: pattern.into(),
                start_number: 0,
                fallback_extension: None,
            },
            preload_window: default_preload_window(),
            tail: TailConfig::default(),
            prefetch: PrefetchWindow::default(),
            smoothing: Smoothing::default(),
            background_rgba: default_background_rgba(),
        }
    }

    /// Parse a configuration from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> ScrubResult<Self> {
        let cfg: Self = serde_json::from_reader(r)
            .map_err(|e| ScrubError::serde(format!("parse player config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a configuration from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> ScrubResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            ScrubError::validation(format!("open player config '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Check every field that cannot be expressed in the type.
    pub fn validate(&self) -> ScrubResult<()> {
        self.sequence()?;
        self.smoothing.validate()?;
        if self.tail.batch == 0 {
            return Err(ScrubError::validation("tail.batch must be >= 1"));
        }
        Ok(())
    }

    /// Build the frame sequence.
    pub fn sequence(&self) -> ScrubResult<FrameSequence> {
        let template = FramePathTemplate::parse(
            &self.sequence.pattern,
            self.sequence.start_number,
            self.sequence.fallback_extension.as_deref(),
        )?;
        FrameSequence::new(self.sequence.frame_count, template)
    }

    /// Preload window clamped to the sequence length.
    pub fn effective_preload_window(&self) -> u32 {
        self.preload_window.min(self.sequence.frame_count)
    }

    /// Lazy-tail pacing.
    pub fn tail_pacing(&self) -> TailPacing {
        TailPacing {
            interval: Duration::from_millis(self.tail.interval_ms),
            batch: self.tail.batch,
        }
    }
}

/// One-time state scoped to the host's browsing session, injected at construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SessionState {
    /// The loading splash was already shown once this session.
    pub splash_shown: bool,
}

#[cfg(test)]
#[path = "../../tests/unit/player/config.rs"]
mod tests;
