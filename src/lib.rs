//! framescrub plays a pre-rendered image sequence in lockstep with page scroll.
//!
//! A player is assembled from a handful of roles that can be swapped independently:
//!
//! - a [`FrameStore`] that fetches, decodes and caches numbered frames
//! - a [`ProgressMapper`] that turns container geometry into progress in `[0, 1]`
//! - a [`PlaybackController`] that maps progress to a frame, optionally smoothed per tick
//! - a [`RenderSurface`] the resolved frame is painted onto
//!
//! [`ScrubPlayer`] wires them together and exposes the host-facing event handlers.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod foundation;

pub(crate) mod playback;
pub(crate) mod player;
pub(crate) mod render;
pub(crate) mod scroll;
pub(crate) mod sequence;
pub(crate) mod store;

pub use crate::foundation::core::{FrameRgba, Placement, SurfaceSize, fit_contain};
pub use crate::foundation::error::{ScrubError, ScrubResult};

pub use crate::assets::decode::{FrameImage, decode_frame, normalize_rel_path};
pub use crate::assets::loader::{
    AssetLoader, FsLoader, LoadCompletion, LoadRequest, ManualLoader, ManualLoaderHandle,
    MemoryLoader, read_frame_file,
};
pub use crate::playback::controller::{
    FrameController, PlaybackController, PlaybackState, PrefetchWindow, SNAP_EPSILON, Smoothing,
};
pub use crate::playback::ticker::{ManualTicker, TickLoop, TickScheduler, TickToken};
pub use crate::player::config::{PlayerConfig, SequenceConfig, SessionState, TailConfig};
pub use crate::player::scrub_player::ScrubPlayer;
pub use crate::render::driver::{LoadGate, PaintOutcome, SurfaceDriver};
pub use crate::render::surface::{PixelSurface, RenderSurface};
pub use crate::scroll::mapper::{ProgressMapper, ViewportGeometry, ViewportProgress};
pub use crate::sequence::FrameSequence;
pub use crate::sequence::template::{Attempt, FramePathTemplate};
pub use crate::store::frame_store::{
    FrameStore, SequenceFrameStore, SlotState, StoreStats, TailPacing,
};
