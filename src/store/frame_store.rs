use std::ops::Range;
use std::time::{Duration, Instant};

use crate::assets::decode::FrameImage;
use crate::assets::loader::{AssetLoader, LoadCompletion, LoadRequest};
use crate::foundation::error::ScrubError;
use crate::sequence::FrameSequence;
use crate::sequence::template::Attempt;

/// Lifecycle of one frame slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SlotState {
    /// Nothing has asked for this frame yet.
    #[default]
    NotRequested,
    /// A primary or fallback load is in flight.
    Loading,
    /// The decoded asset is available through [`FrameStore::get`].
    Loaded,
    /// Primary and fallback both failed; terminal.
    Failed,
}

impl SlotState {
    /// `Loaded` or `Failed`.
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Loaded | Self::Failed)
    }
}

/// Load counters for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Primary-locator loads started.
    pub primary_attempts: u64,
    /// Fallback-locator loads started.
    pub fallback_attempts: u64,
    /// Slots currently `Loaded`.
    pub loaded: u32,
    /// Slots currently `Failed`.
    pub failed: u32,
}

/// Owner of every frame slot and its decoded asset.
///
/// All methods run on the owner thread; loads complete asynchronously and are applied by
/// [`FrameStore::poll`].
pub trait FrameStore {
    /// Number of frames in the sequence.
    fn frame_count(&self) -> u32;

    /// Start loading `index` if it was never requested; no-op otherwise.
    fn request(&mut self, index: u32);

    /// Decoded asset for `index` when loaded. Never blocks.
    fn get(&self, index: u32) -> Option<&FrameImage>;

    /// Slot state for `index`, `None` when out of range.
    fn state(&self, index: u32) -> Option<SlotState>;

    /// Apply finished loads. Returns how many slots settled (loaded or failed) during this call.
    fn poll(&mut self) -> usize;

    /// Monotonic count of slots that ended `Failed`.
    fn failure_count(&self) -> u64;

    /// Load counters.
    fn stats(&self) -> StoreStats;

    /// Number of slots currently `Loaded`.
    fn loaded_count(&self) -> u32 {
        self.stats().loaded
    }

    /// Eagerly request the first `count` frames.
    fn preload(&mut self, count: u32) {
        for i in 0..count.min(self.frame_count()) {
            self.request(i);
        }
    }

    /// Request more of the remaining frames if the pacing allows it at `now`.
    ///
    /// Returns the number of loads started. Stores without a lazy tail return 0.
    fn advance_tail(&mut self, _now: Instant) -> usize {
        0
    }

    /// Earliest instant at which `advance_tail` may start more loads.
    ///
    /// `None` when the tail is exhausted or still waiting for the preload window, in which case a
    /// load completion is the next event that can unblock it.
    fn tail_due(&self) -> Option<Instant> {
        None
    }

    /// Count settled slots in `range`.
    fn settled_in(&self, range: Range<u32>) -> u32 {
        range
            .filter(|&i| self.state(i).is_some_and(SlotState::is_settled))
            .count() as u32
    }
}

/// Pacing of the lazy tail that fetches frames beyond the preload window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TailPacing {
    /// Minimum time between two tail batches.
    pub interval: Duration,
    /// Loads started per batch.
    pub batch: u32,
}

impl Default for TailPacing {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(40),
            batch: 2,
        }
    }
}

#[derive(Debug, Default)]
struct FrameSlot {
    state: SlotState,
    attempt: Option<Attempt>,
    asset: Option<FrameImage>,
}

/// [`FrameStore`] over a numbered still-image sequence.
///
/// Loaded frames are never evicted. A failed primary load is retried once against the sequence's
/// fallback locator when one is configured.
pub struct SequenceFrameStore {
    sequence: FrameSequence,
    loader: Box<dyn AssetLoader>,
    slots: Vec<FrameSlot>,
    stats: StoreStats,
    failures: u64,

    preload_window: u32,
    pacing: TailPacing,
    tail_next: u32,
    tail_last: Option<Instant>,

    scratch: Vec<LoadCompletion>,
}

impl SequenceFrameStore {
    /// Create a store with every slot `NotRequested`.
    pub fn new(sequence: FrameSequence, loader: Box<dyn AssetLoader>, pacing: TailPacing) -> Self {
        let slots = (0..sequence.frame_count())
            .map(|_| FrameSlot::default())
            .collect();
        Self {
            sequence,
            loader,
            slots,
            stats: StoreStats::default(),
            failures: 0,
            preload_window: 0,
            pacing,
            tail_next: 0,
            tail_last: None,
            scratch: Vec::new(),
        }
    }

    /// The sequence this store serves.
    pub fn sequence(&self) -> &FrameSequence {
        &self.sequence
    }

    /// Size of the eager window requested by the last `preload` call.
    pub fn preload_window(&self) -> u32 {
        self.preload_window
    }

    /// Loads started but not yet applied by `poll`.
    pub fn in_flight(&self) -> usize {
        self.loader.in_flight()
    }

    fn start(&mut self, index: u32, attempt: Attempt) -> bool {
        let Some(locator) = self.sequence.locator(index, attempt) else {
            return false;
        };
        match attempt {
            Attempt::Primary => self.stats.primary_attempts += 1,
            Attempt::Fallback => self.stats.fallback_attempts += 1,
        }
        tracing::debug!(index, ?attempt, %locator, "frame load started");
        self.loader.start(LoadRequest {
            index,
            attempt,
            locator,
        });
        true
    }

    fn tail_open(&self) -> bool {
        self.tail_next < self.frame_count()
            && self.settled_in(0..self.preload_window) >= self.preload_window
    }

    fn fail_slot(&mut self, index: u32, reason: &ScrubError) {
        let slot = &mut self.slots[index as usize];
        slot.state = SlotState::Failed;
        slot.attempt = None;
        self.failures += 1;
        self.stats.failed += 1;
        tracing::warn!(
            index,
            failures = self.failures,
            error = %reason,
            "frame failed permanently"
        );
    }
}

impl FrameStore for SequenceFrameStore {
    fn frame_count(&self) -> u32 {
        self.sequence.frame_count()
    }

    fn request(&mut self, index: u32) {
        let Some(slot) = self.slots.get(index as usize) else {
            return;
        };
        if slot.state != SlotState::NotRequested {
            return;
        }
        if self.start(index, Attempt::Primary) {
            let slot = &mut self.slots[index as usize];
            slot.state = SlotState::Loading;
            slot.attempt = Some(Attempt::Primary);
        }
    }

    fn get(&self, index: u32) -> Option<&FrameImage> {
        self.slots.get(index as usize)?.asset.as_ref()
    }

    fn state(&self, index: u32) -> Option<SlotState> {
        self.slots.get(index as usize).map(|s| s.state)
    }

    fn poll(&mut self) -> usize {
        let mut done = std::mem::take(&mut self.scratch);
        self.loader.drain(&mut done);

        let mut settled = 0;
        for LoadCompletion { request, result } in done.drain(..) {
            let index = request.index;
            let waiting = self.slots.get(index as usize).is_some_and(|s| {
                s.state == SlotState::Loading && s.attempt == Some(request.attempt)
            });
            if !waiting {
                tracing::debug!(index, attempt = ?request.attempt, "discarding stale frame load");
                continue;
            }

            match result {
                Ok(frame) => {
                    let slot = &mut self.slots[index as usize];
                    slot.state = SlotState::Loaded;
                    slot.attempt = None;
                    slot.asset = Some(frame);
                    self.stats.loaded += 1;
                    settled += 1;
                }
                Err(err) => {
                    if request.attempt == Attempt::Primary
                        && self.start(index, Attempt::Fallback)
                    {
                        tracing::debug!(index, error = %err, "primary frame failed, trying fallback");
                        self.slots[index as usize].attempt = Some(Attempt::Fallback);
                    } else {
                        self.fail_slot(index, &err);
                        settled += 1;
                    }
                }
            }
        }

        self.scratch = done;
        settled
    }

    fn failure_count(&self) -> u64 {
        self.failures
    }

    fn stats(&self) -> StoreStats {
        self.stats
    }

    fn preload(&mut self, count: u32) {
        self.preload_window = count.min(self.frame_count());
        for i in 0..self.preload_window {
            self.request(i);
        }
    }

    fn advance_tail(&mut self, now: Instant) -> usize {
        if !self.tail_open() {
            return 0;
        }
        if let Some(last) = self.tail_last
            && now.duration_since(last) < self.pacing.interval
        {
            return 0;
        }

        let mut started = 0;
        while started < self.pacing.batch.max(1) as usize && self.tail_next < self.frame_count() {
            let i = self.tail_next;
            self.tail_next += 1;
            if self.state(i) == Some(SlotState::NotRequested) {
                self.request(i);
                started += 1;
            }
        }
        if started > 0 {
            self.tail_last = Some(now);
            tracing::debug!(started, next = self.tail_next, "lazy tail batch");
        }
        started
    }

    fn tail_due(&self) -> Option<Instant> {
        if !self.tail_open() {
            return None;
        }
        Some(match self.tail_last {
            Some(last) => last + self.pacing.interval,
            None => Instant::now(),
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/store/frame_store.rs"]
mod tests;
