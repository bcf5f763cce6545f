use std::rc::Rc;
use std::time::Instant;

use crate::assets::loader::AssetLoader;
use crate::foundation::core::SurfaceSize;
use crate::foundation::error::{ScrubError, ScrubResult};
use crate::playback::controller::{FrameController, PlaybackController, PlaybackState};
use crate::playback::ticker::{TickLoop, TickScheduler};
use crate::player::config::{PlayerConfig, SessionState};
use crate::render::driver::{LoadGate, PaintOutcome, SurfaceDriver};
use crate::render::surface::RenderSurface;
use crate::scroll::mapper::{ProgressMapper, ViewportGeometry, ViewportProgress};
use crate::store::frame_store::{FrameStore, SequenceFrameStore};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Created,
    Mounted,
    TornDown,
}

/// One scroll-synchronized image-sequence player instance.
///
/// The host forwards its events (`on_scroll`, `on_resize`, `on_tick`, `service`) from a single
/// thread. None of them fail: load errors stay inside the store and degenerate geometry maps to
/// progress 0. After [`ScrubPlayer::teardown`] every event is ignored.
pub struct ScrubPlayer<S> {
    store: Box<dyn FrameStore>,
    mapper: Box<dyn ProgressMapper>,
    controller: Box<dyn PlaybackController>,
    driver: SurfaceDriver<S>,
    gate: LoadGate,
    session: SessionState,

    scheduler: Option<Rc<dyn TickScheduler>>,
    tick_loop: Option<TickLoop>,
    on_complete: Option<Box<dyn FnMut()>>,
    completed: bool,
    phase: Phase,
}

impl<S: RenderSurface> ScrubPlayer<S> {
    /// Build the default stack: numbered still images, viewport-relative progress and a
    /// [`FrameController`].
    pub fn new(
        config: &PlayerConfig,
        loader: Box<dyn AssetLoader>,
        surface: S,
        session: SessionState,
    ) -> ScrubResult<Self> {
        config.validate()?;
        let sequence = config.sequence()?;
        let frame_count = sequence.frame_count();
        let store = SequenceFrameStore::new(sequence, loader, config.tail_pacing());
        let controller = FrameController::new(frame_count, config.smoothing, config.prefetch)?;
        Self::from_parts(
            Box::new(store),
            Box::new(ViewportProgress::new()),
            Box::new(controller),
            surface,
            config.effective_preload_window(),
            session,
        )
    }

    /// Assemble a player from explicit role implementations.
    ///
    /// Store and controller must describe the same number of frames.
    pub fn from_parts(
        store: Box<dyn FrameStore>,
        mapper: Box<dyn ProgressMapper>,
        controller: Box<dyn PlaybackController>,
        surface: S,
        preload_window: u32,
        session: SessionState,
    ) -> ScrubResult<Self> {
        if store.frame_count() != controller.frame_count() {
            return Err(ScrubError::validation(format!(
                "store holds {} frames but controller maps {}",
                store.frame_count(),
                controller.frame_count()
            )));
        }
        let window = preload_window.min(store.frame_count());
        Ok(Self {
            store,
            mapper,
            controller,
            driver: SurfaceDriver::new(surface),
            gate: LoadGate::new(window),
            session,
            scheduler: None,
            tick_loop: None,
            on_complete: None,
            completed: false,
            phase: Phase::Created,
        })
    }

    /// Use `scheduler` for the per-refresh loop required by interpolated smoothing.
    pub fn with_scheduler(mut self, scheduler: Rc<dyn TickScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Invoke `callback` the first time the terminal frame is reached.
    pub fn on_complete(&mut self, callback: impl FnMut() + 'static) {
        self.on_complete = Some(Box::new(callback));
    }

    /// Size the surface, start the preload window, position playback and, for interpolated
    /// smoothing, start the tick loop. Mounting twice is a no-op.
    #[tracing::instrument(skip(self, geometry), fields(width = size.width, height = size.height))]
    pub fn mount(&mut self, size: SurfaceSize, geometry: Option<ViewportGeometry>) {
        if self.phase != Phase::Created {
            return;
        }
        self.phase = Phase::Mounted;
        self.driver.mount(size);
        self.store.preload(self.gate.window());

        let progress = self.mapper.map(geometry);
        self.controller.reset(progress);
        self.prefetch();

        if self.controller.smoothing().needs_tick_loop() {
            match &self.scheduler {
                Some(scheduler) => self.tick_loop = Some(TickLoop::start(Rc::clone(scheduler))),
                None => tracing::warn!(
                    "interpolated smoothing without a tick scheduler; host must drive on_tick"
                ),
            }
        }
        self.present();
    }

    /// Scroll event: recompute progress from the container geometry.
    pub fn on_scroll(&mut self, geometry: Option<ViewportGeometry>) {
        if self.phase != Phase::Mounted {
            return;
        }
        self.store.advance_tail(Instant::now());
        self.update_progress(geometry);
    }

    /// Container resize: resize the surface (repainting immediately) and recompute progress.
    pub fn on_resize(&mut self, size: SurfaceSize, geometry: Option<ViewportGeometry>) {
        if self.phase != Phase::Mounted {
            return;
        }
        let resolved = self.controller.resolved_frame();
        self.driver.resize(size, resolved, self.store.as_ref());
        self.store.advance_tail(Instant::now());
        self.update_progress(geometry);
    }

    /// Display refresh tick: apply finished loads, advance smoothing, prefetch and paint.
    pub fn on_tick(&mut self, now: Instant) {
        if self.phase != Phase::Mounted {
            return;
        }
        self.service(now);
        self.controller.tick();
        self.prefetch();
        self.present();
    }

    /// Apply finished loads and advance the lazy tail; repaints when an awaited frame arrived.
    ///
    /// Interpolated players get this from `on_tick`. Immediate players call it whenever the loader
    /// signals progress and at [`ScrubPlayer::next_service_due`].
    pub fn service(&mut self, now: Instant) {
        if self.phase != Phase::Mounted {
            return;
        }
        let settled = self.store.poll();
        if self.gate.update(self.store.as_ref()) {
            self.session.splash_shown = true;
            tracing::info!(
                window = self.gate.window(),
                failures = self.store.failure_count(),
                "preload window settled, player ready"
            );
        }
        self.store.advance_tail(now);
        if settled > 0 {
            self.present();
        }
    }

    /// When the paced tail next wants `service` called, if no load completion comes first.
    ///
    /// `None` once every frame has been requested, while the preload window is still loading, or
    /// when the player is not mounted.
    pub fn next_service_due(&self) -> Option<Instant> {
        if self.phase != Phase::Mounted {
            return None;
        }
        self.store.tail_due()
    }

    /// Stop the tick loop and ignore all further events. Outstanding loads are discarded.
    pub fn teardown(&mut self) {
        if self.phase == Phase::TornDown {
            return;
        }
        if let Some(mut tick_loop) = self.tick_loop.take() {
            tick_loop.cancel();
        }
        self.on_complete = None;
        self.phase = Phase::TornDown;
        tracing::debug!("player torn down");
    }

    /// `true` once every preload-window frame has settled.
    pub fn is_ready(&self) -> bool {
        self.gate.is_ready()
    }

    /// Percentage of the preload window settled.
    pub fn load_progress(&self) -> f64 {
        self.gate.percent(self.store.as_ref())
    }

    /// Whether a host loading indicator should be shown right now.
    pub fn loading_indicator_visible(&self) -> bool {
        !self.gate.is_ready() && !self.session.splash_shown
    }

    /// Session state to carry over to the next instance.
    pub fn session_state(&self) -> SessionState {
        self.session
    }

    /// Last computed progress.
    pub fn progress(&self) -> f64 {
        self.mapper.last()
    }

    /// Playback positions.
    pub fn playback_state(&self) -> PlaybackState {
        self.controller.state()
    }

    /// Frame index that should be on screen.
    pub fn resolved_frame(&self) -> u32 {
        self.controller.resolved_frame()
    }

    /// Frame index actually on screen.
    pub fn painted_frame(&self) -> Option<u32> {
        self.driver.painted_frame()
    }

    /// Read-only view of the frame store.
    pub fn store(&self) -> &dyn FrameStore {
        self.store.as_ref()
    }

    /// The drawing surface.
    pub fn surface(&self) -> &S {
        self.driver.surface()
    }

    /// Whether the per-refresh loop is registered.
    pub fn is_tick_loop_running(&self) -> bool {
        self.tick_loop.as_ref().is_some_and(TickLoop::is_running)
    }

    /// Whether the completion callback already fired.
    pub fn is_complete(&self) -> bool {
        self.completed
    }

    fn update_progress(&mut self, geometry: Option<ViewportGeometry>) {
        let progress = self.mapper.map(geometry);
        let moved = self.controller.on_progress(progress);
        if self.controller.smoothing().needs_tick_loop() {
            return;
        }
        if moved {
            self.prefetch();
        }
        self.present();
    }

    fn prefetch(&mut self) {
        for i in self.controller.prefetch_range() {
            self.store.request(i);
        }
    }

    fn present(&mut self) {
        let resolved = self.controller.resolved_frame();
        if let PaintOutcome::Painted(index) = self.driver.paint(resolved, self.store.as_ref()) {
            tracing::trace!(index, "frame painted");
        }
        self.check_complete(resolved);
    }

    fn check_complete(&mut self, resolved: u32) {
        if self.completed || resolved + 1 < self.store.frame_count() {
            return;
        }
        self.completed = true;
        tracing::info!(frame = resolved, "terminal frame reached");
        if let Some(callback) = self.on_complete.as_mut() {
            callback();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/player/scrub_player.rs"]
mod tests;
