use std::cell::Cell;
use std::time::Duration;

use super::*;
use crate::assets::decode::FrameImage;
use crate::assets::loader::{ManualLoader, ManualLoaderHandle};
use crate::playback::controller::Smoothing;
use crate::playback::ticker::ManualTicker;
use crate::render::surface::PixelSurface;
use crate::sequence::template::Attempt;
use crate::store::frame_store::SlotState;

fn frame(v: u8) -> FrameImage {
    FrameImage::from_straight_rgba8(2, 1, [v, v, v, 255].repeat(2)).unwrap()
}

fn config(smoothing: Smoothing) -> PlayerConfig {
    let mut cfg = PlayerConfig::new(250, "frames/hero_####.webp");
    cfg.smoothing = smoothing;
    cfg
}

fn player(
    cfg: &PlayerConfig,
    session: SessionState,
) -> (ScrubPlayer<PixelSurface>, ManualLoaderHandle) {
    let (loader, handle) = ManualLoader::new();
    let surface = PixelSurface::new(SurfaceSize::default(), cfg.background_rgba);
    let p = ScrubPlayer::new(cfg, Box::new(loader), surface, session).unwrap();
    (p, handle)
}

fn geom(top: f64) -> Option<ViewportGeometry> {
    Some(ViewportGeometry {
        container_top: top,
        container_height: 500.0,
        viewport_height: 800.0,
    })
}

fn load_all_pending(handle: &ManualLoaderHandle) {
    for req in handle.pending() {
        handle.succeed(req.index, req.attempt, frame((req.index % 250) as u8));
    }
}

#[test]
fn mount_preloads_window_and_starts_at_geometry() {
    let cfg = config(Smoothing::Immediate);
    let (mut p, handle) = player(&cfg, SessionState::default());
    p.mount(SurfaceSize::new(4, 2), geom(800.0));

    let started = handle.started();
    assert_eq!(started.len(), 30);
    assert_eq!(started[0].locator, "frames/hero_0000.webp");
    assert_eq!(p.resolved_frame(), 0);
    assert_eq!(p.painted_frame(), None);
    assert!(!p.is_ready());
    assert_eq!(p.load_progress(), 0.0);
}

#[test]
fn ready_after_preload_and_later_failures_do_not_matter() {
    let cfg = config(Smoothing::Immediate);
    let (mut p, handle) = player(&cfg, SessionState::default());
    p.mount(SurfaceSize::new(4, 2), geom(800.0));
    let t0 = Instant::now();

    for i in 0..29 {
        handle.succeed(i, Attempt::Primary, frame(i as u8));
    }
    p.service(t0);
    assert!(!p.is_ready());
    assert!((p.load_progress() - 29.0 * 100.0 / 30.0).abs() < 1e-9);

    handle.succeed(29, Attempt::Primary, frame(29));
    p.service(t0);
    assert!(p.is_ready());
    assert_eq!(p.load_progress(), 100.0);

    // the lazy tail starts once the window settled
    assert!(handle.pending().iter().any(|r| r.index == 30));
    handle.fail(30, Attempt::Primary, "404");
    p.service(t0 + Duration::from_secs(1));
    assert!(p.is_ready());
    assert_eq!(p.store().state(30), Some(SlotState::Failed));
    assert_eq!(p.store().failure_count(), 1);
}

#[test]
fn loading_indicator_follows_session_state() {
    let cfg = config(Smoothing::Immediate);
    let (mut p, handle) = player(&cfg, SessionState::default());
    p.mount(SurfaceSize::new(4, 2), geom(800.0));
    assert!(p.loading_indicator_visible());

    load_all_pending(&handle);
    p.service(Instant::now());
    assert!(!p.loading_indicator_visible());
    assert!(p.session_state().splash_shown);

    let (mut again, _h) = player(&cfg, p.session_state());
    again.mount(SurfaceSize::new(4, 2), geom(800.0));
    assert!(!again.is_ready());
    assert!(!again.loading_indicator_visible());
}

#[test]
fn immediate_scroll_paints_reference_frame_once_loaded() {
    let cfg = config(Smoothing::Immediate);
    let (mut p, handle) = player(&cfg, SessionState::default());
    p.mount(SurfaceSize::new(4, 2), geom(800.0));
    load_all_pending(&handle);
    p.service(Instant::now());
    assert_eq!(p.painted_frame(), Some(0));

    p.on_scroll(geom(-100.0));
    assert!((p.progress() - 900.0 / 1300.0).abs() < 1e-12);
    assert_eq!(p.resolved_frame(), 172);
    // not loaded yet: previous picture stays
    assert_eq!(p.painted_frame(), Some(0));

    let requested: Vec<u32> = handle.pending().iter().map(|r| r.index).collect();
    for i in 171..=177 {
        assert!(requested.contains(&i), "frame {i} not prefetched");
    }

    handle.succeed(172, Attempt::Primary, frame(172));
    p.service(Instant::now());
    assert_eq!(p.painted_frame(), Some(172));
    assert_eq!(p.surface().pixel(0, 0), Some([172, 172, 172, 255]));
}

#[test]
fn interpolated_player_runs_tick_loop_until_teardown() {
    let cfg = config(Smoothing::Interpolated { factor: 0.15 });
    let ticker = Rc::new(ManualTicker::new());
    let (p, _handle) = player(&cfg, SessionState::default());
    let mut p = p.with_scheduler(ticker.clone());

    assert!(!p.is_tick_loop_running());
    p.mount(SurfaceSize::new(4, 2), geom(800.0));
    assert!(p.is_tick_loop_running());
    assert_eq!(ticker.active_count(), 1);

    p.teardown();
    assert!(!p.is_tick_loop_running());
    assert_eq!(ticker.active_count(), 0);

    let before = p.playback_state();
    p.on_scroll(geom(-500.0));
    p.on_tick(Instant::now());
    assert_eq!(p.playback_state(), before);
}

#[test]
fn dropping_player_cancels_tick_loop() {
    let cfg = config(Smoothing::default());
    let ticker = Rc::new(ManualTicker::new());
    {
        let (p, _handle) = player(&cfg, SessionState::default());
        let mut p = p.with_scheduler(ticker.clone());
        p.mount(SurfaceSize::new(4, 2), None);
        assert_eq!(ticker.active_count(), 1);
    }
    assert_eq!(ticker.active_count(), 0);
}

#[test]
fn interpolated_scroll_moves_gradually() {
    let cfg = config(Smoothing::Interpolated { factor: 0.15 });
    let (mut p, _handle) = player(&cfg, SessionState::default());
    p.mount(SurfaceSize::new(4, 2), geom(800.0));

    p.on_scroll(geom(-500.0));
    let st = p.playback_state();
    assert_eq!(st.target_frame, 249.0);
    assert_eq!(st.current_frame, 0.0);

    p.on_tick(Instant::now());
    let st = p.playback_state();
    assert!((st.current_frame - 249.0 * 0.15).abs() < 1e-9);
    assert_eq!(p.resolved_frame(), 37);
    assert_eq!(p.store().state(37), Some(SlotState::Loading));
}

#[test]
fn completion_fires_once_at_terminal_frame() {
    let cfg = config(Smoothing::Immediate);
    let (mut p, _handle) = player(&cfg, SessionState::default());
    let hits = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&hits);
    p.on_complete(move || counter.set(counter.get() + 1));
    p.mount(SurfaceSize::new(4, 2), geom(800.0));

    p.on_scroll(geom(0.0));
    assert_eq!(hits.get(), 0);
    p.on_scroll(geom(-2_000.0));
    assert_eq!(hits.get(), 1);
    assert!(p.is_complete());
    p.on_scroll(geom(0.0));
    p.on_scroll(geom(-2_000.0));
    assert_eq!(hits.get(), 1);
}

#[test]
fn resize_repaints_and_same_size_is_noop() {
    let cfg = config(Smoothing::Immediate);
    let (mut p, handle) = player(&cfg, SessionState::default());
    p.mount(SurfaceSize::new(2, 1), geom(800.0));
    load_all_pending(&handle);
    p.service(Instant::now());
    assert_eq!(p.surface().draw_count(), 1);

    p.on_resize(SurfaceSize::new(2, 1), geom(800.0));
    assert_eq!(p.surface().draw_count(), 1);

    p.on_resize(SurfaceSize::new(8, 4), geom(800.0));
    assert_eq!(p.surface().size(), SurfaceSize::new(8, 4));
    assert_eq!(p.surface().draw_count(), 2);
    assert_eq!(p.surface().pixel(7, 3), Some([0, 0, 0, 255]));
    assert_eq!(p.painted_frame(), Some(0));
}

#[test]
fn unmeasured_container_stays_at_first_frame() {
    let cfg = config(Smoothing::Immediate);
    let (mut p, _handle) = player(&cfg, SessionState::default());
    p.mount(SurfaceSize::new(4, 2), None);
    p.on_scroll(None);
    assert_eq!(p.progress(), 0.0);
    assert_eq!(p.resolved_frame(), 0);
}

#[test]
fn events_before_mount_are_ignored() {
    let cfg = config(Smoothing::Immediate);
    let (mut p, handle) = player(&cfg, SessionState::default());
    p.on_scroll(geom(-100.0));
    p.service(Instant::now());
    assert!(handle.started().is_empty());
    assert_eq!(p.resolved_frame(), 0);
}

fn small_immediate(interval_ms: u64) -> PlayerConfig {
    let mut cfg = PlayerConfig::new(10, "f_##.png");
    cfg.smoothing = Smoothing::Immediate;
    cfg.preload_window = 2;
    cfg.tail.interval_ms = interval_ms;
    cfg.tail.batch = 2;
    cfg
}

fn requested(handle: &ManualLoaderHandle) -> Vec<u32> {
    let mut ids: Vec<u32> = handle.started().iter().map(|r| r.index).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[test]
fn immediate_tail_reaches_every_frame_when_serviced_on_schedule() {
    let cfg = small_immediate(40);
    let (mut p, handle) = player(&cfg, SessionState::default());
    assert_eq!(p.next_service_due(), None);
    p.mount(SurfaceSize::new(2, 1), geom(800.0));
    let t0 = Instant::now();

    load_all_pending(&handle);
    p.service(t0 + Duration::from_millis(5));

    let mut rounds = 0;
    while let Some(due) = p.next_service_due() {
        rounds += 1;
        assert!(rounds < 20, "tail never finished");
        load_all_pending(&handle);
        p.service(due);
    }
    assert_eq!(requested(&handle), (0..10).collect::<Vec<_>>());
}

#[test]
fn scroll_events_keep_the_tail_moving() {
    let cfg = small_immediate(0);
    let (mut p, handle) = player(&cfg, SessionState::default());
    p.mount(SurfaceSize::new(2, 1), geom(800.0));

    load_all_pending(&handle);
    p.service(Instant::now());
    assert!(requested(&handle).len() < 10);

    for _ in 0..5 {
        p.on_scroll(geom(800.0));
    }
    assert_eq!(requested(&handle), (0..10).collect::<Vec<_>>());
}

#[test]
fn collapsed_container_keeps_last_frame_after_reopening() {
    let mut cfg = config(Smoothing::Immediate);
    cfg.background_rgba = [255, 255, 255, 255];
    let (mut p, handle) = player(&cfg, SessionState::default());
    p.mount(SurfaceSize::new(2, 1), geom(800.0));
    load_all_pending(&handle);
    p.service(Instant::now());
    assert_eq!(p.painted_frame(), Some(0));

    p.on_scroll(geom(-100.0));
    assert_eq!(p.resolved_frame(), 172);
    p.on_resize(SurfaceSize::new(0, 0), geom(-100.0));
    p.on_resize(SurfaceSize::new(2, 1), geom(-100.0));
    assert_eq!(p.painted_frame(), Some(0));
    assert_eq!(p.surface().pixel(0, 0), Some([0, 0, 0, 255]));
    assert_eq!(p.surface().draw_count(), 2);
}

#[test]
fn mismatched_store_and_controller_are_rejected() {
    let cfg = config(Smoothing::Immediate);
    let (loader, _handle) = ManualLoader::new();
    let store =
        SequenceFrameStore::new(cfg.sequence().unwrap(), Box::new(loader), Default::default());
    let controller =
        FrameController::new(100, Smoothing::Immediate, Default::default()).unwrap();
    let surface = PixelSurface::new(SurfaceSize::default(), cfg.background_rgba);

    let res = ScrubPlayer::from_parts(
        Box::new(store),
        Box::new(ViewportProgress::new()),
        Box::new(controller),
        surface,
        30,
        SessionState::default(),
    );
    assert!(matches!(res, Err(ScrubError::Validation(_))));
}
