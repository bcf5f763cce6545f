use super::*;

fn geom(top: f64, height: f64, viewport: f64) -> ViewportGeometry {
    ViewportGeometry {
        container_top: top,
        container_height: height,
        viewport_height: viewport,
    }
}

#[test]
fn reference_scenario_matches_formula() {
    let p = ViewportProgress::progress(geom(-100.0, 500.0, 800.0));
    assert!((p - 900.0 / 1300.0).abs() < 1e-12);
}

#[test]
fn endpoints_are_entry_and_exit() {
    // container top at viewport bottom: just entering
    assert_eq!(ViewportProgress::progress(geom(800.0, 500.0, 800.0)), 0.0);
    // container bottom at viewport top: just left
    assert_eq!(ViewportProgress::progress(geom(-500.0, 500.0, 800.0)), 1.0);
}

#[test]
fn far_away_containers_clamp() {
    assert_eq!(ViewportProgress::progress(geom(5_000.0, 500.0, 800.0)), 0.0);
    assert_eq!(ViewportProgress::progress(geom(-9_000.0, 500.0, 800.0)), 1.0);
}

#[test]
fn degenerate_geometry_is_zero() {
    assert_eq!(ViewportProgress::progress(geom(0.0, 0.0, 0.0)), 0.0);
    assert_eq!(ViewportProgress::progress(geom(10.0, -900.0, 800.0)), 0.0);
    assert_eq!(ViewportProgress::progress(geom(f64::NAN, 500.0, 800.0)), 0.0);
    assert_eq!(
        ViewportProgress::progress(geom(0.0, f64::INFINITY, 800.0)),
        0.0
    );
}

#[test]
fn zero_height_container_is_still_defined() {
    let p = ViewportProgress::progress(geom(400.0, 0.0, 800.0));
    assert_eq!(p, 0.5);
}

#[test]
fn unmeasured_container_maps_to_zero_and_caches() {
    let mut m = ViewportProgress::new();
    assert_eq!(m.last(), 0.0);
    let p = m.map(Some(geom(0.0, 800.0, 800.0)));
    assert_eq!(p, 0.5);
    assert_eq!(m.last(), 0.5);
    assert_eq!(m.map(None), 0.0);
    assert_eq!(m.last(), 0.0);
}

#[test]
fn resize_changes_progress_without_scrolling() {
    let mut m = ViewportProgress::new();
    let before = m.map(Some(geom(200.0, 600.0, 800.0)));
    let after = m.map(Some(geom(200.0, 600.0, 1000.0)));
    assert!(after > before);
}

#[test]
fn from_scroll_offsets_container() {
    let g = ViewportGeometry::from_scroll(1_100.0, 1_000.0, 500.0, 800.0);
    assert_eq!(g.container_top, -100.0);
}

#[test]
fn progress_is_monotonic_in_scroll() {
    let mut prev = 0.0;
    for step in 0..200 {
        let g = ViewportGeometry::from_scroll(f64::from(step) * 15.0, 1_200.0, 700.0, 900.0);
        let p = ViewportProgress::progress(g);
        assert!(p >= prev);
        prev = p;
    }
    assert_eq!(prev, 1.0);
}
