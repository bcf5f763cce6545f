use std::io::Cursor;
use std::time::{Duration, Instant};

use super::*;

fn png_bytes(rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_raw(1, 1, rgba.to_vec()).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn req(index: u32, attempt: Attempt, locator: &str) -> LoadRequest {
    LoadRequest {
        index,
        attempt,
        locator: locator.to_string(),
    }
}

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "framescrub_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

#[test]
fn memory_loader_completes_on_drain() {
    let mut loader = MemoryLoader::new();
    loader.insert("f_0.png", png_bytes([9, 8, 7, 255]));
    loader.start(req(0, Attempt::Primary, "f_0.png"));
    loader.start(req(1, Attempt::Primary, "f_1.png"));
    assert_eq!(loader.in_flight(), 2);

    let mut out = Vec::new();
    loader.drain(&mut out);
    assert_eq!(loader.in_flight(), 0);
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].result.as_ref().unwrap().rgba8_premul[..], [9, 8, 7, 255]);
    assert!(matches!(out[1].result, Err(ScrubError::Load(_))));
}

#[test]
fn manual_loader_only_completes_resolved_requests() {
    let (mut loader, handle) = ManualLoader::new();
    loader.start(req(3, Attempt::Primary, "a"));
    loader.start(req(4, Attempt::Primary, "b"));

    let mut out = Vec::new();
    loader.drain(&mut out);
    assert!(out.is_empty());

    assert!(handle.fail(4, Attempt::Primary, "404"));
    assert!(!handle.fail(4, Attempt::Primary, "404"));
    assert!(!handle.fail(3, Attempt::Fallback, "not started"));

    loader.drain(&mut out);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].request.index, 4);
    assert_eq!(handle.pending(), vec![req(3, Attempt::Primary, "a")]);
    assert_eq!(handle.started().len(), 2);
    assert_eq!(loader.in_flight(), 1);
}

#[test]
fn fs_loader_reads_and_decodes_off_thread() {
    let tmp = temp_dir("fs_loader");
    std::fs::create_dir_all(tmp.join("frames")).unwrap();
    std::fs::write(tmp.join("frames/f_0.png"), png_bytes([1, 2, 3, 255])).unwrap();

    let mut loader = FsLoader::new(&tmp, Some(2)).unwrap();
    loader.start(req(0, Attempt::Primary, "frames/f_0.png"));
    loader.start(req(1, Attempt::Primary, "frames/f_1.png"));

    let mut out = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(10);
    while out.len() < 2 && Instant::now() < deadline {
        loader.drain(&mut out);
        std::thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(out.len(), 2);
    assert_eq!(loader.in_flight(), 0);

    out.sort_by_key(|c| c.request.index);
    assert_eq!(out[0].result.as_ref().unwrap().width, 1);
    assert!(matches!(out[1].result, Err(ScrubError::Load(_))));

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn fs_loader_rejects_zero_threads_and_escaping_paths() {
    assert!(FsLoader::new(".", Some(0)).is_err());
    assert!(read_frame_file(Path::new("."), "../secret.png").is_err());
}
