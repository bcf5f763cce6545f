use std::io::Cursor;

use super::*;

#[test]
fn decode_png_dimensions_and_premul() {
    let src_rgba = vec![100u8, 50u8, 200u8, 128u8, 0, 0, 0, 255];
    let img = image::RgbaImage::from_raw(2, 1, src_rgba).unwrap();

    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();

    let frame = decode_frame(&buf).unwrap();
    assert_eq!(frame.size(), SurfaceSize::new(2, 1));
    assert_eq!(
        &frame.rgba8_premul[..4],
        &[
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128u8
        ]
    );
}

#[test]
fn garbage_bytes_are_a_decode_error() {
    let err = decode_frame(b"definitely not an image").unwrap_err();
    assert!(matches!(err, ScrubError::Decode(_)));
}

#[test]
fn straight_rgba_length_is_checked() {
    assert!(FrameImage::from_straight_rgba8(2, 2, vec![0; 15]).is_err());
    assert!(FrameImage::from_straight_rgba8(0, 2, vec![]).is_err());
    assert!(FrameImage::from_straight_rgba8(1, 1, vec![1, 2, 3, 255]).is_ok());
}

#[test]
fn normalize_path_cross_platform() {
    assert_eq!(normalize_rel_path("a/./b.png").unwrap(), "a/b.png");
    assert_eq!(normalize_rel_path("a\\b.png").unwrap(), "a/b.png");
    assert!(normalize_rel_path("../x.png").is_err());
    assert!(normalize_rel_path("/abs.png").is_err());
    assert!(normalize_rel_path("./").is_err());
}
