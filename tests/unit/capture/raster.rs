use super::*;

const SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="5" viewBox="0 0 10 5"><rect x="0" y="0" width="5" height="5" fill="#ff0000"/></svg>"##;

#[test]
fn scaled_raster_matches_target_and_decodes() {
    let jpeg = rasterize_jpeg(
        SQUARE,
        &FontEnvironment::empty(),
        "sans-serif",
        (20, 10),
        2.0,
        Rgb8::WHITE,
        0.95,
    )
    .unwrap();
    assert_eq!((jpeg.width, jpeg.height), (20, 10));
    assert_eq!(&jpeg.bytes[..2], &[0xFF, 0xD8]);

    let img = image::load_from_memory(&jpeg.bytes).unwrap().to_rgb8();
    assert_eq!(img.dimensions(), (20, 10));
    let left = img.get_pixel(2, 5);
    let right = img.get_pixel(17, 5);
    assert!(left[0] > 200 && left[1] < 60, "left half should be red: {left:?}");
    assert!(right.0.iter().all(|c| *c > 230), "right half should be white: {right:?}");
    assert!(jpeg.data_uri().starts_with("data:image/jpeg;base64,/9j/"));
}

#[test]
fn zero_target_is_rejected() {
    let err = rasterize_jpeg(
        SQUARE,
        &FontEnvironment::empty(),
        "sans-serif",
        (20, 0),
        2.0,
        Rgb8::WHITE,
        0.9,
    )
    .unwrap_err();
    assert_eq!(err, CaptureError::ZeroHeight);
}

#[test]
fn malformed_markup_is_a_raster_error() {
    let err = rasterize_jpeg(
        "<svg",
        &FontEnvironment::empty(),
        "sans-serif",
        (4, 4),
        1.0,
        Rgb8::WHITE,
        0.9,
    )
    .unwrap_err();
    assert!(matches!(err, CaptureError::Raster(_)));
}
