use std::io::Cursor;

use super::*;

fn png_bytes(w: u32, h: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba([10, 20, 30, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn decode_image_reports_dimensions_and_png() {
    let decoded = decode_image(&png_bytes(3, 2)).unwrap();
    assert_eq!((decoded.width, decoded.height), (3, 2));
    assert_eq!(
        image::guess_format(&decoded.png).unwrap(),
        image::ImageFormat::Png
    );
}

#[test]
fn decode_image_rejects_garbage() {
    assert!(decode_image(b"definitely not an image").is_err());
    assert!(decode_image(&[]).is_err());
}

#[test]
fn data_uri_roundtrip_and_dimensions() {
    let bytes = png_bytes(4, 5);
    let uri = to_data_uri("image/png", &bytes);
    assert!(uri.starts_with("data:image/png;base64,"));

    let (mime, back) = parse_data_uri(&uri).unwrap();
    assert_eq!(mime, "image/png");
    assert_eq!(back, bytes);
    assert_eq!(data_uri_dimensions(&uri).unwrap(), (4, 5));
}

#[test]
fn parse_data_uri_rejects_other_forms() {
    assert!(parse_data_uri("/logo1.webp").is_err());
    assert!(parse_data_uri("data:image/png,raw").is_err());
    assert!(parse_data_uri("data:image/png;base64").is_err());
    assert!(parse_data_uri("data:image/png;base64,%%%").is_err());
}

#[test]
fn short_src_truncates_long_references() {
    assert_eq!(short_src("/logo1.webp"), "/logo1.webp");
    let long = format!("data:image/png;base64,{}", "A".repeat(200));
    let short = short_src(&long);
    assert!(short.ends_with('…'));
    assert!(short.chars().count() <= 49);
}
