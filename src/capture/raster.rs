use crate::assets::decode::to_data_uri;
use crate::capture::fonts::FontEnvironment;
use crate::foundation::config::Rgb8;
use crate::foundation::error::CaptureError;

/// Largest pixmap edge accepted.
const MAX_DIM: u32 = 16_384;

/// JPEG produced from card markup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedJpeg {
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

impl EncodedJpeg {
    pub fn data_uri(&self) -> String {
        to_data_uri("image/jpeg", &self.bytes)
    }
}

/// Parse `svg`, rasterize it at `scale` onto a `width × height` pixmap filled with `background`,
/// and encode the result as JPEG at `quality` (0, 1].
pub fn rasterize_jpeg(
    svg: &str,
    fonts: &FontEnvironment,
    default_family: &str,
    target: (u32, u32),
    scale: f32,
    background: Rgb8,
    quality: f32,
) -> Result<EncodedJpeg, CaptureError> {
    let (width, height) = target;
    if width == 0 || height == 0 {
        return Err(CaptureError::ZeroHeight);
    }
    if width > MAX_DIM || height > MAX_DIM {
        return Err(CaptureError::Raster(format!(
            "raster size too large: {width}x{height} (max {MAX_DIM}x{MAX_DIM})"
        )));
    }

    let opts = usvg::Options {
        fontdb: fonts.db(),
        font_resolver: fonts.resolver(),
        font_family: default_family.to_string(),
        ..Default::default()
    };
    let tree = usvg::Tree::from_str(svg, &opts)
        .map_err(|e| CaptureError::Raster(format!("parse card markup: {e}")))?;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| CaptureError::Raster("failed to allocate pixmap".to_string()))?;
    let [r, g, b] = background.0;
    pixmap.fill(resvg::tiny_skia::Color::from_rgba8(r, g, b, 255));
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );

    // Opaque background: premultiplied and straight RGB coincide.
    let rgb: Vec<u8> = pixmap
        .data()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();

    let q = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
    let mut bytes = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, q);
    encoder
        .encode(&rgb, width, height, image::ExtendedColorType::Rgb8)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;

    Ok(EncodedJpeg {
        width,
        height,
        bytes,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/capture/raster.rs"]
mod tests;
