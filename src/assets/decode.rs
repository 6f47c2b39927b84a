use std::io::Cursor;

use anyhow::Context;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::foundation::error::{TicketError, TicketResult};

/// Decoded raster image reduced to what readiness checks need.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Re-encoded PNG bytes.
    pub png: Vec<u8>,
}

/// Decode encoded image bytes (any format `image` understands) and re-encode them as PNG.
///
/// Zero-sized images are rejected: a decoded image without pixels is not a usable logo.
pub fn decode_image(bytes: &[u8]) -> TicketResult<DecodedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let (width, height) = (dyn_img.width(), dyn_img.height());
    if width == 0 || height == 0 {
        return Err(TicketError::asset_load(format!(
            "decoded image has zero dimension ({width}x{height})"
        )));
    }

    let mut png = Vec::new();
    dyn_img
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .context("re-encode image as png")?;

    Ok(DecodedImage { width, height, png })
}

/// Build a base64 `data:` URI.
pub fn to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", BASE64.encode(bytes))
}

/// Split a base64 `data:` URI into its mime type and payload bytes.
pub fn parse_data_uri(uri: &str) -> TicketResult<(String, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| TicketError::asset_load("not a data uri"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| TicketError::asset_load("data uri has no payload separator"))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| TicketError::asset_load("only base64 data uris are supported"))?;
    let bytes = BASE64
        .decode(payload.trim())
        .map_err(|e| TicketError::asset_load(format!("bad base64 payload: {e}")))?;
    Ok((mime.to_string(), bytes))
}

/// Decode the image behind a `data:` URI and report its natural dimensions.
pub fn data_uri_dimensions(uri: &str) -> TicketResult<(u32, u32)> {
    let (_, bytes) = parse_data_uri(uri)?;
    let img = decode_image(&bytes)?;
    Ok((img.width, img.height))
}

/// Shorten long references (data URIs) for logs and error messages.
pub fn short_src(src: &str) -> String {
    const MAX: usize = 48;
    if src.chars().count() <= MAX {
        return src.to_string();
    }
    let head: String = src.chars().take(MAX).collect();
    format!("{head}…")
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
