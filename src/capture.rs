//! Raster capture of a mounted ticket card.
//!
//! The card tree is laid out, serialized to SVG and rasterized with `resvg` at a fixed output width
//! times a pixel ratio, then encoded as JPEG. Capture takes a [`CaptureGate`] from the readiness
//! wait and re-checks every card image before rasterizing.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::anyhow;
use parking_lot::Mutex;

use crate::assets::decode::{data_uri_dimensions, parse_data_uri, short_src};
use crate::card::dom::{CardDom, split_family_list};
use crate::card::layout::{LayoutItem, layout_card};
use crate::card::mount::TicketCard;
use crate::foundation::config::{CaptureSettings, Rgb8};
use crate::foundation::error::{CaptureError, TicketError, TicketResult};
use crate::readiness::CaptureGate;

pub mod fonts;
pub mod raster;
pub mod svg;

pub use fonts::FontEnvironment;

/// Capture parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureOptions {
    pub width_px: u32,
    pub pixel_ratio: f32,
    pub background: Rgb8,
    pub quality: f32,
    pub settle_delay: Duration,
    pub safe_font_family: String,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self::from(&CaptureSettings::default())
    }
}

impl From<&CaptureSettings> for CaptureOptions {
    fn from(s: &CaptureSettings) -> Self {
        Self {
            width_px: s.width_px,
            pixel_ratio: s.pixel_ratio,
            background: s.background,
            quality: s.quality,
            settle_delay: Duration::from_millis(s.settle_delay_ms),
            safe_font_family: s.safe_font_family.clone(),
        }
    }
}

impl CaptureOptions {
    /// Output size in device pixels for a card of `content_height` CSS pixels.
    pub fn output_size(&self, content_height: f64) -> (u32, u32) {
        let ratio = f64::from(self.pixel_ratio);
        let w = (f64::from(self.width_px) * ratio).round() as u32;
        let h = (content_height.ceil() * ratio).round() as u32;
        (w, h)
    }
}

/// Encoded capture result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedImage {
    /// `data:image/jpeg;base64,...`
    pub data_uri: String,
    pub width: u32,
    pub height: u32,
    pub jpeg_len: usize,
}

impl CapturedImage {
    /// Raw JPEG bytes behind the data URI.
    pub fn jpeg_bytes(&self) -> TicketResult<Vec<u8>> {
        parse_data_uri(&self.data_uri).map(|(_, bytes)| bytes)
    }
}

/// Forces a font family onto the card tree until dropped, then restores the previous value.
pub struct ScopedFontOverride<'a> {
    dom: &'a mut CardDom,
    previous: Option<String>,
}

impl<'a> ScopedFontOverride<'a> {
    pub fn apply(dom: &'a mut CardDom, family: &str) -> Self {
        let previous = dom.style.font_override.replace(family.to_string());
        Self { dom, previous }
    }

    pub fn dom(&self) -> &CardDom {
        self.dom
    }
}

impl Drop for ScopedFontOverride<'_> {
    fn drop(&mut self) {
        self.dom.style.font_override = self.previous.take();
    }
}

/// Rasterizes mounted cards.
#[derive(Clone, Debug)]
pub struct CaptureEngine {
    fonts: FontEnvironment,
    opts: CaptureOptions,
}

impl CaptureEngine {
    pub fn new(fonts: FontEnvironment, opts: CaptureOptions) -> Self {
        Self { fonts, opts }
    }

    pub fn options(&self) -> &CaptureOptions {
        &self.opts
    }

    pub fn fonts(&self) -> &FontEnvironment {
        &self.fonts
    }

    /// Capture `card` as a JPEG data URI.
    #[tracing::instrument(level = "debug", skip_all, fields(ticket_id = card.ticket_id(), gate = ?gate))]
    pub async fn capture(&self, card: &TicketCard, gate: CaptureGate) -> TicketResult<CapturedImage> {
        let dom = card.dom();
        let dropped = self.ensure_images_loaded(&dom, gate).await?;

        if !self.opts.settle_delay.is_zero() {
            tokio::time::sleep(self.opts.settle_delay).await;
        }

        let fonts = self.fonts.clone();
        let opts = self.opts.clone();
        let jpeg = tokio::task::spawn_blocking(move || {
            let (svg, content_height) = render_markup(&dom, &fonts, &opts, &dropped)?;
            let target = opts.output_size(content_height);
            let default_family = split_family_list(&opts.safe_font_family)
                .next()
                .unwrap_or_else(|| "sans-serif".to_string());
            raster::rasterize_jpeg(
                &svg,
                &fonts,
                &default_family,
                target,
                opts.pixel_ratio,
                opts.background,
                opts.quality,
            )
        })
        .await
        .map_err(|e| TicketError::Other(anyhow!("capture task failed: {e}")))??;

        let image = CapturedImage {
            data_uri: jpeg.data_uri(),
            width: jpeg.width,
            height: jpeg.height,
            jpeg_len: jpeg.bytes.len(),
        };
        tracing::debug!(
            width = image.width,
            height = image.height,
            bytes = image.jpeg_len,
            "card captured"
        );
        Ok(image)
    }

    /// Decode every image in the card. Returns the sources to leave out of a degraded capture.
    ///
    /// A confirmed capture fails on the first image without usable pixels.
    async fn ensure_images_loaded(
        &self,
        dom: &Mutex<CardDom>,
        gate: CaptureGate,
    ) -> TicketResult<HashSet<String>> {
        let slots = dom.lock().image_slots();
        let mut dropped = HashSet::new();

        for slot in slots {
            let loaded = if slot.is_embedded() {
                let src = slot.src.clone();
                tokio::task::spawn_blocking(move || data_uri_dimensions(&src))
                    .await
                    .map_err(|e| TicketError::Other(anyhow!("image decode task failed: {e}")))?
                    .map(|(w, h)| w > 0 && h > 0)
                    .unwrap_or(false)
            } else {
                false
            };
            if loaded {
                continue;
            }

            match gate {
                CaptureGate::Confirmed => {
                    return Err(CaptureError::ImageNotLoaded {
                        src: short_src(&slot.src),
                    }
                    .into());
                }
                CaptureGate::Degraded => {
                    tracing::warn!(src = %short_src(&slot.src), "image not loaded, capturing without it");
                    dropped.insert(slot.src);
                }
            }
        }
        Ok(dropped)
    }
}

/// Lay out the card under the safe font override and serialize it. The override is restored
/// before returning, on success and on error.
fn render_markup(
    dom: &Mutex<CardDom>,
    fonts: &FontEnvironment,
    opts: &CaptureOptions,
    dropped: &HashSet<String>,
) -> Result<(String, f64), CaptureError> {
    let mut guard = dom.lock();
    let scoped = ScopedFontOverride::apply(&mut guard, &opts.safe_font_family);

    let mut layout = layout_card(scoped.dom());
    if layout.content_height <= 0.0 {
        return Err(CaptureError::ZeroHeight);
    }
    fonts.check_local(&scoped.dom().font_families())?;

    layout.items.retain(|item| match item {
        LayoutItem::Image { href: Some(h), .. } => !dropped.contains(h),
        _ => true,
    });
    let svg = svg::to_svg(&layout, f64::from(opts.width_px), opts.background);
    Ok((svg, layout.content_height))
}

#[cfg(test)]
#[path = "../tests/unit/capture/engine.rs"]
mod tests;
