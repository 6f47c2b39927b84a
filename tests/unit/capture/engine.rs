use std::sync::Arc;

use chrono::NaiveDate;

use super::*;
use crate::assets::logo::{LogoCache, LogoSource};
use crate::card::content::TicketContent;
use crate::foundation::config::{PageContext, ReadinessPolicy};
use crate::readiness::wait_until_ready;

struct Fixed(Option<Vec<u8>>);

#[async_trait::async_trait]
impl LogoSource for Fixed {
    async fn fetch(&self) -> anyhow::Result<Vec<u8>> {
        match &self.0 {
            Some(b) => Ok(b.clone()),
            None => std::future::pending().await,
        }
    }

    fn describe(&self) -> String {
        "fixed".to_string()
    }
}

fn png(w: u32, h: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba([30, 60, 200, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn engine() -> CaptureEngine {
    let opts = CaptureOptions {
        settle_delay: Duration::ZERO,
        ..CaptureOptions::default()
    };
    CaptureEngine::new(FontEnvironment::empty(), opts)
}

fn mounted_card(source: Fixed) -> TicketCard {
    let logos = Arc::new(LogoCache::new(Arc::new(source), Duration::from_secs(4)));
    TicketCard::mount_on(
        TicketContent::issued("DR-9", "300", Some("05 Mar 2026".into())),
        &PageContext::from_origin(Some("https://tickets.example.com")),
        logos,
        NaiveDate::from_ymd_opt(2026, 3, 5).unwrap(),
    )
    .unwrap()
}

#[tokio::test]
async fn capture_is_fixed_width_and_content_high() {
    let card = mounted_card(Fixed(Some(png(40, 20))));
    assert!(wait_until_ready(&card.readiness(), Duration::from_secs(2), 0).await);

    let engine = engine();
    let image = engine.capture(&card, CaptureGate::Confirmed).await.unwrap();

    let mut expected = card.snapshot();
    expected.style.font_override = Some(engine.options().safe_font_family.clone());
    let h = layout_card(&expected).content_height;
    assert_eq!(image.width, 660);
    assert_eq!(image.height, (h.ceil() * 2.0) as u32);
    assert!(image.data_uri.starts_with("data:image/jpeg;base64,"));

    let bytes = image.jpeg_bytes().unwrap();
    assert_eq!(bytes.len(), image.jpeg_len);
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (image.width, image.height));

    assert_eq!(card.snapshot().style.font_override, None);
}

#[tokio::test]
async fn width_does_not_depend_on_card_width() {
    let card = mounted_card(Fixed(Some(png(10, 10))));
    assert!(wait_until_ready(&card.readiness(), Duration::from_secs(2), 0).await);
    card.dom().lock().width_px = 300.0;

    let image = engine().capture(&card, CaptureGate::Confirmed).await.unwrap();
    assert_eq!(image.width, 660);
}

#[tokio::test]
async fn hidden_card_fails_with_zero_height_and_restores_font() {
    let card = mounted_card(Fixed(Some(png(10, 10))));
    assert!(wait_until_ready(&card.readiness(), Duration::from_secs(2), 0).await);
    card.set_visible(false);

    let err = engine().capture(&card, CaptureGate::Confirmed).await.unwrap_err();
    assert!(matches!(err, TicketError::Capture(CaptureError::ZeroHeight)));
    assert_eq!(card.snapshot().style.font_override, None);
}

#[tokio::test]
async fn remote_font_is_refused() {
    let card = mounted_card(Fixed(Some(png(10, 10))));
    assert!(wait_until_ready(&card.readiness(), Duration::from_secs(2), 0).await);

    let opts = CaptureOptions {
        settle_delay: Duration::ZERO,
        safe_font_family: "Montserrat, sans-serif".into(),
        ..CaptureOptions::default()
    };
    let err = CaptureEngine::new(FontEnvironment::empty(), opts)
        .capture(&card, CaptureGate::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TicketError::Capture(CaptureError::RemoteFont { ref family }) if family == "Montserrat"
    ));
    assert_eq!(card.snapshot().style.font_override, None);
}

#[tokio::test]
async fn unresolved_logo_blocks_confirmed_but_not_degraded_capture() {
    let card = mounted_card(Fixed(None));
    assert!(!card.is_ready());

    let err = engine().capture(&card, CaptureGate::Confirmed).await.unwrap_err();
    assert!(matches!(
        err,
        TicketError::Capture(CaptureError::ImageNotLoaded { ref src }) if src == "/logo1.webp"
    ));

    let image = engine().capture(&card, CaptureGate::Degraded).await.unwrap();
    assert_eq!(image.width, 660);
    assert!(image.jpeg_len > 0);
}

#[tokio::test]
async fn confirmed_gate_without_readiness_still_checks_images() {
    let card = mounted_card(Fixed(None));
    let gate = CaptureGate::decide(card.is_ready(), ReadinessPolicy::Abort);
    assert_eq!(gate, None);

    // A gate built by hand does not bypass the image check.
    let err = engine().capture(&card, CaptureGate::Confirmed).await.unwrap_err();
    assert!(matches!(
        err,
        TicketError::Capture(CaptureError::ImageNotLoaded { .. })
    ));
    assert_eq!(card.snapshot().style.font_override, None);
}

#[tokio::test(start_paused = true)]
async fn settle_delay_runs_before_rasterizing() {
    let card = mounted_card(Fixed(Some(png(10, 10))));
    assert!(wait_until_ready(&card.readiness(), Duration::from_secs(2), 0).await);

    let engine = CaptureEngine::new(FontEnvironment::empty(), CaptureOptions::default());
    let started = tokio::time::Instant::now();
    engine.capture(&card, CaptureGate::Confirmed).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(250));
}

#[test]
fn scoped_override_restores_previous_value() {
    let mut dom = CardDom::build(
        &TicketContent::default(),
        &PageContext::default(),
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
    )
    .unwrap();
    dom.style.font_override = Some("Georgia".into());
    {
        let scoped = ScopedFontOverride::apply(&mut dom, "Arial");
        assert_eq!(scoped.dom().field_family(), "Arial");
    }
    assert_eq!(dom.style.font_override.as_deref(), Some("Georgia"));
}

#[test]
fn output_size_scales_by_ratio() {
    let opts = CaptureOptions::default();
    assert_eq!(opts.output_size(400.2), (660, 802));
}
