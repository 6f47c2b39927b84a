use chrono::NaiveDate;

use super::*;
use crate::assets::logo::LogoAsset;
use crate::card::content::TicketContent;
use crate::foundation::config::PageContext;

fn dom_for(ticket_id: &str) -> CardDom {
    let content = TicketContent::issued(ticket_id, "300", Some("05 Mar 2026".to_string()));
    CardDom::build(
        &content,
        &PageContext::default(),
        NaiveDate::from_ymd_opt(2026, 3, 5).unwrap(),
    )
    .unwrap()
}

#[test]
fn visible_card_has_positive_height_and_all_parts() {
    let layout = layout_card(&dom_for("DR-1"));
    assert!(layout.content_height > 300.0);
    assert_eq!(layout.width, 320.0);

    let texts: Vec<&str> = layout
        .items
        .iter()
        .filter_map(|i| match i {
            LayoutItem::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert!(texts.contains(&"₦300"));
    assert!(texts.contains(&"DanRaph Ecocruise"));
    assert!(texts.contains(&"Ticket ID: DR-1"));
    assert!(texts.contains(&"Safe. Reliable. On Time"));
    assert!(layout.items.iter().any(|i| matches!(i, LayoutItem::Qr { .. })));
}

#[test]
fn hidden_card_measures_zero() {
    let mut dom = dom_for("DR-1");
    dom.visible = false;
    let layout = layout_card(&dom);
    assert_eq!(layout.content_height, 0.0);
    assert!(layout.items.is_empty());
}

#[test]
fn height_grows_with_wrapped_content() {
    let short = layout_card(&dom_for("DR-1")).content_height;
    let long = layout_card(&dom_for(&"DR-0123456789".repeat(6))).content_height;
    assert!(long > short);
}

#[test]
fn unresolved_logo_has_no_href_until_embedded() {
    let mut dom = dom_for("DR-1");
    let href = |l: &CardLayout| {
        l.items.iter().find_map(|i| match i {
            LayoutItem::Image { href, .. } => Some(href.clone()),
            _ => None,
        })
    };
    assert_eq!(href(&layout_card(&dom)), Some(None));

    dom.set_logo(&LogoAsset::fallback());
    let resolved = href(&layout_card(&dom)).flatten().unwrap();
    assert!(resolved.starts_with("data:image/png;base64,"));
}

#[test]
fn texts_use_override_family_when_set() {
    let mut dom = dom_for("DR-1");
    dom.style.font_override = Some("Arial".to_string());
    let layout = layout_card(&dom);
    for item in &layout.items {
        if let LayoutItem::Text { family, .. } = item {
            assert_eq!(family, "Arial");
        }
    }
}

#[test]
fn wrap_text_breaks_words_and_long_tokens() {
    // 10px * 0.55 = 5.5px per char; 33px fits 6 chars.
    assert_eq!(wrap_text("ab cd ef", 33.0, 10.0), vec!["ab cd", "ef"]);
    assert_eq!(wrap_text("abcdefghij", 33.0, 10.0), vec!["abcdef", "ghij"]);
    assert_eq!(wrap_text("", 33.0, 10.0), vec![String::new()]);
    assert_eq!(wrap_text("x", 1.0, 10.0), vec!["x"]);
}

#[test]
fn estimate_width_scales_with_chars() {
    assert!((estimate_width("abcd", 10.0) - 22.0).abs() < 1e-9);
}
