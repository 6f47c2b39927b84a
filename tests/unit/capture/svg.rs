use chrono::NaiveDate;

use super::*;
use crate::assets::logo::LogoAsset;
use crate::card::content::TicketContent;
use crate::card::dom::CardDom;
use crate::card::layout::layout_card;
use crate::foundation::config::PageContext;

fn dom() -> CardDom {
    CardDom::build(
        &TicketContent::issued("DR-<&>", "300", None),
        &PageContext::default(),
        NaiveDate::from_ymd_opt(2026, 3, 5).unwrap(),
    )
    .unwrap()
}

#[test]
fn markup_is_centered_and_sized_to_content() {
    let layout = layout_card(&dom());
    let svg = to_svg(&layout, 330.0, Rgb8::WHITE);

    let h = layout.content_height.ceil();
    assert!(svg.starts_with("<svg "));
    assert!(svg.contains(&format!(r#"width="330" height="{h}""#)));
    assert!(svg.contains(r#"<g transform="translate(5 0)">"#));
    assert!(svg.ends_with("</g></svg>"));
}

#[test]
fn text_is_escaped() {
    let svg = to_svg(&layout_card(&dom()), 330.0, Rgb8::WHITE);
    assert!(svg.contains("Ticket ID: DR-&lt;&amp;&gt;"));
    assert!(!svg.contains("DR-<&>"));
}

#[test]
fn unresolved_logo_is_not_emitted_until_embedded() {
    let mut dom = dom();
    let svg = to_svg(&layout_card(&dom), 330.0, Rgb8::WHITE);
    assert!(!svg.contains("<image"));

    dom.set_logo(&LogoAsset::fallback());
    let svg = to_svg(&layout_card(&dom), 330.0, Rgb8::WHITE);
    assert!(svg.contains(r#"xlink:href="data:image/png;base64,"#));
}

#[test]
fn font_lists_quote_named_families_only() {
    assert_eq!(
        svg_font_family("Arial, Roboto, sans-serif"),
        "'Arial', 'Roboto', sans-serif"
    );
    assert_eq!(svg_font_family("\"Playfair Display\""), "'Playfair Display'");
    assert_eq!(escape_xml("a'b\"c"), "a&apos;b&quot;c");
}
