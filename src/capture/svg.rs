use std::fmt::Write as _;

use crate::card::dom::{TextAlign, split_family_list};
use crate::card::layout::{CardLayout, LayoutItem};
use crate::foundation::config::Rgb8;

const INK: &str = "#111827";
const GENERIC_FAMILIES: [&str; 6] = [
    "serif",
    "sans-serif",
    "monospace",
    "cursive",
    "fantasy",
    "system-ui",
];

/// Serialize a laid-out card as SVG markup on a `canvas_width`-wide canvas.
///
/// The card is centered horizontally; canvas height is the card's content height rounded up.
pub fn to_svg(layout: &CardLayout, canvas_width: f64, background: Rgb8) -> String {
    let height = layout.content_height.ceil();
    let offset_x = ((canvas_width - layout.width) / 2.0).max(0.0);

    let mut out = String::with_capacity(4096);
    // `write!` into a String cannot fail.
    let _ = write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{canvas_width}" height="{height}" viewBox="0 0 {canvas_width} {height}">"#
    );
    let _ = write!(
        out,
        r#"<rect x="0" y="0" width="{canvas_width}" height="{height}" fill="{}"/>"#,
        background.to_hex()
    );
    let _ = write!(out, r#"<g transform="translate({offset_x} 0)">"#);

    for item in &layout.items {
        match item {
            LayoutItem::Text {
                x,
                baseline,
                text,
                size_px,
                weight,
                family,
                align,
            } => {
                let anchor = match align {
                    TextAlign::Start => "start",
                    TextAlign::Center => "middle",
                    TextAlign::End => "end",
                };
                let _ = write!(
                    out,
                    r#"<text x="{x}" y="{baseline}" font-size="{size_px}" font-weight="{weight}" font-family="{}" text-anchor="{anchor}" fill="{INK}">{}</text>"#,
                    escape_xml(&svg_font_family(family)),
                    escape_xml(text)
                );
            }
            LayoutItem::Image { rect, href } => {
                // An unresolved image paints nothing.
                if let Some(href) = href {
                    let _ = write!(
                        out,
                        r#"<image x="{}" y="{}" width="{}" height="{}" preserveAspectRatio="none" xlink:href="{}"/>"#,
                        rect.x0,
                        rect.y0,
                        rect.width(),
                        rect.height(),
                        escape_xml(href)
                    );
                }
            }
            LayoutItem::Frame {
                rect,
                stroke,
                color,
            } => {
                let _ = write!(
                    out,
                    r#"<rect x="{}" y="{}" width="{}" height="{}" fill="none" stroke="{}" stroke-width="{stroke}"/>"#,
                    rect.x0,
                    rect.y0,
                    rect.width(),
                    rect.height(),
                    color.to_hex()
                );
            }
            LayoutItem::Fill { rect, color } => {
                let _ = write!(
                    out,
                    r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
                    rect.x0,
                    rect.y0,
                    rect.width(),
                    rect.height(),
                    color.to_hex()
                );
            }
            LayoutItem::Qr { rect, matrix } => {
                let modules = matrix.width().max(1) as f64;
                let scale = rect.width() / modules;
                let _ = write!(
                    out,
                    r##"<rect x="{}" y="{}" width="{}" height="{}" fill="#ffffff"/><g transform="translate({} {}) scale({scale})"><path d="{}" fill="#000000" shape-rendering="crispEdges"/></g>"##,
                    rect.x0,
                    rect.y0,
                    rect.width(),
                    rect.height(),
                    rect.x0,
                    rect.y0,
                    matrix.svg_path()
                );
            }
        }
    }

    out.push_str("</g></svg>");
    out
}

/// Family list in SVG attribute form: named families quoted, generic keywords bare.
pub fn svg_font_family(list: &str) -> String {
    split_family_list(list)
        .map(|name| {
            if GENERIC_FAMILIES.contains(&name.to_ascii_lowercase().as_str()) {
                name
            } else {
                format!("'{name}'")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/capture/svg.rs"]
mod tests;
