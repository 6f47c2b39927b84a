//! Box layout of the fixed card design.
//!
//! Text is measured with a fixed advance estimate instead of shaped glyphs. The rasterizer shapes
//! the real glyphs later; the estimate only decides line breaks and therefore content height.

use kurbo::Rect;

use crate::card::dom::{CardDom, TextAlign, TextBlock};
use crate::card::qr::QrMatrix;
use crate::foundation::config::Rgb8;

const ADVANCE_EM: f64 = 0.55;
const LINE_HEIGHT: f64 = 1.5;

const AMOUNT_PAD: f64 = 12.0;
const LOGO_BOX_H: f64 = 110.0;
const LOGO_W: f64 = 100.0;
const INFO_MARGIN: f64 = 20.0;
const INFO_BORDER: f64 = 2.0;
const INFO_PAD_Y: f64 = 20.0;
const INFO_PAD_X: f64 = 8.0;
const ROW_GAP: f64 = 8.0;
const FIELD_SIZE: f64 = 14.0;
const QR_SIZE: f64 = 63.0;
const QR_GAP: f64 = 8.0;
const DIVIDER_H: f64 = 1.3;
const FOOTER_PAD: f64 = 20.0;

const BORDER: Rgb8 = Rgb8([229, 231, 235]);
const INFO_BORDER_COLOR: Rgb8 = Rgb8([156, 163, 175]);

/// A positioned drawing primitive in card coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum LayoutItem {
    /// One line of text; `baseline` is the y of the alphabetic baseline, `x` the anchor point.
    Text {
        x: f64,
        baseline: f64,
        text: String,
        size_px: f64,
        weight: u16,
        family: String,
        align: TextAlign,
    },
    /// Image box; `href` is `None` when the source is not embeddable yet.
    Image { rect: Rect, href: Option<String> },
    /// Stroked rectangle outline.
    Frame { rect: Rect, stroke: f64, color: Rgb8 },
    /// Filled rectangle.
    Fill { rect: Rect, color: Rgb8 },
    /// QR symbol scaled into `rect`.
    Qr { rect: Rect, matrix: QrMatrix },
}

/// Laid-out card.
#[derive(Clone, Debug, PartialEq)]
pub struct CardLayout {
    pub width: f64,
    /// Measured content height (the card's scroll height).
    pub content_height: f64,
    pub items: Vec<LayoutItem>,
}

/// Lay out `dom` top to bottom.
pub fn layout_card(dom: &CardDom) -> CardLayout {
    let w = dom.width_px;
    if !dom.visible {
        return CardLayout {
            width: w,
            content_height: 0.0,
            items: Vec::new(),
        };
    }

    let mut items = Vec::new();
    let mut y = 0.0;

    // Amount, right aligned inside 12px padding.
    y += AMOUNT_PAD;
    y = push_block(&mut items, dom, &dom.amount, AMOUNT_PAD, w - AMOUNT_PAD, y);
    y += AMOUNT_PAD;

    // Logo centered in a fixed-height box; height follows the natural aspect ratio.
    let logo_h = match dom.logo.natural {
        Some((nw, nh)) if nw > 0 => LOGO_W * f64::from(nh) / f64::from(nw),
        _ => LOGO_W,
    };
    let box_h = LOGO_BOX_H.max(logo_h);
    let logo_x = (w - LOGO_W) / 2.0;
    let logo_y = y + (box_h - logo_h) / 2.0;
    items.push(LayoutItem::Image {
        rect: Rect::new(logo_x, logo_y, logo_x + LOGO_W, logo_y + logo_h),
        href: dom.logo.is_embedded().then(|| dom.logo.src.clone()),
    });
    y += box_h;

    y = push_block(&mut items, dom, &dom.heading, 0.0, w, y);
    y = push_block(&mut items, dom, &dom.operator, 0.0, w, y);

    // Metadata box: rows on the left, QR on the right.
    y += INFO_MARGIN;
    let box_top = y;
    let inner_left = INFO_MARGIN + INFO_BORDER + INFO_PAD_X;
    let inner_right = w - INFO_MARGIN - INFO_BORDER - INFO_PAD_X;
    let rows_right = inner_right - QR_SIZE - QR_GAP;
    let mut row_y = box_top + INFO_BORDER + INFO_PAD_Y;
    let rows_top = row_y;
    let family = dom.field_family().to_string();
    for (i, row) in dom.fields.iter().enumerate() {
        if i > 0 {
            row_y += ROW_GAP;
        }
        let text = format!("{} {}", row.label, row.value);
        let lines = wrap_text(&text, rows_right - inner_left, FIELD_SIZE);
        for line in lines {
            items.push(LayoutItem::Text {
                x: inner_left,
                baseline: baseline_for(row_y, FIELD_SIZE),
                text: line,
                size_px: FIELD_SIZE,
                weight: 400,
                family: family.clone(),
                align: TextAlign::Start,
            });
            row_y += FIELD_SIZE * LINE_HEIGHT;
        }
    }
    let rows_h = row_y - rows_top;
    let inner_h = rows_h.max(QR_SIZE);
    let qr_top = rows_top + (inner_h - QR_SIZE) / 2.0;
    items.push(LayoutItem::Qr {
        rect: Rect::new(inner_right - QR_SIZE, qr_top, inner_right, qr_top + QR_SIZE),
        matrix: dom.qr.clone(),
    });
    let box_bottom = rows_top + inner_h + INFO_PAD_Y + INFO_BORDER;
    items.push(LayoutItem::Frame {
        rect: Rect::new(
            INFO_MARGIN + INFO_BORDER / 2.0,
            box_top + INFO_BORDER / 2.0,
            w - INFO_MARGIN - INFO_BORDER / 2.0,
            box_bottom - INFO_BORDER / 2.0,
        ),
        stroke: INFO_BORDER,
        color: INFO_BORDER_COLOR,
    });
    y = box_bottom + INFO_MARGIN;

    // Divider.
    items.push(LayoutItem::Fill {
        rect: Rect::new(INFO_MARGIN, y, w - INFO_MARGIN, y + DIVIDER_H),
        color: BORDER,
    });
    y += DIVIDER_H + INFO_MARGIN;

    y = push_block(&mut items, dom, &dom.slogan, 0.0, w, y);
    y = push_block(&mut items, dom, &dom.contact, 0.0, w, y);
    y += FOOTER_PAD;

    // Card outline last so it sits on top of the background only.
    items.push(LayoutItem::Frame {
        rect: Rect::new(0.5, 0.5, w - 0.5, y - 0.5),
        stroke: 1.0,
        color: BORDER,
    });

    CardLayout {
        width: w,
        content_height: y,
        items,
    }
}

/// Lay out a text block between `left` and `right` starting at `top`; returns the new cursor.
fn push_block(
    items: &mut Vec<LayoutItem>,
    dom: &CardDom,
    block: &TextBlock,
    left: f64,
    right: f64,
    top: f64,
) -> f64 {
    let family = dom.effective_family(block).to_string();
    let x = match block.align {
        TextAlign::Start => left,
        TextAlign::Center => (left + right) / 2.0,
        TextAlign::End => right,
    };
    let mut y = top;
    for line in wrap_text(&block.text, right - left, block.size_px) {
        items.push(LayoutItem::Text {
            x,
            baseline: baseline_for(y, block.size_px),
            text: line,
            size_px: block.size_px,
            weight: block.weight,
            family: family.clone(),
            align: block.align,
        });
        y += block.size_px * LINE_HEIGHT;
    }
    y
}

fn baseline_for(line_top: f64, size_px: f64) -> f64 {
    // Half-leading above, then roughly 0.8em of ascent.
    line_top + size_px * (LINE_HEIGHT - 1.0) / 2.0 + size_px * 0.8
}

/// Estimated rendered width of `text` at `size_px`.
pub fn estimate_width(text: &str, size_px: f64) -> f64 {
    text.chars().count() as f64 * size_px * ADVANCE_EM
}

/// Greedy word wrap; words wider than the line are split by characters. Always returns at least
/// one line.
pub fn wrap_text(text: &str, max_width: f64, size_px: f64) -> Vec<String> {
    let max_chars = ((max_width / (size_px * ADVANCE_EM)).floor() as usize).max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        loop {
            let cur_len = current.chars().count();
            let needed = if cur_len == 0 { word.len() } else { cur_len + 1 + word.len() };
            if needed <= max_chars {
                if cur_len > 0 {
                    current.push(' ');
                }
                current.extend(word.iter());
                break;
            }
            if cur_len > 0 {
                lines.push(std::mem::take(&mut current));
                continue;
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
            if word.is_empty() {
                break;
            }
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
#[path = "../../tests/unit/card/layout.rs"]
mod tests;
