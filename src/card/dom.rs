use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::assets::logo::{LOGO_PATH, LogoAsset};
use crate::card::content::{TicketContent, display_date, qr_payload};
use crate::card::qr::QrMatrix;
use crate::foundation::config::{PageContext, Rgb8};
use crate::foundation::error::TicketResult;

/// Rendered card width in CSS pixels.
pub const CARD_WIDTH_PX: f64 = 320.0;

pub const BRAND_HEADING: &str = "DanRaph Ecocruise";
pub const OPERATOR_LINE: &str = "Operator Of Maduka Shuttle Services";
pub const SLOGAN: &str = "Safe. Reliable. On Time";
pub const CONTACT_LINE: &str = "Call: 07032950309 | 09168071385 | 08037006559";

pub const BASE_FONT_FAMILY: &str = "system-ui, sans-serif";
pub const OPERATOR_FONT_FAMILY: &str = "Montserrat";
pub const SLOGAN_FONT_FAMILY: &str = "Playfair Display";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextAlign {
    Start,
    Center,
    End,
}

/// One styled run of text.
#[derive(Clone, Debug, PartialEq)]
pub struct TextBlock {
    pub text: String,
    pub size_px: f64,
    pub weight: u16,
    /// Own family; `None` inherits the root family.
    pub family: Option<String>,
    pub align: TextAlign,
}

impl TextBlock {
    fn new(text: impl Into<String>, size_px: f64, weight: u16, align: TextAlign) -> Self {
        Self {
            text: text.into(),
            size_px,
            weight,
            family: None,
            align,
        }
    }

    fn family(mut self, family: &str) -> Self {
        self.family = Some(family.to_string());
        self
    }
}

/// `label: value` row in the metadata block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldRow {
    pub label: String,
    pub value: String,
}

/// The card's single `<img>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageSlot {
    /// Unresolved path until the logo resolves, then an embedded `data:` URI.
    pub src: String,
    pub alt: String,
    /// Natural size once decoded.
    pub natural: Option<(u32, u32)>,
}

impl ImageSlot {
    /// Whether `src` can be rasterized without any further fetch.
    pub fn is_embedded(&self) -> bool {
        self.src.starts_with("data:")
    }
}

/// Root style of the card subtree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RootStyle {
    pub font_family: String,
    /// Forced family applied to every text node while set.
    pub font_override: Option<String>,
    pub background: Rgb8,
}

/// Fixed-layout ticket card tree.
#[derive(Clone, Debug, PartialEq)]
pub struct CardDom {
    pub width_px: f64,
    /// Hidden cards lay out to zero height.
    pub visible: bool,
    pub style: RootStyle,
    pub amount: TextBlock,
    pub logo: ImageSlot,
    pub heading: TextBlock,
    pub operator: TextBlock,
    pub fields: Vec<FieldRow>,
    pub qr: QrMatrix,
    pub slogan: TextBlock,
    pub contact: TextBlock,
    /// Mirrors the card's readiness for observers inspecting the tree.
    pub ready_attr: bool,
}

impl CardDom {
    /// Build the tree for `content`. The logo starts unresolved.
    pub fn build(content: &TicketContent, page: &PageContext, today: NaiveDate) -> TicketResult<Self> {
        let qr_value = qr_payload(content.qr_value.as_deref(), page, &content.ticket_id);
        let issued = display_date(content.date_issued.as_deref(), today);

        Ok(Self {
            width_px: CARD_WIDTH_PX,
            visible: true,
            style: RootStyle {
                font_family: BASE_FONT_FAMILY.to_string(),
                font_override: None,
                background: Rgb8::WHITE,
            },
            amount: TextBlock::new(content.amount.clone(), 16.0, 700, TextAlign::End),
            logo: ImageSlot {
                src: LOGO_PATH.to_string(),
                alt: "DanRaph Ecocruise Logo".to_string(),
                natural: None,
            },
            heading: TextBlock::new(BRAND_HEADING, 25.0, 600, TextAlign::Center),
            operator: TextBlock::new(OPERATOR_LINE, 15.0, 400, TextAlign::Center)
                .family(OPERATOR_FONT_FAMILY),
            fields: vec![
                FieldRow::new("Ticket ID:", &content.ticket_id),
                FieldRow::new("Date Issued:", &issued),
                FieldRow::new("Type:", &content.kind),
                FieldRow::new("Valid For:", &content.valid_for),
            ],
            qr: QrMatrix::encode(&qr_value)?,
            slogan: TextBlock::new(SLOGAN, 19.0, 700, TextAlign::Center).family(SLOGAN_FONT_FAMILY),
            contact: TextBlock::new(CONTACT_LINE, 14.0, 500, TextAlign::Center),
            ready_attr: false,
        })
    }

    /// Point the image slot at a resolved logo.
    pub fn set_logo(&mut self, logo: &LogoAsset) {
        self.logo.src = logo.data_uri().to_string();
        self.logo.natural = Some((logo.width(), logo.height()));
    }

    /// Family a text block renders with: override, then own family, then root family.
    pub fn effective_family<'a>(&'a self, block: &'a TextBlock) -> &'a str {
        self.style
            .font_override
            .as_deref()
            .or(block.family.as_deref())
            .unwrap_or(&self.style.font_family)
    }

    /// Family used by the metadata rows.
    pub fn field_family(&self) -> &str {
        self.style
            .font_override
            .as_deref()
            .unwrap_or(&self.style.font_family)
    }

    /// Every individual family name referenced under the current style.
    pub fn font_families(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        let blocks = [
            &self.amount,
            &self.heading,
            &self.operator,
            &self.slogan,
            &self.contact,
        ];
        let lists = blocks
            .iter()
            .map(|b| self.effective_family(b))
            .chain(std::iter::once(self.field_family()));
        for list in lists {
            for name in split_family_list(list) {
                out.insert(name);
            }
        }
        out
    }

    /// Image elements inside the subtree.
    pub fn image_slots(&self) -> Vec<ImageSlot> {
        vec![self.logo.clone()]
    }
}

impl FieldRow {
    fn new(label: &str, value: &str) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
        }
    }
}

/// Split a CSS-style family list into bare family names.
pub fn split_family_list(list: &str) -> impl Iterator<Item = String> + '_ {
    list.split(',')
        .map(|f| f.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
        .filter(|f| !f.is_empty())
}

#[cfg(test)]
#[path = "../../tests/unit/card/dom.rs"]
mod tests;
