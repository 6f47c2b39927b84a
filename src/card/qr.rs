use qrcode::{Color, QrCode};

use crate::foundation::error::{TicketError, TicketResult};

/// Square module matrix of an encoded QR symbol (no quiet zone).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QrMatrix {
    width: usize,
    dark: Vec<bool>,
}

impl QrMatrix {
    /// Encode `payload`. An empty payload still produces a valid (empty-text) symbol.
    pub fn encode(payload: &str) -> TicketResult<Self> {
        let code = QrCode::new(payload.as_bytes())
            .map_err(|e| TicketError::validation(format!("qr encode failed: {e}")))?;
        let width = code.width();
        let dark = code
            .to_colors()
            .into_iter()
            .map(|c| c == Color::Dark)
            .collect();
        Ok(Self { width, dark })
    }

    /// Modules per side.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.width && self.dark[y * self.width + x]
    }

    pub fn dark_count(&self) -> usize {
        self.dark.iter().filter(|d| **d).count()
    }

    /// SVG path data drawing every dark module as a unit square.
    pub fn svg_path(&self) -> String {
        let mut d = String::with_capacity(self.dark_count() * 16);
        for y in 0..self.width {
            for x in 0..self.width {
                if self.is_dark(x, y) {
                    d.push_str(&format!("M{x} {y}h1v1h-1z"));
                }
            }
        }
        d
    }
}

#[cfg(test)]
#[path = "../../tests/unit/card/qr.rs"]
mod tests;
