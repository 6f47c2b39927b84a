use chrono::{DateTime, NaiveDate, TimeZone};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};

use crate::foundation::config::PageContext;

pub const DEFAULT_AMOUNT: &str = "₦300";
pub const DEFAULT_TICKET_ID: &str = "#DR-XXXXXXXX-XXX";
pub const DEFAULT_KIND: &str = "Printed";
pub const DEFAULT_VALID_FOR: &str = "Single Trip";

/// Canonical verification domain used when no page origin is available.
pub const CANONICAL_TICKET_BASE: &str = "https://tickets.ecocruise.org/";

/// Bytes left unescaped in a URI component: alphanumerics and `-_.!~*'()`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Display date format (`05 Mar 2026`).
pub const DISPLAY_DATE_FORMAT: &str = "%d %b %Y";

/// Values shown on one ticket card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketContent {
    /// Amount as displayed, currency symbol included.
    pub amount: String,
    pub ticket_id: String,
    /// Authoritative issue date from the backend, already formatted for display.
    pub date_issued: Option<String>,
    pub kind: String,
    pub valid_for: String,
    /// Explicit QR payload; derived from the ticket id when absent.
    pub qr_value: Option<String>,
}

impl Default for TicketContent {
    fn default() -> Self {
        Self {
            amount: DEFAULT_AMOUNT.to_string(),
            ticket_id: DEFAULT_TICKET_ID.to_string(),
            date_issued: None,
            kind: DEFAULT_KIND.to_string(),
            valid_for: DEFAULT_VALID_FOR.to_string(),
            qr_value: None,
        }
    }
}

impl TicketContent {
    /// Content for an issued ticket; `raw_amount` is the amount typed into the form.
    pub fn issued(ticket_id: &str, raw_amount: &str, date_issued: Option<String>) -> Self {
        Self {
            amount: format_amount(raw_amount),
            ticket_id: ticket_id.to_string(),
            date_issued,
            ..Self::default()
        }
    }
}

/// `₦` + amount, defaulting to 300 when the form amount is blank.
pub fn format_amount(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        DEFAULT_AMOUNT.to_string()
    } else {
        format!("₦{raw}")
    }
}

/// QR payload for a card.
///
/// An explicit value wins. Otherwise the payload links to `<origin>/verify?ticketId=<id>` with the id
/// escaped as a URI component (spaces become `%20`). Without a usable origin it falls back to the
/// canonical domain. A blank ticket id yields an empty payload.
pub fn qr_payload(explicit: Option<&str>, page: &PageContext, ticket_id: &str) -> String {
    if let Some(v) = explicit.filter(|v| !v.is_empty()) {
        return v.to_string();
    }
    if ticket_id.is_empty() {
        return String::new();
    }
    match page.origin().and_then(|o| o.join("/verify").ok()) {
        Some(url) => format!(
            "{}?ticketId={}",
            url.as_str(),
            utf8_percent_encode(ticket_id, URI_COMPONENT)
        ),
        None => format!("{CANONICAL_TICKET_BASE}{ticket_id}"),
    }
}

pub fn format_display_date(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

/// Date shown on the card: the backend value when present, otherwise `today`. Never empty.
pub fn display_date(date_issued: Option<&str>, today: NaiveDate) -> String {
    match date_issued.map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) => d.to_string(),
        None => format_display_date(today),
    }
}

/// Format a backend RFC 3339 timestamp as a display date in `tz`.
pub fn format_issue_date_iso<Tz: TimeZone>(iso: &str, tz: &Tz) -> Option<String> {
    let parsed = DateTime::parse_from_rfc3339(iso.trim()).ok()?;
    Some(format_display_date(parsed.with_timezone(tz).date_naive()))
}

#[cfg(test)]
#[path = "../../tests/unit/card/content.rs"]
mod tests;
