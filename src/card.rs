//! The ticket card: content, fixed-layout tree, QR symbol and box layout.
//!
//! A card is mounted with [`TicketCard::mount`]; it resolves the shared logo in the background and
//! flips its readiness signal exactly once when the logo has usable pixels.

pub mod content;
pub mod dom;
pub mod layout;
pub mod mount;
pub mod qr;

pub use content::TicketContent;
pub use dom::CardDom;
pub use layout::{CardLayout, LayoutItem, layout_card};
pub use mount::{CardPhase, TicketCard, TicketCardState};
pub use qr::QrMatrix;
