#![forbid(unsafe_code)]

pub mod assets;
pub mod capture;
pub mod card;
pub mod delivery;
pub mod foundation;
pub mod readiness;
pub mod verify;
pub mod wizard;

pub use assets::logo::{FileLogoSource, HttpLogoSource, LogoAsset, LogoCache, LogoSource};
pub use capture::{CaptureEngine, CaptureOptions, CapturedImage, FontEnvironment};
pub use card::{TicketCard, TicketContent};
pub use delivery::{
    DeliveryOrchestrator, DeliveryOutcome, DeliveryResult, HttpTicketApi, IssuedTicket, Notifier,
    TicketApi, TicketMeta,
};
pub use foundation::config::{PipelineConfig, ReadinessPolicy};
pub use foundation::error::{CaptureError, TicketError, TicketResult};
pub use readiness::{CaptureGate, wait_until_ready};
pub use verify::{VerifyStatus, invalidate_ticket, verify_ticket};
pub use wizard::{Step, Wizard};
