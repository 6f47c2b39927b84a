//! Ticket delivery: backend contract, user notifications and the issue/resend orchestrator.

pub mod api;
pub mod notify;
pub mod orchestrator;

pub use api::{CreateTicketRequest, CreatedTicket, EmailRequest, HttpTicketApi, TicketApi, TicketRecord};
pub use notify::{Level, MemoryNotifier, Notification, Notifier, TracingNotifier};
pub use orchestrator::{
    DeliveryOrchestrator, DeliveryOutcome, DeliveryResult, DeliverySettings, IssuedTicket,
    TicketMeta,
};
