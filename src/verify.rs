//! Ticket verification against the backend.

use crate::delivery::api::{TicketApi, TicketRecord};
use crate::delivery::notify::Notifier;
use crate::foundation::error::{TicketError, TicketResult};

pub const MARKED_USED_MESSAGE: &str = "Ticket marked as used";

/// Verification verdict for a scanned ticket id.
#[derive(Clone, Debug, PartialEq)]
pub enum VerifyStatus {
    /// Issued and not yet used.
    Valid(TicketRecord),
    /// Issued and already used.
    Used(TicketRecord),
    /// Unknown id, or the backend could not confirm it.
    Fake,
}

impl VerifyStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Valid(_) => "valid",
            Self::Used(_) => "used",
            Self::Fake => "fake",
        }
    }
}

/// Look up `ticket_id`. Any failure to confirm the ticket reads as [`VerifyStatus::Fake`].
#[tracing::instrument(skip(api))]
pub async fn verify_ticket(api: &dyn TicketApi, ticket_id: &str) -> VerifyStatus {
    let ticket_id = ticket_id.trim();
    if ticket_id.is_empty() {
        return VerifyStatus::Fake;
    }
    match api.get_ticket(ticket_id).await {
        Ok(Some(record)) if record.used => VerifyStatus::Used(record),
        Ok(Some(record)) => VerifyStatus::Valid(record),
        Ok(None) => VerifyStatus::Fake,
        Err(e) => {
            tracing::warn!(error = %e, "ticket lookup failed");
            VerifyStatus::Fake
        }
    }
}

/// Mark `ticket_id` used. Failures are reported with the server's message when it sent one.
#[tracing::instrument(skip(api, notifier))]
pub async fn invalidate_ticket(
    api: &dyn TicketApi,
    notifier: &dyn Notifier,
    ticket_id: &str,
) -> TicketResult<TicketRecord> {
    match api.mark_used(ticket_id).await {
        Ok(record) => {
            notifier.success(MARKED_USED_MESSAGE);
            Ok(record)
        }
        Err(e) => {
            let message = match &e {
                TicketError::Delivery {
                    message,
                    server_message: true,
                    ..
                } => message.clone(),
                TicketError::Delivery {
                    status: Some(status),
                    ..
                } => format!("Update failed ({status})"),
                _ => "Update failed".to_string(),
            };
            notifier.error(&message);
            Err(e)
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/verify.rs"]
mod tests;
