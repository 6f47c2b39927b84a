//! Ticket issuance wizard: amount, contact details, confirmation, issued ticket.
//!
//! Progress is persisted after every change so a restart resumes where the operator left off,
//! including the issued-ticket step when a ticket was already generated.

use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::delivery::notify::Notifier;
use crate::delivery::orchestrator::{
    DeliveryOrchestrator, DeliveryOutcome, DeliveryResult, IssuedTicket, TicketMeta,
};
use crate::foundation::error::{TicketError, TicketResult};

pub mod store;

pub use store::{SNAPSHOT_KEY, SnapshotStore, WizardSnapshot};

pub const MIN_AMOUNT: f64 = 300.0;
pub const AMOUNT_ERROR: &str = "Please enter a valid amount (minimum ₦300).";
pub const EMAIL_ERROR: &str = "Please enter a valid email address.";

/// Wizard step. Numbering continues the public flow, where step 1 is the landing page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    Amount = 2,
    Contact = 3,
    Confirm = 4,
    Ticket = 5,
}

impl Step {
    pub const FIRST: Self = Self::Amount;
    pub const LAST: Self = Self::Ticket;

    pub fn number(self) -> u8 {
        self as u8
    }

    /// Step for `n`, clamped into range.
    pub fn from_number(n: u8) -> Self {
        match n {
            0..=2 => Self::Amount,
            3 => Self::Contact,
            4 => Self::Confirm,
            _ => Self::Ticket,
        }
    }

    pub fn next(self) -> Self {
        Self::from_number(self.number().saturating_add(1))
    }

    pub fn prev(self) -> Self {
        Self::from_number(self.number().saturating_sub(1))
    }
}

/// Numeric and at least the minimum fare.
pub fn is_valid_amount(raw: &str) -> bool {
    raw.trim()
        .parse::<f64>()
        .is_ok_and(|n| n.is_finite() && n >= MIN_AMOUNT)
}

fn email_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
}

pub fn is_valid_email(raw: &str) -> bool {
    email_re().is_some_and(|re| re.is_match(raw))
}

/// Form state machine driving issuance.
pub struct Wizard {
    step: Step,
    amount: String,
    email: String,
    phone: String,
    ticket: Option<IssuedTicket>,
    last_error: Option<String>,
    store: Option<SnapshotStore>,
    notifier: Arc<dyn Notifier>,
}

impl Wizard {
    /// Fresh wizard without persistence.
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            step: Step::FIRST,
            amount: String::new(),
            email: String::new(),
            phone: String::new(),
            ticket: None,
            last_error: None,
            store: None,
            notifier,
        }
    }

    /// Wizard persisted in `store`, restored from any snapshot already there.
    pub fn with_store(store: SnapshotStore, notifier: Arc<dyn Notifier>) -> Self {
        let mut wizard = Self::new(notifier);
        match store.get::<WizardSnapshot>(SNAPSHOT_KEY) {
            Ok(Some(snap)) => wizard.apply_snapshot(snap),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %format!("{e:#}"), "ignoring unreadable wizard state"),
        }
        wizard.store = Some(store);
        wizard
    }

    fn apply_snapshot(&mut self, snap: WizardSnapshot) {
        self.amount = snap.amount;
        self.email = snap.email;
        self.phone = snap.phone;
        self.step = Step::from_number(snap.step);
        self.ticket = match (snap.generated, snap.ticket_id) {
            (true, Some(ticket_id)) if !ticket_id.is_empty() => Some(IssuedTicket {
                ticket_id,
                amount: self.amount.clone(),
                date_issued: snap.date_issued,
            }),
            _ => None,
        };
        if self.ticket.is_some() {
            self.step = Step::Ticket;
        } else if self.step == Step::Ticket {
            self.step = Step::Confirm;
        }
        tracing::debug!(step = self.step.number(), "wizard state restored");
    }

    pub fn snapshot(&self) -> WizardSnapshot {
        WizardSnapshot {
            amount: self.amount.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            step: self.step.number(),
            generated: self.ticket.is_some(),
            ticket_id: self.ticket.as_ref().map(|t| t.ticket_id.clone()),
            date_issued: self.ticket.as_ref().and_then(|t| t.date_issued.clone()),
        }
    }

    fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.set(SNAPSHOT_KEY, &self.snapshot()) {
            tracing::warn!(error = %format!("{e:#}"), "failed to persist wizard state");
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    /// The issued ticket, once generated.
    pub fn ticket(&self) -> Option<&IssuedTicket> {
        self.ticket.as_ref()
    }

    /// Error shown after a failed generation.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn set_amount(&mut self, amount: impl Into<String>) {
        self.amount = amount.into();
        self.persist();
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = email.into();
        self.persist();
    }

    pub fn set_phone(&mut self, phone: impl Into<String>) {
        self.phone = phone.into();
        self.persist();
    }

    /// Advance past the current input step if its value validates. Returns whether the step
    /// changed. Confirmation advances only through [`Wizard::generate`].
    pub fn next(&mut self) -> bool {
        match self.step {
            Step::Amount if !is_valid_amount(&self.amount) => {
                self.notifier.error(AMOUNT_ERROR);
                false
            }
            Step::Contact if !is_valid_email(&self.email) => {
                self.notifier.error(EMAIL_ERROR);
                false
            }
            Step::Amount | Step::Contact => {
                self.step = self.step.next();
                self.persist();
                true
            }
            Step::Confirm | Step::Ticket => false,
        }
    }

    /// Go back one step, never before the first. From an issued ticket this starts over.
    pub fn back(&mut self) {
        if self.ticket.is_some() {
            self.reset();
            return;
        }
        self.step = self.step.prev();
        self.persist();
    }

    /// Issue the ticket from the confirmation step and deliver it by email.
    ///
    /// A create failure keeps the wizard on confirmation with [`Wizard::last_error`] set. Once the
    /// backend issued a ticket the wizard moves to the ticket step, even if the email failed.
    #[tracing::instrument(skip_all)]
    pub async fn generate(&mut self, orch: &DeliveryOrchestrator) -> TicketResult<DeliveryResult> {
        if self.step != Step::Confirm {
            return Err(TicketError::validation(format!(
                "generate is only available on the confirmation step (at step {})",
                self.step.number()
            )));
        }
        if !is_valid_amount(&self.amount) {
            self.notifier.error(AMOUNT_ERROR);
            return Err(TicketError::validation(AMOUNT_ERROR));
        }
        if !is_valid_email(&self.email) {
            self.notifier.error(EMAIL_ERROR);
            return Err(TicketError::validation(EMAIL_ERROR));
        }

        self.last_error = None;
        let meta = TicketMeta {
            amount: self.amount.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        };
        let result = orch.issue_and_deliver(&meta).await;

        match &result.ticket {
            Some(ticket) => {
                self.ticket = Some(ticket.clone());
                self.step = Step::Ticket;
                self.persist();
            }
            None => {
                if let DeliveryOutcome::CreateFailed { message, .. } = &result.outcome {
                    self.last_error = Some(message.clone());
                }
            }
        }
        Ok(result)
    }

    /// Email the issued ticket again using the mounted card.
    pub async fn resend(&self, orch: &DeliveryOrchestrator) -> TicketResult<DeliveryResult> {
        let ticket = self
            .ticket
            .as_ref()
            .ok_or_else(|| TicketError::validation("no ticket has been generated"))?;
        Ok(orch.resend(&ticket.ticket_id, &self.email).await)
    }

    /// Mount the restored ticket's card so it can be resent. Returns whether a card was mounted.
    pub fn remount(&self, orch: &DeliveryOrchestrator) -> TicketResult<bool> {
        match &self.ticket {
            Some(ticket) if orch.mounted_ticket().as_ref() != Some(ticket) => {
                orch.mount(ticket.clone())?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Clear the form and the persisted snapshot to start a new ticket.
    pub fn reset(&mut self) {
        self.step = Step::FIRST;
        self.amount.clear();
        self.email.clear();
        self.phone.clear();
        self.ticket = None;
        self.last_error = None;
        if let Some(store) = &self.store {
            if let Err(e) = store.remove(SNAPSHOT_KEY) {
                tracing::warn!(error = %format!("{e:#}"), "failed to clear wizard state");
            }
        }
    }
}

impl std::fmt::Debug for Wizard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wizard")
            .field("step", &self.step)
            .field("amount", &self.amount)
            .field("email", &self.email)
            .field("ticket", &self.ticket)
            .field("last_error", &self.last_error)
            .finish()
    }
}

#[cfg(test)]
#[path = "../tests/unit/wizard/wizard.rs"]
mod tests;
