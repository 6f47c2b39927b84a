use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Local;
use parking_lot::Mutex;

use crate::assets::logo::{LogoCache, logo_source_for};
use crate::capture::{CaptureEngine, CaptureOptions, CapturedImage, FontEnvironment};
use crate::card::content::TicketContent;
use crate::card::mount::TicketCard;
use crate::delivery::api::{CreateTicketRequest, EmailRequest, HttpTicketApi, TicketApi};
use crate::delivery::notify::Notifier;
use crate::foundation::config::{PageContext, PipelineConfig, ReadinessPolicy};
use crate::foundation::error::{GENERIC_DELIVERY_MESSAGE, TicketError, TicketResult};
use crate::readiness::{CaptureGate, WaitOptions, wait_until_ready_with};

pub const CAPTURE_FAILED_MESSAGE: &str = "Failed to generate ticket image";
pub const NOT_MOUNTED_MESSAGE: &str = "Ticket view not ready to resend";
pub const BUSY_MESSAGE: &str = "A ticket email is already being sent";
pub const UNCONFIRMED_READINESS_MESSAGE: &str =
    "Ticket image may be incomplete: the ticket did not finish loading in time";

/// Form values for a new ticket.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TicketMeta {
    /// Amount as typed; blank displays the default fare.
    pub amount: String,
    pub email: String,
    pub phone: String,
}

/// A ticket the backend has issued.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedTicket {
    pub ticket_id: String,
    /// Amount as typed into the form.
    pub amount: String,
    /// Display date; `None` lets the card show today's date.
    pub date_issued: Option<String>,
}

impl IssuedTicket {
    pub fn content(&self) -> TicketContent {
        TicketContent::issued(&self.ticket_id, &self.amount, self.date_issued.clone())
    }
}

/// How a delivery attempt ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered {
        image: CapturedImage,
        /// Whether readiness was observed before capture.
        readiness_confirmed: bool,
    },
    /// The ticket record could not be created; nothing was captured.
    CreateFailed { status: Option<u16>, message: String },
    /// The ticket exists but its image could not be produced.
    CaptureFailed { message: String },
    /// The image was produced but the email endpoint refused or failed.
    EmailFailed { status: Option<u16>, message: String },
    /// Another delivery holds the sending latch.
    Busy,
    /// No card is mounted for the requested ticket.
    NotMounted,
}

/// Result of one issue or resend attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryResult {
    /// The issued ticket, when one exists. Survives capture and email failures.
    pub ticket: Option<IssuedTicket>,
    pub outcome: DeliveryOutcome,
}

impl DeliveryResult {
    pub fn is_delivered(&self) -> bool {
        matches!(self.outcome, DeliveryOutcome::Delivered { .. })
    }
}

/// Readiness and page settings for an orchestrator.
#[derive(Clone, Debug, PartialEq)]
pub struct DeliverySettings {
    pub page: PageContext,
    pub wait: WaitOptions,
    pub policy: ReadinessPolicy,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for DeliverySettings {
    fn from(cfg: &PipelineConfig) -> Self {
        Self {
            page: cfg.page(),
            wait: WaitOptions::new(cfg.readiness_timeout(), cfg.readiness_max_retries)
                .with_backoff(cfg.readiness_backoff()),
            policy: cfg.readiness_policy,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AttemptKind {
    Issue,
    Resend,
}

/// Clears the sending latch on drop.
struct SendingGuard<'a>(&'a AtomicBool);

impl<'a> SendingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Mounted {
    ticket: IssuedTicket,
    card: Arc<TicketCard>,
}

/// Sequences create → mount → wait-ready → capture → email.
///
/// Every failure ends in a notification and a [`DeliveryResult`]; nothing here is fatal. Email
/// failures are never retried automatically: the caller resends.
pub struct DeliveryOrchestrator {
    api: Arc<dyn TicketApi>,
    logos: Arc<LogoCache>,
    capture: CaptureEngine,
    notifier: Arc<dyn Notifier>,
    settings: DeliverySettings,
    email_sending: AtomicBool,
    mounted: Mutex<Option<Mounted>>,
}

impl DeliveryOrchestrator {
    pub fn new(
        api: Arc<dyn TicketApi>,
        logos: Arc<LogoCache>,
        capture: CaptureEngine,
        notifier: Arc<dyn Notifier>,
        settings: DeliverySettings,
    ) -> Self {
        Self {
            api,
            logos,
            capture,
            notifier,
            settings,
            email_sending: AtomicBool::new(false),
            mounted: Mutex::new(None),
        }
    }

    /// Wire the HTTP backend, logo source and system fonts described by `cfg`.
    pub fn from_config(cfg: &PipelineConfig, client: reqwest::Client, notifier: Arc<dyn Notifier>) -> Self {
        let api = Arc::new(HttpTicketApi::new(client.clone(), cfg.api_base()));
        let logos = Arc::new(LogoCache::new(
            logo_source_for(&cfg.logo, client),
            cfg.logo_timeout(),
        ));
        let capture = CaptureEngine::new(
            FontEnvironment::system(&cfg.font_dirs),
            CaptureOptions::from(&cfg.capture),
        );
        Self::new(api, logos, capture, notifier, DeliverySettings::from(cfg))
    }

    pub fn api(&self) -> Arc<dyn TicketApi> {
        Arc::clone(&self.api)
    }

    pub fn logos(&self) -> Arc<LogoCache> {
        Arc::clone(&self.logos)
    }

    /// Whether a delivery currently holds the sending latch.
    pub fn is_sending(&self) -> bool {
        self.email_sending.load(Ordering::Acquire)
    }

    /// The ticket whose card is currently mounted.
    pub fn mounted_ticket(&self) -> Option<IssuedTicket> {
        self.mounted.lock().as_ref().map(|m| m.ticket.clone())
    }

    /// Mount the card for `ticket`, replacing (and unmounting) any previous card.
    pub fn mount(&self, ticket: IssuedTicket) -> TicketResult<()> {
        self.mount_card(ticket).map(|_| ())
    }

    /// Unmount the current card, if any.
    pub fn unmount(&self) {
        if let Some(prev) = self.mounted.lock().take() {
            tracing::debug!(ticket_id = %prev.ticket.ticket_id, "unmounting ticket card");
        }
    }

    fn mount_card(&self, ticket: IssuedTicket) -> TicketResult<Arc<TicketCard>> {
        let card = Arc::new(TicketCard::mount(
            ticket.content(),
            &self.settings.page,
            Arc::clone(&self.logos),
        )?);
        let previous = self.mounted.lock().replace(Mounted {
            ticket,
            card: Arc::clone(&card),
        });
        drop(previous);
        Ok(card)
    }

    /// Create the ticket record, mount its card and email the captured image to `meta.email`.
    #[tracing::instrument(skip_all, fields(email = %meta.email))]
    pub async fn issue_and_deliver(&self, meta: &TicketMeta) -> DeliveryResult {
        let req = CreateTicketRequest {
            amount: meta.amount.clone(),
            email: meta.email.clone(),
            phone: meta.phone.clone(),
        };
        let created = match self.api.create_ticket(&req).await {
            Ok(created) => created,
            Err(e) => {
                tracing::warn!(error = %e, "ticket creation failed");
                let message = create_failure_message(&e);
                self.notifier.error(&message);
                return DeliveryResult {
                    ticket: None,
                    outcome: DeliveryOutcome::CreateFailed {
                        status: e.status(),
                        message,
                    },
                };
            }
        };

        let ticket = IssuedTicket {
            date_issued: created.display_date(&Local),
            ticket_id: created.ticket_id,
            amount: meta.amount.clone(),
        };
        tracing::info!(ticket_id = %ticket.ticket_id, "ticket issued");

        let card = match self.mount_card(ticket.clone()) {
            Ok(card) => card,
            Err(e) => {
                tracing::warn!(error = %e, "ticket card could not be mounted");
                self.notifier.error(CAPTURE_FAILED_MESSAGE);
                return DeliveryResult {
                    ticket: Some(ticket),
                    outcome: DeliveryOutcome::CaptureFailed {
                        message: CAPTURE_FAILED_MESSAGE.to_string(),
                    },
                };
            }
        };

        let outcome = self.deliver(&card, &ticket.ticket_id, &meta.email, AttemptKind::Issue).await;
        DeliveryResult {
            ticket: Some(ticket),
            outcome,
        }
    }

    /// Re-capture the mounted card for `ticket_id` and email it again. Never creates a record.
    #[tracing::instrument(skip(self))]
    pub async fn resend(&self, ticket_id: &str, email: &str) -> DeliveryResult {
        let mounted = {
            let guard = self.mounted.lock();
            guard
                .as_ref()
                .filter(|m| m.ticket.ticket_id == ticket_id)
                .map(|m| (m.ticket.clone(), Arc::clone(&m.card)))
        };
        let Some((ticket, card)) = mounted else {
            self.notifier.error(NOT_MOUNTED_MESSAGE);
            return DeliveryResult {
                ticket: None,
                outcome: DeliveryOutcome::NotMounted,
            };
        };

        let outcome = self.deliver(&card, ticket_id, email, AttemptKind::Resend).await;
        DeliveryResult {
            ticket: Some(ticket),
            outcome,
        }
    }

    async fn deliver(
        &self,
        card: &TicketCard,
        ticket_id: &str,
        email: &str,
        kind: AttemptKind,
    ) -> DeliveryOutcome {
        let Some(_sending) = SendingGuard::acquire(&self.email_sending) else {
            self.notifier.info(BUSY_MESSAGE);
            return DeliveryOutcome::Busy;
        };

        let waited = wait_until_ready_with(&card.readiness(), self.settings.wait).await;
        let gate = match CaptureGate::decide(waited.succeeded, self.settings.policy) {
            Some(gate) => gate,
            None => {
                let err = TicketError::ReadinessTimeout {
                    attempts: waited.attempts,
                };
                tracing::warn!(error = %err, "aborting capture");
                self.notifier.error(CAPTURE_FAILED_MESSAGE);
                return DeliveryOutcome::CaptureFailed {
                    message: CAPTURE_FAILED_MESSAGE.to_string(),
                };
            }
        };
        if gate == CaptureGate::Degraded {
            self.notifier.warning(UNCONFIRMED_READINESS_MESSAGE);
        }

        let image = match self.capture.capture(card, gate).await {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(error = %e, "capture failed");
                self.notifier.error(CAPTURE_FAILED_MESSAGE);
                return DeliveryOutcome::CaptureFailed {
                    message: CAPTURE_FAILED_MESSAGE.to_string(),
                };
            }
        };

        let req = EmailRequest {
            ticket_id: ticket_id.to_string(),
            to: email.to_string(),
            image_data_url: image.data_uri.clone(),
        };
        if let Err(e) = self.api.send_ticket_email(&req).await {
            tracing::warn!(error = %e, "ticket email failed");
            let message = email_failure_message(&e);
            self.notifier.error(&message);
            return DeliveryOutcome::EmailFailed {
                status: e.status(),
                message,
            };
        }

        let verb = match kind {
            AttemptKind::Issue => "emailed",
            AttemptKind::Resend => "resent",
        };
        self.notifier.success(&format!("Ticket {verb} to {email}"));
        DeliveryOutcome::Delivered {
            image,
            readiness_confirmed: gate == CaptureGate::Confirmed,
        }
    }
}

impl std::fmt::Debug for DeliveryOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryOrchestrator")
            .field("logos", &self.logos)
            .field("capture", &self.capture)
            .field("settings", &self.settings)
            .field("sending", &self.is_sending())
            .field("mounted", &self.mounted_ticket())
            .finish()
    }
}

fn create_failure_message(e: &TicketError) -> String {
    match e {
        TicketError::Delivery { message, .. } => message.clone(),
        other => other.user_message(GENERIC_DELIVERY_MESSAGE),
    }
}

fn email_failure_message(e: &TicketError) -> String {
    match e {
        TicketError::Delivery {
            message,
            server_message: true,
            ..
        } => message.clone(),
        TicketError::Delivery {
            status: Some(status),
            ..
        } => format!("Email failed ({status})"),
        _ => "Email failed".to_string(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/delivery/orchestrator.rs"]
mod tests;
