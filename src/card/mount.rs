use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Local, NaiveDate};
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::assets::logo::{LogoAsset, LogoCache};
use crate::card::content::TicketContent;
use crate::card::dom::CardDom;
use crate::foundation::config::PageContext;
use crate::foundation::error::TicketResult;
use crate::readiness::{ReadinessHandle, ReadinessSignal};

/// Lifecycle phase of a mounted card. `Ready` is absorbing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardPhase {
    Mounted,
    LogoResolving,
    Ready,
}

/// Per-card observable state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TicketCardState {
    pub resolved_logo_src: String,
    pub ready: bool,
}

struct CardShared {
    ticket_id: String,
    alive: AtomicBool,
    phase: Mutex<CardPhase>,
    dom: Arc<Mutex<CardDom>>,
    signal: ReadinessSignal,
}

impl CardShared {
    /// Load-completion handler. The only place card state changes after mount.
    fn apply_logo(&self, logo: &LogoAsset) {
        if !self.alive.load(Ordering::Acquire) {
            tracing::debug!(ticket_id = %self.ticket_id, "logo resolved after unmount, ignoring");
            return;
        }
        if !logo.is_renderable() {
            tracing::warn!(ticket_id = %self.ticket_id, "logo has no pixels, card stays unready");
            return;
        }

        {
            let mut dom = self.dom.lock();
            dom.set_logo(logo);
            dom.ready_attr = true;
        }
        *self.phase.lock() = CardPhase::Ready;
        if self.signal.mark_ready() {
            tracing::debug!(
                ticket_id = %self.ticket_id,
                fallback = logo.is_fallback(),
                "ticket card ready"
            );
        }
    }
}

/// A mounted ticket card.
///
/// Mounting starts logo resolution in the background. Dropping the card unmounts it: the liveness
/// flag is cleared, the resolver is aborted and waiters observe the readiness channel closing.
pub struct TicketCard {
    shared: Arc<CardShared>,
    handle: ReadinessHandle,
    resolver: JoinHandle<()>,
}

impl TicketCard {
    /// Mount a card dated today (local time). Must be called inside a Tokio runtime.
    pub fn mount(
        content: TicketContent,
        page: &PageContext,
        logos: Arc<LogoCache>,
    ) -> TicketResult<Self> {
        Self::mount_on(content, page, logos, Local::now().date_naive())
    }

    /// Mount a card with an explicit "today" used when the backend supplied no issue date.
    pub fn mount_on(
        content: TicketContent,
        page: &PageContext,
        logos: Arc<LogoCache>,
        today: NaiveDate,
    ) -> TicketResult<Self> {
        let dom = CardDom::build(&content, page, today)?;
        let signal = ReadinessSignal::new();
        let handle = signal.handle();
        let shared = Arc::new(CardShared {
            ticket_id: content.ticket_id.clone(),
            alive: AtomicBool::new(true),
            phase: Mutex::new(CardPhase::Mounted),
            dom: Arc::new(Mutex::new(dom)),
            signal,
        });

        *shared.phase.lock() = CardPhase::LogoResolving;
        let resolver = {
            let shared = Arc::clone(&shared);
            tokio::spawn(async move {
                let logo = logos.get_logo().await;
                shared.apply_logo(&logo);
            })
        };

        tracing::debug!(ticket_id = %content.ticket_id, "ticket card mounted");
        Ok(Self {
            shared,
            handle,
            resolver,
        })
    }

    pub fn ticket_id(&self) -> &str {
        &self.shared.ticket_id
    }

    /// Readiness handle for waiters; usable after the card is gone.
    pub fn readiness(&self) -> ReadinessHandle {
        self.handle.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.handle.is_ready()
    }

    pub fn phase(&self) -> CardPhase {
        *self.shared.phase.lock()
    }

    pub fn state(&self) -> TicketCardState {
        TicketCardState {
            resolved_logo_src: self.shared.dom.lock().logo.src.clone(),
            ready: self.is_ready(),
        }
    }

    /// Show or hide the card subtree.
    pub fn set_visible(&self, visible: bool) {
        self.shared.dom.lock().visible = visible;
    }

    /// Copy of the current card tree.
    pub fn snapshot(&self) -> CardDom {
        self.shared.dom.lock().clone()
    }

    /// Shared handle on the live card tree, for capture.
    pub(crate) fn dom(&self) -> Arc<Mutex<CardDom>> {
        Arc::clone(&self.shared.dom)
    }
}

impl Drop for TicketCard {
    fn drop(&mut self) {
        self.shared.alive.store(false, Ordering::Release);
        self.resolver.abort();
        tracing::debug!(ticket_id = %self.shared.ticket_id, "ticket card unmounted");
    }
}

impl std::fmt::Debug for TicketCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketCard")
            .field("ticket_id", &self.shared.ticket_id)
            .field("phase", &self.phase())
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/card/mount.rs"]
mod tests;
