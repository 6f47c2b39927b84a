use std::sync::Arc;

use parking_lot::Mutex;

use super::*;
use crate::delivery::api::{CreateTicketRequest, CreatedTicket, EmailRequest};
use crate::delivery::notify::{Level, MemoryNotifier};

#[derive(Default)]
struct Backend {
    records: Mutex<Vec<TicketRecord>>,
    lookup_error: Option<u16>,
    patch_error: Option<(u16, Option<String>)>,
}

#[async_trait::async_trait]
impl TicketApi for Backend {
    async fn create_ticket(&self, _req: &CreateTicketRequest) -> TicketResult<CreatedTicket> {
        Err(TicketError::http(405, None))
    }

    async fn get_ticket(&self, ticket_id: &str) -> TicketResult<Option<TicketRecord>> {
        if let Some(status) = self.lookup_error {
            return Err(TicketError::http(status, None));
        }
        Ok(self
            .records
            .lock()
            .iter()
            .find(|r| r.ticket_id == ticket_id)
            .cloned())
    }

    async fn mark_used(&self, ticket_id: &str) -> TicketResult<TicketRecord> {
        if let Some((status, msg)) = &self.patch_error {
            return Err(TicketError::http(*status, msg.clone()));
        }
        let mut records = self.records.lock();
        let record = records
            .iter_mut()
            .find(|r| r.ticket_id == ticket_id)
            .ok_or_else(|| TicketError::http(404, Some("not found".into())))?;
        record.used = true;
        Ok(record.clone())
    }

    async fn send_ticket_email(&self, _req: &EmailRequest) -> TicketResult<()> {
        Ok(())
    }
}

fn record(id: &str, used: bool) -> TicketRecord {
    TicketRecord {
        ticket_id: id.into(),
        used,
        ..TicketRecord::default()
    }
}

#[tokio::test]
async fn lookup_maps_to_status() {
    let backend = Backend::default();
    backend.records.lock().extend([record("DR-1", false), record("DR-2", true)]);

    assert!(matches!(verify_ticket(&backend, "DR-1").await, VerifyStatus::Valid(_)));
    assert_eq!(verify_ticket(&backend, " DR-2 ").await.label(), "used");
    assert_eq!(verify_ticket(&backend, "DR-3").await, VerifyStatus::Fake);
    assert_eq!(verify_ticket(&backend, "").await, VerifyStatus::Fake);
}

#[tokio::test]
async fn backend_errors_read_as_fake() {
    let backend = Backend {
        lookup_error: Some(500),
        ..Backend::default()
    };
    assert_eq!(verify_ticket(&backend, "DR-1").await, VerifyStatus::Fake);
}

#[tokio::test]
async fn invalidate_marks_used_and_notifies() {
    let backend = Arc::new(Backend::default());
    backend.records.lock().push(record("DR-1", false));
    let notes = MemoryNotifier::new();

    let updated = invalidate_ticket(backend.as_ref(), &notes, "DR-1").await.unwrap();
    assert!(updated.used);
    assert_eq!(notes.messages(Level::Success), vec![MARKED_USED_MESSAGE]);
    assert_eq!(verify_ticket(backend.as_ref(), "DR-1").await.label(), "used");
}

#[tokio::test]
async fn invalidate_failure_surfaces_server_message() {
    let notes = MemoryNotifier::new();
    let backend = Backend {
        patch_error: Some((409, Some("already used".into()))),
        ..Backend::default()
    };
    assert!(invalidate_ticket(&backend, &notes, "DR-1").await.is_err());

    let backend = Backend {
        patch_error: Some((500, None)),
        ..Backend::default()
    };
    assert!(invalidate_ticket(&backend, &notes, "DR-1").await.is_err());
    assert_eq!(
        notes.messages(Level::Error),
        vec!["already used", "Update failed (500)"]
    );
}
