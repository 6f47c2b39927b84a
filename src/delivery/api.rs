use chrono::TimeZone;
use serde::{Deserialize, Serialize};

use crate::card::content::{DEFAULT_AMOUNT, format_issue_date_iso};
use crate::foundation::error::{TicketError, TicketResult};

/// `POST /api/tickets` body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTicketRequest {
    /// Amount exactly as typed into the form.
    pub amount: String,
    pub email: String,
    pub phone: String,
}

/// `POST /api/tickets` response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTicket {
    pub ticket_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_issued: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_issued_iso: Option<String>,
}

impl CreatedTicket {
    /// Display date: the backend's formatted date, else its ISO timestamp rendered in `tz`.
    pub fn display_date<Tz: TimeZone>(&self, tz: &Tz) -> Option<String> {
        if let Some(d) = self.date_issued.as_deref().filter(|d| !d.trim().is_empty()) {
            return Some(d.to_string());
        }
        self.date_issued_iso
            .as_deref()
            .and_then(|iso| format_issue_date_iso(iso, tz))
    }
}

/// Stored ticket as returned by `GET /api/tickets/{id}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TicketRecord {
    pub ticket_id: String,
    /// String or number depending on the backend revision.
    pub amount: Option<serde_json::Value>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub used: bool,
    pub date_issued: Option<String>,
    pub date_issued_iso: Option<String>,
}

impl TicketRecord {
    /// Amount with currency symbol; the default fare when the record has none.
    pub fn amount_display(&self) -> String {
        match &self.amount {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => format!("₦{}", s.trim()),
            Some(serde_json::Value::Number(n)) => format!("₦{n}"),
            _ => DEFAULT_AMOUNT.to_string(),
        }
    }
}

/// `POST /api/tickets/email` body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRequest {
    pub ticket_id: String,
    pub to: String,
    pub image_data_url: String,
}

#[derive(Serialize)]
struct MarkUsedRequest {
    used: bool,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Ticket backend.
#[async_trait::async_trait]
pub trait TicketApi: Send + Sync {
    async fn create_ticket(&self, req: &CreateTicketRequest) -> TicketResult<CreatedTicket>;

    /// `Ok(None)` when the backend answers 404.
    async fn get_ticket(&self, ticket_id: &str) -> TicketResult<Option<TicketRecord>>;

    async fn mark_used(&self, ticket_id: &str) -> TicketResult<TicketRecord>;

    async fn send_ticket_email(&self, req: &EmailRequest) -> TicketResult<()>;
}

/// JSON-over-HTTP backend client.
#[derive(Clone, Debug)]
pub struct HttpTicketApi {
    client: reqwest::Client,
    base: String,
}

impl HttpTicketApi {
    pub fn new(client: reqwest::Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    fn ticket_url(&self, ticket_id: &str) -> TicketResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.url("/api/tickets/"))
            .map_err(|e| TicketError::validation(format!("bad api base '{}': {e}", self.base)))?;
        url.path_segments_mut()
            .map_err(|()| TicketError::validation(format!("api base '{}' cannot be a base", self.base)))?
            .pop_if_empty()
            .push(ticket_id);
        Ok(url)
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> TicketResult<reqwest::Response> {
        req.send()
            .await
            .map_err(|e| TicketError::transport(format!("request failed: {e}")))
    }
}

/// Read the body of a non-2xx response into a delivery error.
async fn failure(resp: reqwest::Response) -> TicketError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    error_from_body(status, &body)
}

/// Map a failed status and its body to [`TicketError::Delivery`], keeping the server's `{error}`
/// message when the body carries one.
pub fn error_from_body(status: u16, body: &str) -> TicketError {
    let server = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error);
    TicketError::http(status, server)
}

async fn json_body<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> TicketResult<T> {
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| TicketError::transport(format!("read response body: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| TicketError::serde(format!("response body: {e}")))
}

#[async_trait::async_trait]
impl TicketApi for HttpTicketApi {
    #[tracing::instrument(level = "debug", skip_all, fields(base = %self.base))]
    async fn create_ticket(&self, req: &CreateTicketRequest) -> TicketResult<CreatedTicket> {
        let resp = self
            .send(self.client.post(self.url("/api/tickets")).json(req))
            .await?;
        if !resp.status().is_success() {
            return Err(failure(resp).await);
        }
        json_body(resp).await
    }

    async fn get_ticket(&self, ticket_id: &str) -> TicketResult<Option<TicketRecord>> {
        let resp = self.send(self.client.get(self.ticket_url(ticket_id)?)).await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(failure(resp).await);
        }
        json_body(resp).await.map(Some)
    }

    async fn mark_used(&self, ticket_id: &str) -> TicketResult<TicketRecord> {
        let resp = self
            .send(
                self.client
                    .patch(self.ticket_url(ticket_id)?)
                    .json(&MarkUsedRequest { used: true }),
            )
            .await?;
        if !resp.status().is_success() {
            return Err(failure(resp).await);
        }
        json_body(resp).await
    }

    #[tracing::instrument(level = "debug", skip_all, fields(ticket_id = %req.ticket_id))]
    async fn send_ticket_email(&self, req: &EmailRequest) -> TicketResult<()> {
        let resp = self
            .send(self.client.post(self.url("/api/tickets/email")).json(req))
            .await?;
        if !resp.status().is_success() {
            return Err(failure(resp).await);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/delivery/api.rs"]
mod tests;
