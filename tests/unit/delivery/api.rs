use chrono::{FixedOffset, Utc};

use super::*;

#[test]
fn create_request_serializes_raw_form_values() {
    let req = CreateTicketRequest {
        amount: "300".into(),
        email: "a@b.co".into(),
        phone: String::new(),
    };
    assert_eq!(
        serde_json::to_value(&req).unwrap(),
        serde_json::json!({"amount": "300", "email": "a@b.co", "phone": ""})
    );
}

#[test]
fn created_ticket_prefers_formatted_date() {
    let t: CreatedTicket = serde_json::from_str(
        r#"{"ticketId":"DR-1","dateIssued":"05 Mar 2026","dateIssuedIso":"2026-03-04T23:30:00Z"}"#,
    )
    .unwrap();
    assert_eq!(t.ticket_id, "DR-1");
    assert_eq!(t.display_date(&Utc).as_deref(), Some("05 Mar 2026"));

    let t: CreatedTicket =
        serde_json::from_str(r#"{"ticketId":"DR-2","dateIssuedIso":"2026-03-04T23:30:00Z"}"#).unwrap();
    assert_eq!(t.display_date(&Utc).as_deref(), Some("04 Mar 2026"));
    let lagos = FixedOffset::east_opt(3600).unwrap();
    assert_eq!(t.display_date(&lagos).as_deref(), Some("05 Mar 2026"));

    let t: CreatedTicket = serde_json::from_str(r#"{"ticketId":"DR-3"}"#).unwrap();
    assert_eq!(t.display_date(&Utc), None);
}

#[test]
fn email_request_uses_camel_case() {
    let req = EmailRequest {
        ticket_id: "DR-1".into(),
        to: "a@b.co".into(),
        image_data_url: "data:image/jpeg;base64,AAAA".into(),
    };
    let v = serde_json::to_value(&req).unwrap();
    assert_eq!(v["ticketId"], "DR-1");
    assert_eq!(v["imageDataUrl"], "data:image/jpeg;base64,AAAA");
}

#[test]
fn server_error_message_is_kept_verbatim() {
    let err = error_from_body(400, r#"{"error":"invalid address"}"#);
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.user_message("generic"), "invalid address");

    let err = error_from_body(500, "<html>oops</html>");
    assert_eq!(err.user_message("generic"), "generic");
    assert_eq!(err.to_string(), "delivery error: Server error 500");

    let err = error_from_body(502, r#"{"error":""}"#);
    assert_eq!(err.user_message("generic"), "generic");
}

#[test]
fn record_amount_display_handles_both_shapes() {
    let r: TicketRecord = serde_json::from_str(r#"{"ticketId":"A","amount":"500","used":true}"#).unwrap();
    assert!(r.used);
    assert_eq!(r.amount_display(), "₦500");

    let r: TicketRecord = serde_json::from_str(r#"{"ticketId":"B","amount":450}"#).unwrap();
    assert!(!r.used);
    assert_eq!(r.amount_display(), "₦450");

    assert_eq!(TicketRecord::default().amount_display(), "₦300");
}

#[test]
fn ticket_urls_escape_the_id() {
    let api = HttpTicketApi::new(reqwest::Client::new(), "http://localhost:4000/");
    assert_eq!(api.base(), "http://localhost:4000");
    assert_eq!(
        api.ticket_url("DR 1/x").unwrap().as_str(),
        "http://localhost:4000/api/tickets/DR%201%2Fx"
    );
}
