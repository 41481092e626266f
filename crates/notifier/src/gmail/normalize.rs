//! Gmail API response normalization
//!
//! Converts metadata-format Gmail messages to [`MessageHeaders`].

use super::api::{GmailMessage, MessagePayload};
use crate::models::MessageHeaders;

/// Pull the Subject, From and Date headers out of a Gmail message
pub fn message_headers(gmail_msg: &GmailMessage) -> MessageHeaders {
    let Some(payload) = gmail_msg.payload.as_ref() else {
        return MessageHeaders::default();
    };

    MessageHeaders {
        subject: extract_header(payload, "Subject"),
        from: extract_header(payload, "From"),
        date: extract_header(payload, "Date"),
    }
}

/// Extract a header value by name
fn extract_header(payload: &MessagePayload, name: &str) -> Option<String> {
    payload.headers.as_ref()?.iter().find_map(|h| {
        if h.name.eq_ignore_ascii_case(name) {
            Some(h.value.clone())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::api::Header;

    fn make_test_payload(headers: Vec<(&str, &str)>) -> MessagePayload {
        MessagePayload {
            headers: Some(
                headers
                    .into_iter()
                    .map(|(n, v)| Header {
                        name: n.to_string(),
                        value: v.to_string(),
                    })
                    .collect(),
            ),
            mime_type: Some("text/plain".to_string()),
        }
    }

    #[test]
    fn test_extract_header() {
        let payload = make_test_payload(vec![
            ("From", "test@example.com"),
            ("Subject", "Test Subject"),
        ]);

        assert_eq!(
            extract_header(&payload, "From"),
            Some("test@example.com".to_string())
        );
        assert_eq!(
            extract_header(&payload, "Subject"),
            Some("Test Subject".to_string())
        );
        assert_eq!(extract_header(&payload, "Date"), None);
    }

    #[test]
    fn test_extract_header_case_insensitive() {
        let payload = make_test_payload(vec![("SUBJECT", "hello")]);
        assert_eq!(extract_header(&payload, "Subject"), Some("hello".to_string()));
    }

    #[test]
    fn test_message_headers_from_json() {
        let json = r#"{
            "id": "18c1",
            "threadId": "18c0",
            "labelIds": ["UNREAD", "INBOX"],
            "payload": {
                "mimeType": "multipart/alternative",
                "headers": [
                    {"name": "Date", "value": "Tue, 1 Oct 2024 09:05:00 -0700"},
                    {"name": "Subject", "value": "Quarterly report"},
                    {"name": "From", "value": "Ann <ann@example.com>"}
                ]
            }
        }"#;
        let msg: GmailMessage = serde_json::from_str(json).unwrap();
        let headers = message_headers(&msg);

        assert_eq!(headers.subject.as_deref(), Some("Quarterly report"));
        assert_eq!(headers.from.as_deref(), Some("Ann <ann@example.com>"));
        assert_eq!(headers.date.as_deref(), Some("Tue, 1 Oct 2024 09:05:00 -0700"));
    }

    #[test]
    fn test_message_without_payload() {
        let msg: GmailMessage = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        assert_eq!(message_headers(&msg), MessageHeaders::default());
    }
}
