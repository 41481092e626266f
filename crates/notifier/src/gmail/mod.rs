//! Gmail API integration
//!
//! This module provides:
//! - A blocking Gmail REST client implementing [`crate::MailProvider`]
//! - Header extraction from metadata-format messages

mod client;
mod normalize;

pub use client::GmailClient;
pub use normalize::message_headers;

/// Gmail API response types
pub mod api {
    use serde::{Deserialize, Serialize};

    /// Response from listing messages
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListMessagesResponse {
        pub messages: Option<Vec<MessageRef>>,
        pub next_page_token: Option<String>,
        pub result_size_estimate: Option<u32>,
    }

    /// Reference to a message (just ID and thread ID)
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageRef {
        pub id: String,
        pub thread_id: Option<String>,
    }

    /// Message fetched with `format=metadata`
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailMessage {
        pub id: String,
        pub thread_id: Option<String>,
        pub label_ids: Option<Vec<String>>,
        pub payload: Option<MessagePayload>,
    }

    /// Message payload; only headers are requested
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePayload {
        pub headers: Option<Vec<Header>>,
        pub mime_type: Option<String>,
    }

    /// Email header (name-value pair)
    #[derive(Debug, Deserialize, Serialize)]
    pub struct Header {
        pub name: String,
        pub value: String,
    }

    /// Token response from Google
    #[derive(Debug, Deserialize)]
    pub struct TokenResponse {
        pub access_token: String,
        pub refresh_token: Option<String>,
        pub expires_in: Option<u64>,
        pub token_type: Option<String>,
    }

    /// Error bodies returned by the REST API and by the token endpoint
    #[derive(Debug, Deserialize)]
    #[serde(untagged)]
    pub enum ErrorResponse {
        /// `{"error": {"code": 401, "message": "...", "errors": [...]}}`
        Api { error: ApiError },
        /// `{"error": "invalid_grant", "error_description": "..."}`
        Token {
            error: String,
            error_description: Option<String>,
        },
    }

    #[derive(Debug, Deserialize)]
    pub struct ApiError {
        pub code: Option<u16>,
        pub message: Option<String>,
        #[serde(default)]
        pub errors: Vec<ApiErrorItem>,
        pub status: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ApiErrorItem {
        pub reason: Option<String>,
        pub message: Option<String>,
        pub domain: Option<String>,
    }
}
