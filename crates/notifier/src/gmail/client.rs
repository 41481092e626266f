//! Gmail API HTTP client
//!
//! Implements the provider boundary against the Gmail REST API and Google's
//! OAuth2 endpoints. Uses synchronous HTTP (ureq) to be executor-agnostic.

use std::time::Duration;

use log::debug;
use serde::de::DeserializeOwned;
use ureq::Agent;
use ureq::http::Response;

use super::api::{ErrorResponse, GmailMessage, ListMessagesResponse, TokenResponse};
use super::normalize::message_headers;
use crate::config::NotifierConfig;
use crate::error::ProviderError;
use crate::models::{MessageHeaders, MessageId};
use crate::provider::{MailProvider, TokenGrant};

/// Gmail API client
pub struct GmailClient {
    agent: Agent,
    client_id: String,
    client_secret: String,
    redirect_url: String,
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// OAuth2 endpoints
    const AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    /// Per-request timeout; failures surface as transient errors
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a new Gmail client
    ///
    /// # Arguments
    /// * `client_id` - OAuth2 client ID from Google Cloud Console
    /// * `client_secret` - OAuth2 client secret from Google Cloud Console
    /// * `redirect_url` - Redirect URI registered for the client
    pub fn new(client_id: String, client_secret: String, redirect_url: String) -> Self {
        let config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(Self::REQUEST_TIMEOUT))
            .build();

        Self {
            agent: Agent::new_with_config(config),
            client_id,
            client_secret,
            redirect_url,
        }
    }

    pub fn from_config(config: &NotifierConfig) -> Self {
        Self::new(
            config.client_id.clone(),
            config.client_secret.clone(),
            config.redirect_url.clone(),
        )
    }

    fn request_tokens(&self, form: &[(&str, &str)]) -> Result<TokenGrant, ProviderError> {
        let response = self
            .agent
            .post(Self::TOKEN_URL)
            .send_form(form.iter().copied())
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let token: TokenResponse = read_response(response)?;
        Ok(TokenGrant {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in: token.expires_in,
        })
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, access_token: &str) -> Result<T, ProviderError> {
        let response = self
            .agent
            .get(url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        read_response(response)
    }
}

impl MailProvider for GmailClient {
    fn authorization_url(&self, scopes: &[String]) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            Self::AUTH_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_url),
            urlencoding::encode(&scopes.join(" ")),
        )
    }

    fn exchange_code(&self, code: &str) -> Result<TokenGrant, ProviderError> {
        debug!("Exchanging authorization code for tokens");
        self.request_tokens(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.redirect_url.as_str()),
        ])
    }

    fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenGrant, ProviderError> {
        debug!("Refreshing access token");
        self.request_tokens(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
    }

    fn list_unread(
        &self,
        access_token: &str,
        mailbox: &str,
        max_results: usize,
    ) -> Result<Vec<MessageId>, ProviderError> {
        let url = format!(
            "{}/users/{}/messages?maxResults={}&labelIds=INBOX&q={}",
            Self::BASE_URL,
            urlencoding::encode(mailbox),
            max_results,
            urlencoding::encode("is:unread"),
        );

        let list: ListMessagesResponse = self.get_json(&url, access_token)?;
        Ok(list
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| MessageId::new(m.id))
            .collect())
    }

    fn get_message_headers(
        &self,
        access_token: &str,
        mailbox: &str,
        id: &MessageId,
    ) -> Result<MessageHeaders, ProviderError> {
        let url = format!(
            "{}/users/{}/messages/{}?format=metadata&metadataHeaders=Subject&metadataHeaders=From&metadataHeaders=Date",
            Self::BASE_URL,
            urlencoding::encode(mailbox),
            urlencoding::encode(id.as_str()),
        );

        let message: GmailMessage = self.get_json(&url, access_token)?;
        Ok(message_headers(&message))
    }
}

/// Decode a success body, or turn an error body into a [`ProviderError`]
fn read_response<T: DeserializeOwned>(
    mut response: Response<ureq::Body>,
) -> Result<T, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return response
            .body_mut()
            .read_json()
            .map_err(|e| ProviderError::Decode(e.to_string()));
    }

    let body = response.body_mut().read_to_string().unwrap_or_default();
    Err(parse_error_body(status.as_u16(), &body))
}

/// Interpret a Google error body
///
/// Bodies that don't match either known shape keep only the status, which
/// classifies them as transient unless the status itself is 401.
fn parse_error_body(status: u16, body: &str) -> ProviderError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse::Api { error }) => {
            let reason = error.errors.iter().find_map(|e| e.reason.clone());
            ProviderError::Api {
                status,
                reason,
                message: error.message.unwrap_or_default(),
            }
        }
        Ok(ErrorResponse::Token {
            error,
            error_description,
        }) => ProviderError::Api {
            status,
            message: error_description.unwrap_or_else(|| error.clone()),
            reason: Some(error),
        },
        Err(_) => ProviderError::Api {
            status,
            reason: None,
            message: body.chars().take(200).collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GmailClient {
        GmailClient::new(
            "client id".to_string(),
            "secret".to_string(),
            "http://localhost:8080/redirect".to_string(),
        )
    }

    #[test]
    fn test_authorization_url() {
        let url = client().authorization_url(&[
            "https://www.googleapis.com/auth/gmail.readonly".to_string(),
        ]);

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=client%20id"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fredirect"));
        assert!(url.contains("scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fgmail.readonly"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
    }

    #[test]
    fn test_authorization_url_is_deterministic() {
        let scopes = vec!["a".to_string(), "b".to_string()];
        assert_eq!(client().authorization_url(&scopes), client().authorization_url(&scopes));
        assert!(client().authorization_url(&scopes).contains("scope=a%20b"));
    }

    #[test]
    fn test_parse_api_auth_error() {
        let body = r#"{
            "error": {
                "code": 401,
                "message": "Invalid Credentials",
                "errors": [{"domain": "global", "reason": "authError", "message": "Invalid Credentials"}],
                "status": "UNAUTHENTICATED"
            }
        }"#;
        let err = parse_error_body(401, body);
        assert_eq!(
            err,
            ProviderError::Api {
                status: 401,
                reason: Some("authError".to_string()),
                message: "Invalid Credentials".to_string(),
            }
        );
        assert!(err.is_auth());
    }

    #[test]
    fn test_parse_token_error() {
        let body = r#"{"error": "invalid_grant", "error_description": "Token has been expired or revoked."}"#;
        let err = parse_error_body(400, body);
        assert!(err.is_auth());
        assert!(err.to_string().contains("expired or revoked"));
    }

    #[test]
    fn test_parse_unstructured_error() {
        let err = parse_error_body(503, "<html>Service Unavailable</html>");
        assert!(!err.is_auth());
        assert!(matches!(err, ProviderError::Api { status: 503, reason: None, .. }));
    }

    #[test]
    fn test_parse_rate_limit_error() {
        let body = r#"{"error": {"code": 429, "message": "Too many", "errors": [{"reason": "rateLimitExceeded"}]}}"#;
        let err = parse_error_body(429, body);
        assert!(!err.is_auth());
    }
}
