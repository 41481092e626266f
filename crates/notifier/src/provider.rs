//! Mail provider boundary
//!
//! The engine treats the provider as a set of opaque remote procedures.
//! [`crate::gmail::GmailClient`] is the production implementation; tests
//! substitute in-memory fakes.

use crate::error::ProviderError;
use crate::models::{MessageHeaders, MessageId};

/// Tokens granted by the provider's token endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    /// Absent on most refresh responses
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds
    pub expires_in: Option<u64>,
}

/// Remote procedures the engine needs from a mail provider
pub trait MailProvider: Send {
    /// Consent URL for the given scopes; must be deterministic
    fn authorization_url(&self, scopes: &[String]) -> String;

    /// Exchange an authorization code for tokens
    fn exchange_code(&self, code: &str) -> Result<TokenGrant, ProviderError>;

    /// Obtain a fresh access token from a refresh token
    fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenGrant, ProviderError>;

    /// Ids of up to `max_results` unread inbox messages, most recent first
    fn list_unread(
        &self,
        access_token: &str,
        mailbox: &str,
        max_results: usize,
    ) -> Result<Vec<MessageId>, ProviderError>;

    /// Subject, From and Date headers of one message
    fn get_message_headers(
        &self,
        access_token: &str,
        mailbox: &str,
        id: &MessageId,
    ) -> Result<MessageHeaders, ProviderError>;
}
