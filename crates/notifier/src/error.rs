//! Error taxonomy for provider calls and reconciliation cycles
//!
//! Provider calls fail with [`ProviderError`], which keeps whatever detail the
//! HTTP layer returned. The engine collapses those into [`SyncError`]:
//! only [`AuthRequired`] ever escapes a reconciliation cycle.

use crate::models::MessageId;

/// Error reasons the Gmail API and token endpoint use for dead credentials
const AUTH_REASONS: &[&str] = &["authError", "invalid_grant", "unauthorized_client"];

/// Failure reported by the mail provider boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The provider answered with a non-success status
    #[error("Provider returned HTTP {status}: {message}")]
    Api {
        status: u16,
        /// Structured reason (`errors[0].reason` or the token endpoint's `error`)
        reason: Option<String>,
        message: String,
    },

    /// The request never produced a response (DNS, TLS, timeout, ...)
    #[error("Request failed: {0}")]
    Transport(String),

    /// A success response whose body could not be decoded
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Whether this failure means the credential is invalid, expired or revoked
    pub fn is_auth(&self) -> bool {
        match self {
            Self::Api { status, reason, .. } => {
                *status == 401
                    || reason
                        .as_deref()
                        .is_some_and(|r| AUTH_REASONS.contains(&r))
            }
            _ => false,
        }
    }
}

/// The credential is unusable; polling stops until the user re-authorizes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Authorization required: {0}")]
pub struct AuthRequired(pub String);

/// Engine-level error classes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// Halts polling and asks the user to authorize again
    #[error(transparent)]
    Auth(#[from] AuthRequired),

    /// Retried silently on the next cycle
    #[error("Transient provider failure: {0}")]
    Transient(String),

    /// One message could not be resolved; only its slot is affected
    #[error("Failed to retrieve message {id}: {message}")]
    Data { id: MessageId, message: String },
}

impl SyncError {
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

impl From<ProviderError> for SyncError {
    fn from(e: ProviderError) -> Self {
        if e.is_auth() {
            Self::Auth(AuthRequired(e.to_string()))
        } else {
            Self::Transient(e.to_string())
        }
    }
}
