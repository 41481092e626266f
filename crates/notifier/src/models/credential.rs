//! OAuth credential pair

use serde::{Deserialize, Serialize};

/// Access/refresh token pair authorizing provider calls
///
/// Serialized as the `{access_token, refresh_token}` object stored in the
/// token file. `expiry_date` is milliseconds since the Unix epoch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
}

impl Credential {
    /// An empty credential ("not authorized yet")
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token,
            expiry_date: None,
        }
    }

    pub fn with_expiry_date(mut self, expiry_date: i64) -> Self {
        self.expiry_date = Some(expiry_date);
        self
    }

    /// Non-empty access token, if any
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Non-empty refresh token, if any
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    /// True iff either token is non-empty
    pub fn is_valid(&self) -> bool {
        self.access_token().is_some() || self.refresh_token().is_some()
    }

    /// Whether the access token expires within `buffer_ms` of `now_ms`.
    ///
    /// A credential without a known expiry is never considered expired.
    pub fn expires_within(&self, now_ms: i64, buffer_ms: i64) -> bool {
        self.expiry_date
            .is_some_and(|expiry| expiry <= now_ms + buffer_ms)
    }
}
